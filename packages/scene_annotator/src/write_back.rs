//! Write-back of user-driven annotations.
//!
//! Selecting an entity in the tree proposes a new desired state that
//! annotates it. The emitter never touches overlays: it hands the proposed
//! list to the host, which persists it and feeds it back in, and the next
//! reconciliation pass creates the overlay.

use crate::config::DuplicatePolicy;
use crate::desired_state::{DesiredAnnotation, DesiredState};

/// Receives proposed desired states.
pub type ProposalListener = Box<dyn FnMut(&DesiredState)>;

/// Derive the desired state that annotates `id`.
///
/// Entries are judged the way reconciliation sees them: when `id` repeats,
/// only the entry that wins under `policy` counts. Returns `None` when that
/// entry is titled. An untitled winner gets the id as its title and keeps
/// its color; otherwise a new `{ id, color: default_color, title: id }`
/// entry is appended.
pub fn propose(
    desired: &DesiredState,
    id: &str,
    default_color: &str,
    policy: DuplicatePolicy,
) -> Option<DesiredState> {
    if id.is_empty() {
        return None;
    }

    let winner = desired
        .effective(policy)
        .get(id)
        .map(|winner| (winner.has_title(), desired.iter().position(|e| std::ptr::eq(e, winner))));

    let mut entries = desired.entries().to_vec();
    match winner {
        Some((true, _)) => return None,
        Some((false, Some(index))) => entries[index].set_title(id),
        _ => entries.push(
            DesiredAnnotation::new(id)
                .with_color(default_color)
                .with_title(id),
        ),
    }
    Some(DesiredState::new(entries))
}

pub struct WriteBackEmitter {
    default_color: String,
    duplicates: DuplicatePolicy,
    listener: Option<ProposalListener>,
    /// Last proposal the host has not re-supplied yet.
    pending: Option<DesiredState>,
}

impl std::fmt::Debug for WriteBackEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackEmitter")
            .field("default_color", &self.default_color)
            .field("duplicates", &self.duplicates)
            .field("has_listener", &self.listener.is_some())
            .field("pending", &self.pending.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl WriteBackEmitter {
    pub fn new(default_color: impl Into<String>, duplicates: DuplicatePolicy) -> Self {
        Self {
            default_color: default_color.into(),
            duplicates,
            listener: None,
            pending: None,
        }
    }

    pub fn set_listener(&mut self, listener: ProposalListener) {
        self.listener = Some(listener);
    }

    pub fn pending(&self) -> Option<&DesiredState> {
        self.pending.as_ref()
    }

    /// The host supplied a new desired state; pending proposals are settled.
    pub fn acknowledge(&mut self) {
        self.pending = None;
    }

    /// Handle a selection. Publishes and returns the proposal, if any.
    ///
    /// Proposals build on the last unacknowledged one, so repeated or rapid
    /// selections before the host answers never emit duplicates.
    pub fn on_entity_selected(&mut self, current: &DesiredState, id: &str) -> Option<DesiredState> {
        let base = self.pending.as_ref().unwrap_or(current);
        let proposal = propose(base, id, &self.default_color, self.duplicates)?;

        log::info!("Proposing annotation for '{}' ({} entries)", id, proposal.len());
        if let Some(listener) = self.listener.as_mut() {
            listener(&proposal);
        }
        self.pending = Some(proposal.clone());
        Some(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_appends_default_entry() {
        let desired = DesiredState::new(vec![DesiredAnnotation::new("A").with_title("Door")]);
        let proposal = propose(&desired, "B", "#ff0000", DuplicatePolicy::LastWins).unwrap();

        assert_eq!(proposal.len(), 2);
        let added = &proposal.entries()[1];
        assert_eq!(added.id, "B");
        assert_eq!(added.color.as_deref(), Some("#ff0000"));
        assert_eq!(added.title(), Some("B"));
        // the input list is not modified
        assert_eq!(desired.len(), 1);
    }

    #[test]
    fn test_titled_entry_is_not_proposed_again() {
        let desired = DesiredState::new(vec![DesiredAnnotation::new("A").with_title("Door")]);
        assert!(propose(&desired, "A", "#ff0000", DuplicatePolicy::LastWins).is_none());
        assert!(propose(&desired, "", "#ff0000", DuplicatePolicy::LastWins).is_none());
    }

    #[test]
    fn test_untitled_entry_gets_title_in_place() {
        let desired = DesiredState::new(vec![
            DesiredAnnotation::new("A").with_color("#00ff00"),
            DesiredAnnotation::new("B"),
        ]);
        let proposal = propose(&desired, "A", "#ff0000", DuplicatePolicy::LastWins).unwrap();

        assert_eq!(proposal.len(), 2);
        assert_eq!(proposal.entries()[0].title(), Some("A"));
        assert_eq!(proposal.entries()[0].color.as_deref(), Some("#00ff00"));
        assert_eq!(proposal.entries()[1], desired.entries()[1]);
    }

    #[test]
    fn test_repeated_selection_emits_once() {
        let emitted = Rc::new(RefCell::new(Vec::new()));
        let sink = emitted.clone();
        let mut emitter = WriteBackEmitter::new("#ff0000", DuplicatePolicy::LastWins);
        emitter.set_listener(Box::new(move |state: &DesiredState| {
            sink.borrow_mut().push(state.clone());
        }));

        let current = DesiredState::default();
        assert!(emitter.on_entity_selected(&current, "A").is_some());
        assert!(emitter.on_entity_selected(&current, "A").is_none());

        let emitted = emitted.borrow();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].len(), 1);
    }

    #[test]
    fn test_rapid_selections_accumulate() {
        let mut emitter = WriteBackEmitter::new("#ff0000", DuplicatePolicy::LastWins);
        let current = DesiredState::default();
        emitter.on_entity_selected(&current, "A");
        let proposal = emitter.on_entity_selected(&current, "B").unwrap();

        let ids: Vec<&str> = proposal.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_acknowledge_settles_pending() {
        let mut emitter = WriteBackEmitter::new("#ff0000", DuplicatePolicy::LastWins);
        let proposal = emitter.on_entity_selected(&DesiredState::default(), "A").unwrap();
        assert!(emitter.pending().is_some());

        emitter.acknowledge();
        assert!(emitter.pending().is_none());
        assert!(emitter.on_entity_selected(&proposal, "A").is_none());
    }

    #[test]
    fn test_untitled_winner_is_titled_despite_titled_duplicate() {
        let desired = DesiredState::new(vec![
            DesiredAnnotation::new("A"),
            DesiredAnnotation::new("A").with_title("T"),
        ]);
        assert!(propose(&desired, "A", "#ff0000", DuplicatePolicy::LastWins).is_none());

        let proposal = propose(&desired, "A", "#ff0000", DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(proposal.len(), 2);
        assert_eq!(proposal.entries()[0].title(), Some("A"));
        assert_eq!(proposal.entries()[1].title(), Some("T"));
        let effective = proposal.effective(DuplicatePolicy::FirstWins);
        assert!(effective.get("A").unwrap().has_title());
    }
}
