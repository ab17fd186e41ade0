//! Model load gating.
//!
//! Model loading is asynchronous and owned by the host. The gate hands out a
//! generation token per load and only accepts the completion signal of the
//! most recent one, exactly once. Completions from superseded loads are
//! dropped without being reported.

use crate::bounds::BoundingBox;

/// Identifies one model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken {
    generation: u64,
}

impl LoadToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of delivering a completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The current load finished; run the first full pass.
    Ready,
    /// Superseded or already-delivered signal; ignore it.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading {
        token: LoadToken,
        source: String,
    },
    Ready {
        token: LoadToken,
        source: String,
        bounds: BoundingBox,
    },
}

#[derive(Debug)]
pub struct LoadGate {
    generation: u64,
    state: LoadState,
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGate {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Start a new load, superseding any load in flight.
    pub fn begin_load(&mut self, source: impl Into<String>) -> LoadToken {
        self.generation += 1;
        let token = LoadToken {
            generation: self.generation,
        };
        let source = source.into();
        log::info!("Loading model '{}' (generation {})", source, token.generation);
        self.state = LoadState::Loading { token, source };
        token
    }

    /// Deliver a load-completion signal.
    pub fn complete(&mut self, token: LoadToken, bounds: BoundingBox) -> LoadOutcome {
        match &self.state {
            LoadState::Loading { token: current, source } if *current == token => {
                let source = source.clone();
                log::info!("Model '{}' ready (generation {})", source, token.generation);
                self.state = LoadState::Ready {
                    token,
                    source,
                    bounds,
                };
                LoadOutcome::Ready
            }
            _ => {
                log::debug!("Ignoring stale load signal (generation {})", token.generation);
                LoadOutcome::Stale
            }
        }
    }

    /// Forget the current model. In-flight loads become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = LoadState::Idle;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading { .. })
    }

    pub fn current_source(&self) -> Option<&str> {
        match &self.state {
            LoadState::Idle => None,
            LoadState::Loading { source, .. } | LoadState::Ready { source, .. } => Some(source),
        }
    }

    /// Bounds reported by the completed load.
    pub fn model_bounds(&self) -> Option<BoundingBox> {
        match &self.state {
            LoadState::Ready { bounds, .. } => Some(*bounds),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_load_completes_once() {
        let mut gate = LoadGate::new();
        let token = gate.begin_load("house.xkt");
        assert!(gate.is_loading());
        assert!(!gate.is_ready());

        assert_eq!(gate.complete(token, BoundingBox::default()), LoadOutcome::Ready);
        assert!(gate.is_ready());
        assert_eq!(gate.current_source(), Some("house.xkt"));

        assert_eq!(gate.complete(token, BoundingBox::default()), LoadOutcome::Stale);
    }

    #[test]
    fn test_superseded_load_is_stale() {
        let mut gate = LoadGate::new();
        let old = gate.begin_load("a.xkt");
        let new = gate.begin_load("b.xkt");
        assert_ne!(old, new);

        assert_eq!(gate.complete(old, BoundingBox::default()), LoadOutcome::Stale);
        assert!(gate.is_loading());

        let bounds = BoundingBox::new([0.0; 3], [1.0; 3]);
        assert_eq!(gate.complete(new, bounds), LoadOutcome::Ready);
        assert_eq!(gate.model_bounds(), Some(bounds));
        assert_eq!(gate.current_source(), Some("b.xkt"));
    }

    #[test]
    fn test_reset_makes_in_flight_load_stale() {
        let mut gate = LoadGate::new();
        let token = gate.begin_load("a.xkt");
        gate.reset();

        assert_eq!(gate.complete(token, BoundingBox::default()), LoadOutcome::Stale);
        assert_eq!(gate.state(), &LoadState::Idle);
        assert_eq!(gate.current_source(), None);
    }
}
