//! Declarative annotation state.
//!
//! The host owns an ordered list of `{ id, color?, annotation?: { title? } }`
//! records and replaces it wholesale whenever it changes. This module is the
//! typed view of that list plus its JSON wire format. Fields the viewer does
//! not understand are carried along untouched, so a list survives any number
//! of reconciliation passes byte-for-byte (modulo key order).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::DuplicatePolicy;
use crate::diagnostics::PassDiagnostic;
use crate::error::{parse_document, Document, ViewerError};

/// The `annotation` object of an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One desired-state record, keyed by entity id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredAnnotation {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationProps>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DesiredAnnotation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    /// Set the title, keeping any other `annotation` fields.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.annotation.get_or_insert_with(AnnotationProps::default).title = Some(title.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.annotation.as_ref().and_then(|a| a.title.as_deref())
    }

    /// Non-empty title, the condition for having an overlay.
    pub fn has_title(&self) -> bool {
        self.title().is_some_and(|t| !t.is_empty())
    }

    /// Non-empty color string (which may still be malformed).
    pub fn has_color(&self) -> bool {
        self.color.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Ordered desired-state list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState {
    entries: Vec<DesiredAnnotation>,
}

/// Desired state after collapsing duplicate ids.
#[derive(Debug, Default)]
pub struct EffectiveState<'a> {
    /// One entry per non-empty id, in first-appearance order.
    pub entries: Vec<&'a DesiredAnnotation>,
    /// One `DuplicateId` diagnostic per repeated id.
    pub duplicates: Vec<PassDiagnostic>,
}

impl<'a> EffectiveState<'a> {
    pub fn get(&self, id: &str) -> Option<&'a DesiredAnnotation> {
        self.entries.iter().copied().find(|e| e.id == id)
    }
}

impl DesiredState {
    pub fn new(entries: Vec<DesiredAnnotation>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        parse_document(Document::DesiredState, json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn entries(&self) -> &[DesiredAnnotation] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &DesiredAnnotation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DesiredAnnotation> {
        self.entries
    }

    /// Collapse repeated ids according to `policy`.
    ///
    /// The surviving entry keeps the position of the id's first appearance.
    /// Entries with an empty id never resolve and are left out.
    pub fn effective(&self, policy: DuplicatePolicy) -> EffectiveState<'_> {
        let mut out = EffectiveState::default();
        let mut slots: HashMap<&str, (usize, usize)> = HashMap::new();

        for entry in self.entries.iter().filter(|e| !e.id.is_empty()) {
            match slots.get_mut(entry.id.as_str()) {
                Some((slot, count)) => {
                    *count += 1;
                    if policy == DuplicatePolicy::LastWins {
                        out.entries[*slot] = entry;
                    }
                }
                None => {
                    slots.insert(entry.id.as_str(), (out.entries.len(), 1));
                    out.entries.push(entry);
                }
            }
        }

        for entry in &out.entries {
            if let Some(&(_, count)) = slots.get(entry.id.as_str()) {
                if count > 1 {
                    out.duplicates.push(PassDiagnostic::duplicate_id(&entry.id, count));
                }
            }
        }

        out
    }
}

impl From<Vec<DesiredAnnotation>> for DesiredState {
    fn from(entries: Vec<DesiredAnnotation>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<DesiredAnnotation> for DesiredState {
    fn from_iter<I: IntoIterator<Item = DesiredAnnotation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn default_source() -> String {
    String::new()
}

fn default_background_color() -> String {
    "#f0f0f0".to_string()
}

/// The viewer component's property tree as the host stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerProps {
    /// Model URL or path. Empty means nothing to load.
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default)]
    pub entity_colors: DesiredState,
}

impl Default for ViewerProps {
    fn default() -> Self {
        Self {
            source: default_source(),
            background_color: default_background_color(),
            entity_colors: DesiredState::default(),
        }
    }
}

impl ViewerProps {
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        parse_document(Document::ViewerProps, json)
    }
}
