//! Annotation overlays and the registry that owns them.
//!
//! An overlay is a marker + label pair anchored at an entity's bounds
//! center. The [`AnnotationRegistry`] is the only writer: it keeps one
//! overlay per entity id and mirrors every change onto an
//! [`OverlayBackend`], the thing that actually draws them.

use glam::Vec3;
use serde::Serialize;
use std::collections::HashMap;

/// Everything a backend needs to create an overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySpec {
    pub id: String,
    pub anchor: Vec3,
    pub title: String,
    pub glyph: String,
    pub marker_visible: bool,
    pub label_visible: bool,
}

/// Drawing side of the overlays.
pub trait OverlayBackend {
    fn create_overlay(&mut self, spec: &OverlaySpec);
    fn update_overlay_title(&mut self, id: &str, title: &str);
    fn set_overlay_visibility(&mut self, id: &str, marker_visible: bool, label_visible: bool);
    fn destroy_overlay(&mut self, id: &str);
    fn has_overlay(&self, id: &str) -> bool;
}

/// A live overlay as the registry tracks it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationOverlay {
    pub id: String,
    pub anchor: Vec3,
    pub title: String,
    pub marker_visible: bool,
    pub label_visible: bool,
}

/// Id-indexed set of live overlays.
#[derive(Debug)]
pub struct AnnotationRegistry {
    overlays: HashMap<String, AnnotationOverlay>,
    glyph: String,
}

impl AnnotationRegistry {
    pub fn new(glyph: impl Into<String>) -> Self {
        Self {
            overlays: HashMap::new(),
            glyph: glyph.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.overlays.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&AnnotationOverlay> {
        self.overlays.get(id)
    }

    /// Ids of all live overlays, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.overlays.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All overlays, sorted by id.
    pub fn overlays(&self) -> Vec<&AnnotationOverlay> {
        let mut out: Vec<&AnnotationOverlay> = self.overlays.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Create an overlay with marker and label shown.
    ///
    /// Returns false (and does nothing) if `id` already has one.
    pub fn create<B: OverlayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: &str,
        anchor: Vec3,
        title: &str,
    ) -> bool {
        if self.overlays.contains_key(id) {
            return false;
        }
        // A backend overlay the registry does not know about would become a
        // second overlay for this id.
        if backend.has_overlay(id) {
            log::warn!("Backend already had an untracked overlay for '{}', replacing it", id);
            backend.destroy_overlay(id);
        }

        let spec = OverlaySpec {
            id: id.to_string(),
            anchor,
            title: title.to_string(),
            glyph: self.glyph.clone(),
            marker_visible: true,
            label_visible: true,
        };
        backend.create_overlay(&spec);
        log::debug!("Created overlay '{}' at {:?}", id, anchor);

        self.overlays.insert(
            id.to_string(),
            AnnotationOverlay {
                id: spec.id,
                anchor,
                title: spec.title,
                marker_visible: true,
                label_visible: true,
            },
        );
        true
    }

    /// Change an overlay's title in place.
    ///
    /// Returns false if there is no overlay or the title is unchanged.
    pub fn update_title<B: OverlayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: &str,
        title: &str,
    ) -> bool {
        let Some(overlay) = self.overlays.get_mut(id) else {
            return false;
        };
        if overlay.title == title {
            return false;
        }
        backend.update_overlay_title(id, title);
        log::debug!("Retitled overlay '{}': '{}' -> '{}'", id, overlay.title, title);
        overlay.title = title.to_string();
        true
    }

    pub fn set_marker_visible<B: OverlayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: &str,
        visible: bool,
    ) -> bool {
        let Some(overlay) = self.overlays.get_mut(id) else {
            return false;
        };
        overlay.marker_visible = visible;
        backend.set_overlay_visibility(id, overlay.marker_visible, overlay.label_visible);
        true
    }

    pub fn set_label_visible<B: OverlayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        id: &str,
        visible: bool,
    ) -> bool {
        let Some(overlay) = self.overlays.get_mut(id) else {
            return false;
        };
        overlay.label_visible = visible;
        backend.set_overlay_visibility(id, overlay.marker_visible, overlay.label_visible);
        true
    }

    /// Destroy one overlay. Returns false if there was none.
    pub fn destroy<B: OverlayBackend + ?Sized>(&mut self, backend: &mut B, id: &str) -> bool {
        if self.overlays.remove(id).is_none() {
            return false;
        }
        backend.destroy_overlay(id);
        log::debug!("Destroyed overlay '{}'", id);
        true
    }

    /// Destroy every overlay. Returns how many there were.
    pub fn clear<B: OverlayBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let ids = self.ids();
        for id in &ids {
            backend.destroy_overlay(id);
        }
        self.overlays.clear();
        ids.len()
    }
}

/// A backend operation, as recorded by [`MarkerLayer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OverlayCall {
    Create { id: String, title: String },
    UpdateTitle { id: String, title: String },
    SetVisibility { id: String, marker: bool, label: bool },
    Destroy { id: String },
}

impl OverlayCall {
    pub fn id(&self) -> &str {
        match self {
            OverlayCall::Create { id, .. }
            | OverlayCall::UpdateTitle { id, .. }
            | OverlayCall::SetVisibility { id, .. }
            | OverlayCall::Destroy { id } => id,
        }
    }
}

/// In-process overlay backend that keeps the drawn markers in memory and
/// records every call made to it.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: HashMap<String, OverlaySpec>,
    calls: Vec<OverlayCall>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: &str) -> Option<&OverlaySpec> {
        self.markers.get(id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn calls(&self) -> &[OverlayCall] {
        &self.calls
    }

    /// Take all recorded calls, clearing the log.
    pub fn take_calls(&mut self) -> Vec<OverlayCall> {
        std::mem::take(&mut self.calls)
    }
}

impl OverlayBackend for MarkerLayer {
    fn create_overlay(&mut self, spec: &OverlaySpec) {
        self.calls.push(OverlayCall::Create {
            id: spec.id.clone(),
            title: spec.title.clone(),
        });
        self.markers.insert(spec.id.clone(), spec.clone());
    }

    fn update_overlay_title(&mut self, id: &str, title: &str) {
        self.calls.push(OverlayCall::UpdateTitle {
            id: id.to_string(),
            title: title.to_string(),
        });
        if let Some(marker) = self.markers.get_mut(id) {
            marker.title = title.to_string();
        }
    }

    fn set_overlay_visibility(&mut self, id: &str, marker_visible: bool, label_visible: bool) {
        self.calls.push(OverlayCall::SetVisibility {
            id: id.to_string(),
            marker: marker_visible,
            label: label_visible,
        });
        if let Some(marker) = self.markers.get_mut(id) {
            marker.marker_visible = marker_visible;
            marker.label_visible = label_visible;
        }
    }

    fn destroy_overlay(&mut self, id: &str) {
        self.calls.push(OverlayCall::Destroy { id: id.to_string() });
        self.markers.remove(id);
    }

    fn has_overlay(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }
}
