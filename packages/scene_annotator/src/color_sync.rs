//! Color synchronization.
//!
//! Applies each desired `color` to its resolved entity. Unresolvable ids are
//! skipped (a later pass retries them), malformed colors are skipped and
//! reported as diagnostics, and entries without a color are left alone
//! unless the reset policy says otherwise.

use std::collections::HashSet;

use crate::color::{parse_hex_color, Rgb};
use crate::config::ColorResetPolicy;
use crate::desired_state::EffectiveState;
use crate::diagnostics::PassDiagnostic;
use crate::resolver::{EntityHandle, EntityResolver, SceneLookup};

/// The two ways a scene object can take a display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCapability {
    /// A single colorize attribute on the whole object.
    Colorize,
    /// Per-material colors; holds the material count.
    Materials(usize),
}

/// Set the display color of `handle` through whichever capability it has.
pub fn apply_display_color<S: SceneLookup + ?Sized>(scene: &mut S, handle: EntityHandle, rgb: Rgb) {
    match scene.color_capability(handle) {
        ColorCapability::Colorize => scene.set_colorize(handle, rgb),
        ColorCapability::Materials(count) => {
            for material in 0..count {
                scene.set_material_color(handle, material, rgb);
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ColorSyncReport {
    pub applied: Vec<String>,
    pub reset: Vec<String>,
    pub unresolved: Vec<String>,
    pub diagnostics: Vec<PassDiagnostic>,
}

#[derive(Debug)]
pub struct ColorSynchronizer {
    resolver: EntityResolver,
    policy: ColorResetPolicy,
    reset_rgb: Rgb,
    /// Ids whose color this synchronizer last set. Only consulted by
    /// `ColorResetPolicy::ResetToDefault`.
    colored: HashSet<String>,
}

impl ColorSynchronizer {
    pub fn new(policy: ColorResetPolicy, reset_rgb: Rgb) -> Self {
        Self {
            resolver: EntityResolver::new(),
            policy,
            reset_rgb,
            colored: HashSet::new(),
        }
    }

    /// Forget every applied color. Called when the model is replaced.
    pub fn forget_all(&mut self) {
        self.colored.clear();
    }

    pub fn apply<S: SceneLookup + ?Sized>(
        &mut self,
        scene: &mut S,
        desired: &EffectiveState<'_>,
    ) -> ColorSyncReport {
        let mut report = ColorSyncReport::default();
        let mut named: HashSet<&str> = HashSet::new();
        let mut colored_now: HashSet<String> = HashSet::new();

        for entry in desired.entries.iter().filter(|e| e.has_color()) {
            named.insert(entry.id.as_str());
            let color = entry.color.as_deref().unwrap_or_default();

            let rgb = match parse_hex_color(color) {
                Ok(rgb) => rgb,
                Err(e) => {
                    log::debug!("Skipping color for '{}': {}", entry.id, e);
                    report
                        .diagnostics
                        .push(PassDiagnostic::malformed_color(&entry.id, color));
                    continue;
                }
            };

            let Some(entity) = self.resolver.resolve(&*scene, &entry.id) else {
                report.unresolved.push(entry.id.clone());
                continue;
            };

            apply_display_color(scene, entity.handle, rgb);
            colored_now.insert(entry.id.clone());
            report.applied.push(entry.id.clone());
        }

        let previous = std::mem::take(&mut self.colored);
        for id in previous {
            if named.contains(id.as_str()) {
                colored_now.insert(id);
                continue;
            }
            if self.policy != ColorResetPolicy::ResetToDefault {
                continue;
            }
            if let Some(entity) = self.resolver.resolve(&*scene, &id) {
                apply_display_color(scene, entity.handle, self.reset_rgb);
                report.reset.push(id);
            }
        }
        report.reset.sort();
        self.colored = colored_now;

        log::debug!(
            "Color pass: {} applied, {} reset, {} unresolved",
            report.applied.len(),
            report.reset.len(),
            report.unresolved.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundingBox;
    use crate::config::DuplicatePolicy;
    use crate::desired_state::{DesiredAnnotation, DesiredState};
    use crate::diagnostics::PassDiagnosticKind;
    use crate::scene_graph::{EntityDescription, SceneDescription, SceneGraph};

    fn scene() -> SceneGraph {
        let bounds = BoundingBox::new([0.0; 3], [1.0; 3]);
        let mut scene = SceneGraph::from_description(&SceneDescription {
            entities: vec![
                EntityDescription::new("A", bounds),
                EntityDescription::new("B", bounds).with_materials(3),
            ],
        });
        scene.set_loaded(true);
        scene
    }

    fn apply(sync: &mut ColorSynchronizer, scene: &mut SceneGraph, state: &DesiredState) -> ColorSyncReport {
        sync.apply(scene, &state.effective(DuplicatePolicy::LastWins))
    }

    #[test]
    fn test_colorize_capability() {
        let mut scene = scene();
        let mut sync = ColorSynchronizer::new(ColorResetPolicy::KeepLast, Rgb::WHITE);
        let state = DesiredState::new(vec![DesiredAnnotation::new("A").with_color("#00ff00")]);

        let report = apply(&mut sync, &mut scene, &state);
        assert_eq!(report.applied, vec!["A"]);
        assert_eq!(scene.display_color("A"), Some(Rgb::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_material_capability_sets_every_material() {
        let mut scene = scene();
        let mut sync = ColorSynchronizer::new(ColorResetPolicy::KeepLast, Rgb::WHITE);
        let state = DesiredState::new(vec![DesiredAnnotation::new("B").with_color("#0000ff")]);

        apply(&mut sync, &mut scene, &state);
        let materials = scene.material_colors("B").unwrap();
        assert_eq!(materials.len(), 3);
        assert!(materials.iter().all(|c| *c == Some(Rgb::new(0.0, 0.0, 1.0))));
    }

    #[test]
    fn test_unresolved_and_malformed_are_skipped() {
        let mut scene = scene();
        let mut sync = ColorSynchronizer::new(ColorResetPolicy::KeepLast, Rgb::WHITE);
        let state = DesiredState::new(vec![
            DesiredAnnotation::new("Z").with_color("#ff0000"),
            DesiredAnnotation::new("A").with_color("green"),
            DesiredAnnotation::new("B").with_color("#ff0000"),
        ]);

        let report = apply(&mut sync, &mut scene, &state);
        assert_eq!(report.unresolved, vec!["Z"]);
        assert_eq!(report.applied, vec!["B"]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, PassDiagnosticKind::MalformedColor);
        assert_eq!(scene.display_color("A"), None);
        assert_eq!(scene.color_writes(), 3);
    }

    #[test]
    fn test_keep_last_leaves_removed_colors() {
        let mut scene = scene();
        let mut sync = ColorSynchronizer::new(ColorResetPolicy::KeepLast, Rgb::WHITE);
        apply(
            &mut sync,
            &mut scene,
            &DesiredState::new(vec![DesiredAnnotation::new("A").with_color("#ff0000")]),
        );
        let writes = scene.color_writes();

        let report = apply(
            &mut sync,
            &mut scene,
            &DesiredState::new(vec![DesiredAnnotation::new("A")]),
        );
        assert!(report.reset.is_empty());
        assert_eq!(scene.color_writes(), writes);
        assert_eq!(scene.display_color("A"), Some(Rgb::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_reset_to_default_restores_removed_colors() {
        let mut scene = scene();
        let mut sync = ColorSynchronizer::new(ColorResetPolicy::ResetToDefault, Rgb::WHITE);
        apply(
            &mut sync,
            &mut scene,
            &DesiredState::new(vec![DesiredAnnotation::new("A").with_color("#ff0000")]),
        );

        let report = apply(&mut sync, &mut scene, &DesiredState::default());
        assert_eq!(report.reset, vec!["A"]);
        assert_eq!(scene.display_color("A"), Some(Rgb::WHITE));

        // Already reset: nothing more to do.
        let report = apply(&mut sync, &mut scene, &DesiredState::default());
        assert!(report.reset.is_empty());
    }
}
