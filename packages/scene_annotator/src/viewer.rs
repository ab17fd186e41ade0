//! Viewer session.
//!
//! One `ViewerSession` exists per mounted viewer widget. It owns the scene
//! collaborator, the overlay backend and all annotation state, and turns
//! the three external triggers (desired-state replacement, model-load
//! completion, entity selection) into reconciliation passes. Dropping or
//! unmounting the session destroys every overlay.

use serde::Serialize;

use crate::bounds::BoundingBox;
use crate::color_sync::{ColorSyncReport, ColorSynchronizer};
use crate::config::ViewerConfig;
use crate::desired_state::DesiredState;
use crate::diagnostics::PassDiagnostic;
use crate::load_gate::{LoadGate, LoadOutcome, LoadToken};
use crate::overlay::{AnnotationRegistry, OverlayBackend};
use crate::reconciler::{reconcile_effective, ReconcileReport};
use crate::resolver::SceneLookup;
use crate::write_back::{ProposalListener, WriteBackEmitter};

/// What one full pass (colors, then annotations) did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PassSummary {
    /// A model load is in flight; nothing ran. The completed load runs
    /// the pass against the latest desired state.
    pub deferred: bool,
    pub colors_applied: Vec<String>,
    pub colors_reset: Vec<String>,
    pub annotations: ReconcileReport,
    pub diagnostics: Vec<PassDiagnostic>,
}

impl PassSummary {
    fn new(colors: ColorSyncReport, annotations: ReconcileReport) -> Self {
        let mut diagnostics = annotations.diagnostics.clone();
        diagnostics.extend(colors.diagnostics);
        Self {
            deferred: false,
            colors_applied: colors.applied,
            colors_reset: colors.reset,
            annotations,
            diagnostics,
        }
    }
}

pub struct ViewerSession<S: SceneLookup, B: OverlayBackend> {
    scene: S,
    backend: B,
    config: ViewerConfig,
    registry: AnnotationRegistry,
    colors: ColorSynchronizer,
    gate: LoadGate,
    emitter: WriteBackEmitter,
    desired: DesiredState,
    /// Bounds the camera should frame after the last completed load.
    camera_focus: Option<BoundingBox>,
    mounted: bool,
}

impl<S: SceneLookup, B: OverlayBackend> ViewerSession<S, B> {
    pub fn mount(scene: S, backend: B, config: ViewerConfig) -> Self {
        log::info!("Mounting viewer session");
        Self {
            registry: AnnotationRegistry::new(config.marker_glyph.clone()),
            colors: ColorSynchronizer::new(config.color_reset, config.reset_rgb()),
            emitter: WriteBackEmitter::new(
                config.default_annotation_color.clone(),
                config.duplicate_ids,
            ),
            gate: LoadGate::new(),
            desired: DesiredState::default(),
            camera_focus: None,
            mounted: true,
            scene,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene, e.g. for the host's model loader.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    pub fn desired_state(&self) -> &DesiredState {
        &self.desired
    }

    pub fn load_gate(&self) -> &LoadGate {
        &self.gate
    }

    pub fn camera_focus(&self) -> Option<BoundingBox> {
        self.camera_focus
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Register the callback that receives proposed desired states.
    pub fn on_desired_state_proposed(&mut self, listener: ProposalListener) {
        self.emitter.set_listener(listener);
    }

    /// Replace the desired state wholesale and reconcile against it.
    ///
    /// While a model is loading the state is only stored.
    pub fn set_desired_state(&mut self, desired: DesiredState) -> PassSummary {
        self.desired = desired;
        self.emitter.acknowledge();
        self.run_pass()
    }

    /// Start loading a new model. Existing overlays are torn down first:
    /// their anchors and ids mean nothing in the next model.
    pub fn begin_model_load(&mut self, source: &str) -> LoadToken {
        let removed = self.registry.clear(&mut self.backend);
        if removed > 0 {
            log::info!("Model swap: destroyed {} overlays", removed);
        }
        self.colors.forget_all();
        self.camera_focus = None;
        self.gate.begin_load(source)
    }

    /// Deliver the host's load-completion signal.
    ///
    /// Returns `None` for stale signals, which are otherwise ignored.
    pub fn on_model_loaded(&mut self, token: LoadToken, bounds: BoundingBox) -> Option<PassSummary> {
        match self.gate.complete(token, bounds) {
            LoadOutcome::Ready => {
                self.camera_focus = Some(bounds);
                Some(self.run_pass())
            }
            LoadOutcome::Stale => None,
        }
    }

    /// The tree UI activated an entity's title.
    pub fn on_entity_title_activated(&mut self, id: &str) -> Option<DesiredState> {
        self.emitter.on_entity_selected(&self.desired, id)
    }

    pub fn set_marker_visible(&mut self, id: &str, visible: bool) -> bool {
        self.registry.set_marker_visible(&mut self.backend, id, visible)
    }

    pub fn set_label_visible(&mut self, id: &str, visible: bool) -> bool {
        self.registry.set_label_visible(&mut self.backend, id, visible)
    }

    /// Re-run a pass against the current desired state.
    pub fn refresh(&mut self) -> PassSummary {
        self.run_pass()
    }

    /// Destroy all overlays and forget the model.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        let removed = self.registry.clear(&mut self.backend);
        self.colors.forget_all();
        self.gate.reset();
        self.camera_focus = None;
        self.mounted = false;
        log::info!("Unmounted viewer session ({} overlays destroyed)", removed);
    }

    fn run_pass(&mut self) -> PassSummary {
        if self.gate.is_loading() {
            log::debug!("Model loading; deferring pass");
            return PassSummary {
                deferred: true,
                ..Default::default()
            };
        }

        let effective = self.desired.effective(self.config.duplicate_ids);
        let colors = self.colors.apply(&mut self.scene, &effective);
        let annotations =
            reconcile_effective(&self.scene, &mut self.registry, &mut self.backend, &effective);

        let summary = PassSummary::new(colors, annotations);
        for diag in summary.diagnostics.iter().filter(|d| d.is_warning()) {
            log::warn!("{} ({})", diag.message, diag.id);
        }
        summary
    }
}

impl<S: SceneLookup, B: OverlayBackend> Drop for ViewerSession<S, B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
