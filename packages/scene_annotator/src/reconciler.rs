//! Annotation reconciliation.
//!
//! Converges the overlay registry onto the desired state in one synchronous
//! pass:
//!
//! 1. every titled, resolvable entry gets an overlay (created if missing,
//!    retitled in place if its title changed, otherwise left alone);
//! 2. every overlay whose id is no longer listed with a non-empty title, or
//!    whose entity no longer resolves, is destroyed.
//!
//! Step 2 runs after step 1, so within a single pass an overlay is never
//! destroyed and recreated. Running the same pass twice issues no backend
//! calls the second time.

use serde::Serialize;
use std::collections::HashSet;

use crate::config::DuplicatePolicy;
use crate::desired_state::{DesiredState, EffectiveState};
use crate::diagnostics::PassDiagnostic;
use crate::overlay::{AnnotationRegistry, OverlayBackend};
use crate::resolver::{EntityResolver, SceneLookup};

/// Everything one reconciliation pass touches. Not kept between passes.
pub struct ReconciliationContext<'a, S: SceneLookup + ?Sized, B: OverlayBackend + ?Sized> {
    pub scene: &'a S,
    pub registry: &'a mut AnnotationRegistry,
    pub backend: &'a mut B,
    pub desired: &'a DesiredState,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub destroyed: Vec<String>,
    pub unchanged: usize,
    pub unresolved: Vec<String>,
    pub diagnostics: Vec<PassDiagnostic>,
}

impl ReconcileReport {
    /// Whether the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.destroyed.is_empty()
    }
}

/// Run one pass over the desired state.
pub fn reconcile<S, B>(ctx: ReconciliationContext<'_, S, B>) -> ReconcileReport
where
    S: SceneLookup + ?Sized,
    B: OverlayBackend + ?Sized,
{
    let effective = ctx.desired.effective(ctx.duplicates);
    reconcile_effective(ctx.scene, ctx.registry, ctx.backend, &effective)
}

/// Run one pass over an already de-duplicated desired state.
pub fn reconcile_effective<S, B>(
    scene: &S,
    registry: &mut AnnotationRegistry,
    backend: &mut B,
    desired: &EffectiveState<'_>,
) -> ReconcileReport
where
    S: SceneLookup + ?Sized,
    B: OverlayBackend + ?Sized,
{
    let resolver = EntityResolver::new();
    let mut report = ReconcileReport {
        diagnostics: desired.duplicates.clone(),
        ..Default::default()
    };

    // Step 1: create or retitle.
    let mut keep: HashSet<&str> = HashSet::new();
    for entry in desired.entries.iter().filter(|e| e.has_title()) {
        let title = entry.title().unwrap_or_default();

        let Some(entity) = resolver.resolve(scene, &entry.id) else {
            report.unresolved.push(entry.id.clone());
            report.diagnostics.push(PassDiagnostic::unresolved(&entry.id));
            continue;
        };
        keep.insert(entry.id.as_str());

        if registry.contains(&entry.id) {
            if registry.update_title(backend, &entry.id, title) {
                report.updated.push(entry.id.clone());
            } else {
                report.unchanged += 1;
            }
        } else if registry.create(backend, &entry.id, entity.anchor, title) {
            report.created.push(entry.id.clone());
        }
    }

    // Step 2: prune orphans.
    for id in registry.ids() {
        if !keep.contains(id.as_str()) && registry.destroy(backend, &id) {
            report.destroyed.push(id);
        }
    }

    if !report.is_noop() {
        log::info!(
            "Reconciled annotations: {} created, {} updated, {} destroyed, {} unresolved",
            report.created.len(),
            report.updated.len(),
            report.destroyed.len(),
            report.unresolved.len()
        );
    }
    report
}
