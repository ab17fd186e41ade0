//! Entity resolution against a live scene.
//!
//! Scenes index their objects in more than one place: the primary object
//! index and a metadata-object index whose ids depend on how the model was
//! authored. All lookups go through [`EntityResolver`], which tries them in
//! a fixed order:
//!
//! 1. primary scene object index
//! 2. metadata-object index
//!
//! Before a model finishes loading nothing resolves; that is the normal
//! "not yet available" state, not an error.

use glam::Vec3;

use crate::color::Rgb;
use crate::color_sync::ColorCapability;

/// Opaque handle to a scene object, valid while its model stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u32);

/// The scene as seen by the annotation core.
///
/// Implemented by whatever owns the rendered model. All calls are
/// synchronous and must not block.
pub trait SceneLookup {
    /// Whether the current model has finished loading.
    fn is_model_loaded(&self) -> bool;

    /// Look an object up in the primary scene index.
    fn object_by_id(&self, id: &str) -> Option<EntityHandle>;

    /// Look an object up through the metadata-object index.
    fn metadata_object_by_id(&self, id: &str) -> Option<EntityHandle>;

    /// Center of the entity's bounding volume.
    fn entity_anchor(&self, handle: EntityHandle) -> Vec3;

    /// How the entity accepts a display color.
    fn color_capability(&self, handle: EntityHandle) -> ColorCapability;

    /// Set the entity-wide colorize attribute.
    fn set_colorize(&mut self, handle: EntityHandle, rgb: Rgb);

    /// Set the color of one of the entity's materials.
    fn set_material_color(&mut self, handle: EntityHandle, material: usize, rgb: Rgb);
}

/// Which index an entity was found through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPath {
    Primary,
    Metadata,
}

/// A resolved entity. Never stored in the desired state.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntityRef {
    pub id: String,
    pub handle: EntityHandle,
    pub anchor: Vec3,
    pub path: LookupPath,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityResolver;

impl EntityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `id`, trying the primary index first, then metadata.
    pub fn resolve<S: SceneLookup + ?Sized>(&self, scene: &S, id: &str) -> Option<SceneEntityRef> {
        if id.is_empty() || !scene.is_model_loaded() {
            return None;
        }

        let (handle, path) = scene
            .object_by_id(id)
            .map(|h| (h, LookupPath::Primary))
            .or_else(|| {
                scene
                    .metadata_object_by_id(id)
                    .map(|h| (h, LookupPath::Metadata))
            })?;

        Some(SceneEntityRef {
            id: id.to_string(),
            handle,
            anchor: scene.entity_anchor(handle),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundingBox;
    use crate::scene_graph::{EntityDescription, SceneDescription, SceneGraph};

    fn scene() -> SceneGraph {
        let mut scene = SceneGraph::from_description(&SceneDescription {
            entities: vec![
                EntityDescription::new("A", BoundingBox::new([0.0; 3], [2.0; 3])),
                EntityDescription::new("B", BoundingBox::new([1.0; 3], [3.0; 3]))
                    .with_metadata_id("meta-B"),
            ],
        });
        scene.set_loaded(true);
        scene
    }

    #[test]
    fn test_primary_index() {
        let scene = scene();
        let found = EntityResolver::new().resolve(&scene, "A").unwrap();
        assert_eq!(found.path, LookupPath::Primary);
        assert_eq!(found.anchor, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_metadata_fallback() {
        let scene = scene();
        let found = EntityResolver::new().resolve(&scene, "meta-B").unwrap();
        assert_eq!(found.path, LookupPath::Metadata);
        assert_eq!(found.id, "meta-B");
        assert_eq!(found.anchor, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_not_found() {
        let scene = scene();
        assert!(EntityResolver::new().resolve(&scene, "Z").is_none());
        assert!(EntityResolver::new().resolve(&scene, "").is_none());
    }

    #[test]
    fn test_nothing_resolves_before_load() {
        let mut scene = scene();
        scene.set_loaded(false);
        assert!(EntityResolver::new().resolve(&scene, "A").is_none());
    }
}
