//! In-memory scene.
//!
//! A pure-Rust [`SceneLookup`] implementation: objects keyed by string id,
//! each with bounds and a color capability, plus a secondary metadata index.
//! The CLI and the tests drive reconciliation against it; a host embedding a
//! real renderer implements [`SceneLookup`] itself.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::bounds::BoundingBox;
use crate::color::Rgb;
use crate::color_sync::ColorCapability;
use crate::error::{parse_document, read_document, Document, ViewerError};
use crate::resolver::{EntityHandle, SceneLookup};

/// One entity of a model description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescription {
    pub id: String,

    /// Id under which the metadata-object index knows this entity.
    #[serde(default)]
    pub metadata_id: Option<String>,

    pub bounds: BoundingBox,

    /// Material count for per-material coloring. `None` means the object
    /// has a single colorize attribute.
    #[serde(default)]
    pub materials: Option<usize>,
}

impl EntityDescription {
    pub fn new(id: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            id: id.into(),
            metadata_id: None,
            bounds,
            materials: None,
        }
    }

    pub fn with_metadata_id(mut self, metadata_id: impl Into<String>) -> Self {
        self.metadata_id = Some(metadata_id.into());
        self
    }

    pub fn with_materials(mut self, count: usize) -> Self {
        self.materials = Some(count);
        self
    }
}

/// A model as a list of entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub entities: Vec<EntityDescription>,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        parse_document(Document::Scene, json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let json = read_document(Document::Scene, path.as_ref())?;
        Self::from_json(&json)
    }

    /// Union of all entity bounds.
    pub fn bounds(&self) -> BoundingBox {
        let mut iter = self.entities.iter().map(|e| e.bounds);
        match iter.next() {
            Some(first) => iter.fold(first, |acc, b| acc.union(&b)),
            None => BoundingBox::default(),
        }
    }
}

/// A live scene object.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: String,
    pub metadata_id: Option<String>,
    pub bounds: BoundingBox,
    pub capability: ColorCapability,
    pub colorize: Option<Rgb>,
    pub material_colors: Vec<Option<Rgb>>,
}

impl SceneObject {
    fn from_description(desc: &EntityDescription) -> Self {
        let (capability, material_colors) = match desc.materials {
            Some(count) => (ColorCapability::Materials(count), vec![None; count]),
            None => (ColorCapability::Colorize, Vec::new()),
        };
        Self {
            id: desc.id.clone(),
            metadata_id: desc.metadata_id.clone(),
            bounds: desc.bounds,
            capability,
            colorize: None,
            material_colors,
        }
    }

    /// The color the object currently shows, if one was set.
    pub fn display_color(&self) -> Option<Rgb> {
        match self.capability {
            ColorCapability::Colorize => self.colorize,
            ColorCapability::Materials(_) => self.material_colors.first().copied().flatten(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
    by_id: HashMap<String, EntityHandle>,
    by_metadata_id: HashMap<String, EntityHandle>,
    loaded: bool,
    /// Number of color attribute writes, for observing idempotence.
    color_writes: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an (unloaded) scene from a description.
    pub fn from_description(desc: &SceneDescription) -> Self {
        let mut scene = Self::new();
        scene.replace_model(desc);
        scene
    }

    /// Swap in a new model. The scene is unloaded until `set_loaded(true)`.
    pub fn replace_model(&mut self, desc: &SceneDescription) {
        self.clear();
        for entity in &desc.entities {
            self.insert(entity);
        }
    }

    /// Insert an object. A repeated id replaces the earlier object's index entry.
    pub fn insert(&mut self, desc: &EntityDescription) -> EntityHandle {
        let handle = EntityHandle(self.objects.len() as u32);
        self.objects.push(SceneObject::from_description(desc));
        self.by_id.insert(desc.id.clone(), handle);
        if let Some(meta) = &desc.metadata_id {
            self.by_metadata_id.insert(meta.clone(), handle);
        }
        handle
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_id.clear();
        self.by_metadata_id.clear();
        self.loaded = false;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&SceneObject> {
        self.objects.get(handle.0 as usize)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    fn find(&self, id: &str) -> Option<&SceneObject> {
        self.by_id
            .get(id)
            .or_else(|| self.by_metadata_id.get(id))
            .and_then(|h| self.get(*h))
    }

    pub fn display_color(&self, id: &str) -> Option<Rgb> {
        self.find(id).and_then(|o| o.display_color())
    }

    pub fn material_colors(&self, id: &str) -> Option<&[Option<Rgb>]> {
        self.find(id).map(|o| o.material_colors.as_slice())
    }

    pub fn color_writes(&self) -> usize {
        self.color_writes
    }
}

impl SceneLookup for SceneGraph {
    fn is_model_loaded(&self) -> bool {
        self.loaded
    }

    fn object_by_id(&self, id: &str) -> Option<EntityHandle> {
        self.by_id.get(id).copied()
    }

    fn metadata_object_by_id(&self, id: &str) -> Option<EntityHandle> {
        self.by_metadata_id.get(id).copied()
    }

    fn entity_anchor(&self, handle: EntityHandle) -> Vec3 {
        self.get(handle).map(|o| o.bounds.center()).unwrap_or(Vec3::ZERO)
    }

    fn color_capability(&self, handle: EntityHandle) -> ColorCapability {
        self.get(handle)
            .map(|o| o.capability)
            .unwrap_or(ColorCapability::Colorize)
    }

    fn set_colorize(&mut self, handle: EntityHandle, rgb: Rgb) {
        if let Some(obj) = self.objects.get_mut(handle.0 as usize) {
            obj.colorize = Some(rgb);
            self.color_writes += 1;
        }
    }

    fn set_material_color(&mut self, handle: EntityHandle, material: usize, rgb: Rgb) {
        if let Some(slot) = self
            .objects
            .get_mut(handle.0 as usize)
            .and_then(|o| o.material_colors.get_mut(material))
        {
            *slot = Some(rgb);
            self.color_writes += 1;
        }
    }
}
