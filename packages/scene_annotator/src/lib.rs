pub mod bounds;
pub mod color;
pub mod config;
pub mod error;
pub mod diagnostics;
pub mod desired_state;

// Scene side
pub mod resolver;
pub mod scene_graph;
pub mod color_sync;

// Annotation lifecycle
pub mod overlay;
pub mod reconciler;
pub mod load_gate;
pub mod write_back;
pub mod viewer;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
