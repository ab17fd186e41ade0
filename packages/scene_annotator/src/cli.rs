use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bounds::BoundingBox;
use crate::color::parse_hex_color;
use crate::config::ViewerConfig;
use crate::desired_state::{DesiredState, ViewerProps};
use crate::diagnostics::PassDiagnostic;
use crate::overlay::{AnnotationOverlay, MarkerLayer};
use crate::scene_graph::{SceneDescription, SceneGraph};
use crate::viewer::ViewerSession;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a desired state against a scene and print the result
    Reconcile {
        /// Scene description JSON (`{ "entities": [...] }`)
        #[arg(long)]
        scene: PathBuf,

        /// Desired state JSON: a bare entry list or a full viewer props object
        #[arg(long)]
        state: PathBuf,

        /// Viewer config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Entity ids selected in the tree, replayed in order
        #[arg(long = "select")]
        select: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Reconcile {
            scene,
            state,
            config,
            select,
        } => {
            let report = reconcile_files(&scene, &state, config.as_deref(), &select)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Final viewer state after a `reconcile` run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRun {
    pub background: String,
    pub camera_focus: Option<BoundingBox>,
    pub overlays: Vec<AnnotationOverlay>,
    /// Display color per entity id, for entities that have one.
    pub entity_colors: BTreeMap<String, String>,
    pub desired_state: DesiredState,
    /// Selections that produced a proposal.
    pub proposals: usize,
    /// Diagnostics of the last pass.
    pub diagnostics: Vec<PassDiagnostic>,
}

pub fn reconcile_files(
    scene_path: &Path,
    state_path: &Path,
    config_path: Option<&Path>,
    selections: &[String],
) -> Result<ReconcileRun> {
    let config = match config_path {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let description = SceneDescription::load(scene_path)?;
    let mut props = read_props(state_path)?;
    if props.source.is_empty() {
        props.source = scene_path.display().to_string();
    }

    Ok(reconcile_props(&description, props, config, selections))
}

/// Accept either `[ ...entries ]` or `{ source, backgroundColor, entityColors }`.
fn read_props(path: &Path) -> Result<ViewerProps> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read desired state {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if value.is_array() {
        Ok(ViewerProps {
            entity_colors: DesiredState::from_json(&json)?,
            ..ViewerProps::default()
        })
    } else {
        Ok(ViewerProps::from_json(&json)?)
    }
}

/// Mount a session, load `description`, apply the props, then replay
/// `selections` the way a host would: each proposal is fed straight back in.
pub fn reconcile_props(
    description: &SceneDescription,
    props: ViewerProps,
    config: ViewerConfig,
    selections: &[String],
) -> ReconcileRun {
    let background = match parse_hex_color(&props.background_color) {
        Ok(rgb) => rgb.to_hex(),
        Err(e) => {
            log::warn!("Ignoring backgroundColor: {}", e);
            config.background_rgb().to_hex()
        }
    };

    let mut session = ViewerSession::mount(SceneGraph::new(), MarkerLayer::new(), config);

    let token = session.begin_model_load(&props.source);
    session.scene_mut().replace_model(description);
    session.scene_mut().set_loaded(true);
    session.on_model_loaded(token, description.bounds());

    let mut last = session.set_desired_state(props.entity_colors);

    let mut proposals = 0;
    for id in selections {
        if let Some(proposal) = session.on_entity_title_activated(id) {
            proposals += 1;
            last = session.set_desired_state(proposal);
        }
    }

    let entity_colors = session
        .scene()
        .objects()
        .filter_map(|o| o.display_color().map(|c| (o.id.clone(), c.to_hex())))
        .collect();

    ReconcileRun {
        background,
        camera_focus: session.camera_focus(),
        overlays: session.registry().overlays().into_iter().cloned().collect(),
        entity_colors,
        desired_state: session.desired_state().clone(),
        proposals,
        diagnostics: last.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desired_state::DesiredAnnotation;
    use crate::scene_graph::EntityDescription;

    fn model() -> SceneDescription {
        SceneDescription {
            entities: vec![
                EntityDescription::new("A", BoundingBox::new([0.0; 3], [1.0; 3])),
                EntityDescription::new("B", BoundingBox::new([1.0; 3], [3.0; 3])).with_materials(2),
            ],
        }
    }

    #[test]
    fn test_reconcile_props_applies_state_and_selections() {
        let props = ViewerProps {
            entity_colors: DesiredState::new(vec![
                DesiredAnnotation::new("A").with_color("#00ff00").with_title("Door"),
            ]),
            ..ViewerProps::default()
        };
        let run = reconcile_props(
            &model(),
            props,
            ViewerConfig::default(),
            &["B".to_string(), "B".to_string()],
        );

        assert_eq!(run.background, "#f0f0f0");
        assert_eq!(run.proposals, 1);
        assert_eq!(run.overlays.len(), 2);
        assert_eq!(run.overlays[1].title, "B");
        assert_eq!(run.entity_colors.get("A").map(String::as_str), Some("#00ff00"));
        assert_eq!(run.entity_colors.get("B").map(String::as_str), Some("#ff0000"));
        assert_eq!(run.desired_state.len(), 2);
        assert_eq!(run.camera_focus, Some(model().bounds()));
    }

    #[test]
    fn test_bad_background_falls_back_to_config() {
        let props = ViewerProps {
            background_color: "grey".to_string(),
            ..ViewerProps::default()
        };
        let mut config = ViewerConfig::default();
        config.background_color = "#000000".to_string();

        let run = reconcile_props(&model(), props, config, &[]);
        assert_eq!(run.background, "#000000");
        assert!(run.overlays.is_empty());
    }
}
