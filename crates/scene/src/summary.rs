use serde::Serialize;

use crate::compose::{NodeKind, SceneDescription};

/// One-line status of the composed scene, shown in the viewer's status bar
/// and printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub node_count: usize,
    pub nodes: Vec<&'static str>,
    pub environment: Option<String>,
    pub model: Option<String>,
    pub shadows: bool,
    pub controls: &'static str,
}

impl SceneSummary {
    pub fn of(scene: &SceneDescription) -> Self {
        let controls = if scene.contains(NodeKind::FirstPersonControls) {
            "first-person"
        } else {
            "orbit"
        };
        Self {
            node_count: scene.nodes().len(),
            nodes: scene.kinds().iter().map(NodeKind::label).collect(),
            environment: scene.environment_request().map(|r| r.to_string()),
            model: scene.model().map(|m| m.asset.name.clone()),
            shadows: scene.contains(NodeKind::AccumulativeShadows),
            controls,
        }
    }
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: nodes={} env={} model={} shadows={} controls={}",
            self.node_count,
            self.environment.as_deref().unwrap_or("none"),
            self.model.as_deref().unwrap_or("none"),
            if self.shadows { "on" } else { "off" },
            self.controls
        )
    }
}

impl SceneDescription {
    pub fn summary(&self) -> SceneSummary {
        SceneSummary::of(self)
    }
}
