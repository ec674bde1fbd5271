use std::collections::HashSet;
use std::path::Path;

use crate::animation::ease::Ease;
use crate::animation::handle::{FillMode, Iterations, Keyframe};
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::model::{Fill, MediaBinding, NodeKind, Paint, TransformValues};
use crate::scene::overlay::TextOverlay;
use crate::timeline::clock::TrackKind;

/// Serialized scene file.
///
/// The first entry of `nodes` is the root; every other node names an earlier node as its
/// parent, which keeps paint order equal to declaration order within a parent.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDef {
    pub canvas: Canvas,
    /// User-specified timeline duration.
    pub duration_ms: u64,
    #[serde(default)]
    pub background: Option<Fill>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub animations: Vec<AnimationDef>,
    #[serde(default)]
    pub tracks: Vec<TrackDef>,
    #[serde(default)]
    pub text: Option<TextOverlay>,
    /// Font files to materialize and register before rendering.
    #[serde(default)]
    pub fonts: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RectDef {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectDef {
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub parent: Option<String>,
    pub rect: RectDef,
    #[serde(default)]
    pub paint: Paint,
    #[serde(default)]
    pub transform: TransformValues,
    #[serde(default)]
    pub media: Option<MediaBinding>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationDef {
    /// Target node name.
    pub node: String,
    pub keyframes: Vec<Keyframe<TransformValues>>,
    #[serde(default)]
    pub easing: Ease,
    pub duration_ms: u64,
    #[serde(default)]
    pub start_offset_ms: u64,
    #[serde(default)]
    pub iterations: Iterations,
    #[serde(default)]
    pub fill: FillMode,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackDef {
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub clips: Vec<ClipDef>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipDef {
    pub start_ms: u64,
    pub duration_ms: u64,
    /// Node whose visibility this clip gates.
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub media_uri: Option<String>,
}

impl SceneDef {
    pub fn from_json_str(s: &str) -> LiikeResult<Self> {
        let def: Self = serde_json::from_str(s)?;
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> LiikeResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(LiikeError::validation("canvas width/height must be non-zero"));
        }
        let Some(root) = self.nodes.first() else {
            return Err(LiikeError::missing_root("scene declares no nodes"));
        };
        if root.parent.is_some() {
            return Err(LiikeError::validation(format!(
                "root node '{}' must not declare a parent",
                root.name
            )));
        }

        let mut seen = HashSet::new();
        for (i, n) in self.nodes.iter().enumerate() {
            if n.rect.width < 0.0 || n.rect.height < 0.0 {
                return Err(LiikeError::validation(format!(
                    "node '{}' has a negative size",
                    n.name
                )));
            }
            if i > 0 {
                let Some(parent) = n.parent.as_deref() else {
                    return Err(LiikeError::validation(format!(
                        "node '{}' must name its parent",
                        n.name
                    )));
                };
                if !seen.contains(parent) {
                    return Err(LiikeError::validation(format!(
                        "node '{}' references unknown or later parent '{parent}'",
                        n.name
                    )));
                }
            }
            if !seen.insert(n.name.as_str()) {
                return Err(LiikeError::validation(format!(
                    "duplicate node name '{}'",
                    n.name
                )));
            }
        }

        for a in &self.animations {
            if !seen.contains(a.node.as_str()) {
                return Err(LiikeError::validation(format!(
                    "animation targets unknown node '{}'",
                    a.node
                )));
            }
        }
        for c in self.tracks.iter().flat_map(|t| t.clips.iter()) {
            if let Some(node) = c.node.as_deref()
                && !seen.contains(node)
            {
                return Err(LiikeError::validation(format!(
                    "clip references unknown node '{node}'"
                )));
            }
        }
        Ok(())
    }

    /// Rewrite relative file references against `base` (the scene file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let fix = |uri: &mut String| {
            if !uri.contains("://") && Path::new(uri.as_str()).is_relative() {
                *uri = base.join(uri.as_str()).to_string_lossy().into_owned();
            }
        };
        if let Some(Fill::Image { uri, .. }) = self.background.as_mut() {
            fix(uri);
        }
        for n in &mut self.nodes {
            if let Some(Fill::Image { uri, .. }) = n.paint.fill.as_mut() {
                fix(uri);
            }
            if let Some(m) = n.media.as_mut() {
                fix(&mut m.uri);
            }
        }
        for c in self.tracks.iter_mut().flat_map(|t| t.clips.iter_mut()) {
            if let Some(uri) = c.media_uri.as_mut() {
                fix(uri);
            }
        }
        for f in &mut self.fonts {
            fix(f);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/def.rs"]
mod tests;
