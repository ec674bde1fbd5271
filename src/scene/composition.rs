use std::path::{Path, PathBuf};

use crate::animation::handle::AnimationHandle;
use crate::assets::media::FfmpegVideoSource;
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::color::Color;
use crate::scene::def::SceneDef;
use crate::scene::model::{Fill, MediaKind, Node, NodeId, NodeKind, Paint, SceneTree};
use crate::scene::overlay::TextOverlay;
use crate::timeline::clock::{Clip, Timeline, Track};
use crate::timeline::media::{MediaElement, SyntheticVideo, VideoSource};

/// Decode rate used for file-backed video sources.
pub const DEFAULT_DECODE_FPS: u32 = 30;

/// Creates the decoder behind each video media binding.
pub trait VideoOpener {
    fn open(&self, uri: &str) -> LiikeResult<Box<dyn VideoSource>>;
}

impl<F> VideoOpener for F
where
    F: Fn(&str) -> LiikeResult<Box<dyn VideoSource>>,
{
    fn open(&self, uri: &str) -> LiikeResult<Box<dyn VideoSource>> {
        self(uri)
    }
}

/// `synthetic://` URIs become [`SyntheticVideo`]s, everything else is decoded with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct DefaultVideoOpener {
    pub ffmpeg: PathBuf,
    pub decode_fps: u32,
}

impl Default for DefaultVideoOpener {
    fn default() -> Self {
        Self {
            ffmpeg: crate::encode::ffmpeg::ffmpeg_binary(),
            decode_fps: DEFAULT_DECODE_FPS,
        }
    }
}

impl VideoOpener for DefaultVideoOpener {
    fn open(&self, uri: &str) -> LiikeResult<Box<dyn VideoSource>> {
        if uri.starts_with("synthetic://") {
            return Ok(Box::new(SyntheticVideo::from_uri(uri)?));
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        Ok(Box::new(FfmpegVideoSource::open(
            &self.ffmpeg,
            Path::new(path),
            self.decode_fps,
        )?))
    }
}

/// Kind of asset the resource cache must materialize before capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Font,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub uri: String,
    pub kind: ResourceKind,
}

/// Live scene: arena tree plus every time-driven primitive slaved to its timeline.
#[derive(Debug)]
pub struct Scene {
    pub canvas: Canvas,
    /// User-specified timeline duration.
    pub duration_ms: u64,
    pub tree: SceneTree,
    pub animations: Vec<AnimationHandle>,
    pub media: Vec<MediaElement>,
    pub timeline: Timeline,
    pub text: Option<TextOverlay>,
    pub fonts: Vec<String>,
}

impl Scene {
    pub fn new(canvas: Canvas, duration_ms: u64, tree: SceneTree) -> Self {
        Self {
            canvas,
            duration_ms,
            tree,
            animations: Vec::new(),
            media: Vec::new(),
            timeline: Timeline::default(),
            text: None,
            fonts: Vec::new(),
        }
    }

    pub fn from_json_str(s: &str, opener: &dyn VideoOpener) -> LiikeResult<Self> {
        Self::from_def(SceneDef::from_json_str(s)?, opener)
    }

    /// Load a scene file; relative asset paths resolve against its directory.
    #[tracing::instrument(skip(opener))]
    pub fn from_path(path: &Path, opener: &dyn VideoOpener) -> LiikeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LiikeError::io(format!("failed to read scene '{}': {e}", path.display()))
        })?;
        let mut def = SceneDef::from_json_str(&text)?;
        if let Some(dir) = path.parent() {
            def.resolve_paths(dir);
        }
        Self::from_def(def, opener)
    }

    pub fn from_def(def: SceneDef, opener: &dyn VideoOpener) -> LiikeResult<Self> {
        def.validate()?;
        let canvas = Canvas::new(def.canvas.width, def.canvas.height)?;
        let mut tree = SceneTree::new();
        let mut ids: Vec<(String, NodeId)> = Vec::with_capacity(def.nodes.len());
        let lookup = |ids: &[(String, NodeId)], name: &str| {
            ids.iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| *id)
                .ok_or_else(|| LiikeError::validation(format!("unknown node '{name}'")))
        };

        for (i, nd) in def.nodes.into_iter().enumerate() {
            let mut node = Node::new(nd.name.clone(), nd.kind, nd.rect.to_rect())
                .with_paint(nd.paint)
                .with_transform(nd.transform);
            node.media = nd.media;
            let id = if i == 0 {
                let root = tree.set_root(node)?;
                if let Some(fill) = def.background.clone() {
                    let bg = Node::new(
                        "background",
                        NodeKind::Background,
                        Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height)),
                    )
                    .with_paint(Paint {
                        fill: Some(fill),
                        ..Paint::default()
                    });
                    tree.add_child(root, bg)?;
                }
                root
            } else {
                let parent = nd.parent.as_deref().unwrap_or_default();
                tree.add_child(lookup(&ids, parent)?, node)?
            };
            ids.push((nd.name, id));
        }

        let mut scene = Self::new(canvas, def.duration_ms, tree);
        for a in def.animations {
            let handle = AnimationHandle::new(
                lookup(&ids, &a.node)?,
                a.keyframes,
                a.easing,
                a.duration_ms,
                a.start_offset_ms,
            )?
            .with_iterations(a.iterations)?
            .with_fill(a.fill);
            scene.animations.push(handle);
        }

        let mut tracks = Vec::with_capacity(def.tracks.len());
        for t in def.tracks {
            let mut clips = Vec::with_capacity(t.clips.len());
            for c in t.clips {
                let node = match c.node.as_deref() {
                    Some(name) => Some(lookup(&ids, name)?),
                    None => None,
                };
                clips.push(Clip {
                    start_ms: c.start_ms,
                    duration_ms: c.duration_ms,
                    node,
                    media_uri: c.media_uri,
                });
            }
            tracks.push(Track {
                kind: t.kind,
                muted: t.muted,
                clips,
            });
        }
        scene.timeline = Timeline::new(tracks);
        scene.text = def.text.filter(|t| !t.is_empty());
        scene.fonts = def.fonts;
        scene.open_media(opener);
        scene.tree.recompute_styles();
        Ok(scene)
    }

    /// Create a [`MediaElement`] for every video binding without one.
    ///
    /// A binding whose source cannot be opened is skipped and renders as an empty slot. Returns
    /// the `(uri, reason)` of each skipped binding.
    pub fn open_media(&mut self, opener: &dyn VideoOpener) -> Vec<(String, String)> {
        let mut skipped = Vec::new();
        for id in self.tree.document_order() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let Some(binding) = node.media.as_ref().filter(|m| m.kind == MediaKind::Video)
            else {
                continue;
            };
            if self.media.iter().any(|m| m.node == id) {
                continue;
            }
            let source = match opener.open(&binding.uri) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(
                        node = %node.name,
                        uri = %binding.uri,
                        code = e.code(),
                        "video unavailable, leaving slot empty: {e}"
                    );
                    skipped.push((binding.uri.clone(), e.to_string()));
                    continue;
                }
            };
            tracing::debug!(node = %node.name, uri = %binding.uri, "opened video source");
            self.media.push(MediaElement::new(
                id,
                binding.clip_start_ms,
                binding.object_fit,
                source,
            ));
        }
        skipped
    }

    pub fn add_animation(&mut self, handle: AnimationHandle) {
        self.animations.push(handle);
    }

    pub fn add_media(&mut self, element: MediaElement) {
        self.media.push(element);
    }

    pub fn media_for(&self, node: NodeId) -> Option<&MediaElement> {
        self.media.iter().find(|m| m.node == node)
    }

    /// Export length: the longest video when any video is bound, else the user duration.
    pub fn effective_duration_ms(&self) -> u64 {
        self.media
            .iter()
            .map(MediaElement::intrinsic_duration_ms)
            .max()
            .unwrap_or(self.duration_ms)
    }

    /// Color frames are flattened over when the target format has no alpha.
    pub fn background_color(&self) -> Color {
        self.tree
            .nodes()
            .iter()
            .find(|n| n.kind == NodeKind::Background)
            .and_then(|n| match n.paint.fill.as_ref() {
                Some(Fill::Solid { color }) => Some(*color),
                Some(Fill::LinearGradient { stops, .. }) => stops.first().map(|s| s.color),
                _ => None,
            })
            .unwrap_or(Color::BLACK)
    }

    /// Every external image and font the rasterizer will look up, deduplicated.
    pub fn resource_uris(&self) -> Vec<ResourceRef> {
        let mut out: Vec<ResourceRef> = Vec::new();
        let mut push = |uri: &str, kind| {
            let r = ResourceRef {
                uri: uri.to_string(),
                kind,
            };
            if !out.contains(&r) {
                out.push(r);
            }
        };
        for node in self.tree.nodes() {
            if let Some(Fill::Image { uri, .. }) = node.paint.fill.as_ref() {
                push(uri, ResourceKind::Image);
            }
            if let Some(m) = node.media.as_ref()
                && m.kind == MediaKind::Image
            {
                push(&m.uri, ResourceKind::Image);
            }
        }
        for f in &self.fonts {
            push(f, ResourceKind::Font);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/composition.rs"]
mod tests;
