use crate::foundation::core::{Affine, Canvas};
use crate::scene::composition::Scene;
use crate::scene::model::{MediaBinding, NodeId, NodeKind, ObjectFit, Paint};
use crate::scene::overlay::TextOverlay;
use crate::scene::style::{ComputedStyle, compute_styles};
use crate::timeline::media::VideoFrame;

/// Self-contained copy of one visible node with its resolved style.
#[derive(Clone, Debug)]
pub struct SnapshotNode {
    pub id: NodeId,
    /// Index of the parent inside [`SceneSnapshot::nodes`].
    pub parent: Option<usize>,
    pub name: String,
    pub kind: NodeKind,
    pub width: f64,
    pub height: f64,
    /// Node box to parent box.
    pub local: Affine,
    /// Node box to canvas.
    pub world: Affine,
    pub opacity: f64,
    pub world_opacity: f64,
    pub blur: f64,
    pub paint: Paint,
    /// Clip radius: own or inherited from the nearest rounded ancestor.
    pub clip_radius: f64,
    pub media: Option<MediaBinding>,
}

impl SnapshotNode {
    pub fn is_video(&self) -> bool {
        self.media
            .as_ref()
            .is_some_and(|m| m.kind == crate::scene::model::MediaKind::Video)
    }
}

/// Video content to composite over the vector pass.
#[derive(Clone, Debug)]
pub struct VideoLayer {
    /// Index of the owning node inside [`SceneSnapshot::nodes`].
    pub node: usize,
    pub frame: Option<VideoFrame>,
    pub object_fit: ObjectFit,
}

/// Frozen view of a scene at one instant, in canvas (layout) units.
///
/// Nodes are in paint order, with parents before children; hidden subtrees are dropped.
#[derive(Clone, Debug)]
pub struct SceneSnapshot {
    pub canvas: Canvas,
    pub instant_ms: u64,
    pub effective_duration_ms: u64,
    pub nodes: Vec<SnapshotNode>,
    pub videos: Vec<VideoLayer>,
    pub text: Option<TextOverlay>,
}

impl SceneSnapshot {
    pub fn capture(scene: &Scene) -> Self {
        let tree = &scene.tree;
        // Styles are normally fresh from the synchronizer; a dirty tree is resolved here instead.
        let styles: Vec<ComputedStyle> = if tree.styles_dirty() {
            compute_styles(tree)
        } else {
            (0..tree.len())
                .filter_map(|i| tree.computed(NodeId(i as u32)).copied())
                .collect()
        };

        let mut nodes: Vec<SnapshotNode> = Vec::with_capacity(tree.len());
        let mut index_of: Vec<Option<usize>> = vec![None; tree.len()];
        let mut videos = Vec::new();

        for id in tree.document_order() {
            let (Some(node), Some(style)) = (tree.get(id), styles.get(id.index()).copied()) else {
                continue;
            };
            if !style.visible {
                continue;
            }
            let parent = match node.parent {
                Some(p) => match index_of[p.index()] {
                    Some(i) => Some(i),
                    // Parent was culled.
                    None => continue,
                },
                None => None,
            };

            let idx = nodes.len();
            index_of[id.index()] = Some(idx);
            let media = node.media.clone();
            if node.is_video() {
                let element = scene.media_for(id);
                videos.push(VideoLayer {
                    node: idx,
                    frame: element.and_then(|e| e.frame().cloned()),
                    object_fit: element
                        .map(|e| e.object_fit)
                        .or(media.as_ref().map(|m| m.object_fit))
                        .unwrap_or_default(),
                });
            }
            nodes.push(SnapshotNode {
                id,
                parent,
                name: node.name.clone(),
                kind: node.kind,
                width: node.rect.width(),
                height: node.rect.height(),
                local: style.local,
                world: style.world,
                opacity: style.opacity,
                world_opacity: style.world_opacity,
                blur: style.blur,
                paint: node.paint.clone(),
                clip_radius: tree.effective_corner_radius(id),
                media,
            });
        }

        Self {
            canvas: scene.canvas,
            instant_ms: scene.timeline.now_ms(),
            effective_duration_ms: scene.effective_duration_ms(),
            nodes,
            videos,
            text: scene.text.clone(),
        }
    }

    pub fn children(&self, parent: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(parent))
            .map(|(i, _)| i)
    }

    /// Every image URI the vector pass will embed.
    pub fn image_uris(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for n in &self.nodes {
            if let Some(crate::scene::model::Fill::Image { uri, .. }) = n.paint.fill.as_ref() {
                out.push(uri);
            }
            if let Some(m) = n.media.as_ref()
                && !n.is_video()
            {
                out.push(&m.uri);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/snapshot.rs"]
mod tests;
