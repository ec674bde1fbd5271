use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::color::Color;
use crate::scene::style::{ComputedStyle, compute_styles};

/// Index of a node inside a [`SceneTree`] arena.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Role of a node in a mockup scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Group,
    Background,
    MockupFrame,
    MediaSlot,
    Shape,
}

/// How media content is fitted into its node rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFit {
    /// Scale to fill, cropping the overflow (centered).
    #[default]
    Cover,
    /// Scale to fit, letterboxing the remainder.
    Contain,
    /// Stretch to the rectangle, ignoring aspect ratio.
    Fill,
}

impl ObjectFit {
    /// Map source content of `src` size into `dst`, returning `(src_crop, dst_rect)`.
    ///
    /// Both rectangles are in their own pixel spaces; `dst` is node-local.
    pub fn resolve(self, src: (f64, f64), dst: Rect) -> (Rect, Rect) {
        let (sw, sh) = src;
        let full_src = Rect::new(0.0, 0.0, sw, sh);
        if sw <= 0.0 || sh <= 0.0 || dst.width() <= 0.0 || dst.height() <= 0.0 {
            return (full_src, dst);
        }
        let src_aspect = sw / sh;
        let dst_aspect = dst.width() / dst.height();
        match self {
            Self::Fill => (full_src, dst),
            Self::Cover => {
                if src_aspect > dst_aspect {
                    let crop_w = sh * dst_aspect;
                    let x0 = (sw - crop_w) / 2.0;
                    (Rect::new(x0, 0.0, x0 + crop_w, sh), dst)
                } else {
                    let crop_h = sw / dst_aspect;
                    let y0 = (sh - crop_h) / 2.0;
                    (Rect::new(0.0, y0, sw, y0 + crop_h), dst)
                }
            }
            Self::Contain => {
                if src_aspect > dst_aspect {
                    let h = dst.width() / src_aspect;
                    let y0 = dst.y0 + (dst.height() - h) / 2.0;
                    (full_src, Rect::new(dst.x0, y0, dst.x1, y0 + h))
                } else {
                    let w = dst.height() * src_aspect;
                    let x0 = dst.x0 + (dst.width() - w) / 2.0;
                    (full_src, Rect::new(x0, dst.y0, x0 + w, dst.y1))
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient line in `[0, 1]`.
    pub offset: f64,
    pub color: Color,
}

/// Node fill paint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fill {
    Solid {
        color: Color,
    },
    /// CSS-style linear gradient; `angle_deg` 0 points up, 90 points right.
    LinearGradient {
        angle_deg: f64,
        stops: Vec<GradientStop>,
    },
    /// External raster/vector image materialized through the resource cache.
    Image {
        uri: String,
        #[serde(default)]
        fit: ObjectFit,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shadow {
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub blur: f64,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
}

/// Static paint properties of a node.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Paint {
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    /// Rounded-corner radius in layout pixels. Zero means square corners.
    pub corner_radius: f64,
    /// Clip descendants to this node's (rounded) rectangle.
    pub clip: bool,
    pub shadow: Option<Shadow>,
}

/// Animatable transform and effect values of a node.
///
/// Applied about the node's center in the order translate, rotate, skew, scale.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransformValues {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    /// Degrees about the horizontal axis, projected orthographically.
    pub rotate_x: f64,
    /// Degrees about the vertical axis, projected orthographically.
    pub rotate_y: f64,
    /// Degrees in the image plane.
    pub rotate_z: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub opacity: f64,
    /// Gaussian blur radius in layout pixels.
    pub blur: f64,
}

impl Default for TransformValues {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformValues {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        rotate_x: 0.0,
        rotate_y: 0.0,
        rotate_z: 0.0,
        skew_x: 0.0,
        skew_y: 0.0,
        opacity: 1.0,
        blur: 0.0,
    };

    /// Affine for a box of `size`, pivoting about its center.
    pub fn to_affine(&self, size: Vec2) -> Affine {
        let center = Vec2::new(size.x / 2.0, size.y / 2.0);
        let fx = self.rotate_y.to_radians().cos();
        let fy = self.rotate_x.to_radians().cos();
        Affine::translate(center + Vec2::new(self.translate_x, self.translate_y))
            * Affine::rotate(self.rotate_z.to_radians())
            * Affine::skew(
                self.skew_x.to_radians().tan(),
                self.skew_y.to_radians().tan(),
            )
            * Affine::scale_non_uniform(self.scale * fx, self.scale * fy)
            * Affine::translate(-center)
    }

    pub fn is_identity_transform(&self) -> bool {
        self.translate_x == 0.0
            && self.translate_y == 0.0
            && self.scale == 1.0
            && self.rotate_x == 0.0
            && self.rotate_y == 0.0
            && self.rotate_z == 0.0
            && self.skew_x == 0.0
            && self.skew_y == 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Media asset bound to a media slot.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaBinding {
    pub kind: MediaKind,
    pub uri: String,
    /// Timeline instant at which the clip's first frame plays.
    #[serde(default)]
    pub clip_start_ms: u64,
    #[serde(default)]
    pub object_fit: ObjectFit,
}

/// One node of the scene arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Layout-resolved rectangle in the parent's coordinate space.
    pub rect: Rect,
    pub paint: Paint,
    /// Static style transform.
    pub transform: TransformValues,
    /// Value baked in by the last animation commit; wins over `transform`.
    pub committed: Option<TransformValues>,
    pub media: Option<MediaBinding>,
    /// Driven by the timeline clip windows.
    pub visible: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind, rect: Rect) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            rect,
            paint: Paint::default(),
            transform: TransformValues::IDENTITY,
            committed: None,
            media: None,
            visible: true,
        }
    }

    pub fn with_paint(mut self, paint: Paint) -> Self {
        self.paint = paint;
        self
    }

    pub fn with_media(mut self, media: MediaBinding) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_transform(mut self, transform: TransformValues) -> Self {
        self.transform = transform;
        self
    }

    /// Transform currently in effect (committed animation value or static style).
    pub fn effective_transform(&self) -> TransformValues {
        self.committed.unwrap_or(self.transform)
    }

    pub fn is_video(&self) -> bool {
        self.media
            .as_ref()
            .is_some_and(|m| m.kind == MediaKind::Video)
    }
}

/// Scene graph stored as an arena with parent/child indices.
///
/// Node 0 is the root. Children are kept in document (paint) order.
#[derive(Clone, Debug, Default)]
pub struct SceneTree {
    nodes: Vec<Node>,
    computed: Vec<ComputedStyle>,
    styles_dirty: bool,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the root node. Fails if a root already exists.
    pub fn set_root(&mut self, node: Node) -> LiikeResult<NodeId> {
        if !self.nodes.is_empty() {
            return Err(LiikeError::validation("scene tree already has a root"));
        }
        self.nodes.push(Node {
            parent: None,
            ..node
        });
        self.styles_dirty = true;
        Ok(NodeId(0))
    }

    pub fn add_child(&mut self, parent: NodeId, node: Node) -> LiikeResult<NodeId> {
        if parent.index() >= self.nodes.len() {
            return Err(LiikeError::validation(format!(
                "parent node {} does not exist",
                parent.0
            )));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            ..node
        });
        self.nodes[parent.index()].children.push(id);
        self.styles_dirty = true;
        Ok(id)
    }

    pub fn root(&self) -> LiikeResult<NodeId> {
        if self.nodes.is_empty() {
            return Err(LiikeError::missing_root("scene tree has no nodes"));
        }
        Ok(NodeId(0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Mutable access marks computed styles stale.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.styles_dirty = true;
        self.nodes.get_mut(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Iterate `id`'s ancestors, nearest first (excluding `id`).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|n| n.parent), move |p| {
            self.get(*p).and_then(|n| n.parent)
        })
    }

    /// Corner radius used to clip `id`: its own when non-zero, else the first non-zero radius
    /// found walking up the parent chain.
    pub fn effective_corner_radius(&self, id: NodeId) -> f64 {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|n| self.get(n))
            .map(|n| n.paint.corner_radius)
            .find(|r| *r > 0.0)
            .unwrap_or(0.0)
    }

    /// Pre-order traversal from the root (paint order).
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.get(id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn styles_dirty(&self) -> bool {
        self.styles_dirty
    }

    /// Propagate committed values into world-space computed styles.
    pub fn recompute_styles(&mut self) {
        self.computed = compute_styles(self);
        self.styles_dirty = false;
    }

    /// Styles from the last [`SceneTree::recompute_styles`]; `None` while stale.
    pub fn computed(&self, id: NodeId) -> Option<&ComputedStyle> {
        if self.styles_dirty {
            return None;
        }
        self.computed.get(id.index())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
