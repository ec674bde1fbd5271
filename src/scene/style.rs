use crate::foundation::core::{Affine, Vec2};
use crate::scene::model::{NodeId, SceneTree};

/// Post-animation, post-layout values of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputedStyle {
    /// Node-local box (origin at the node's top-left) to canvas space.
    pub world: Affine,
    /// Node-local box to parent space.
    pub local: Affine,
    /// Own opacity.
    pub opacity: f64,
    /// Product of the node's and all ancestors' opacities.
    pub world_opacity: f64,
    pub blur: f64,
    /// Visible only when the node and every ancestor is visible.
    pub visible: bool,
}

/// Resolve every node's computed style, parents before children.
pub fn compute_styles(tree: &SceneTree) -> Vec<ComputedStyle> {
    let mut out = vec![
        ComputedStyle {
            world: Affine::IDENTITY,
            local: Affine::IDENTITY,
            opacity: 1.0,
            world_opacity: 1.0,
            blur: 0.0,
            visible: true,
        };
        tree.len()
    ];

    for id in tree.document_order() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let tv = node.effective_transform();
        let size = Vec2::new(node.rect.width(), node.rect.height());
        let local = Affine::translate(Vec2::new(node.rect.x0, node.rect.y0)) * tv.to_affine(size);
        let opacity = tv.opacity.clamp(0.0, 1.0);

        let (parent_world, parent_opacity, parent_visible) = match node.parent {
            Some(NodeId(p)) => {
                let ps = &out[p as usize];
                (ps.world, ps.world_opacity, ps.visible)
            }
            None => (Affine::IDENTITY, 1.0, true),
        };

        out[id.index()] = ComputedStyle {
            world: parent_world * local,
            local,
            opacity,
            world_opacity: parent_opacity * opacity,
            blur: tv.blur.max(0.0),
            visible: parent_visible && node.visible,
        };
    }
    out
}
