use super::*;
use crate::foundation::core::Rect;
use crate::scene::model::{Node, NodeKind};

fn fade_in(node: NodeId, delay: u64) -> AnimationHandle {
    AnimationHandle::new(
        node,
        vec![
            Keyframe {
                offset: 0.0,
                value: TransformValues {
                    opacity: 0.0,
                    translate_y: 40.0,
                    ..TransformValues::IDENTITY
                },
                ease: Ease::Linear,
            },
            Keyframe {
                offset: 1.0,
                value: TransformValues::IDENTITY,
                ease: Ease::Linear,
            },
        ],
        Ease::Linear,
        800,
        delay,
    )
    .unwrap()
}

fn tree() -> (SceneTree, NodeId) {
    let mut t = SceneTree::new();
    let root = t
        .set_root(Node::new(
            "device",
            NodeKind::MockupFrame,
            Rect::new(0.0, 0.0, 100.0, 100.0),
        ))
        .unwrap();
    (t, root)
}

#[test]
fn evaluate_interpolates_linearly() {
    let h = fade_in(NodeId(0), 400);
    let v = h.evaluate(800).unwrap();
    assert!((v.opacity - 0.5).abs() < 1e-12);
    assert!((v.translate_y - 20.0).abs() < 1e-12);
}

#[test]
fn fill_both_holds_edges() {
    let h = fade_in(NodeId(0), 400);
    assert_eq!(h.evaluate(0).unwrap().opacity, 0.0);
    assert_eq!(h.evaluate(10_000).unwrap().opacity, 1.0);
}

#[test]
fn fill_none_has_no_effect_outside_interval() {
    let h = fade_in(NodeId(0), 400).with_fill(FillMode::None);
    assert!(h.evaluate(100).is_none());
    assert!(h.evaluate(1200).is_none());
    assert!(h.evaluate(800).is_some());
}

#[test]
fn infinite_iterations_wrap() {
    let h = fade_in(NodeId(0), 0)
        .with_iterations(Iterations::Infinite)
        .unwrap();
    let a = h.evaluate(200).unwrap();
    let b = h.evaluate(1000).unwrap();
    assert!((a.opacity - b.opacity).abs() < 1e-12);
}

#[test]
fn evaluate_is_pure() {
    let h = fade_in(NodeId(0), 0);
    assert_eq!(h.evaluate(333), h.evaluate(333));
}

#[test]
fn seek_then_commit_matches_evaluate() {
    let (mut t, id) = tree();
    let mut h = fade_in(id, 100);
    h.pause().unwrap();
    h.seek(500);
    h.commit(&mut t).unwrap();
    assert_eq!(t.get(id).unwrap().committed, h.evaluate(500));
    assert!(t.styles_dirty());
}

#[test]
fn invalid_handle_cannot_pause_but_still_commits() {
    let (mut t, id) = tree();
    let mut h = fade_in(id, 0);
    h.invalidate();
    assert!(h.pause().is_err());
    h.seek(400);
    h.commit(&mut t).unwrap();
    assert!((t.get(id).unwrap().committed.unwrap().opacity - 0.5).abs() < 1e-12);
}

#[test]
fn commit_to_missing_node_fails() {
    let (mut t, _) = tree();
    let h = fade_in(NodeId(7), 0);
    assert!(h.commit(&mut t).is_err());
}

#[test]
fn unsorted_keyframes_are_rejected() {
    let err = AnimationHandle::new(
        NodeId(0),
        vec![
            Keyframe {
                offset: 0.8,
                value: TransformValues::IDENTITY,
                ease: Ease::Linear,
            },
            Keyframe {
                offset: 0.2,
                value: TransformValues::IDENTITY,
                ease: Ease::Linear,
            },
        ],
        Ease::Linear,
        100,
        0,
    )
    .unwrap_err();
    assert!(err.to_string().contains("sorted"));
}

#[test]
fn whole_iteration_easing_is_applied() {
    let mut h = fade_in(NodeId(0), 0);
    h.easing = Ease::InQuad;
    let v = h.evaluate(400).unwrap();
    assert!((v.opacity - 0.25).abs() < 1e-12);
}

#[test]
fn iteration_count_must_be_positive_and_finite() {
    for n in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = fade_in(NodeId(0), 0)
            .with_iterations(Iterations::Count(n))
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }
    assert!(fade_in(NodeId(0), 0).with_iterations(Iterations::Count(2.5)).is_ok());
}
