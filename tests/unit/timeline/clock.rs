use super::*;
use crate::foundation::core::Rect;
use crate::scene::model::{Node, NodeKind};

fn tree_with_slot() -> (SceneTree, NodeId) {
    let mut tree = SceneTree::new();
    let root = tree
        .set_root(Node::new("root", NodeKind::Group, Rect::new(0.0, 0.0, 100.0, 100.0)))
        .unwrap();
    let slot = tree
        .add_child(
            root,
            Node::new("slot", NodeKind::MediaSlot, Rect::new(0.0, 0.0, 50.0, 50.0)),
        )
        .unwrap();
    (tree, slot)
}

fn visual(node: NodeId, start_ms: u64, duration_ms: u64) -> Clip {
    Clip {
        start_ms,
        duration_ms,
        node: Some(node),
        media_uri: None,
    }
}

#[test]
fn clip_window_is_half_open() {
    let c = visual(NodeId(1), 100, 50);
    assert!(!c.contains(99));
    assert!(c.contains(100));
    assert!(c.contains(149));
    assert!(!c.contains(150));
}

#[test]
fn visibility_follows_clip_windows() {
    let (mut tree, slot) = tree_with_slot();
    let mut tl = Timeline::new(vec![Track {
        kind: TrackKind::Visual,
        muted: false,
        clips: vec![visual(slot, 0, 100), visual(slot, 300, 100)],
    }]);

    tl.set_instant(50);
    tl.apply_visibility(&mut tree);
    assert!(tree.get(slot).unwrap().visible);

    tl.set_instant(200);
    tl.apply_visibility(&mut tree);
    assert!(!tree.get(slot).unwrap().visible);

    tl.set_instant(350);
    tl.apply_visibility(&mut tree);
    assert!(tree.get(slot).unwrap().visible);
}

#[test]
fn nodes_without_clips_are_untouched() {
    let (mut tree, slot) = tree_with_slot();
    tree.get_mut(slot).unwrap().visible = false;
    let mut tl = Timeline::new(vec![Track {
        kind: TrackKind::Animation,
        muted: false,
        clips: vec![visual(slot, 0, 100)],
    }]);
    tl.set_instant(10);
    tl.apply_visibility(&mut tree);
    assert!(!tree.get(slot).unwrap().visible);
}

#[test]
fn audio_source_skips_muted_tracks() {
    let audio = |uri: &str| Clip {
        start_ms: 0,
        duration_ms: 1000,
        node: None,
        media_uri: Some(uri.to_string()),
    };
    let tl = Timeline::new(vec![
        Track {
            kind: TrackKind::Audio,
            muted: true,
            clips: vec![audio("muted.m4a")],
        },
        Track {
            kind: TrackKind::Audio,
            muted: false,
            clips: vec![audio("music.m4a"), audio("second.m4a")],
        },
    ]);
    assert_eq!(tl.audio_source(), Some("music.m4a"));
    assert_eq!(tl.end_ms(), 1000);
}

#[test]
fn empty_timeline_has_no_audio() {
    let tl = Timeline::default();
    assert_eq!(tl.audio_source(), None);
    assert_eq!(tl.end_ms(), 0);
}
