use super::*;
use crate::animation::ease::Ease;
use crate::animation::handle::{AnimationHandle, Keyframe};
use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::LiikeError;
use crate::scene::model::{Node, NodeId, NodeKind, ObjectFit, SceneTree, TransformValues};
use crate::timeline::clock::{Clip, Timeline, Track, TrackKind};
use crate::timeline::media::{MediaElement, MediaEvent, SyntheticVideo, VideoFrame, VideoSource};

fn fade_in(node: NodeId) -> AnimationHandle {
    let kf = |offset: f64, opacity: f64| Keyframe {
        offset,
        value: TransformValues {
            opacity,
            ..TransformValues::IDENTITY
        },
        ease: Ease::Linear,
    };
    AnimationHandle::new(node, vec![kf(0.0, 0.0), kf(1.0, 1.0)], Ease::Linear, 1000, 0).unwrap()
}

fn scene() -> (Scene, NodeId, NodeId) {
    let mut tree = SceneTree::new();
    let root = tree
        .set_root(Node::new("root", NodeKind::Group, Rect::new(0.0, 0.0, 100.0, 100.0)))
        .unwrap();
    let a = tree
        .add_child(root, Node::new("a", NodeKind::Shape, Rect::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let b = tree
        .add_child(root, Node::new("b", NodeKind::MediaSlot, Rect::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    let scene = Scene::new(Canvas::new(100, 100).unwrap(), 1000, tree);
    (scene, a, b)
}

#[test]
fn commits_every_handle_and_recomputes_styles() {
    let (mut scene, a, b) = scene();
    scene.add_animation(fade_in(a));
    scene.add_animation(fade_in(b));

    let sync = TimelineSynchronizer::default();
    let report = sync
        .seek_to(&mut scene, 250, SyncMode::Scrub, &CancelToken::new())
        .unwrap();

    assert_eq!(report.handles_committed, 2);
    assert_eq!(scene.timeline.now_ms(), 250);
    let style = scene.tree.computed(a).unwrap();
    assert!((style.opacity - 0.25).abs() < 1e-9);
    assert!((scene.tree.computed(b).unwrap().opacity - 0.25).abs() < 1e-9);
}

#[test]
fn invalid_handle_still_commits_and_others_continue() {
    let (mut scene, a, b) = scene();
    let mut broken = fade_in(a);
    broken.invalidate();
    scene.add_animation(broken);
    // Target missing from the tree: commit fails.
    scene.add_animation(fade_in(NodeId(42)));
    scene.add_animation(fade_in(b));

    let report = TimelineSynchronizer::default()
        .seek_to(&mut scene, 500, SyncMode::Scrub, &CancelToken::new())
        .unwrap();

    assert_eq!(report.handles_committed, 2);
    assert_eq!(report.handles_failed, 1);
    assert!((scene.tree.get(a).unwrap().effective_transform().opacity - 0.5).abs() < 1e-9);
    assert!((scene.tree.get(b).unwrap().effective_transform().opacity - 0.5).abs() < 1e-9);
}

#[test]
fn clip_visibility_is_applied_before_styles() {
    let (mut scene, a, _) = scene();
    scene.timeline = Timeline::new(vec![Track {
        kind: TrackKind::Visual,
        muted: false,
        clips: vec![Clip {
            start_ms: 500,
            duration_ms: 500,
            node: Some(a),
            media_uri: None,
        }],
    }]);
    let sync = TimelineSynchronizer::default();
    let cancel = CancelToken::new();

    sync.seek_to(&mut scene, 100, SyncMode::Scrub, &cancel).unwrap();
    assert!(!scene.tree.computed(a).unwrap().visible);
    sync.seek_to(&mut scene, 600, SyncMode::Scrub, &cancel).unwrap();
    assert!(scene.tree.computed(a).unwrap().visible);
}

#[test]
fn media_is_positioned_relative_to_clip_start() {
    let (mut scene, _, b) = scene();
    scene.add_media(MediaElement::new(
        b,
        200,
        ObjectFit::Cover,
        Box::new(SyntheticVideo::new(8, 8, 2000, 30)),
    ));
    let report = TimelineSynchronizer::default()
        .seek_to(&mut scene, 700, SyncMode::Scrub, &CancelToken::new())
        .unwrap();
    assert_eq!(report.media_seeked, 1);
    assert_eq!(scene.media[0].last_synced_ms(), Some(700));
    assert!(scene.media[0].frame().is_some());
}

#[test]
fn cancellation_is_observed_before_media_seek() {
    let (mut scene, _, b) = scene();
    let video = SyntheticVideo::new(8, 8, 2000, 30);
    let seeks = video.seek_counter();
    scene.add_media(MediaElement::new(b, 0, ObjectFit::Cover, Box::new(video)));

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = TimelineSynchronizer::default()
        .seek_to(&mut scene, 900, SyncMode::Scrub, &cancel)
        .unwrap_err();
    assert!(matches!(err, LiikeError::Cancelled));
    assert_eq!(seeks.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn stalled_seek_times_out_without_failing() {
    let (mut scene, _, b) = scene();
    scene.add_media(MediaElement::new(
        b,
        0,
        ObjectFit::Cover,
        Box::new(SyntheticVideo::new(8, 8, 2000, 30).stalled()),
    ));
    let settings = ExportSettings {
        seek_timeout_ms: 20,
        ..ExportSettings::default()
    };
    let report = TimelineSynchronizer::new(settings)
        .seek_to(&mut scene, 900, SyncMode::Scrub, &CancelToken::new())
        .unwrap();
    assert_eq!(report.media_timed_out, 1);
}

struct BrokenAdvance(SyntheticVideo);

impl VideoSource for BrokenAdvance {
    fn size(&self) -> (u32, u32) {
        self.0.size()
    }

    fn duration_ms(&self) -> u64 {
        self.0.duration_ms()
    }

    fn position_ms(&mut self) -> u64 {
        self.0.position_ms()
    }

    fn start_seek(&mut self, target_ms: u64, events: std::sync::mpsc::Sender<MediaEvent>) {
        self.0.start_seek(target_ms, events);
    }

    fn advance_to(&mut self, _target_ms: u64) -> LiikeResult<()> {
        Err(LiikeError::resource("test://broken", "decoder died"))
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.0.current_frame()
    }
}

#[test]
fn media_decode_failure_is_reported_not_propagated() {
    let (mut scene, a, b) = scene();
    scene.add_animation(fade_in(a));
    scene.add_media(MediaElement::new(
        b,
        0,
        ObjectFit::Cover,
        Box::new(BrokenAdvance(SyntheticVideo::new(8, 8, 2000, 30))),
    ));
    let sync = TimelineSynchronizer::default();
    let cancel = CancelToken::new();
    sync.seek_to(&mut scene, 0, SyncMode::Scrub, &cancel).unwrap();

    let report = sync
        .seek_to(&mut scene, 100, SyncMode::Continuity, &cancel)
        .unwrap();
    assert_eq!(report.media_stale, 1);
    assert_eq!(report.handles_committed, 1);
    assert!(scene.media[0].frame().is_some());
    let style = scene.tree.computed(a).unwrap();
    assert!((style.opacity - 0.1).abs() < 1e-9);
}
