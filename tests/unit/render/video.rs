use super::*;
use crate::foundation::core::Canvas;
use crate::render::snapshot::{SnapshotNode, VideoLayer};
use crate::scene::model::{MediaBinding, MediaKind, NodeId, NodeKind, ObjectFit, Paint};
use std::sync::Arc;

fn solid_frame(w: u32, h: u32, px: [u8; 4]) -> VideoFrame {
    VideoFrame {
        width: w,
        height: h,
        rgba: Arc::new(px.repeat((w * h) as usize)),
    }
}

fn node(width: f64, height: f64, clip_radius: f64) -> SnapshotNode {
    SnapshotNode {
        id: NodeId(0),
        parent: None,
        name: "screen".to_string(),
        kind: NodeKind::MediaSlot,
        width,
        height,
        local: Affine::IDENTITY,
        world: Affine::IDENTITY,
        opacity: 1.0,
        world_opacity: 1.0,
        blur: 0.0,
        paint: Paint::default(),
        clip_radius,
        media: Some(MediaBinding {
            kind: MediaKind::Video,
            uri: "synthetic://4x4/1000".to_string(),
            clip_start_ms: 0,
            object_fit: ObjectFit::Cover,
        }),
    }
}

fn snapshot(node: SnapshotNode, frame: VideoFrame, fit: ObjectFit) -> SceneSnapshot {
    SceneSnapshot {
        canvas: Canvas::new(100, 100).unwrap(),
        instant_ms: 0,
        effective_duration_ms: 1000,
        nodes: vec![node],
        videos: vec![VideoLayer {
            node: 0,
            frame: Some(frame),
            object_fit: fit,
        }],
        text: None,
    }
}

fn px(buf: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * w + x) * 4) as usize;
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

#[test]
fn sdf_is_negative_inside_and_positive_outside() {
    assert!(rounded_rect_sdf(Point::new(50.0, 50.0), 100.0, 100.0, 20.0) < 0.0);
    assert!(rounded_rect_sdf(Point::new(1.0, 1.0), 100.0, 100.0, 20.0) > 0.0);
    assert!(rounded_rect_sdf(Point::new(1.0, 50.0), 100.0, 100.0, 20.0) < 0.0);
    let edge = rounded_rect_sdf(Point::new(0.0, 50.0), 100.0, 100.0, 20.0);
    assert!(edge.abs() < 1e-9);
}

#[test]
fn cover_fills_the_whole_box() {
    let snap = snapshot(
        node(100.0, 100.0, 0.0),
        solid_frame(16, 8, [255, 0, 0, 255]),
        ObjectFit::Cover,
    );
    let mut dst = vec![0u8; 100 * 100 * 4];
    composite_videos(&mut dst, 100, 100, &snap).unwrap();
    assert_eq!(px(&dst, 100, 0, 0), [255, 0, 0, 255]);
    assert_eq!(px(&dst, 100, 99, 99), [255, 0, 0, 255]);
    assert_eq!(px(&dst, 100, 50, 2), [255, 0, 0, 255]);
}

#[test]
fn contain_letterboxes_wide_frames() {
    let snap = snapshot(
        node(100.0, 100.0, 0.0),
        solid_frame(20, 10, [0, 255, 0, 255]),
        ObjectFit::Contain,
    );
    let mut dst = vec![0u8; 100 * 100 * 4];
    composite_videos(&mut dst, 100, 100, &snap).unwrap();
    // Content occupies rows 25..75.
    assert_eq!(px(&dst, 100, 50, 10), [0, 0, 0, 0]);
    assert_eq!(px(&dst, 100, 50, 50), [0, 255, 0, 255]);
    assert_eq!(px(&dst, 100, 50, 90), [0, 0, 0, 0]);
}

#[test]
fn corner_radius_clip_scales_with_output() {
    // Layout radius 24 on a 100x100 canvas exported at 200x200.
    let snap = snapshot(
        node(100.0, 100.0, 24.0),
        solid_frame(8, 8, [0, 0, 255, 255]),
        ObjectFit::Cover,
    );
    let mut dst = vec![0u8; 200 * 200 * 4];
    composite_videos(&mut dst, 200, 200, &snap).unwrap();
    assert_eq!(px(&dst, 200, 12, 12)[3], 0);
    assert_eq!(px(&dst, 200, 20, 20), [0, 0, 255, 255]);
    assert_eq!(px(&dst, 200, 100, 100), [0, 0, 255, 255]);
    assert_eq!(px(&dst, 200, 187, 187)[3], 0);
}

#[test]
fn opacity_and_missing_frames() {
    let mut n = node(100.0, 100.0, 0.0);
    n.world_opacity = 0.5;
    let mut snap = snapshot(n, solid_frame(4, 4, [255, 255, 255, 255]), ObjectFit::Fill);
    let mut dst = vec![0u8; 100 * 100 * 4];
    composite_videos(&mut dst, 100, 100, &snap).unwrap();
    let p = px(&dst, 100, 50, 50);
    assert!((i32::from(p[3]) - 128).abs() <= 1, "{p:?}");

    snap.videos[0].frame = None;
    let mut clean = vec![0u8; 100 * 100 * 4];
    composite_videos(&mut clean, 100, 100, &snap).unwrap();
    assert!(clean.iter().all(|&b| b == 0));
}

#[test]
fn rejects_mismatched_target() {
    let snap = snapshot(
        node(100.0, 100.0, 0.0),
        solid_frame(4, 4, [255, 255, 255, 255]),
        ObjectFit::Fill,
    );
    let mut dst = vec![0u8; 10];
    assert!(composite_videos(&mut dst, 100, 100, &snap).is_err());
}
