use super::*;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Canvas;
use crate::scene::composition::DefaultVideoOpener;
use crate::scene::model::SceneTree;
use crate::timeline::media::SyncMode;
use crate::timeline::sync::TimelineSynchronizer;

const SCENE: &str = r##"{
    "canvas": { "width": 120, "height": 80 },
    "duration_ms": 1000,
    "background": { "type": "solid", "color": "#00ff00" },
    "nodes": [
        { "name": "root", "kind": "group", "rect": { "width": 120, "height": 80 } },
        { "name": "screen", "kind": "media_slot", "parent": "root",
          "rect": { "x": 20, "y": 20, "width": 40, "height": 40 },
          "media": { "kind": "video", "uri": "synthetic://8x8/1000?fps=10" } }
    ]
}"##;

fn rasterizer() -> FrameRasterizer {
    FrameRasterizer::new(Arc::new(ResourceCache::default()), FontRegistry::empty())
}

fn synced_scene(at_ms: u64) -> Scene {
    let mut scene = Scene::from_json_str(SCENE, &DefaultVideoOpener::default()).unwrap();
    TimelineSynchronizer::default()
        .seek_to(&mut scene, at_ms, SyncMode::Scrub, &CancelToken::new())
        .unwrap();
    scene
}

#[test]
fn background_and_video_land_in_the_buffer() {
    let scene = synced_scene(0);
    let frame = rasterizer().rasterize(&scene, 120, 80).unwrap();
    assert_eq!(frame.data.len(), 120 * 80 * 4);
    assert!(frame.premultiplied);
    assert_eq!(frame.pixel(5, 5), Some([0, 255, 0, 255]));
    let inside = frame.pixel(40, 40).unwrap();
    assert_eq!(inside[3], 255);
    assert_ne!(inside, [0, 255, 0, 255]);
}

#[test]
fn repeated_rasterize_is_identical_with_and_without_elision() {
    let scene = synced_scene(300);
    let mut elided = rasterizer();
    let a = elided.rasterize(&scene, 240, 160).unwrap();
    let b = elided.rasterize(&scene, 240, 160).unwrap();
    assert_eq!(a, b);

    let mut fresh = rasterizer().with_static_elision(false);
    let c = fresh.rasterize(&scene, 240, 160).unwrap();
    let d = fresh.rasterize(&scene, 240, 160).unwrap();
    assert_eq!(c, d);
    assert_eq!(a, c);
}

#[test]
fn output_size_is_part_of_the_fingerprint() {
    let scene = synced_scene(0);
    let mut r = rasterizer();
    let small = r.rasterize(&scene, 120, 80).unwrap();
    let large = r.rasterize(&scene, 240, 160).unwrap();
    assert_eq!((small.width, large.width), (120, 240));
}

#[test]
fn empty_tree_is_missing_root() {
    let scene = Scene::new(Canvas::new(10, 10).unwrap(), 1000, SceneTree::new());
    let err = rasterizer().rasterize(&scene, 10, 10).unwrap_err();
    assert_eq!(err.code(), "missing_scene_root");
}

#[test]
fn zero_output_is_rejected() {
    let scene = synced_scene(0);
    assert!(rasterizer().rasterize(&scene, 0, 10).is_err());
}
