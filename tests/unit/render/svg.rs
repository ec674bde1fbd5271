use std::io::Cursor;

use super::*;
use crate::assets::fetch::MemoryFetcher;
use crate::assets::optimize::OptimizePolicy;
use crate::scene::composition::{DefaultVideoOpener, ResourceKind, Scene};

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn scene(nodes: &str) -> SceneSnapshot {
    let json = format!(
        r##"{{
        "canvas": {{ "width": 100, "height": 50 }},
        "duration_ms": 1000,
        "background": {{ "type": "solid", "color": "#ff0000" }},
        "nodes": [
            {{ "name": "root", "kind": "group", "rect": {{ "width": 100, "height": 50 }} }}
            {nodes}
        ]
    }}"##
    );
    let scene = Scene::from_json_str(&json, &DefaultVideoOpener::default()).unwrap();
    SceneSnapshot::capture(&scene)
}

fn px(buf: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * w + x) * 4) as usize;
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

fn empty_db() -> Arc<usvg::fontdb::Database> {
    Arc::new(usvg::fontdb::Database::new())
}

#[test]
fn markup_scales_canvas_to_output() {
    let snap = scene("");
    let svg = serialize_snapshot(&snap, 200, 100);
    assert!(svg.contains(r#"width="200" height="100""#));
    assert!(svg.contains(r#"<g transform="scale(2 2)">"#));
    assert!(svg.contains(r##"fill="#ff0000""##));
}

#[test]
fn video_nodes_serialize_as_placeholders() {
    let snap = scene(
        r#", { "name": "v", "kind": "media_slot", "parent": "root",
             "rect": { "width": 40, "height": 40 },
             "media": { "kind": "video", "uri": "synthetic://8x8/1000" } }"#,
    );
    let svg = serialize_snapshot(&snap, 100, 50);
    assert!(svg.contains(r#"class="video-placeholder""#));
    assert!(!svg.contains("synthetic://"));
}

#[test]
fn attribute_values_are_escaped() {
    assert_eq!(escape_attr(r#"a&b"<c>"#), "a&amp;b&quot;&lt;c&gt;");
    assert_eq!(num(1.0), "1");
    assert_eq!(num(0.123456), "0.1235");
}

#[test]
fn solid_background_rasterizes() {
    let snap = scene("");
    let svg = serialize_snapshot(&snap, 100, 50);
    let cache = ResourceCache::default();
    let px_buf = rasterize_svg(&svg, 100, 50, empty_db(), &cache).unwrap();
    assert_eq!(px_buf.len(), 100 * 50 * 4);
    assert_eq!(px(&px_buf, 100, 50, 25), [255, 0, 0, 255]);
}

#[test]
fn images_resolve_from_cache_only() {
    let snap = scene(
        r#", { "name": "shot", "kind": "media_slot", "parent": "root",
             "rect": { "x": 50, "width": 50, "height": 50 },
             "media": { "kind": "image", "uri": "shot.png", "object_fit": "fill" } }"#,
    );
    let svg = serialize_snapshot(&snap, 100, 50);
    let fetcher = Arc::new(MemoryFetcher::new().with("shot.png", png(4, 4, [0, 0, 255, 255])));
    let cache = ResourceCache::new(fetcher, OptimizePolicy::default());

    let unprimed = rasterize_svg(&svg, 100, 50, empty_db(), &cache).unwrap();
    assert_eq!(px(&unprimed, 100, 75, 25), [255, 0, 0, 255]);

    cache.materialize("shot.png", ResourceKind::Image).unwrap();
    let primed = rasterize_svg(&svg, 100, 50, empty_db(), &cache).unwrap();
    assert_eq!(px(&primed, 100, 75, 25), [0, 0, 255, 255]);
    assert_eq!(px(&primed, 100, 25, 25), [255, 0, 0, 255]);
}

#[test]
fn malformed_markup_is_a_validation_error() {
    let cache = ResourceCache::default();
    let err = rasterize_svg("<svg", 10, 10, empty_db(), &cache).unwrap_err();
    assert_eq!(err.code(), "validation");
}
