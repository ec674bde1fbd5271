use super::*;

fn scene_json(media: &str) -> String {
    format!(
        r##"{{
        "canvas": {{ "width": 400, "height": 300 }},
        "duration_ms": 2000,
        "background": {{ "type": "solid", "color": "#336699" }},
        "nodes": [
            {{ "name": "root", "kind": "group", "rect": {{ "width": 400, "height": 300 }} }},
            {{ "name": "frame", "kind": "mockup_frame", "parent": "root",
               "rect": {{ "x": 100, "y": 20, "width": 200, "height": 260 }},
               "paint": {{ "corner_radius": 24 }} }},
            {{ "name": "screen", "kind": "media_slot", "parent": "frame",
               "rect": {{ "x": 0, "y": 0, "width": 200, "height": 260 }},
               "media": {media} }}
        ],
        "fonts": ["fonts/a.ttf", "fonts/a.ttf"]
    }}"##
    )
}

#[test]
fn video_priority_rule_uses_longest_video() {
    let json = scene_json(r#"{ "kind": "video", "uri": "synthetic://64x64/4000?fps=30" }"#);
    let scene = Scene::from_json_str(&json, &DefaultVideoOpener::default()).unwrap();
    assert_eq!(scene.duration_ms, 2000);
    assert_eq!(scene.media.len(), 1);
    assert_eq!(scene.effective_duration_ms(), 4000);
}

#[test]
fn user_duration_applies_without_video() {
    let json = scene_json(r#"{ "kind": "image", "uri": "shots/a.png" }"#);
    let scene = Scene::from_json_str(&json, &DefaultVideoOpener::default()).unwrap();
    assert!(scene.media.is_empty());
    assert_eq!(scene.effective_duration_ms(), 2000);
}

#[test]
fn background_becomes_first_child_of_root() {
    let json = scene_json(r#"{ "kind": "image", "uri": "shots/a.png" }"#);
    let scene = Scene::from_json_str(&json, &DefaultVideoOpener::default()).unwrap();
    let root = scene.tree.get(NodeId(0)).unwrap();
    let first = scene.tree.get(root.children[0]).unwrap();
    assert_eq!(first.kind, NodeKind::Background);
    assert_eq!(scene.background_color(), Color::from_rgba8(0x33, 0x66, 0x99, 255));
    assert!(!scene.tree.styles_dirty());
}

#[test]
fn resource_uris_are_deduplicated() {
    let json = scene_json(r#"{ "kind": "image", "uri": "shots/a.png" }"#);
    let scene = Scene::from_json_str(&json, &DefaultVideoOpener::default()).unwrap();
    let uris = scene.resource_uris();
    assert_eq!(
        uris,
        vec![
            ResourceRef {
                uri: "shots/a.png".to_string(),
                kind: ResourceKind::Image
            },
            ResourceRef {
                uri: "fonts/a.ttf".to_string(),
                kind: ResourceKind::Font
            },
        ]
    );
}

#[test]
fn custom_opener_is_used_for_video_bindings() {
    let json = scene_json(r#"{ "kind": "video", "uri": "clip.mp4", "clip_start_ms": 250 }"#);
    let opener = |uri: &str| -> LiikeResult<Box<dyn VideoSource>> {
        assert_eq!(uri, "clip.mp4");
        Ok(Box::new(SyntheticVideo::new(32, 32, 1500, 30)))
    };
    let scene = Scene::from_json_str(&json, &opener).unwrap();
    let el = scene.media_for(NodeId(3)).unwrap();
    assert_eq!(el.clip_start_ms, 250);
    assert_eq!(scene.effective_duration_ms(), 1500);
}

#[test]
fn unopenable_video_is_skipped() {
    let json = scene_json(r#"{ "kind": "video", "uri": "missing.mp4" }"#);
    let opener = |uri: &str| -> LiikeResult<Box<dyn VideoSource>> {
        Err(LiikeError::resource(uri, "not found"))
    };
    let mut scene = Scene::from_json_str(&json, &opener).unwrap();
    assert!(scene.media.is_empty());
    assert_eq!(scene.effective_duration_ms(), 2000);
    // The binding itself survives, so the slot still renders as a placeholder.
    assert!(scene.tree.get(NodeId(3)).unwrap().media.is_some());

    let skipped = scene.open_media(&opener);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "missing.mp4");
}

#[test]
fn zero_iteration_animation_is_rejected() {
    let json = r##"{
        "canvas": { "width": 10, "height": 10 },
        "duration_ms": 1000,
        "nodes": [ { "name": "root", "kind": "group", "rect": { "width": 10, "height": 10 } } ],
        "animations": [
            { "node": "root", "duration_ms": 500, "iterations": { "count": 0 },
              "keyframes": [ { "offset": 0, "value": { "opacity": 0 } },
                             { "offset": 1, "value": { "opacity": 1 } } ] }
        ]
    }"##;
    let err = Scene::from_json_str(json, &DefaultVideoOpener::default()).unwrap_err();
    assert_eq!(err.code(), "validation");
}
