use super::*;

const MINIMAL: &str = r##"{
    "canvas": { "width": 640, "height": 360 },
    "duration_ms": 2000,
    "background": { "type": "solid", "color": "#101820" },
    "nodes": [
        { "name": "root", "kind": "group", "rect": { "width": 640, "height": 360 } },
        { "name": "phone", "kind": "mockup_frame", "parent": "root",
          "rect": { "x": 220, "y": 20, "width": 200, "height": 320 },
          "paint": { "corner_radius": 24, "clip": true } },
        { "name": "screen", "kind": "media_slot", "parent": "phone",
          "rect": { "x": 10, "y": 10, "width": 180, "height": 300 },
          "media": { "kind": "image", "uri": "shots/home.png", "object_fit": "cover" } }
    ],
    "animations": [
        { "node": "phone", "duration_ms": 1000, "easing": "ease-out",
          "keyframes": [
            { "offset": 0, "value": { "translate_y": 40, "opacity": 0 } },
            { "offset": 1, "value": { "translate_y": 0, "opacity": 1 } }
          ] }
    ],
    "tracks": [
        { "kind": "visual", "clips": [ { "start_ms": 0, "duration_ms": 2000, "node": "screen" } ] },
        { "kind": "audio", "clips": [ { "start_ms": 0, "duration_ms": 2000, "media_uri": "music.m4a" } ] }
    ],
    "text": { "headline": "Hello", "position": "bottom-center", "animation": "blur-in" },
    "fonts": ["fonts/Manrope.ttf"]
}"##;

#[test]
fn parses_full_scene_definition() {
    let def = SceneDef::from_json_str(MINIMAL).unwrap();
    assert_eq!(def.nodes.len(), 3);
    assert_eq!(def.nodes[1].paint.corner_radius, 24.0);
    assert_eq!(def.animations[0].easing, Ease::parse("ease-out").unwrap());
    assert_eq!(def.tracks.len(), 2);
    let text = def.text.unwrap();
    assert_eq!(text.font_size, 64.0);
    assert_eq!(text.font_family, "Manrope");
}

#[test]
fn empty_node_list_is_missing_root() {
    let err = SceneDef::from_json_str(
        r#"{ "canvas": { "width": 10, "height": 10 }, "duration_ms": 100 }"#,
    )
    .unwrap_err();
    assert!(matches!(err, LiikeError::MissingSceneRoot(_)));
}

#[test]
fn rejects_forward_parent_reference() {
    let json = r#"{
        "canvas": { "width": 10, "height": 10 }, "duration_ms": 100,
        "nodes": [
            { "name": "root", "kind": "group", "rect": { "width": 10, "height": 10 } },
            { "name": "a", "kind": "shape", "parent": "b", "rect": { "width": 1, "height": 1 } },
            { "name": "b", "kind": "shape", "parent": "root", "rect": { "width": 1, "height": 1 } }
        ]
    }"#;
    assert!(SceneDef::from_json_str(json).is_err());
}

#[test]
fn rejects_unknown_fields_and_targets() {
    let unknown_field = r#"{ "canvas": { "width": 10, "height": 10 }, "duration_ms": 1, "fps": 30 }"#;
    assert!(SceneDef::from_json_str(unknown_field).is_err());

    let mut def = SceneDef::from_json_str(MINIMAL).unwrap();
    def.animations[0].node = "ghost".to_string();
    assert!(def.validate().is_err());
}

#[test]
fn resolve_paths_rewrites_relative_uris_only() {
    let mut def = SceneDef::from_json_str(MINIMAL).unwrap();
    def.nodes[2].paint.fill = Some(Fill::Image {
        uri: "https://cdn.example/bg.png".to_string(),
        fit: Default::default(),
    });
    def.resolve_paths(Path::new("/scenes"));

    let media = def.nodes[2].media.as_ref().unwrap();
    assert_eq!(Path::new(&media.uri), Path::new("/scenes/shots/home.png"));
    assert_eq!(Path::new(&def.fonts[0]), Path::new("/scenes/fonts/Manrope.ttf"));
    assert!(matches!(
        def.nodes[2].paint.fill.as_ref(),
        Some(Fill::Image { uri, .. }) if uri == "https://cdn.example/bg.png"
    ));
}
