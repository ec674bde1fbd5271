use super::*;

const ALL: [TextAnimation; 10] = [
    TextAnimation::None,
    TextAnimation::Typewriter,
    TextAnimation::WordFadeIn,
    TextAnimation::LetterCascade,
    TextAnimation::WordSlideUp,
    TextAnimation::GlowReveal,
    TextAnimation::BounceLetters,
    TextAnimation::BlurIn,
    TextAnimation::ScalePop,
    TextAnimation::SplitReveal,
];

#[test]
fn every_preset_ends_fully_revealed() {
    for a in ALL {
        let f = a.frame(1.0);
        assert_eq!(f.opacity, 1.0, "{a:?}");
        assert!((f.scale - 1.0).abs() < 1e-12, "{a:?}");
        assert_eq!(f.blur, 0.0, "{a:?}");
        assert!((f.brightness - 1.0).abs() < 1e-12, "{a:?}");
        assert_eq!(f.translate_x, 0.0, "{a:?}");
    }
}

#[test]
fn presets_start_hidden_except_static() {
    for a in ALL {
        let f = a.frame(0.0);
        let expect = if a == TextAnimation::None { 1.0 } else { 0.0 };
        assert_eq!(f.opacity, expect, "{a:?}");
    }
}

#[test]
fn reveal_completes_halfway_through_the_window() {
    let f = TextAnimation::WordSlideUp.frame(0.25);
    assert!((f.opacity - 0.5).abs() < 1e-12);
    assert!((f.translate_y - 20.0).abs() < 1e-12);
    assert_eq!(TextAnimation::WordSlideUp.frame(0.5).opacity, 1.0);
}

#[test]
fn split_reveal_enters_from_the_left() {
    assert_eq!(TextAnimation::SplitReveal.frame(0.0).translate_x, -50.0);
    assert_eq!(TextAnimation::SplitReveal.frame(0.25).translate_x, -25.0);
    assert_eq!(TextAnimation::SplitReveal.frame(0.5).translate_x, 0.0);
}

#[test]
fn typewriter_is_binary() {
    assert_eq!(TextAnimation::Typewriter.frame(0.01).opacity, 1.0);
    assert_eq!(TextAnimation::Typewriter.frame(0.0).opacity, 0.0);
}

#[test]
fn timing_follows_speed() {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    let t = TextTiming::new(4000, AnimationSpeed::Normal);
    assert!(close(t.headline_start_ms, 300.0));
    assert!(close(t.tagline_start_ms, 900.0));
    assert!(close(t.line_duration_ms, 1200.0));

    let fast = TextTiming::new(4000, AnimationSpeed::Fast);
    assert!(close(fast.headline_start_ms, 150.0));
    assert!(close(fast.line_duration_ms, 600.0));
}

#[test]
fn progress_clamps_and_staggers() {
    let t = TextTiming::new(4000, AnimationSpeed::Normal);
    assert_eq!(t.progress(0), (0.0, 0.0));
    let (h, g) = t.progress(900);
    assert!((h - 0.5).abs() < 1e-9);
    assert!(g.abs() < 1e-9);
    assert_eq!(t.progress(10_000), (1.0, 1.0));
}

#[test]
fn serde_names_are_kebab_case() {
    let a: TextAnimation = serde_json::from_str("\"letter-cascade\"").unwrap();
    assert_eq!(a, TextAnimation::LetterCascade);
}
