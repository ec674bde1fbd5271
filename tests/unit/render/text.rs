use super::*;
use crate::foundation::core::Canvas;
use crate::scene::overlay::TextPosition;

fn snap(text: TextOverlay, instant_ms: u64) -> SceneSnapshot {
    SceneSnapshot {
        canvas: Canvas::new(400, 200).unwrap(),
        instant_ms,
        effective_duration_ms: 2000,
        nodes: Vec::new(),
        videos: Vec::new(),
        text: Some(text),
    }
}

fn overlay(position: TextPosition) -> TextOverlay {
    TextOverlay {
        tagline: "Ship it".to_string(),
        position,
        ..TextOverlay::new("Hello")
    }
}

#[test]
fn top_center_layout_uses_padding_and_gap() {
    let o = overlay(TextPosition::TopCenter);
    let specs = line_specs(&o, 2.0, 800.0, 400.0, TextFrame::STATIC, TextFrame::STATIC);
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].anchor_x, 400.0);
    assert_eq!(specs[0].top_y, 120.0);
    assert_eq!(specs[0].size_px, 128.0);
    let head_h = 64.0 * 2.0 * 1.1;
    assert!((specs[1].top_y - (120.0 + head_h + 24.0)).abs() < 1e-9);
    assert_eq!(specs[1].weight, TAGLINE_WEIGHT);
    assert!((specs[1].color.a - 0.9).abs() < 1e-9);
}

#[test]
fn bottom_right_layout_anchors_to_far_edges() {
    let o = TextOverlay {
        tagline: String::new(),
        ..overlay(TextPosition::BottomRight)
    };
    let specs = line_specs(&o, 1.0, 400.0, 200.0, TextFrame::STATIC, TextFrame::STATIC);
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].align, HAlign::Right);
    assert_eq!(specs[0].anchor_x, 360.0);
    let total = 64.0 * 1.1;
    assert!((specs[0].top_y - (200.0 - 60.0 - total)).abs() < 1e-9);
}

#[test]
fn brightness_scales_rgb_only() {
    let c = brighten(Color::rgba(0.4, 0.6, 0.8, 0.5), 1.5);
    assert!((c.r - 0.6).abs() < 1e-9);
    assert!((c.g - 0.9).abs() < 1e-9);
    assert_eq!(c.b, 1.0);
    assert_eq!(c.a, 0.5);
}

#[test]
fn blit_offsets_into_destination() {
    let mut dst = vec![0u8; 4 * 4 * 4];
    let src = [255u8, 0, 0, 255].repeat(4);
    blit_over(&mut dst, 4, &src, (1, 2), (2, 2), 1.0);
    assert_eq!(&dst[(2 * 4 + 1) * 4..(2 * 4 + 1) * 4 + 4], &[255, 0, 0, 255]);
    assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
}

#[test]
fn nothing_is_drawn_before_the_reveal_starts() {
    let mut painter = TextPainter::new();
    let mut fonts = FontRegistry::empty();
    let mut dst = vec![0u8; 400 * 200 * 4];
    painter
        .paint(
            &mut dst,
            400,
            200,
            &snap(
                TextOverlay {
                    animation: crate::animation::text::TextAnimation::WordFadeIn,
                    ..overlay(TextPosition::Center)
                },
                0,
            ),
            &mut fonts,
        )
        .unwrap();
    assert!(dst.iter().all(|&b| b == 0));
}

#[test]
fn missing_fonts_skip_the_overlay() {
    let mut painter = TextPainter::new();
    let mut fonts = FontRegistry::empty();
    let mut dst = vec![0u8; 400 * 200 * 4];
    painter
        .paint(&mut dst, 400, 200, &snap(overlay(TextPosition::Center), 1999), &mut fonts)
        .unwrap();
    assert!(dst.iter().all(|&b| b == 0));
}

#[test]
fn settled_headline_draws_near_its_anchor() {
    let mut fonts = FontRegistry::new();
    if fonts.resolve_family("sans-serif").is_none() {
        return;
    }
    let mut painter = TextPainter::new();
    let mut dst = vec![0u8; 400 * 200 * 4];
    let o = TextOverlay {
        tagline: String::new(),
        ..overlay(TextPosition::TopLeft)
    };
    painter
        .paint(&mut dst, 400, 200, &snap(o, 1999), &mut fonts)
        .unwrap();

    let inked = |x0: u32, x1: u32| {
        (0..200u32).any(|y| (x0..x1).any(|x| dst[((y * 400 + x) * 4 + 3) as usize] > 0))
    };
    assert!(inked(40, 200));
    assert!(!inked(330, 400));
}
