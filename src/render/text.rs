use std::collections::HashMap;

use crate::animation::text::{TextFrame, TextTiming};
use crate::assets::fonts::FontRegistry;
use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::math::{blend_px_over, blur_css_px, blur_filter_px, premul_over_in_place_opacity};
use crate::render::snapshot::SceneSnapshot;
use crate::scene::color::Color;
use crate::scene::overlay::{HAlign, TextOverlay, VAlign};

const PADDING: f64 = 40.0;
const LINE_GAP: f64 = 12.0;
const HEADLINE_LEADING: f64 = 1.1;
const TAGLINE_LEADING: f64 = 1.3;
const TAGLINE_WEIGHT: u16 = 400;
const TAGLINE_ALPHA: f64 = 0.9;
const SHADOW_BLUR: f64 = 4.0;
const SHADOW_OFFSET_Y: f64 = 2.0;
const SHADOW_ALPHA: u8 = 102;
const MIN_VISIBLE_OPACITY: f64 = 0.001;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextBrush {
    fn from_color(c: Color) -> Self {
        let [r, g, b, a] = c.to_rgba8();
        Self { r, g, b, a }
    }
}

struct LineSpec<'a> {
    text: &'a str,
    size_px: f32,
    weight: u16,
    color: Color,
    frame: TextFrame,
    align: HAlign,
    anchor_x: f64,
    top_y: f64,
}

/// Draws the headline/tagline overlay directly into the output raster.
///
/// Lines are shaped with Parley and filled with `vello_cpu`; shadow and blur run on a
/// per-line layer cropped to the line's device bounds.
pub struct TextPainter {
    layout_cx: parley::LayoutContext<TextBrush>,
    fonts: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
}

impl Default for TextPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextPainter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextPainter")
            .field("cached_fonts", &self.fonts.len())
            .finish_non_exhaustive()
    }
}

impl TextPainter {
    pub fn new() -> Self {
        Self {
            layout_cx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
        }
    }

    /// Paint the snapshot's text overlay onto premultiplied `dst` at `snap.instant_ms`.
    ///
    /// No-op when the overlay is absent, empty, or fully transparent at this instant.
    pub fn paint(
        &mut self,
        dst: &mut [u8],
        out_w: u32,
        out_h: u32,
        snap: &SceneSnapshot,
        fonts: &mut FontRegistry,
    ) -> LiikeResult<()> {
        let Some(overlay) = snap.text.as_ref().filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        if dst.len() != (out_w as usize) * (out_h as usize) * 4 {
            return Err(LiikeError::validation("text overlay target size mismatch"));
        }

        let Some((head, tag)) = line_frames(snap) else {
            return Ok(());
        };

        let Some(family) = fonts.resolve_family(&overlay.font_family) else {
            tracing::warn!(family = %overlay.font_family, "no font available, text overlay skipped");
            return Ok(());
        };

        let scale = f64::from(out_w) / f64::from(snap.canvas.width.max(1));
        let specs = line_specs(overlay, scale, f64::from(out_w), f64::from(out_h), head, tag);
        for spec in specs {
            if spec.text.is_empty() || spec.frame.opacity <= MIN_VISIBLE_OPACITY {
                continue;
            }
            self.paint_line(dst, out_w, out_h, scale, &family, &spec, fonts)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_line(
        &mut self,
        dst: &mut [u8],
        out_w: u32,
        out_h: u32,
        scale: f64,
        family: &str,
        spec: &LineSpec<'_>,
        fonts: &mut FontRegistry,
    ) -> LiikeResult<()> {
        let color = brighten(spec.color, spec.frame.brightness);
        let layout = self.layout(fonts, family, spec, TextBrush::from_color(color));
        let lw = f64::from(layout.width());
        let lh = f64::from(layout.height());
        if lw <= 0.0 || lh <= 0.0 {
            return Ok(());
        }

        let left = match spec.align {
            HAlign::Left => spec.anchor_x,
            HAlign::Center => spec.anchor_x - lw / 2.0,
            HAlign::Right => spec.anchor_x - lw,
        };
        let center = Vec2::new(left + lw / 2.0, spec.top_y + lh / 2.0);
        let f = spec.frame;
        let xf = Affine::translate(center + Vec2::new(f.translate_x * scale, f.translate_y * scale))
            * Affine::scale(f.scale)
            * Affine::translate(-center)
            * Affine::translate(Vec2::new(left, spec.top_y));

        let shadow_blur = SHADOW_BLUR * scale;
        let shadow_dy = SHADOW_OFFSET_Y * scale;
        let filter_blur = f.blur.max(0.0) * scale;
        let margin = (3.0 * shadow_blur / 2.0 + shadow_dy + 3.0 * filter_blur + 2.0).ceil();
        let bbox = xf
            .transform_rect_bbox(Rect::new(0.0, 0.0, lw, lh))
            .inflate(margin, margin);
        let x0 = bbox.x0.floor().max(0.0);
        let y0 = bbox.y0.floor().max(0.0);
        let x1 = bbox.x1.ceil().min(f64::from(out_w));
        let y1 = bbox.y1.ceil().min(f64::from(out_h));
        if x1 <= x0 || y1 <= y0 {
            return Ok(());
        }
        let (bw, bh) = (x1 - x0, y1 - y0);
        let (bw16, bh16) = (to_u16(bw)?, to_u16(bh)?);
        let to_layer = Affine::translate(Vec2::new(-x0, -y0)) * xf;

        let shadow = self.fill_layout(
            &layout,
            Affine::translate(Vec2::new(0.0, shadow_dy)) * to_layer,
            bw16,
            bh16,
            Some([0, 0, 0, SHADOW_ALPHA]),
        );
        let mut layer = blur_css_px(&shadow, u32::from(bw16), u32::from(bh16), shadow_blur)?;
        let glyphs = self.fill_layout(&layout, to_layer, bw16, bh16, None);
        premul_over_in_place_opacity(&mut layer, &glyphs, 1.0)?;
        if filter_blur > 0.0 {
            layer = blur_filter_px(&layer, u32::from(bw16), u32::from(bh16), filter_blur)?;
        }

        blit_over(
            dst,
            out_w,
            &layer,
            (x0 as u32, y0 as u32),
            (u32::from(bw16), u32::from(bh16)),
            f.opacity,
        );
        Ok(())
    }

    fn layout(
        &mut self,
        fonts: &mut FontRegistry,
        family: &str,
        spec: &LineSpec<'_>,
        brush: TextBrush,
    ) -> parley::Layout<TextBrush> {
        let mut builder = self
            .layout_cx
            .ranged_builder(fonts.font_context(), spec.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(spec.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(spec.weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout: parley::Layout<TextBrush> = builder.build(spec.text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
        layout
    }

    fn fill_layout(
        &mut self,
        layout: &parley::Layout<TextBrush>,
        transform: Affine,
        w: u16,
        h: u16,
        paint: Option<[u8; 4]>,
    ) -> Vec<u8> {
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(affine_to_cpu(transform));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let [r, g, b, a] = paint.unwrap_or_else(|| {
                    let brush = run.style().brush;
                    [brush.r, brush.g, brush.b, brush.a]
                });
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
                let font = self.font_for(run.run().font());
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        pixmap.data_as_u8_slice().to_vec()
    }

    fn font_for(&mut self, font: &parley::FontData) -> vello_cpu::peniko::FontData {
        self.fonts
            .entry((font.data.id(), font.index))
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.data.data().to_vec()),
                    font.index,
                )
            })
            .clone()
    }
}

/// Headline and tagline appearance at `snap.instant_ms`; `None` when nothing is visible.
pub(crate) fn line_frames(snap: &SceneSnapshot) -> Option<(TextFrame, TextFrame)> {
    let overlay = snap.text.as_ref().filter(|t| !t.is_empty())?;
    let timing = TextTiming::new(snap.effective_duration_ms, overlay.speed);
    let (hp, tp) = timing.progress(snap.instant_ms);
    let curve = overlay.curve();
    let head = overlay.animation.frame(curve.apply(hp));
    let tag = overlay.animation.frame(curve.apply(tp));
    if head.opacity <= MIN_VISIBLE_OPACITY && tag.opacity <= MIN_VISIBLE_OPACITY {
        return None;
    }
    Some((head, tag))
}

fn line_specs(
    overlay: &TextOverlay,
    scale: f64,
    out_w: f64,
    out_h: f64,
    head: TextFrame,
    tag: TextFrame,
) -> Vec<LineSpec<'_>> {
    let padding = PADDING * scale;
    let has_head = !overlay.headline.is_empty();
    let has_tag = !overlay.tagline.is_empty();
    let head_h = if has_head {
        overlay.font_size * scale * HEADLINE_LEADING
    } else {
        0.0
    };
    let tag_h = if has_tag {
        overlay.tagline_font_size * scale * TAGLINE_LEADING
    } else {
        0.0
    };
    let gap = if has_head && has_tag { LINE_GAP * scale } else { 0.0 };
    let total = head_h + gap + tag_h;

    let top = match overlay.position.v_align() {
        VAlign::Top => padding * 1.5,
        VAlign::Center => (out_h - total) / 2.0,
        VAlign::Bottom => out_h - padding * 1.5 - total,
    };
    let h_align = overlay.position.h_align();
    let anchor = match h_align {
        HAlign::Left => padding,
        HAlign::Center => out_w / 2.0,
        HAlign::Right => out_w - padding,
    };

    let mut out = Vec::with_capacity(2);
    if has_head {
        out.push(LineSpec {
            text: &overlay.headline,
            size_px: (overlay.font_size * scale) as f32,
            weight: overlay.font_weight,
            color: overlay.color,
            frame: head,
            align: h_align,
            anchor_x: anchor,
            top_y: top,
        });
    }
    if has_tag {
        out.push(LineSpec {
            text: &overlay.tagline,
            size_px: (overlay.tagline_font_size * scale) as f32,
            weight: TAGLINE_WEIGHT,
            color: overlay.color.with_alpha_mul(TAGLINE_ALPHA),
            frame: tag,
            align: h_align,
            anchor_x: anchor,
            top_y: top + head_h + gap,
        });
    }
    out
}

/// CSS `brightness()`: linear RGB multiplier, alpha untouched.
fn brighten(c: Color, k: f64) -> Color {
    if (k - 1.0).abs() < f64::EPSILON {
        return c;
    }
    let k = k.max(0.0);
    Color::rgba(
        (c.r * k).min(1.0),
        (c.g * k).min(1.0),
        (c.b * k).min(1.0),
        c.a,
    )
}

fn blit_over(
    dst: &mut [u8],
    dst_w: u32,
    src: &[u8],
    (ox, oy): (u32, u32),
    (w, h): (u32, u32),
    opacity: f64,
) {
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as u16).min(255);
    if op == 0 {
        return;
    }
    for y in 0..h {
        for x in 0..w {
            let si = ((y * w + x) * 4) as usize;
            if src[si + 3] == 0 {
                continue;
            }
            let di = (((oy + y) * dst_w + ox + x) * 4) as usize;
            blend_px_over(
                &mut dst[di..di + 4],
                [src[si], src[si + 1], src[si + 2], src[si + 3]],
                op,
            );
        }
    }
}

fn to_u16(v: f64) -> LiikeResult<u16> {
    u16::try_from(v as u64).map_err(|_| LiikeError::validation("text layer exceeds u16 bounds"))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
