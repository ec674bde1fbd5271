use std::fmt::Write as _;
use std::sync::Arc;

use crate::assets::cache::ResourceCache;
use crate::assets::optimize::ContentType;
use crate::foundation::core::Affine;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::render::snapshot::{SceneSnapshot, SnapshotNode};
use crate::scene::color::Color;
use crate::scene::model::{Fill, GradientStop, ObjectFit, Shadow};

/// Serialize the vector part of `snap` into an SVG document of `out_w` x `out_h` pixels.
///
/// Video nodes become transparent placeholders; their pixels are composited afterwards.
/// Image references stay as their source URI and are resolved against the resource cache at
/// rasterization time.
pub fn serialize_snapshot(snap: &SceneSnapshot, out_w: u32, out_h: u32) -> String {
    let sx = f64::from(out_w) / f64::from(snap.canvas.width.max(1));
    let sy = f64::from(out_h) / f64::from(snap.canvas.height.max(1));

    let mut w = SvgWriter::default();
    let roots: Vec<usize> = (0..snap.nodes.len())
        .filter(|i| snap.nodes[*i].parent.is_none())
        .collect();
    for i in roots {
        w.node(snap, i);
    }

    let mut out = String::with_capacity(w.body.len() + w.defs.len() + 256);
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{out_w}" height="{out_h}" viewBox="0 0 {out_w} {out_h}">"#
    );
    if !w.defs.is_empty() {
        let _ = write!(out, "<defs>{}</defs>", w.defs);
    }
    let _ = write!(out, r#"<g transform="scale({} {})">{}</g></svg>"#, num(sx), num(sy), w.body);
    out
}

#[derive(Default)]
struct SvgWriter {
    defs: String,
    body: String,
    next_id: u32,
}

impl SvgWriter {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn node(&mut self, snap: &SceneSnapshot, idx: usize) {
        let n = &snap.nodes[idx];
        let _ = write!(self.body, r#"<g transform="{}""#, matrix(n.local));
        if n.opacity < 1.0 {
            let _ = write!(self.body, r#" opacity="{}""#, num(n.opacity));
        }
        if n.blur > 0.0 {
            let fid = self.id("blur");
            let _ = write!(
                self.defs,
                r#"<filter id="{fid}" x="-50%" y="-50%" width="200%" height="200%"><feGaussianBlur stdDeviation="{}"/></filter>"#,
                num(n.blur)
            );
            let _ = write!(self.body, r#" filter="url(#{fid})""#);
        }
        self.body.push('>');

        self.shape(n);
        self.media(n);

        let children: Vec<usize> = snap.children(idx).collect();
        if !children.is_empty() {
            let clip = n.paint.clip.then(|| self.rounded_clip(n.width, n.height, n.paint.corner_radius));
            match &clip {
                Some(cid) => {
                    let _ = write!(self.body, r#"<g clip-path="url(#{cid})">"#);
                }
                None => self.body.push_str("<g>"),
            }
            for c in children {
                self.node(snap, c);
            }
            self.body.push_str("</g>");
        }
        self.body.push_str("</g>");
    }

    fn shape(&mut self, n: &SnapshotNode) {
        let fill_attr = match n.paint.fill.as_ref() {
            Some(Fill::Solid { color }) => Some(paint_attr("fill", *color)),
            Some(Fill::LinearGradient { angle_deg, stops }) => {
                let gid = self.linear_gradient(*angle_deg, stops);
                Some(format!(r#"fill="url(#{gid})""#))
            }
            Some(Fill::Image { uri, fit }) => {
                let clip = self.rounded_clip(n.width, n.height, n.paint.corner_radius);
                self.image(uri, n.width, n.height, *fit, &clip);
                None
            }
            None => None,
        };
        let stroke_attr = n.paint.stroke.as_ref().map(|s| {
            format!(
                r#"{} stroke-width="{}""#,
                paint_attr("stroke", s.color),
                num(s.width)
            )
        });
        if fill_attr.is_none() && stroke_attr.is_none() {
            return;
        }

        let filter = n
            .paint
            .shadow
            .as_ref()
            .filter(|_| fill_attr.is_some())
            .map(|s| self.drop_shadow(s));
        let r = n.paint.corner_radius.max(0.0);
        let _ = write!(
            self.body,
            r#"<rect width="{}" height="{}" rx="{}" ry="{}" {} {}"#,
            num(n.width),
            num(n.height),
            num(r),
            num(r),
            fill_attr.unwrap_or_else(|| r#"fill="none""#.to_string()),
            stroke_attr.unwrap_or_default(),
        );
        if let Some(fid) = filter {
            let _ = write!(self.body, r#" filter="url(#{fid})""#);
        }
        self.body.push_str("/>");
    }

    fn media(&mut self, n: &SnapshotNode) {
        let Some(m) = n.media.as_ref() else {
            return;
        };
        if n.is_video() {
            let _ = write!(
                self.body,
                r#"<rect class="video-placeholder" width="{}" height="{}" fill="none"/>"#,
                num(n.width),
                num(n.height)
            );
            return;
        }
        let clip = self.rounded_clip(n.width, n.height, n.clip_radius);
        self.image(&m.uri, n.width, n.height, m.object_fit, &clip);
    }

    fn image(&mut self, uri: &str, w: f64, h: f64, fit: ObjectFit, clip_id: &str) {
        let par = match fit {
            ObjectFit::Cover => "xMidYMid slice",
            ObjectFit::Contain => "xMidYMid meet",
            ObjectFit::Fill => "none",
        };
        let _ = write!(
            self.body,
            r#"<g clip-path="url(#{clip_id})"><image width="{}" height="{}" preserveAspectRatio="{par}" xlink:href="{}"/></g>"#,
            num(w),
            num(h),
            escape_attr(uri)
        );
    }

    fn rounded_clip(&mut self, w: f64, h: f64, radius: f64) -> String {
        let cid = self.id("clip");
        let r = radius.max(0.0).min(w.min(h) / 2.0);
        let _ = write!(
            self.defs,
            r#"<clipPath id="{cid}"><rect width="{}" height="{}" rx="{}" ry="{}"/></clipPath>"#,
            num(w),
            num(h),
            num(r),
            num(r)
        );
        cid
    }

    fn linear_gradient(&mut self, angle_deg: f64, stops: &[GradientStop]) -> String {
        let gid = self.id("grad");
        // CSS angles: 0deg points up, 90deg points right.
        let a = angle_deg.to_radians();
        let (dx, dy) = (a.sin() / 2.0, -a.cos() / 2.0);
        let _ = write!(
            self.defs,
            r#"<linearGradient id="{gid}" x1="{}" y1="{}" x2="{}" y2="{}">"#,
            num(0.5 - dx),
            num(0.5 - dy),
            num(0.5 + dx),
            num(0.5 + dy)
        );
        for s in stops {
            let (hex, op) = s.color.to_svg_paint();
            let _ = write!(
                self.defs,
                r#"<stop offset="{}" stop-color="{hex}" stop-opacity="{}"/>"#,
                num(s.offset.clamp(0.0, 1.0)),
                num(op)
            );
        }
        self.defs.push_str("</linearGradient>");
        gid
    }

    fn drop_shadow(&mut self, s: &Shadow) -> String {
        let fid = self.id("shadow");
        let (hex, op) = s.color.to_svg_paint();
        let _ = write!(
            self.defs,
            r#"<filter id="{fid}" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="{}" dy="{}" stdDeviation="{}" flood-color="{hex}" flood-opacity="{}"/></filter>"#,
            num(s.offset_x),
            num(s.offset_y),
            num(s.blur.max(0.0) / 2.0),
            num(op)
        );
        fid
    }
}

fn paint_attr(name: &str, c: Color) -> String {
    let (hex, op) = c.to_svg_paint();
    if op >= 1.0 {
        format!(r#"{name}="{hex}""#)
    } else {
        format!(r#"{name}="{hex}" {name}-opacity="{}""#, num(op))
    }
}

fn matrix(a: Affine) -> String {
    let [m0, m1, m2, m3, m4, m5] = a.as_coeffs();
    format!(
        "matrix({} {} {} {} {} {})",
        num(m0),
        num(m1),
        num(m2),
        num(m3),
        num(m4),
        num(m5)
    )
}

fn num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let r = (v * 10_000.0).round() / 10_000.0;
    if r == 0.0 { "0".to_string() } else { r.to_string() }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rasterize serialized snapshot markup into premultiplied RGBA8.
///
/// Image references are served from `cache` only; a reference that is not materialized renders
/// as nothing.
pub fn rasterize_svg(
    svg: &str,
    width: u32,
    height: u32,
    fontdb: Arc<usvg::fontdb::Database>,
    cache: &ResourceCache,
) -> LiikeResult<Vec<u8>> {
    let resolve_string: usvg::ImageHrefStringResolverFn<'_> =
        Box::new(move |href: &str, opts: &usvg::Options| {
            let asset = cache.peek(href)?;
            let data = asset.bytes.clone();
            match asset.content_type {
                ContentType::Png => Some(usvg::ImageKind::PNG(data)),
                ContentType::Jpeg => Some(usvg::ImageKind::JPEG(data)),
                ContentType::Gif => Some(usvg::ImageKind::GIF(data)),
                ContentType::Webp => Some(usvg::ImageKind::WEBP(data)),
                ContentType::Svg => usvg::Tree::from_data(&data, opts)
                    .ok()
                    .map(usvg::ImageKind::SVG),
                ContentType::Font | ContentType::Unknown => None,
            }
        });
    let opts = usvg::Options {
        fontdb,
        image_href_resolver: usvg::ImageHrefResolver {
            resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
            resolve_string,
        },
        ..usvg::Options::default()
    };

    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| LiikeError::validation(format!("snapshot svg parse failed: {e}")))?;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| LiikeError::validation("failed to allocate frame pixmap"))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap.take())
}

#[cfg(test)]
#[path = "../../tests/unit/render/svg.rs"]
mod tests;
