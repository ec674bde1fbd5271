use crate::foundation::core::{Affine, Point, Rect};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::math::blend_px_over;
use crate::render::snapshot::SceneSnapshot;
use crate::timeline::media::VideoFrame;

/// Draw every video layer of `snap` directly onto the premultiplied `dst` surface, in paint order.
///
/// Each frame is fitted into its node box per the layer's object-fit, transformed by the node's
/// world transform and clipped to the node's effective corner radius.
pub fn composite_videos(
    dst: &mut [u8],
    out_w: u32,
    out_h: u32,
    snap: &SceneSnapshot,
) -> LiikeResult<()> {
    if dst.len() != (out_w as usize) * (out_h as usize) * 4 {
        return Err(LiikeError::validation("video composite target size mismatch"));
    }
    let sx = f64::from(out_w) / f64::from(snap.canvas.width.max(1));
    let sy = f64::from(out_h) / f64::from(snap.canvas.height.max(1));
    let to_device = Affine::scale_non_uniform(sx, sy);

    for layer in &snap.videos {
        let Some(node) = snap.nodes.get(layer.node) else {
            continue;
        };
        let Some(frame) = layer.frame.as_ref() else {
            continue;
        };
        let expected = (frame.width as usize) * (frame.height as usize) * 4;
        if frame.width == 0 || frame.height == 0 || frame.rgba.len() != expected {
            tracing::warn!(node = %node.name, "skipping malformed video frame");
            continue;
        }
        let opacity = node.world_opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 || node.width <= 0.0 || node.height <= 0.0 {
            continue;
        }
        draw_layer(
            dst,
            out_w,
            out_h,
            &VideoDraw {
                device: to_device * node.world,
                width: node.width,
                height: node.height,
                radius: node.clip_radius,
                opacity,
                fit: layer.object_fit,
                frame,
            },
        );
    }
    Ok(())
}

struct VideoDraw<'a> {
    device: Affine,
    width: f64,
    height: f64,
    radius: f64,
    opacity: f64,
    fit: crate::scene::model::ObjectFit,
    frame: &'a VideoFrame,
}

fn draw_layer(dst: &mut [u8], out_w: u32, out_h: u32, v: &VideoDraw<'_>) {
    let det = v.device.determinant();
    if det.abs() < 1e-12 {
        return;
    }
    let inv = v.device.inverse();
    // Device pixels per local unit, for anti-aliasing the clip edge.
    let px_per_unit = det.abs().sqrt();

    let node_rect = Rect::new(0.0, 0.0, v.width, v.height);
    let (src_crop, dst_rect) = v.fit.resolve(
        (f64::from(v.frame.width), f64::from(v.frame.height)),
        node_rect,
    );
    if dst_rect.width() <= 0.0 || dst_rect.height() <= 0.0 {
        return;
    }
    let radius = v.radius.max(0.0).min(v.width.min(v.height) / 2.0);

    let bbox = v.device.transform_rect_bbox(node_rect);
    let x0 = bbox.x0.floor().max(0.0) as u32;
    let y0 = bbox.y0.floor().max(0.0) as u32;
    let x1 = (bbox.x1.ceil().max(0.0) as u32).min(out_w);
    let y1 = (bbox.y1.ceil().max(0.0) as u32).min(out_h);

    let kx = src_crop.width() / dst_rect.width();
    let ky = src_crop.height() / dst_rect.height();

    for py in y0..y1 {
        for px in x0..x1 {
            let p = inv * Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            let d = rounded_rect_sdf(p, v.width, v.height, radius);
            let cov = (0.5 - d * px_per_unit).clamp(0.0, 1.0);
            if cov <= 0.0 || !contains(dst_rect, p) {
                continue;
            }
            let u = src_crop.x0 + (p.x - dst_rect.x0) * kx;
            let w = src_crop.y0 + (p.y - dst_rect.y0) * ky;
            let s = sample_bilinear_premul(v.frame, u, w);
            let c = ((cov * v.opacity * 255.0).round() as u16).min(255);
            let i = ((py as usize) * (out_w as usize) + px as usize) * 4;
            blend_px_over(&mut dst[i..i + 4], s, c);
        }
    }
}

fn contains(r: Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

/// Signed distance from `p` to a `w` x `h` box with corner radius `r` (negative inside).
fn rounded_rect_sdf(p: Point, w: f64, h: f64, r: f64) -> f64 {
    let (hx, hy) = (w / 2.0, h / 2.0);
    let qx = (p.x - hx).abs() - (hx - r);
    let qy = (p.y - hy).abs() - (hy - r);
    let outside = qx.max(0.0).hypot(qy.max(0.0));
    let inside = qx.max(qy).min(0.0);
    outside + inside - r
}

/// Bilinear sample of a straight-alpha frame at source-pixel coordinates, returned premultiplied.
fn sample_bilinear_premul(frame: &VideoFrame, u: f64, v: f64) -> [u8; 4] {
    let w = frame.width as i64;
    let h = frame.height as i64;
    let fx = u - 0.5;
    let fy = v - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let px = |x: i64, y: i64| -> [f64; 4] {
        let x = x.clamp(0, w - 1) as usize;
        let y = y.clamp(0, h - 1) as usize;
        let i = (y * frame.width as usize + x) * 4;
        let s = &frame.rgba[i..i + 4];
        let a = f64::from(s[3]) / 255.0;
        [
            f64::from(s[0]) * a,
            f64::from(s[1]) * a,
            f64::from(s[2]) * a,
            f64::from(s[3]),
        ]
    };
    let (xi, yi) = (x0 as i64, y0 as i64);
    let p00 = px(xi, yi);
    let p10 = px(xi + 1, yi);
    let p01 = px(xi, yi + 1);
    let p11 = px(xi + 1, yi + 1);
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * tx;
        let bottom = p01[c] + (p11[c] - p01[c]) * tx;
        out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/video.rs"]
mod tests;
