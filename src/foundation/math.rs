use crate::foundation::error::{LiikeError, LiikeResult};

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Source-over of premultiplied `src` onto premultiplied `dst`, scaled by `opacity`.
pub(crate) fn premul_over_in_place_opacity(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
) -> LiikeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(LiikeError::validation(
            "premul_over_in_place_opacity expects equal-length rgba8 buffers",
        ));
    }
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if op == 0 {
        return Ok(());
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        blend_px_over(d, [s[0], s[1], s[2], s[3]], op);
    }
    Ok(())
}

/// Blend one premultiplied pixel over `d` with 8-bit coverage `cov`.
#[inline]
pub(crate) fn blend_px_over(d: &mut [u8], s: [u8; 4], cov: u16) {
    let sa = mul_div255_u8(u16::from(s[3]), cov);
    if sa == 0 {
        return;
    }
    let inv = 255u16 - u16::from(sa);
    d[3] = add_sat_u8(sa, mul_div255_u8(u16::from(d[3]), inv));
    for c in 0..3 {
        let sc = mul_div255_u8(u16::from(s[c]), cov);
        let dc = mul_div255_u8(u16::from(d[c]), inv);
        d[c] = add_sat_u8(sc, dc);
    }
}

pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> LiikeResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(LiikeError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(LiikeError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push rounding error into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

/// Separable gaussian blur of a premultiplied RGBA8 buffer.
///
/// `radius` of 0 returns the input unchanged.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> LiikeResult<Vec<u8>> {
    let expected = (width as usize) * (height as usize) * 4;
    if src.len() != expected {
        return Err(LiikeError::validation("blur input size mismatch"));
    }
    let k = gaussian_kernel_q16(radius, sigma)?;
    if k.len() == 1 {
        return Ok(src.to_vec());
    }
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    horizontal_blur_q16(src, &mut tmp, width, height, &k);
    vertical_blur_q16(&tmp, &mut out, width, height, &k);
    Ok(out)
}

/// Blur for a CSS shadow blur radius in pixels (sigma = radius / 2).
pub(crate) fn blur_css_px(src: &[u8], width: u32, height: u32, px: f64) -> LiikeResult<Vec<u8>> {
    blur_sigma(src, width, height, px / 2.0)
}

/// Blur for CSS `filter: blur(px)`, where the length is the standard deviation.
pub(crate) fn blur_filter_px(src: &[u8], width: u32, height: u32, px: f64) -> LiikeResult<Vec<u8>> {
    blur_sigma(src, width, height, px)
}

fn blur_sigma(src: &[u8], width: u32, height: u32, sigma: f64) -> LiikeResult<Vec<u8>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Ok(src.to_vec());
    }
    let sigma = sigma.max(0.1) as f32;
    let radius = (f64::from(sigma) * 3.0).ceil() as u32;
    blur_rgba8_premul(src, width, height, radius, sigma)
}

fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
