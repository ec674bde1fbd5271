use crate::foundation::error::{LiikeError, LiikeResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Absolute 0-based frame index of an export.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> LiikeResult<Self> {
        if den == 0 {
            return Err(LiikeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(LiikeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate, the common case for exports.
    pub fn whole(num: u32) -> LiikeResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in milliseconds.
    pub fn frame_duration_ms(self) -> f64 {
        1000.0 * f64::from(self.den) / f64::from(self.num)
    }

    /// Timeline instant (ms, rounded to nearest) at which frame `idx` is sampled.
    pub fn frame_to_ms(self, idx: FrameIndex) -> u64 {
        let num = u128::from(self.num);
        let scaled = u128::from(idx.0) * 1000 * u128::from(self.den);
        ((scaled + num / 2) / num) as u64
    }

    /// Frames needed to cover `duration_ms`, rounding up. Never less than one.
    pub fn frames_for_duration(self, duration_ms: u64) -> u64 {
        let num = u128::from(duration_ms) * u128::from(self.num);
        let den = 1000 * u128::from(self.den);
        (num.div_ceil(den) as u64).max(1)
    }
}

/// Canvas dimensions in CSS-like layout pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> LiikeResult<Self> {
        if width == 0 || height == 0 {
            return Err(LiikeError::validation("canvas width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Output dimensions after applying an integer quality multiplier.
    pub fn scaled(self, multiplier: u32) -> LiikeResult<(u32, u32)> {
        match (
            self.width.checked_mul(multiplier),
            self.height.checked_mul(multiplier),
        ) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(LiikeError::validation(format!(
                "{}x{} canvas at {multiplier}x overflows the output size",
                self.width, self.height
            ))),
        }
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
