use crate::foundation::error::{LiikeError, LiikeResult};

/// Easing functions used to map normalized animation progress.
///
/// Serialized as CSS-style strings: `linear`, `ease-out`, `in-out-cubic`,
/// `cubic-bezier(0.33, 1, 0.68, 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ease {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`. `y` may leave `[0, 1]` for overshoot curves.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Ease {
    pub const CSS_EASE: Self = Self::CubicBezier {
        x1: 0.25,
        y1: 0.1,
        x2: 0.25,
        y2: 1.0,
    };

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::CubicBezier { x1, y1, x2, y2 } => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let s = solve_bezier_x(t, x1, x2);
                bezier_axis(s, y1, y2)
            }
        }
    }

    /// Parse a CSS timing function or one of the named curves.
    pub fn parse(s: &str) -> LiikeResult<Self> {
        let s = s.trim();
        let named = match s {
            "linear" => Some(Self::Linear),
            "ease" => Some(Self::CSS_EASE),
            "ease-in" => Some(Self::CubicBezier {
                x1: 0.42,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
            }),
            "ease-out" => Some(Self::CubicBezier {
                x1: 0.0,
                y1: 0.0,
                x2: 0.58,
                y2: 1.0,
            }),
            "ease-in-out" => Some(Self::CubicBezier {
                x1: 0.42,
                y1: 0.0,
                x2: 0.58,
                y2: 1.0,
            }),
            "in-quad" => Some(Self::InQuad),
            "out-quad" => Some(Self::OutQuad),
            "in-out-quad" => Some(Self::InOutQuad),
            "in-cubic" => Some(Self::InCubic),
            "out-cubic" => Some(Self::OutCubic),
            "in-out-cubic" => Some(Self::InOutCubic),
            _ => None,
        };
        if let Some(e) = named {
            return Ok(e);
        }

        let args = s
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| LiikeError::validation(format!("unknown easing '{s}'")))?;
        let nums = args
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| LiikeError::validation(format!("invalid cubic-bezier '{s}'")))?;
        let [x1, y1, x2, y2] = nums[..] else {
            return Err(LiikeError::validation(format!(
                "cubic-bezier takes 4 numbers, got '{s}'"
            )));
        };
        if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
            return Err(LiikeError::validation(
                "cubic-bezier x control points must lie in [0, 1]",
            ));
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }
}

impl TryFrom<String> for Ease {
    type Error = LiikeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ease> for String {
    fn from(e: Ease) -> Self {
        match e {
            Ease::Linear => "linear".to_owned(),
            Ease::InQuad => "in-quad".to_owned(),
            Ease::OutQuad => "out-quad".to_owned(),
            Ease::InOutQuad => "in-out-quad".to_owned(),
            Ease::InCubic => "in-cubic".to_owned(),
            Ease::OutCubic => "out-cubic".to_owned(),
            Ease::InOutCubic => "in-out-cubic".to_owned(),
            Ease::CubicBezier { x1, y1, x2, y2 } => format!("cubic-bezier({x1}, {y1}, {x2}, {y2})"),
        }
    }
}

// One axis of a cubic bezier with endpoints fixed at 0 and 1.
fn bezier_axis(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_axis_deriv(s: f64, p1: f64, p2: f64) -> f64 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

fn solve_bezier_x(x: f64, x1: f64, x2: f64) -> f64 {
    const EPS: f64 = 1e-7;

    let mut s = x;
    for _ in 0..8 {
        let err = bezier_axis(s, x1, x2) - x;
        if err.abs() < EPS {
            return s;
        }
        let d = bezier_axis_deriv(s, x1, x2);
        if d.abs() < 1e-6 {
            break;
        }
        s -= err / d;
    }

    // x(s) is monotonic for x control points in [0, 1].
    let (mut lo, mut hi) = (0.0, 1.0);
    s = x;
    for _ in 0..64 {
        let v = bezier_axis(s, x1, x2);
        if (v - x).abs() < EPS {
            break;
        }
        if v < x {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    s
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
