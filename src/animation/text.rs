use crate::animation::ease::Ease;

/// Reveal effect applied to text-overlay lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAnimation {
    /// Static text, fully visible.
    #[default]
    None,
    Typewriter,
    WordFadeIn,
    LetterCascade,
    WordSlideUp,
    GlowReveal,
    BounceLetters,
    BlurIn,
    ScalePop,
    SplitReveal,
}

/// Playback speed preset shared by device and text animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl AnimationSpeed {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Slow => 0.5,
            Self::Normal => 1.0,
            Self::Fast => 2.0,
        }
    }
}

/// Paint adjustments for one text line at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextFrame {
    pub opacity: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    /// Blur radius in layout pixels.
    pub blur: f64,
    /// Brightness multiplier; 1.0 leaves the color unchanged.
    pub brightness: f64,
}

impl TextFrame {
    pub const STATIC: Self = Self {
        opacity: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        blur: 0.0,
        brightness: 1.0,
    };
}

impl TextAnimation {
    /// Curve used when the overlay does not configure one.
    pub fn default_curve(self) -> Ease {
        let bez = |x1, y1, x2, y2| Ease::CubicBezier { x1, y1, x2, y2 };
        match self {
            Self::None | Self::Typewriter => Ease::Linear,
            Self::WordFadeIn | Self::BlurIn => bez(0.33, 1.0, 0.68, 1.0),
            Self::LetterCascade | Self::BounceLetters | Self::ScalePop => {
                bez(0.34, 1.56, 0.64, 1.0)
            }
            Self::WordSlideUp => bez(0.22, 1.0, 0.36, 1.0),
            Self::GlowReveal | Self::SplitReveal => bez(0.65, 0.0, 0.35, 1.0),
        }
    }

    /// Line appearance at eased line progress `p` in `[0, 1]`.
    pub fn frame(self, p: f64) -> TextFrame {
        // Each line animates as a single unit that completes halfway through its window.
        let cp = (p * 2.0).clamp(0.0, 1.0);
        let rest = 1.0 - cp;
        let base = TextFrame {
            opacity: cp,
            ..TextFrame::STATIC
        };
        match self {
            Self::None => TextFrame::STATIC,
            Self::Typewriter => TextFrame {
                opacity: if cp > 0.0 { 1.0 } else { 0.0 },
                ..TextFrame::STATIC
            },
            Self::WordFadeIn => TextFrame {
                translate_y: rest * 10.0,
                ..base
            },
            Self::LetterCascade => TextFrame {
                translate_y: rest * -30.0,
                ..base
            },
            Self::WordSlideUp => TextFrame {
                translate_y: rest * 40.0,
                ..base
            },
            Self::GlowReveal => TextFrame {
                brightness: 1.0 + rest * 2.0,
                ..base
            },
            Self::BounceLetters => TextFrame {
                translate_y: if cp < 0.5 {
                    (1.0 - cp * 2.0) * -30.0
                } else {
                    (cp - 0.5) * 0.5 * 30.0
                },
                scale: 0.5 + cp * 0.5,
                ..base
            },
            Self::BlurIn => TextFrame {
                scale: 0.95 + cp * 0.05,
                blur: rest * 8.0,
                ..base
            },
            Self::ScalePop => TextFrame {
                scale: if cp < 0.5 {
                    0.3 + cp * 1.4
                } else {
                    1.0 + rest * 0.2
                },
                ..base
            },
            // Both lines enter from the left.
            Self::SplitReveal => TextFrame {
                translate_x: rest * -50.0,
                ..base
            },
        }
    }
}

/// Start/duration of the headline and tagline reveals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextTiming {
    pub headline_start_ms: f64,
    pub tagline_start_ms: f64,
    pub line_duration_ms: f64,
}

impl TextTiming {
    pub fn new(effective_duration_ms: u64, speed: AnimationSpeed) -> Self {
        let m = speed.multiplier();
        let eff = effective_duration_ms as f64;
        let start = 300.0 / m;
        Self {
            headline_start_ms: start,
            tagline_start_ms: start + eff * 0.15 / m,
            line_duration_ms: (eff * 0.3 / m).max(1.0),
        }
    }

    /// Linear `(headline, tagline)` progress in `[0, 1]` at `instant_ms`.
    pub fn progress(&self, instant_ms: u64) -> (f64, f64) {
        let t = instant_ms as f64;
        let p = |start: f64| ((t - start) / self.line_duration_ms).clamp(0.0, 1.0);
        (p(self.headline_start_ms), p(self.tagline_start_ms))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/text.rs"]
mod tests;
