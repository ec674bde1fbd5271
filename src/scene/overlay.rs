use crate::animation::ease::Ease;
use crate::animation::text::{AnimationSpeed, TextAnimation};
use crate::scene::color::Color;

/// One of the nine overlay anchor positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextPosition {
    TopLeft,
    #[default]
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

impl TextPosition {
    pub fn h_align(self) -> HAlign {
        match self {
            Self::TopLeft | Self::CenterLeft | Self::BottomLeft => HAlign::Left,
            Self::TopCenter | Self::Center | Self::BottomCenter => HAlign::Center,
            Self::TopRight | Self::CenterRight | Self::BottomRight => HAlign::Right,
        }
    }

    pub fn v_align(self) -> VAlign {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => VAlign::Top,
            Self::CenterLeft | Self::Center | Self::CenterRight => VAlign::Center,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => VAlign::Bottom,
        }
    }
}

fn default_family() -> String {
    "Manrope".to_string()
}

fn default_headline_size() -> f64 {
    64.0
}

fn default_tagline_size() -> f64 {
    24.0
}

fn default_weight() -> u16 {
    700
}

fn default_color() -> Color {
    Color::WHITE
}

/// Headline/tagline text drawn over the scene.
///
/// Sizes are layout pixels; the rasterizer scales them to the output resolution.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextOverlay {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default = "default_family")]
    pub font_family: String,
    #[serde(default = "default_headline_size")]
    pub font_size: f64,
    #[serde(default = "default_tagline_size")]
    pub tagline_font_size: f64,
    #[serde(default = "default_weight")]
    pub font_weight: u16,
    #[serde(default = "default_color")]
    pub color: Color,
    #[serde(default)]
    pub position: TextPosition,
    #[serde(default)]
    pub animation: TextAnimation,
    /// Overrides the preset's own curve.
    #[serde(default)]
    pub curve: Option<Ease>,
    #[serde(default)]
    pub speed: AnimationSpeed,
}

impl TextOverlay {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            tagline: String::new(),
            font_family: default_family(),
            font_size: default_headline_size(),
            tagline_font_size: default_tagline_size(),
            font_weight: default_weight(),
            color: default_color(),
            position: TextPosition::default(),
            animation: TextAnimation::default(),
            curve: None,
            speed: AnimationSpeed::default(),
        }
    }

    pub fn curve(&self) -> Ease {
        self.curve.unwrap_or_else(|| self.animation.default_curve())
    }

    pub fn is_empty(&self) -> bool {
        self.headline.is_empty() && self.tagline.is_empty()
    }
}
