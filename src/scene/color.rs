use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba8Premul;

/// Straight-alpha color with normalized channels.
///
/// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA`, CSS `rgb()`/`rgba()`, `{r,g,b,a}` objects
/// and `[r,g,b(,a)]` arrays (channels in `0..=1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        )
    }

    pub fn with_alpha_mul(self, m: f64) -> Self {
        Self {
            a: (self.a * m).clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    pub fn to_rgba8_premul(self) -> Rgba8Premul {
        let [r, g, b, a] = self.to_rgba8();
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }

    /// `#rrggbb` plus separate opacity, the form SVG paint attributes expect.
    pub fn to_svg_paint(self) -> (String, f64) {
        let [r, g, b, _] = self.to_rgba8();
        (
            format!("#{r:02x}{g:02x}{b:02x}"),
            self.a.clamp(0.0, 1.0),
        )
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_css_rgb(args);
        }
        match s {
            "transparent" => Ok(Self::TRANSPARENT),
            "black" => Ok(Self::BLACK),
            "white" => Ok(Self::WHITE),
            _ => parse_hex(s),
        }
    }
}

fn to_u8(x: f64) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn parse_hex(s: &str) -> Result<Color, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    let (r, g, b, a) = match s.len() {
        3 => {
            let nib = |i: usize| hex_byte(&s[i..i + 1].repeat(2));
            (nib(0)?, nib(1)?, nib(2)?, 255)
        }
        6 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ),
        8 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ),
        _ => return Err("hex color must be #RGB, #RRGGBB or #RRGGBBAA".to_owned()),
    };
    Ok(Color::from_rgba8(r, g, b, a))
}

fn parse_css_rgb(args: &str) -> Result<Color, String> {
    let parts: Vec<f64> = args
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid rgb() arguments \"{args}\""))?;
    match parts[..] {
        [r, g, b] => Ok(Color::rgba(r / 255.0, g / 255.0, b / 255.0, 1.0)),
        [r, g, b, a] => Ok(Color::rgba(r / 255.0, g / 255.0, b / 255.0, a)),
        _ => Err("rgb()/rgba() takes 3 or 4 components".to_owned()),
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let [r, g, b, a] = self.to_rgba8();
        serializer.serialize_str(&format!("#{r:02x}{g:02x}{b:02x}{a:02x}"))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Css(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Css(s) => Color::parse(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Color::rgba(r, g, b, a)),
            Repr::Arr(v) => match v[..] {
                [r, g, b] => Ok(Color::rgba(r, g, b, 1.0)),
                [r, g, b, a] => Ok(Color::rgba(r, g, b, a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/color.rs"]
mod tests;
