use std::io::Cursor;

use anyhow::Context as _;

use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::settings::ExportSettings;

/// Content type detected from leading bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
    Font,
    Unknown,
}

impl ContentType {
    pub fn sniff(bytes: &[u8]) -> Self {
        let starts = |m: &[u8]| bytes.starts_with(m);
        if starts(b"\x89PNG\r\n\x1a\n") {
            Self::Png
        } else if starts(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if starts(b"GIF87a") || starts(b"GIF89a") {
            Self::Gif
        } else if bytes.len() >= 12 && starts(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Self::Webp
        } else if starts(&[0x00, 0x01, 0x00, 0x00])
            || starts(b"OTTO")
            || starts(b"true")
            || starts(b"ttcf")
            || starts(b"wOFF")
            || starts(b"wOF2")
        {
            Self::Font
        } else if looks_like_svg(bytes) {
            Self::Svg
        } else {
            Self::Unknown
        }
    }

    pub fn is_raster(self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Gif | Self::Webp)
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Font => "font/ttf",
            Self::Unknown => "application/octet-stream",
        }
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let t = text.trim_start_matches('\u{feff}').trim_start();
    t.starts_with("<svg") || (t.starts_with("<?xml") && text.contains("<svg"))
}

/// Size bounds applied to large raster images before they are cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizePolicy {
    pub size_threshold_bytes: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for OptimizePolicy {
    fn default() -> Self {
        Self::from_settings(&ExportSettings::default())
    }
}

impl OptimizePolicy {
    pub fn from_settings(s: &ExportSettings) -> Self {
        Self {
            size_threshold_bytes: s.image_size_threshold_bytes,
            max_dimension: s.max_image_dimension,
            jpeg_quality: s.jpeg_quality,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub content_type: ContentType,
    pub width: u32,
    pub height: u32,
    /// Whether the bytes were re-encoded.
    pub optimized: bool,
}

/// Intrinsic pixel size of an encoded raster image without decoding it.
pub fn raster_dimensions(bytes: &[u8]) -> LiikeResult<(u32, u32)> {
    let dims = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("guess image format")?
        .into_dimensions()
        .context("read image dimensions")?;
    Ok(dims)
}

/// Apply `policy` to an encoded raster image.
///
/// Images at or below the size threshold pass through untouched. Larger ones are downscaled so
/// the long edge fits `max_dimension`, then re-encoded as JPEG when fully opaque or PNG when
/// they carry transparency.
pub fn optimize_image(bytes: Vec<u8>, policy: OptimizePolicy) -> LiikeResult<OptimizedImage> {
    let content_type = ContentType::sniff(&bytes);
    if !content_type.is_raster() {
        return Err(LiikeError::validation(format!(
            "not a raster image ({})",
            content_type.mime()
        )));
    }
    let (width, height) = raster_dimensions(&bytes)?;
    if bytes.len() as u64 <= policy.size_threshold_bytes {
        return Ok(OptimizedImage {
            bytes,
            content_type,
            width,
            height,
            optimized: false,
        });
    }

    let mut img = image::load_from_memory(&bytes).context("decode image for optimization")?;
    let max = policy.max_dimension.max(1);
    if width.max(height) > max {
        img = img.resize(max, max, image::imageops::FilterType::Lanczos3);
    }

    let rgba = img.to_rgba8();
    let opaque = rgba.pixels().all(|p| p.0[3] == 255);
    let (w, h) = rgba.dimensions();
    let mut out = Vec::new();
    let content_type = if opaque {
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
        let enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut out,
            policy.jpeg_quality.clamp(1, 100),
        );
        rgb.write_with_encoder(enc).context("encode optimized jpeg")?;
        ContentType::Jpeg
    } else {
        rgba.write_with_encoder(image::codecs::png::PngEncoder::new(&mut out))
            .context("encode optimized png")?;
        ContentType::Png
    };

    tracing::debug!(
        from_bytes = bytes.len(),
        to_bytes = out.len(),
        width = w,
        height = h,
        "optimized large image"
    );
    Ok(OptimizedImage {
        bytes: out,
        content_type,
        width: w,
        height: h,
        optimized: true,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/optimize.rs"]
mod tests;
