use std::io::BufWriter;
use std::path::Path;

use image::ImageEncoder as _;

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::export::job::ExportFormat;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::render::frame::FrameBuffer;

/// Write one frame as a lossless still image, converting to straight alpha first.
#[tracing::instrument(skip(frame), fields(w = frame.width, h = frame.height))]
pub fn write_still(frame: &FrameBuffer, format: ExportFormat, path: &Path) -> LiikeResult<()> {
    ensure_parent_dir(path)?;
    let rgba = frame.to_straight();
    let file = std::fs::File::create(path)
        .map_err(|e| LiikeError::io(format!("failed to create '{}': {e}", path.display())))?;
    let out = BufWriter::new(file);

    let res = match format {
        ExportFormat::Png => image::codecs::png::PngEncoder::new(out).write_image(
            &rgba,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        ),
        ExportFormat::Webp => image::codecs::webp::WebPEncoder::new_lossless(out).write_image(
            &rgba,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        ),
        other => {
            return Err(LiikeError::validation(format!(
                "'{other}' is not a still image format"
            )));
        }
    };
    res.map_err(|e| LiikeError::encode(format!("failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/still.rs"]
mod tests;
