use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::settings::ExportSettings;
use crate::scene::composition::Scene;

pub const DEFAULT_BASE_NAME: &str = "liike_export";
pub const DEFAULT_FPS: u32 = 30;

/// Output container / image format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Webm,
    Mov,
    Gif,
    Png,
    Webp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Written directly from one raster, without an encode session.
    pub fn is_still(self) -> bool {
        matches!(self, Self::Png | Self::Webp)
    }

    pub fn supports_audio(self) -> bool {
        matches!(self, Self::Mp4 | Self::Webm | Self::Mov)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "mov" => Ok(Self::Mov),
            "gif" => Ok(Self::Gif),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(format!(
                "unknown export format '{other}' (expected mp4, webm, mov, gif, png or webp)"
            )),
        }
    }
}

/// Integer resolution multiplier applied to the canvas before encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    Standard,
    High,
}

impl QualityPreset {
    pub fn multiplier(self) -> u32 {
        match self {
            Self::Standard => 1,
            Self::High => 2,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "1x" => Ok(Self::Standard),
            "high" | "2x" => Ok(Self::High),
            other => Err(format!(
                "unknown quality '{other}' (expected standard or high)"
            )),
        }
    }
}

/// What the caller asks for; turned into an [`ExportJob`] against a concrete scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub fps: u32,
    pub quality: QualityPreset,
    /// Defaults to [`default_output_dir`].
    pub out_dir: Option<PathBuf>,
    /// Defaults to [`DEFAULT_BASE_NAME`].
    pub base_name: Option<String>,
    /// Prefer a hardware video encoder when the platform has one.
    pub hardware_accel: bool,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            fps: DEFAULT_FPS,
            quality: QualityPreset::default(),
            out_dir: None,
            base_name: None,
            hardware_accel: true,
        }
    }
}

/// Immutable parameters of one export run.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    /// Format actually written; short video jobs are demoted to `png`.
    pub format: ExportFormat,
    /// Output size after the quality multiplier.
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub total_frames: u64,
    pub effective_duration_ms: u64,
    pub quality: QualityPreset,
    pub output_path: PathBuf,
    pub audio: Option<PathBuf>,
    pub hardware_accel: bool,
    /// Straight RGBA used to flatten transparency for opaque codecs.
    pub background: [u8; 4],
}

impl ExportJob {
    pub fn is_still(&self) -> bool {
        self.format.is_still()
    }

    /// Clock instant of frame `index`.
    pub fn frame_time_ms(&self, index: u64) -> u64 {
        self.fps.frame_to_ms(FrameIndex(index))
    }
}

impl ExportRequest {
    /// Resolve the request against `scene`, applying the video-priority duration rule and the
    /// still-image fallback.
    pub fn plan(
        &self,
        scene: &Scene,
        settings: &ExportSettings,
        now: DateTime<Utc>,
    ) -> LiikeResult<ExportJob> {
        let fps = Fps::new(self.fps, 1)?;
        let effective = scene.effective_duration_ms();
        let format = if self.format.is_still() {
            self.format
        } else if effective < settings.min_video_duration_ms {
            tracing::info!(
                effective_ms = effective,
                requested = %self.format,
                "duration below video minimum, exporting a still image"
            );
            ExportFormat::Png
        } else {
            self.format
        };

        let (width, height) = scene.canvas.scaled(self.quality.multiplier())?;
        if width == 0 || height == 0 {
            return Err(LiikeError::validation("output size must be non-zero"));
        }
        let total_frames = if format.is_still() {
            1
        } else {
            fps.frames_for_duration(effective)
        };

        let dir = self.out_dir.clone().unwrap_or_else(default_output_dir);
        let base = self
            .base_name
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BASE_NAME);
        let output_path = dir.join(output_file_name(base, now, width, height, format));

        let audio = scene
            .timeline
            .audio_source()
            .filter(|_| format.supports_audio())
            .map(PathBuf::from);

        Ok(ExportJob {
            format,
            width,
            height,
            fps,
            total_frames,
            effective_duration_ms: effective,
            quality: self.quality,
            output_path,
            audio,
            hardware_accel: self.hardware_accel,
            background: scene.background_color().to_rgba8(),
        })
    }
}

/// `{base}_{YYYY-MM-DDTHH-MM-SS}_{W}x{H}.{ext}`
pub fn output_file_name(
    base: &str,
    now: DateTime<Utc>,
    width: u32,
    height: u32,
    format: ExportFormat,
) -> String {
    let stamp = now.format("%Y-%m-%dT%H-%M-%S");
    let base: String = base
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{base}_{stamp}_{width}x{height}.{}", format.extension())
}

/// `<home>/Downloads/Liike`, or `./Liike` when no home directory is known.
pub fn default_output_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    match home {
        Some(h) => h.join("Downloads").join("Liike"),
        None => Path::new(".").join("Liike"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/job.rs"]
mod tests;
