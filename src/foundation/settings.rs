use std::path::Path;
use std::time::Duration;

use crate::foundation::error::{LiikeError, LiikeResult};

/// Tunable constants of the export pipeline.
///
/// Loaded from defaults, then an optional JSON file, then `LIIKE_*` environment overrides.
/// The drift thresholds are empirical.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// Scrub policy: reseek when position and target differ by more than this.
    pub scrub_threshold_ms: u64,
    /// Continuity policy: a step larger than this between syncs is treated as a scrub.
    pub jump_threshold_ms: u64,
    /// Continuity policy: hard resync when playback drifted further than this.
    pub resync_threshold_ms: u64,
    /// Upper bound on waiting for a seek to report completion.
    pub seek_timeout_ms: u64,
    /// Upper bound on waiting for a not-yet-ready element before seeking.
    pub ready_timeout_ms: u64,
    /// Exports shorter than this are written as a still image.
    pub min_video_duration_ms: u64,
    /// Raster images above this size are downscaled and re-encoded.
    pub image_size_threshold_bytes: u64,
    /// Long-edge bound for optimized images.
    pub max_image_dimension: u32,
    /// Lossy quality for optimized images (1..=100).
    pub jpeg_quality: u8,
    /// Progress is reported every N frames (and on the last frame).
    pub progress_every_frames: u64,
    /// The capture loop yields every N frames.
    pub yield_every_frames: u64,
    /// Bound on forceful encoder teardown.
    pub teardown_timeout_ms: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scrub_threshold_ms: 30,
            jump_threshold_ms: 200,
            resync_threshold_ms: 1500,
            seek_timeout_ms: 200,
            ready_timeout_ms: 300,
            min_video_duration_ms: 100,
            image_size_threshold_bytes: 500 * 1024,
            max_image_dimension: 2160,
            jpeg_quality: 92,
            progress_every_frames: 3,
            yield_every_frames: 10,
            teardown_timeout_ms: 2000,
        }
    }
}

impl ExportSettings {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> LiikeResult<Self> {
        let mut s = Self::default();
        s.apply_env_with(|k| std::env::var(k).ok())?;
        s.validate()?;
        Ok(s)
    }

    /// JSON file (missing keys take defaults) with environment overrides applied.
    pub fn from_path(path: impl AsRef<Path>) -> LiikeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LiikeError::io(format!("failed to read settings '{}': {e}", path.display()))
        })?;
        let mut s: Self = serde_json::from_str(&text)?;
        s.apply_env_with(|k| std::env::var(k).ok())?;
        s.validate()?;
        Ok(s)
    }

    /// Apply `LIIKE_<FIELD>` overrides read through `lookup`.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> LiikeResult<()> {
        fn set<T: std::str::FromStr>(
            slot: &mut T,
            key: &str,
            lookup: &impl Fn(&str) -> Option<String>,
        ) -> LiikeResult<()> {
            if let Some(raw) = lookup(key) {
                *slot = raw.trim().parse::<T>().map_err(|_| {
                    LiikeError::validation(format!("{key} has invalid value '{raw}'"))
                })?;
            }
            Ok(())
        }

        set(&mut self.scrub_threshold_ms, "LIIKE_SCRUB_THRESHOLD_MS", &lookup)?;
        set(&mut self.jump_threshold_ms, "LIIKE_JUMP_THRESHOLD_MS", &lookup)?;
        set(&mut self.resync_threshold_ms, "LIIKE_RESYNC_THRESHOLD_MS", &lookup)?;
        set(&mut self.seek_timeout_ms, "LIIKE_SEEK_TIMEOUT_MS", &lookup)?;
        set(&mut self.ready_timeout_ms, "LIIKE_READY_TIMEOUT_MS", &lookup)?;
        set(&mut self.min_video_duration_ms, "LIIKE_MIN_VIDEO_DURATION_MS", &lookup)?;
        set(
            &mut self.image_size_threshold_bytes,
            "LIIKE_IMAGE_SIZE_THRESHOLD_BYTES",
            &lookup,
        )?;
        set(&mut self.max_image_dimension, "LIIKE_MAX_IMAGE_DIMENSION", &lookup)?;
        set(&mut self.jpeg_quality, "LIIKE_JPEG_QUALITY", &lookup)?;
        set(&mut self.progress_every_frames, "LIIKE_PROGRESS_EVERY_FRAMES", &lookup)?;
        set(&mut self.yield_every_frames, "LIIKE_YIELD_EVERY_FRAMES", &lookup)?;
        set(&mut self.teardown_timeout_ms, "LIIKE_TEARDOWN_TIMEOUT_MS", &lookup)?;
        Ok(())
    }

    pub fn validate(&self) -> LiikeResult<()> {
        if self.jump_threshold_ms >= self.resync_threshold_ms {
            return Err(LiikeError::validation(
                "jump_threshold_ms must be smaller than resync_threshold_ms",
            ));
        }
        if self.max_image_dimension == 0 {
            return Err(LiikeError::validation("max_image_dimension must be > 0"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LiikeError::validation("jpeg_quality must be in 1..=100"));
        }
        if self.progress_every_frames == 0 || self.yield_every_frames == 0 {
            return Err(LiikeError::validation(
                "progress_every_frames and yield_every_frames must be > 0",
            ));
        }
        Ok(())
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/settings.rs"]
mod tests;
