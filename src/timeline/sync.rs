use crate::foundation::cancel::CancelToken;
use crate::foundation::error::LiikeResult;
use crate::foundation::settings::ExportSettings;
use crate::scene::composition::Scene;
use crate::timeline::media::{SeekThresholds, SyncMode, SyncOutcome};

/// What one [`TimelineSynchronizer::seek_to`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub instant_ms: u64,
    pub handles_committed: usize,
    pub handles_failed: usize,
    pub media_seeked: usize,
    pub media_advanced: usize,
    pub media_timed_out: usize,
    pub media_stale: usize,
}

/// Slaves every time-driven primitive of a scene to one instant.
#[derive(Clone, Debug, Default)]
pub struct TimelineSynchronizer {
    settings: ExportSettings,
}

impl TimelineSynchronizer {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn thresholds(&self) -> SeekThresholds {
        SeekThresholds {
            scrub_ms: self.settings.scrub_threshold_ms,
            jump_ms: self.settings.jump_threshold_ms,
            resync_ms: self.settings.resync_threshold_ms,
        }
    }

    /// Bring `scene` to `instant_ms`.
    ///
    /// Order: clock and clip visibility, animation handles, video elements, style recompute.
    /// The cancel token is polled around every blocking media seek.
    #[tracing::instrument(level = "debug", skip(self, scene, cancel))]
    pub fn seek_to(
        &self,
        scene: &mut Scene,
        instant_ms: u64,
        mode: SyncMode,
        cancel: &CancelToken,
    ) -> LiikeResult<SyncReport> {
        let mut report = SyncReport {
            instant_ms,
            ..SyncReport::default()
        };

        scene.timeline.set_instant(instant_ms);
        scene.timeline.apply_visibility(&mut scene.tree);

        for handle in &mut scene.animations {
            if let Err(e) = handle.pause() {
                tracing::warn!(node = handle.node.0, "pause failed, committing anyway: {e}");
            }
            handle.seek(instant_ms);
            match handle.commit(&mut scene.tree) {
                Ok(()) => report.handles_committed += 1,
                Err(e) => {
                    report.handles_failed += 1;
                    tracing::warn!(node = handle.node.0, code = e.code(), "commit failed: {e}");
                }
            }
        }

        let th = self.thresholds();
        for el in &mut scene.media {
            cancel.check()?;
            let outcome = el.sync_to(
                instant_ms,
                mode,
                th,
                self.settings.seek_timeout(),
                self.settings.ready_timeout(),
            )?;
            cancel.check()?;
            match outcome {
                SyncOutcome::Seeked => report.media_seeked += 1,
                SyncOutcome::Advanced => report.media_advanced += 1,
                SyncOutcome::TimedOut => report.media_timed_out += 1,
                SyncOutcome::Stale => report.media_stale += 1,
                SyncOutcome::Held => {}
            }
        }

        scene.tree.recompute_styles();
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/sync.rs"]
mod tests;
