use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use chrono::Utc;

use crate::assets::cache::ResourceCache;
use crate::assets::fetch::FsFetcher;
use crate::assets::fonts::FontRegistry;
use crate::assets::optimize::OptimizePolicy;
use crate::encode::client::StreamingEncodeClient;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{EncodeParams, EncodeSink};
use crate::encode::still::write_still;
use crate::export::job::{ExportJob, ExportRequest};
use crate::export::output::OutputGuard;
use crate::export::progress::{ExportEvent, ExportObserver, ExportProgress, ExportState, NoopObserver};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::foundation::settings::ExportSettings;
use crate::render::rasterizer::FrameRasterizer;
use crate::scene::composition::Scene;
use crate::timeline::media::SyncMode;
use crate::timeline::sync::TimelineSynchronizer;

static EXPORT_LOCK: Mutex<()> = Mutex::new(());

/// Creates the encoder sink for a video job.
pub trait EncoderFactory: Send + Sync {
    fn create(&self, params: &EncodeParams) -> LiikeResult<Box<dyn EncodeSink>>;
}

impl<F> EncoderFactory for F
where
    F: Fn(&EncodeParams) -> LiikeResult<Box<dyn EncodeSink>> + Send + Sync,
{
    fn create(&self, params: &EncodeParams) -> LiikeResult<Box<dyn EncodeSink>> {
        self(params)
    }
}

/// Spawns one `ffmpeg` process per job.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoderFactory {
    pub opts: FfmpegSinkOpts,
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn create(&self, _params: &EncodeParams) -> LiikeResult<Box<dyn EncodeSink>> {
        Ok(Box::new(FfmpegSink::new(self.opts.clone())))
    }
}

/// Drives one export from priming through the frame loop to a committed output file.
pub struct ExportOrchestrator {
    settings: ExportSettings,
    rasterizer: FrameRasterizer,
    encoders: Box<dyn EncoderFactory>,
    observer: Box<dyn ExportObserver>,
    state: ExportState,
}

impl std::fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("settings", &self.settings)
            .field("rasterizer", &self.rasterizer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ExportOrchestrator {
    /// Filesystem-backed cache, system fonts and the ffmpeg encoder.
    pub fn new(settings: ExportSettings) -> Self {
        let cache = Arc::new(ResourceCache::new(
            Arc::new(FsFetcher),
            OptimizePolicy::from_settings(&settings),
        ));
        let encoders = FfmpegEncoderFactory {
            opts: FfmpegSinkOpts {
                teardown_timeout: settings.teardown_timeout(),
                ..FfmpegSinkOpts::default()
            },
        };
        Self::with_parts(settings, FrameRasterizer::new(cache, FontRegistry::new()), encoders)
    }

    pub fn with_parts(
        settings: ExportSettings,
        rasterizer: FrameRasterizer,
        encoders: impl EncoderFactory + 'static,
    ) -> Self {
        Self {
            settings,
            rasterizer,
            encoders: Box::new(encoders),
            observer: Box::new(NoopObserver),
            state: ExportState::Idle,
        }
    }

    pub fn with_observer(mut self, observer: impl ExportObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn rasterizer_mut(&mut self) -> &mut FrameRasterizer {
        &mut self.rasterizer
    }

    /// Plan `request` against `scene` at the current time and run it.
    pub fn export(
        &mut self,
        request: &ExportRequest,
        scene: &mut Scene,
        cancel: &CancelToken,
    ) -> LiikeResult<PathBuf> {
        let job = request.plan(scene, &self.settings, Utc::now())?;
        self.run(&job, scene, cancel)
    }

    /// Produce `job` from `scene`. Returns the final output path.
    ///
    /// Exports are serialized process-wide; a second caller waits for the running one. On error or
    /// cancellation the encoder is torn down and no file is left at `job.output_path`.
    #[tracing::instrument(skip_all, fields(format = %job.format, w = job.width, h = job.height, frames = job.total_frames))]
    pub fn run(
        &mut self,
        job: &ExportJob,
        scene: &mut Scene,
        cancel: &CancelToken,
    ) -> LiikeResult<PathBuf> {
        let _lock = acquire_export_lock();
        self.set_state(ExportState::Preparing);
        let res = self.run_locked(job, scene, cancel);
        match &res {
            Ok(path) => {
                tracing::info!(path = %path.display(), "export finished");
                self.set_state(ExportState::Done);
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("export cancelled");
                self.set_state(ExportState::Cancelled);
            }
            Err(e) => {
                tracing::error!(code = e.code(), "export failed: {e}");
                self.set_state(ExportState::Failed);
            }
        }
        res
    }

    fn run_locked(
        &mut self,
        job: &ExportJob,
        scene: &mut Scene,
        cancel: &CancelToken,
    ) -> LiikeResult<PathBuf> {
        scene.tree.root()?;
        if job.width == 0 || job.height == 0 || job.total_frames == 0 {
            return Err(LiikeError::validation(
                "export job needs a non-zero size and frame count",
            ));
        }
        cancel.check()?;

        let report = self.rasterizer.cache().prime(&scene.resource_uris());
        let families = self.rasterizer.register_fonts(&report);
        tracing::debug!(
            ready = report.ready.len(),
            fonts = families,
            failed = report.failed.len(),
            "resources primed"
        );
        cancel.check()?;

        let sync = TimelineSynchronizer::new(self.settings.clone());
        let output = OutputGuard::new(&job.output_path)?;

        if job.is_still() {
            self.set_state(ExportState::Capturing);
            let at = scene.timeline.now_ms();
            sync.seek_to(scene, at, SyncMode::Scrub, cancel)?;
            let frame = self.rasterizer.rasterize(scene, job.width, job.height)?;
            cancel.check()?;
            self.set_state(ExportState::Encoding);
            write_still(&frame, job.format, output.temp_path())?;
            self.report_progress(1, 1);
            return output.commit();
        }

        let params = EncodeParams::for_job(job, output.temp_path().to_path_buf());
        let sink = self.encoders.create(&params)?;
        let mut client = StreamingEncodeClient::open(sink, &params)?
            .with_teardown_timeout(self.settings.teardown_timeout());

        self.set_state(ExportState::Capturing);
        if let Err(e) = self.capture(job, scene, cancel, &sync, &mut client) {
            client.cancel();
            return Err(e);
        }

        self.set_state(ExportState::Encoding);
        client.finish()?;
        drop(client);
        output.commit()
    }

    fn capture(
        &mut self,
        job: &ExportJob,
        scene: &mut Scene,
        cancel: &CancelToken,
        sync: &TimelineSynchronizer,
        client: &mut StreamingEncodeClient,
    ) -> LiikeResult<()> {
        let every = self.settings.progress_every_frames.max(1);
        let yield_every = self.settings.yield_every_frames.max(1);

        for i in 0..job.total_frames {
            cancel.check()?;
            let at = job.frame_time_ms(i);
            let mode = if i == 0 {
                SyncMode::Scrub
            } else {
                SyncMode::Continuity
            };
            sync.seek_to(scene, at, mode, cancel)?;
            let frame = self.rasterizer.rasterize(scene, job.width, job.height)?;
            client.submit_frame(FrameIndex(i), frame)?;

            let done = i + 1;
            if done % every == 0 || done == job.total_frames {
                self.report_progress(done, job.total_frames);
            }
            if done % yield_every == 0 {
                std::thread::yield_now();
            }
        }
        Ok(())
    }

    fn set_state(&mut self, state: ExportState) {
        self.state = state;
        self.observer.on_event(ExportEvent::State(state));
    }

    fn report_progress(&mut self, frame: u64, total_frames: u64) {
        self.observer.on_event(ExportEvent::Progress(ExportProgress {
            frame,
            total_frames,
            ratio: frame as f64 / total_frames.max(1) as f64,
        }));
    }
}

fn acquire_export_lock() -> MutexGuard<'static, ()> {
    match EXPORT_LOCK.try_lock() {
        Ok(g) => g,
        Err(TryLockError::Poisoned(p)) => p.into_inner(),
        Err(TryLockError::WouldBlock) => {
            tracing::info!("another export is running, waiting for it to finish");
            EXPORT_LOCK.lock().unwrap_or_else(|p| p.into_inner())
        }
    }
}
