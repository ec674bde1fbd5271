use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::export::job::{ExportFormat, ExportJob};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::render::frame::FrameBuffer;

/// Configuration handed to an [`EncodeSink`] when a session opens.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub total_frames: u64,
    pub format: ExportFormat,
    pub hardware_accel: bool,
    /// Optional audio track muxed alongside the video (`-shortest`).
    pub audio: Option<PathBuf>,
    /// Where the encoded file is written.
    pub output: PathBuf,
    /// Straight RGBA the premultiplied frames are flattened over.
    pub background: [u8; 4],
}

impl EncodeParams {
    /// Session parameters for `job`, writing to `output` (normally a temp path).
    pub fn for_job(job: &ExportJob, output: PathBuf) -> Self {
        Self {
            width: job.width,
            height: job.height,
            fps: job.fps,
            total_frames: job.total_frames,
            format: job.format,
            hardware_accel: job.hardware_accel,
            audio: job.audio.clone(),
            output,
            background: job.background,
        }
    }

    pub fn frame_bytes(&self) -> usize {
        FrameBuffer::byte_len(self.width, self.height)
    }
}

/// Forceful teardown hook usable from any thread, even while the sink is blocked in a write.
#[derive(Clone)]
pub struct KillSwitch(Arc<dyn Fn() + Send + Sync>);

impl KillSwitch {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn fire(&self) {
        (self.0)();
    }
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KillSwitch")
    }
}

/// Consumer of encoded frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing, contiguous indices
/// starting at zero; `end` is called once after the last frame; `abort` may be called in any
/// state and must release every native resource.
pub trait EncodeSink: Send {
    fn begin(&mut self, params: &EncodeParams) -> LiikeResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameBuffer) -> LiikeResult<()>;
    fn end(&mut self) -> LiikeResult<()>;
    fn abort(&mut self);

    fn kill_switch(&self) -> Option<KillSwitch> {
        None
    }
}

/// What an [`InMemorySink`] observed; shared so it stays readable after the sink moved away.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SinkRecord {
    pub params: Option<EncodeParams>,
    pub frames: Vec<FrameIndex>,
    pub begins: usize,
    pub ends: usize,
    pub aborts: usize,
    /// Straight-alpha frame data, kept only when the sink was built with `keep_frames`.
    pub data: Vec<FrameBuffer>,
}

impl SinkRecord {
    /// No session is left open: every begin was matched by an end, or the sink was aborted.
    pub fn is_closed(&self) -> bool {
        self.aborts > 0 || self.ends >= self.begins
    }
}

/// Handle to a sink's [`SinkRecord`].
#[derive(Clone, Debug, Default)]
pub struct SinkLog(Arc<Mutex<SinkRecord>>);

impl SinkLog {
    pub fn snapshot(&self) -> SinkRecord {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SinkRecord> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Recording sink for tests and dry runs.
///
/// `end` writes the concatenated raw frames (or an empty file) to the session output path so the
/// surrounding file handling behaves exactly as with a real encoder.
#[derive(Debug, Default)]
pub struct InMemorySink {
    log: SinkLog,
    keep_frames: bool,
    fail_at: Option<u64>,
    params: Option<EncodeParams>,
    last: Option<FrameIndex>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink recording into an existing log, so a factory can hand out fresh sinks per job.
    pub fn with_log(log: SinkLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn keep_frames(mut self) -> Self {
        self.keep_frames = true;
        self
    }

    /// Fail `push_frame` for frame `idx` with an encode-session error.
    pub fn failing_at(mut self, idx: u64) -> Self {
        self.fail_at = Some(idx);
        self
    }

    pub fn log(&self) -> SinkLog {
        self.log.clone()
    }
}

impl EncodeSink for InMemorySink {
    fn begin(&mut self, params: &EncodeParams) -> LiikeResult<()> {
        let mut rec = self.log.lock();
        rec.begins += 1;
        rec.params = Some(params.clone());
        rec.frames.clear();
        rec.data.clear();
        self.params = Some(params.clone());
        self.last = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameBuffer) -> LiikeResult<()> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| LiikeError::encode("in-memory sink not started"))?;
        let expected = self.last.map_or(0, |l| l.0 + 1);
        if idx.0 != expected {
            return Err(LiikeError::encode(format!(
                "frame {} submitted, expected {expected}",
                idx.0
            )));
        }
        if frame.width != params.width || frame.height != params.height {
            return Err(LiikeError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, params.width, params.height
            )));
        }
        if self.fail_at == Some(idx.0) {
            return Err(LiikeError::encode(format!("injected failure at frame {}", idx.0)));
        }
        self.last = Some(idx);
        let mut rec = self.log.lock();
        rec.frames.push(idx);
        if self.keep_frames {
            rec.data.push(FrameBuffer {
                width: frame.width,
                height: frame.height,
                data: frame.to_straight(),
                premultiplied: false,
            });
        }
        Ok(())
    }

    fn end(&mut self) -> LiikeResult<()> {
        let params = self
            .params
            .take()
            .ok_or_else(|| LiikeError::encode("in-memory sink not started"))?;
        let mut rec = self.log.lock();
        let mut raw = Vec::with_capacity(rec.data.iter().map(|f| f.data.len()).sum());
        for f in &rec.data {
            raw.extend_from_slice(&f.data);
        }
        std::fs::write(&params.output, raw).map_err(|e| {
            LiikeError::encode(format!(
                "failed to write '{}': {e}",
                params.output.display()
            ))
        })?;
        rec.ends += 1;
        Ok(())
    }

    fn abort(&mut self) {
        self.params = None;
        self.log.lock().aborts += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
