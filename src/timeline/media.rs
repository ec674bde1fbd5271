use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::model::{NodeId, ObjectFit};

/// Decoded video frame, straight-alpha RGBA8, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

/// Notifications a [`VideoSource`] posts back to its element.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// A seek completed and a frame at `target_ms` is available.
    Seeked { target_ms: u64 },
    /// The source finished buffering and can play.
    CanPlay,
    Error(String),
}

/// Decoder-side half of a media element.
pub trait VideoSource: Send {
    /// Intrinsic frame size.
    fn size(&self) -> (u32, u32);
    fn duration_ms(&self) -> u64;
    fn position_ms(&mut self) -> u64;
    fn is_ready(&self) -> bool {
        true
    }
    /// Start repositioning to `target_ms`; completion is posted to `events` as
    /// [`MediaEvent::Seeked`], possibly from another thread.
    fn start_seek(&mut self, target_ms: u64, events: Sender<MediaEvent>);
    /// Sequential playback up to `target_ms`. Never moves backwards.
    fn advance_to(&mut self, target_ms: u64) -> LiikeResult<()>;
    /// Frame at the current position, if one was decoded.
    fn current_frame(&mut self) -> Option<VideoFrame>;
}

/// Element-level seek state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekState {
    Idle,
    Seeking { target_ms: u64 },
    Ready,
}

/// How the synchronizer repositions media for one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Random access: exact seek-and-wait whenever the position is off.
    Scrub,
    /// Monotonic frame-by-frame advance with the element playing.
    Continuity,
}

/// Outcome of [`plan_seek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekAction {
    /// Position is close enough, or a seek to the same target is already in flight.
    Hold,
    /// Let playback run forward to the target.
    Advance,
    /// Seek and block until the element reports completion.
    HardSeek,
}

/// Thresholds used by [`plan_seek`]. See `ExportSettings` for defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekThresholds {
    pub scrub_ms: u64,
    pub jump_ms: u64,
    pub resync_ms: u64,
}

impl Default for SeekThresholds {
    fn default() -> Self {
        Self {
            scrub_ms: 30,
            jump_ms: 200,
            resync_ms: 1500,
        }
    }
}

/// Element state observed when planning a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementView {
    pub state: SeekState,
    pub position_ms: u64,
    /// Requested media-relative position (already offset and clamped).
    pub target_ms: u64,
}

/// Decide how to bring an element to `requested_ms`.
///
/// Pure: depends only on the last synced timeline instant, the requested instant and the
/// element's state, so the scrub/continuity heuristic is testable without a decoder.
pub fn plan_seek(
    mode: SyncMode,
    last_synced_ms: Option<u64>,
    requested_ms: u64,
    el: ElementView,
    th: SeekThresholds,
) -> SeekAction {
    if el.state == (SeekState::Seeking { target_ms: el.target_ms }) {
        return SeekAction::Hold;
    }
    let off = el.position_ms.abs_diff(el.target_ms);
    let scrub = if off > th.scrub_ms {
        SeekAction::HardSeek
    } else {
        SeekAction::Hold
    };

    match mode {
        SyncMode::Scrub => scrub,
        SyncMode::Continuity => {
            let Some(last) = last_synced_ms else {
                return scrub;
            };
            if requested_ms < last || requested_ms - last > th.jump_ms {
                return scrub;
            }
            if off > th.resync_ms {
                SeekAction::HardSeek
            } else {
                SeekAction::Advance
            }
        }
    }
}

/// Result of one element sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Held,
    Advanced,
    Seeked,
    /// The seek did not complete in time; the previous frame stays in use.
    TimedOut,
    /// The source failed to decode up to the target; the previous frame stays in use.
    Stale,
}

/// A video asset bound to a scene node, slaved to the timeline clock during export.
pub struct MediaElement {
    pub node: NodeId,
    pub clip_start_ms: u64,
    pub object_fit: ObjectFit,
    source: Box<dyn VideoSource>,
    state: SeekState,
    last_synced_ms: Option<u64>,
    frame: Option<VideoFrame>,
    events_tx: Sender<MediaEvent>,
    events_rx: Receiver<MediaEvent>,
}

impl std::fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaElement")
            .field("node", &self.node)
            .field("clip_start_ms", &self.clip_start_ms)
            .field("state", &self.state)
            .field("last_synced_ms", &self.last_synced_ms)
            .finish_non_exhaustive()
    }
}

impl MediaElement {
    pub fn new(
        node: NodeId,
        clip_start_ms: u64,
        object_fit: ObjectFit,
        source: Box<dyn VideoSource>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            node,
            clip_start_ms,
            object_fit,
            source,
            state: SeekState::Idle,
            last_synced_ms: None,
            frame: None,
            events_tx,
            events_rx,
        }
    }

    pub fn intrinsic_duration_ms(&self) -> u64 {
        self.source.duration_ms()
    }

    pub fn size(&self) -> (u32, u32) {
        self.source.size()
    }

    pub fn state(&self) -> SeekState {
        self.state
    }

    pub fn last_synced_ms(&self) -> Option<u64> {
        self.last_synced_ms
    }

    /// Frame captured at the last sync.
    pub fn frame(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }

    /// Media-relative position for a timeline instant.
    pub fn relative_target(&self, instant_ms: u64) -> u64 {
        instant_ms
            .saturating_sub(self.clip_start_ms)
            .min(self.source.duration_ms())
    }

    /// Bring the element to `instant_ms` under `mode`.
    pub fn sync_to(
        &mut self,
        instant_ms: u64,
        mode: SyncMode,
        th: SeekThresholds,
        seek_timeout: Duration,
        ready_timeout: Duration,
    ) -> LiikeResult<SyncOutcome> {
        let target_ms = self.relative_target(instant_ms);
        let view = ElementView {
            state: self.state,
            position_ms: self.source.position_ms(),
            target_ms,
        };
        let action = plan_seek(mode, self.last_synced_ms, instant_ms, view, th);
        self.last_synced_ms = Some(instant_ms);

        let outcome = match action {
            SeekAction::Hold => SyncOutcome::Held,
            SeekAction::Advance => match self.source.advance_to(target_ms) {
                Ok(()) => {
                    self.state = SeekState::Ready;
                    SyncOutcome::Advanced
                }
                Err(e) => {
                    self.state = SeekState::Ready;
                    tracing::warn!(
                        node = self.node.0,
                        target_ms,
                        code = e.code(),
                        "advance failed, keeping previous frame: {e}"
                    );
                    return Ok(SyncOutcome::Stale);
                }
            },
            SeekAction::HardSeek => self.seek_and_wait(target_ms, seek_timeout, ready_timeout)?,
        };

        if let Some(frame) = self.source.current_frame() {
            self.frame = Some(frame);
        }
        Ok(outcome)
    }

    fn seek_and_wait(
        &mut self,
        target_ms: u64,
        seek_timeout: Duration,
        ready_timeout: Duration,
    ) -> LiikeResult<SyncOutcome> {
        if !self.source.is_ready() {
            // A source that never reports readiness still gets its seek after the fallback.
            let _ = self.wait_for(ready_timeout, |e| matches!(e, MediaEvent::CanPlay));
        }

        self.drain_stale_events();
        self.state = SeekState::Seeking { target_ms };
        self.source.start_seek(target_ms, self.events_tx.clone());

        let started = Instant::now();
        let done = self.wait_for(seek_timeout, |e| {
            matches!(e, MediaEvent::Seeked { target_ms: t } if *t == target_ms)
        })?;
        self.state = SeekState::Ready;
        if done {
            return Ok(SyncOutcome::Seeked);
        }

        let err = LiikeError::MediaSeekTimeout {
            target_ms,
            waited_ms: started.elapsed().as_millis() as u64,
        };
        tracing::warn!(node = self.node.0, code = err.code(), "{err}; using stale frame");
        Ok(SyncOutcome::TimedOut)
    }

    /// Wait up to `timeout` for an event matching `pred`.
    fn wait_for(
        &self,
        timeout: Duration,
        pred: impl Fn(&MediaEvent) -> bool,
    ) -> LiikeResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(left) {
                Ok(MediaEvent::Error(msg)) => {
                    tracing::warn!(node = self.node.0, "media error during seek: {msg}");
                }
                Ok(ev) if pred(&ev) => return Ok(true),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(LiikeError::validation("media event channel disconnected"));
                }
            }
        }
    }

    fn drain_stale_events(&self) {
        while self.events_rx.try_recv().is_ok() {}
    }
}

/// What a [`SyntheticVideo`] draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticPattern {
    /// Every frame is this straight RGBA color.
    Solid([u8; 4]),
    /// Each frame gets a distinct opaque color derived from its index.
    FrameCode,
}

/// Deterministic generated video source.
///
/// Useful for previews without a decoder and for reproducible tests. Frames are a function of
/// the frame index at the current position, so any path to the same instant yields the same
/// pixels.
#[derive(Clone, Debug)]
pub struct SyntheticVideo {
    width: u32,
    height: u32,
    duration_ms: u64,
    fps: u32,
    pattern: SyntheticPattern,
    position: Arc<AtomicU64>,
    seeks: Arc<AtomicUsize>,
    seek_latency: Option<Duration>,
    stalled: bool,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32, duration_ms: u64, fps: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            duration_ms,
            fps: fps.max(1),
            pattern: SyntheticPattern::FrameCode,
            position: Arc::new(AtomicU64::new(0)),
            seeks: Arc::new(AtomicUsize::new(0)),
            seek_latency: None,
            stalled: false,
        }
    }

    pub fn with_pattern(mut self, pattern: SyntheticPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Complete seeks from a helper thread after `latency`.
    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = Some(latency);
        self
    }

    /// Never report seek completion.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Shared counter of started seeks.
    pub fn seek_counter(&self) -> Arc<AtomicUsize> {
        self.seeks.clone()
    }

    /// Parse `synthetic://WIDTHxHEIGHT/DURATION_MS[?fps=N]`.
    pub fn from_uri(uri: &str) -> LiikeResult<Self> {
        let bad = || LiikeError::validation(format!("invalid synthetic video uri '{uri}'"));
        let rest = uri.strip_prefix("synthetic://").ok_or_else(bad)?;
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (size, dur) = path.split_once('/').ok_or_else(bad)?;
        let (w, h) = size.split_once('x').ok_or_else(bad)?;
        let fps = query
            .strip_prefix("fps=")
            .map(|v| v.parse::<u32>().map_err(|_| bad()))
            .transpose()?
            .unwrap_or(30);
        Ok(Self::new(
            w.parse().map_err(|_| bad())?,
            h.parse().map_err(|_| bad())?,
            dur.parse().map_err(|_| bad())?,
            fps,
        ))
    }

    fn frame_index(&self, position_ms: u64) -> u64 {
        position_ms * u64::from(self.fps) / 1000
    }

    fn render(&self, idx: u64) -> Vec<u8> {
        let px = match self.pattern {
            SyntheticPattern::Solid(c) => c,
            SyntheticPattern::FrameCode => [
                (idx.wrapping_mul(37) % 256) as u8,
                (idx.wrapping_mul(91) % 256) as u8,
                (idx.wrapping_mul(53).wrapping_add(128) % 256) as u8,
                255,
            ],
        };
        px.repeat((self.width * self.height) as usize)
    }
}

impl VideoSource for SyntheticVideo {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn position_ms(&mut self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    fn start_seek(&mut self, target_ms: u64, events: Sender<MediaEvent>) {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        if self.stalled {
            return;
        }
        let target_ms = target_ms.min(self.duration_ms);
        match self.seek_latency {
            None => {
                self.position.store(target_ms, Ordering::SeqCst);
                let _ = events.send(MediaEvent::Seeked { target_ms });
            }
            Some(latency) => {
                let position = self.position.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(latency);
                    position.store(target_ms, Ordering::SeqCst);
                    let _ = events.send(MediaEvent::Seeked { target_ms });
                });
            }
        }
    }

    fn advance_to(&mut self, target_ms: u64) -> LiikeResult<()> {
        let target_ms = target_ms.min(self.duration_ms);
        self.position.fetch_max(target_ms, Ordering::SeqCst);
        Ok(())
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        let idx = self.frame_index(self.position.load(Ordering::SeqCst));
        Some(VideoFrame {
            width: self.width,
            height: self.height,
            rgba: Arc::new(self.render(idx)),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/media.rs"]
mod tests;
