use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::encode::sink::{EncodeParams, EncodeSink, KillSwitch};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::render::frame::FrameBuffer;

const DEFAULT_TEARDOWN: Duration = Duration::from_millis(2000);

enum Request {
    Frame(FrameIndex, FrameBuffer),
    Finish,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Open,
    Finished,
    Cancelled,
    Failed,
}

/// Blocking, strictly ordered session with an encoder sink running on a supervisor thread.
///
/// Every request waits for its acknowledgement, so the capture loop can never run ahead of the
/// encoder. Dropping an open session cancels it.
pub struct StreamingEncodeClient {
    tx: Option<Sender<Request>>,
    acks: Receiver<LiikeResult<()>>,
    worker: Option<JoinHandle<()>>,
    kill: Option<KillSwitch>,
    total_frames: u64,
    next: u64,
    state: SessionState,
    teardown: Duration,
}

impl std::fmt::Debug for StreamingEncodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingEncodeClient")
            .field("total_frames", &self.total_frames)
            .field("next", &self.next)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StreamingEncodeClient {
    /// Start `sink` with `params` and hand it to a supervisor thread.
    #[tracing::instrument(skip(sink, params), fields(format = %params.format, w = params.width, h = params.height, frames = params.total_frames))]
    pub fn open(mut sink: Box<dyn EncodeSink>, params: &EncodeParams) -> LiikeResult<Self> {
        if params.total_frames == 0 {
            return Err(LiikeError::validation("encode session needs at least one frame"));
        }
        sink.begin(params)?;
        let kill = sink.kill_switch();

        let (tx, rx) = mpsc::channel::<Request>();
        let (ack_tx, acks) = mpsc::channel::<LiikeResult<()>>();
        let worker = std::thread::Builder::new()
            .name("liike-encode".into())
            .spawn(move || supervise(sink, rx, ack_tx))
            .map_err(|e| LiikeError::encode(format!("failed to start encoder thread: {e}")))?;

        Ok(Self {
            tx: Some(tx),
            acks,
            worker: Some(worker),
            kill,
            total_frames: params.total_frames,
            next: 0,
            state: SessionState::Open,
            teardown: DEFAULT_TEARDOWN,
        })
    }

    /// Bound on how long [`cancel`](Self::cancel) waits for the supervisor to exit.
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown = timeout;
        self
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn frames_submitted(&self) -> u64 {
        self.next
    }

    /// Handle that forcefully stops the encoder from another thread.
    pub fn kill_handle(&self) -> Option<KillSwitch> {
        self.kill.clone()
    }

    /// Push frame `idx` and block until the encoder accepted it. Returns the progress ratio.
    pub fn submit_frame(&mut self, idx: FrameIndex, frame: FrameBuffer) -> LiikeResult<f64> {
        self.ensure_open()?;
        if idx.0 != self.next {
            return Err(LiikeError::encode(format!(
                "frame {} submitted out of order, expected {}",
                idx.0, self.next
            )));
        }
        if idx.0 >= self.total_frames {
            return Err(LiikeError::encode(format!(
                "frame {} is past the declared {} frames",
                idx.0, self.total_frames
            )));
        }

        match self.request(Request::Frame(idx, frame)) {
            Ok(()) => {
                self.next += 1;
                Ok(self.next as f64 / self.total_frames as f64)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                self.join_worker(self.teardown);
                Err(e)
            }
        }
    }

    /// Close the session after every declared frame has been submitted.
    #[tracing::instrument(skip(self), fields(frames = self.next))]
    pub fn finish(&mut self) -> LiikeResult<()> {
        self.ensure_open()?;
        if self.next != self.total_frames {
            return Err(LiikeError::encode(format!(
                "finish called with {} of {} frames submitted",
                self.next, self.total_frames
            )));
        }
        let res = self.request(Request::Finish);
        self.state = if res.is_ok() {
            SessionState::Finished
        } else {
            SessionState::Failed
        };
        self.tx = None;
        self.join_worker(Duration::MAX);
        res
    }

    /// Tear the session down. Safe in every state; waits at most the teardown timeout.
    pub fn cancel(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Cancelled;
            if let Some(kill) = &self.kill {
                kill.fire();
            }
            if let Some(tx) = self.tx.take() {
                let _ = tx.send(Request::Cancel);
            }
            tracing::debug!(frames = self.next, "encode session cancelled");
        }
        self.tx = None;
        self.join_worker(self.teardown);
    }

    fn ensure_open(&self) -> LiikeResult<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Finished => Err(LiikeError::encode("encode session already finished")),
            SessionState::Cancelled => Err(LiikeError::encode("encode session was cancelled")),
            SessionState::Failed => Err(LiikeError::encode("encode session failed earlier")),
        }
    }

    fn request(&mut self, req: Request) -> LiikeResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| LiikeError::encode("encode session is closed"))?;
        tx.send(req)
            .map_err(|_| LiikeError::encode("encoder thread exited unexpectedly"))?;
        self.acks
            .recv()
            .map_err(|_| LiikeError::encode("encoder thread exited without acknowledging"))?
    }

    fn join_worker(&mut self, timeout: Duration) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if timeout == Duration::MAX || worker.is_finished() {
            if worker.join().is_err() {
                tracing::error!("encoder thread panicked");
            }
            return;
        }
        // Acks from the worker close once it returns; wait on that with a bound.
        loop {
            match self.acks.recv_timeout(timeout) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    if worker.join().is_err() {
                        tracing::error!("encoder thread panicked");
                    }
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "encoder did not shut down in time, detaching"
                    );
                    return;
                }
            }
        }
    }
}

impl Drop for StreamingEncodeClient {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn supervise(mut sink: Box<dyn EncodeSink>, rx: Receiver<Request>, acks: Sender<LiikeResult<()>>) {
    while let Ok(req) = rx.recv() {
        match req {
            Request::Frame(idx, frame) => {
                let res = sink.push_frame(idx, &frame);
                let failed = res.is_err();
                if failed {
                    sink.abort();
                }
                let _ = acks.send(res);
                if failed {
                    return;
                }
            }
            Request::Finish => {
                let res = sink.end();
                if res.is_err() {
                    sink.abort();
                }
                let _ = acks.send(res);
                return;
            }
            Request::Cancel => {
                sink.abort();
                return;
            }
        }
    }
    sink.abort();
}

#[cfg(test)]
#[path = "../../tests/unit/encode/client.rs"]
mod tests;
