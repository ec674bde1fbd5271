use std::sync::{Arc, Mutex};

/// Lifecycle of one export run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportState {
    #[default]
    Idle,
    Preparing,
    Capturing,
    Encoding,
    Done,
    Cancelled,
    Failed,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ExportProgress {
    /// Frames produced so far.
    pub frame: u64,
    pub total_frames: u64,
    pub ratio: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum ExportEvent {
    State(ExportState),
    Progress(ExportProgress),
}

/// Receives state transitions and throttled progress from the orchestrator.
pub trait ExportObserver: Send {
    fn on_event(&mut self, event: ExportEvent);
}

impl<F> ExportObserver for F
where
    F: FnMut(ExportEvent) + Send,
{
    fn on_event(&mut self, event: ExportEvent) {
        self(event)
    }
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ExportObserver for NoopObserver {
    fn on_event(&mut self, _event: ExportEvent) {}
}

/// Observer that keeps every event; cloned handles share the list.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Arc<Mutex<Vec<ExportEvent>>>);

impl EventLog {
    pub fn events(&self) -> Vec<ExportEvent> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn states(&self) -> Vec<ExportState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExportEvent::State(s) => Some(s),
                ExportEvent::Progress(_) => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<ExportProgress> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExportEvent::Progress(p) => Some(p),
                ExportEvent::State(_) => None,
            })
            .collect()
    }
}

impl ExportObserver for EventLog {
    fn on_event(&mut self, event: ExportEvent) {
        if let Ok(mut v) = self.0.lock() {
            v.push(event);
        }
    }
}
