use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::{LiikeError, LiikeResult};

/// Byte source behind the resource cache.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> LiikeResult<Vec<u8>>;
}

/// Reads plain paths and `file://` URIs from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsFetcher;

impl Fetcher for FsFetcher {
    fn fetch(&self, uri: &str) -> LiikeResult<Vec<u8>> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Err(LiikeError::resource(
                uri,
                "remote fetch is not supported; download the asset first",
            ));
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let bytes = std::fs::read(Path::new(path))
            .with_context(|| format!("failed to read '{path}'"))
            .map_err(|e| LiikeError::resource(uri, format!("{e:#}")))?;
        Ok(bytes)
    }
}

/// In-memory fetch layer that counts every call.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.entries.insert(uri.into(), bytes);
        self
    }

    /// Delay every fetch, widening the window for concurrent requests to overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self, uri: &str) -> usize {
        self.calls
            .lock()
            .map(|m| m.get(uri).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, uri: &str) -> LiikeResult<Vec<u8>> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut m) = self.calls.lock() {
            *m.entry(uri.to_string()).or_default() += 1;
        }
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.entries
            .get(uri)
            .cloned()
            .ok_or_else(|| LiikeError::resource(uri, "not found"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
