use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::assets::fetch::{Fetcher, FsFetcher};
use crate::assets::optimize::{ContentType, OptimizePolicy, optimize_image};
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::composition::{ResourceKind, ResourceRef};

/// Materialized resource: local bytes plus what the rasterizer needs to know about them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedAsset {
    pub uri: String,
    pub bytes: Arc<Vec<u8>>,
    pub content_type: ContentType,
    /// Intrinsic size for images, 0 for fonts.
    pub width: u32,
    pub height: u32,
}

/// One key's entry. Only successful loads are stored; a failure leaves the slot empty so the next
/// request fetches again.
type Slot = Arc<Mutex<Option<Arc<CachedAsset>>>>;

/// Outcome of [`ResourceCache::prime`].
#[derive(Debug, Default)]
pub struct PrimeReport {
    pub ready: Vec<Arc<CachedAsset>>,
    pub fonts: Vec<Arc<CachedAsset>>,
    /// `(uri, reason)` of resources that will render as placeholders or fall back.
    pub failed: Vec<(String, String)>,
}

/// Process-wide memo of materialized resources, keyed by source URI.
///
/// Concurrent requests for one key share a single fetch; distinct keys load in parallel.
/// Failed loads are not remembered. Entries live until [`ResourceCache::evict`] or [`ResourceCache::clear`].
pub struct ResourceCache {
    fetcher: Arc<dyn Fetcher>,
    policy: OptimizePolicy,
    slots: Mutex<HashMap<String, Slot>>,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("policy", &self.policy)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(Arc::new(FsFetcher), OptimizePolicy::default())
    }
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: OptimizePolicy) -> Self {
        Self {
            fetcher,
            policy,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, uri: &str) -> LiikeResult<Slot> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| LiikeError::validation("resource cache lock poisoned"))?;
        Ok(slots.entry(uri.to_string()).or_default().clone())
    }

    /// Fetch, optimize and memoize `uri`. Idempotent once it succeeds.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn materialize(&self, uri: &str, kind: ResourceKind) -> LiikeResult<Arc<CachedAsset>> {
        let slot = self.slot(uri)?;
        // Lock order: slot, then map.
        let mut entry = slot
            .lock()
            .map_err(|_| LiikeError::validation("resource cache slot poisoned"))?;
        if let Some(asset) = entry.as_ref() {
            return Ok(asset.clone());
        }
        match self.load(uri, kind) {
            Ok(asset) => {
                let asset = Arc::new(asset);
                *entry = Some(asset.clone());
                Ok(asset)
            }
            Err(e) => {
                if let Ok(mut slots) = self.slots.lock()
                    && slots.get(uri).is_some_and(|s| Arc::ptr_eq(s, &slot))
                {
                    slots.remove(uri);
                }
                Err(e)
            }
        }
    }

    /// Already-materialized entry; never performs I/O.
    pub fn peek(&self, uri: &str) -> Option<Arc<CachedAsset>> {
        let slot = self.slots.lock().ok()?.get(uri)?.clone();
        // A slot still loading reads as absent.
        let entry = slot.try_lock().ok()?;
        entry.clone()
    }

    /// Materialize every resource in parallel.
    ///
    /// Failures are logged and reported, never returned: a broken image becomes a placeholder and a
    /// broken font falls back to the default family.
    #[tracing::instrument(skip_all, fields(count = refs.len()))]
    pub fn prime(&self, refs: &[ResourceRef]) -> PrimeReport {
        let results: Vec<_> = refs
            .par_iter()
            .map(|r| (r, self.materialize(&r.uri, r.kind)))
            .collect();

        let mut report = PrimeReport::default();
        for (r, res) in results {
            match res {
                Ok(asset) if r.kind == ResourceKind::Font => report.fonts.push(asset),
                Ok(asset) => report.ready.push(asset),
                Err(e) => {
                    tracing::warn!(uri = %r.uri, code = e.code(), "resource unavailable: {e}");
                    report.failed.push((r.uri.clone(), e.to_string()));
                }
            }
        }
        report
    }

    pub fn evict(&self, uri: &str) -> bool {
        self.slots
            .lock()
            .map(|mut s| s.remove(uri).is_some())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.slots.lock() {
            s.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, uri: &str, kind: ResourceKind) -> LiikeResult<CachedAsset> {
        let bytes = self.fetcher.fetch(uri)?;
        let sniffed = ContentType::sniff(&bytes);
        match kind {
            ResourceKind::Font => {
                if sniffed != ContentType::Font {
                    return Err(LiikeError::resource(uri, "not a font file"));
                }
                Ok(CachedAsset {
                    uri: uri.to_string(),
                    bytes: Arc::new(bytes),
                    content_type: ContentType::Font,
                    width: 0,
                    height: 0,
                })
            }
            ResourceKind::Image if sniffed == ContentType::Svg => {
                let tree = usvg::Tree::from_data(&bytes, &usvg::Options::default())
                    .map_err(|e| LiikeError::resource(uri, format!("invalid svg: {e}")))?;
                let size = tree.size();
                Ok(CachedAsset {
                    uri: uri.to_string(),
                    bytes: Arc::new(bytes),
                    content_type: ContentType::Svg,
                    width: size.width().ceil() as u32,
                    height: size.height().ceil() as u32,
                })
            }
            ResourceKind::Image => {
                let img = optimize_image(bytes, self.policy)
                    .map_err(|e| LiikeError::resource(uri, e.to_string()))?;
                Ok(CachedAsset {
                    uri: uri.to_string(),
                    bytes: Arc::new(img.bytes),
                    content_type: img.content_type,
                    width: img.width,
                    height: img.height,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
