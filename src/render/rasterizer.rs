use std::collections::HashSet;
use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

use crate::assets::cache::{PrimeReport, ResourceCache};
use crate::assets::fonts::FontRegistry;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::render::frame::FrameBuffer;
use crate::render::snapshot::SceneSnapshot;
use crate::render::svg::{rasterize_svg, serialize_snapshot};
use crate::render::text::{TextPainter, line_frames};
use crate::render::video::composite_videos;
use crate::scene::composition::Scene;

const XXH3_SEED: u64 = 0x5d3c_91e0_7a4b_26f8;

/// Turns a synchronized scene into output pixels.
///
/// Passes, in order: vector snapshot through SVG and `resvg`, video frames drawn directly,
/// text overlay drawn with Parley glyphs. Images must already be materialized in the cache;
/// nothing here touches the network or disk.
pub struct FrameRasterizer {
    cache: Arc<ResourceCache>,
    fonts: FontRegistry,
    text: TextPainter,
    elide_static: bool,
    last: Option<(u64, FrameBuffer)>,
    missing: HashSet<String>,
}

impl std::fmt::Debug for FrameRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRasterizer")
            .field("fonts", &self.fonts)
            .field("elide_static", &self.elide_static)
            .finish_non_exhaustive()
    }
}

impl FrameRasterizer {
    pub fn new(cache: Arc<ResourceCache>, fonts: FontRegistry) -> Self {
        Self {
            cache,
            fonts,
            text: TextPainter::new(),
            elide_static: true,
            last: None,
            missing: HashSet::new(),
        }
    }

    /// Reuse the previous buffer when a frame's inputs hash identically (on by default).
    pub fn with_static_elision(mut self, enabled: bool) -> Self {
        self.elide_static = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn fonts_mut(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }

    /// Register every font a cache prime produced. Returns the number of new families.
    pub fn register_fonts(&mut self, report: &PrimeReport) -> usize {
        let mut added = 0;
        for asset in &report.fonts {
            match self.fonts.register(asset) {
                Ok(families) => added += families.len(),
                Err(e) => tracing::warn!(uri = %asset.uri, error = %e, "font registration failed"),
            }
        }
        if added > 0 {
            self.last = None;
        }
        added
    }

    /// Render `scene` at its current clock instant into an `out_w` x `out_h` premultiplied buffer.
    #[tracing::instrument(skip(self, scene), fields(instant_ms = scene.timeline.now_ms()))]
    pub fn rasterize(&mut self, scene: &Scene, out_w: u32, out_h: u32) -> LiikeResult<FrameBuffer> {
        scene.tree.root()?;
        let snap = SceneSnapshot::capture(scene);
        self.rasterize_snapshot(&snap, out_w, out_h)
    }

    pub fn rasterize_snapshot(
        &mut self,
        snap: &SceneSnapshot,
        out_w: u32,
        out_h: u32,
    ) -> LiikeResult<FrameBuffer> {
        if out_w == 0 || out_h == 0 {
            return Err(LiikeError::validation("output width/height must be non-zero"));
        }
        self.warn_missing_images(snap);

        let svg = serialize_snapshot(snap, out_w, out_h);
        let key = self
            .elide_static
            .then(|| fingerprint(&svg, snap, out_w, out_h, self.fonts.families().len()));
        if let (Some(k), Some((last_key, last))) = (key, self.last.as_ref())
            && k == *last_key
        {
            return Ok(last.clone());
        }

        let mut data = rasterize_svg(&svg, out_w, out_h, self.fonts.fontdb(), &self.cache)?;
        composite_videos(&mut data, out_w, out_h, snap)?;
        self.text.paint(&mut data, out_w, out_h, snap, &mut self.fonts)?;
        let frame = FrameBuffer::from_premul(out_w, out_h, data)?;

        if let Some(k) = key {
            self.last = Some((k, frame.clone()));
        }
        Ok(frame)
    }

    fn warn_missing_images(&mut self, snap: &SceneSnapshot) {
        for uri in snap.image_uris() {
            if self.cache.peek(uri).is_none() && self.missing.insert(uri.to_string()) {
                tracing::warn!(uri, "image not materialized, rendering placeholder");
            }
        }
    }
}

/// Hash of everything that determines a frame's pixels.
fn fingerprint(svg: &str, snap: &SceneSnapshot, out_w: u32, out_h: u32, families: usize) -> u64 {
    let mut h = Xxh3::with_seed(XXH3_SEED);
    h.update(&out_w.to_le_bytes());
    h.update(&out_h.to_le_bytes());
    h.update(&(families as u64).to_le_bytes());
    h.update(svg.as_bytes());
    for layer in &snap.videos {
        match layer.frame.as_ref() {
            Some(f) => {
                h.update(&[1]);
                h.update(&f.width.to_le_bytes());
                h.update(&f.height.to_le_bytes());
                h.update(&f.rgba);
            }
            None => h.update(&[0]),
        }
        h.update(&[layer.object_fit as u8]);
        if let Some(n) = snap.nodes.get(layer.node) {
            for c in n.world.as_coeffs() {
                h.update(&c.to_bits().to_le_bytes());
            }
            h.update(&n.world_opacity.to_bits().to_le_bytes());
            h.update(&n.clip_radius.to_bits().to_le_bytes());
        }
    }
    match line_frames(snap) {
        Some((head, tag)) => {
            h.update(&[1]);
            for f in [head, tag] {
                for v in [f.opacity, f.translate_x, f.translate_y, f.scale, f.blur, f.brightness] {
                    h.update(&v.to_bits().to_le_bytes());
                }
            }
            if let Some(t) = snap.text.as_ref()
                && let Ok(json) = serde_json::to_vec(t)
            {
                h.update(&json);
            }
        }
        None => h.update(&[0]),
    }
    h.digest()
}

#[cfg(test)]
#[path = "../../tests/unit/render/rasterizer.rs"]
mod tests;
