use std::collections::HashSet;
use std::sync::Arc;

use crate::assets::cache::CachedAsset;
use crate::foundation::error::{LiikeError, LiikeResult};

/// Fonts visible to both text paths: the SVG serializer (through the `usvg` font database) and the
/// direct glyph renderer (through the Parley collection).
pub struct FontRegistry {
    fontdb: Arc<usvg::fontdb::Database>,
    font_cx: parley::FontContext,
    families: Vec<String>,
    registered: HashSet<String>,
    fallback: Option<String>,
    warned: HashSet<String>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("families", &self.families)
            .field("fallback", &self.fallback)
            .field("system_faces", &self.fontdb.len())
            .finish_non_exhaustive()
    }
}

impl FontRegistry {
    /// Registry seeded with the system font database.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self::with_database(db)
    }

    /// Registry without system fonts; only explicitly registered faces resolve.
    pub fn empty() -> Self {
        Self::with_database(usvg::fontdb::Database::new())
    }

    fn with_database(fontdb: usvg::fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(fontdb),
            font_cx: parley::FontContext::default(),
            families: Vec::new(),
            registered: HashSet::new(),
            fallback: None,
            warned: HashSet::new(),
        }
    }

    /// Register a materialized font with both text paths. Re-registering a URI is a no-op.
    pub fn register(&mut self, asset: &CachedAsset) -> LiikeResult<Vec<String>> {
        if self.registered.contains(&asset.uri) {
            return Ok(Vec::new());
        }
        let families = self.register_bytes(asset.bytes.as_slice())?;
        self.registered.insert(asset.uri.clone());
        tracing::debug!(uri = %asset.uri, ?families, "registered font");
        Ok(families)
    }

    fn register_bytes(&mut self, bytes: &[u8]) -> LiikeResult<Vec<String>> {
        let added = self
            .font_cx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
        let mut names = Vec::new();
        for (id, _) in added {
            if let Some(name) = self.font_cx.collection.family_name(id) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(LiikeError::validation("no font families found in font data"));
        }
        Arc::make_mut(&mut self.fontdb).load_font_data(bytes.to_vec());
        for n in &names {
            if !self.families.iter().any(|f| f.eq_ignore_ascii_case(n)) {
                self.families.push(n.clone());
            }
        }
        Ok(names)
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.iter().any(|f| f.eq_ignore_ascii_case(family))
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }

    /// Family name to shape `requested` with.
    ///
    /// Unregistered families fall back to the system sans-serif face, loaded into the glyph
    /// renderer on first use. Returns `None` when no face at all is available.
    pub fn resolve_family(&mut self, requested: &str) -> Option<String> {
        if let Some(f) = self
            .families
            .iter()
            .find(|f| f.eq_ignore_ascii_case(requested))
        {
            return Some(f.clone());
        }
        let fallback = self.fallback_family()?;
        if self.warned.insert(requested.to_string()) {
            tracing::warn!(
                requested,
                fallback = %fallback,
                "font family not registered, using fallback"
            );
        }
        Some(fallback)
    }

    fn fallback_family(&mut self) -> Option<String> {
        if let Some(f) = &self.fallback {
            return Some(f.clone());
        }
        let query = usvg::fontdb::Query {
            families: &[usvg::fontdb::Family::SansSerif],
            ..usvg::fontdb::Query::default()
        };
        let id = self
            .fontdb
            .query(&query)
            .or_else(|| self.fontdb.faces().next().map(|f| f.id))?;
        let bytes = self.fontdb.with_face_data(id, |data, _| data.to_vec())?;
        let name = self.register_bytes(&bytes).ok()?.into_iter().next()?;
        self.fallback = Some(name.clone());
        Some(name)
    }

    /// Database the SVG rasterizer resolves `font-family` against.
    pub fn fontdb(&self) -> Arc<usvg::fontdb::Database> {
        self.fontdb.clone()
    }

    pub fn font_context(&mut self) -> &mut parley::FontContext {
        &mut self.font_cx
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
