pub type LiikeResult<T> = Result<T, LiikeError>;

/// Error taxonomy for the export pipeline.
///
/// Resource and seek failures are normally recovered where they happen (placeholder asset, stale
/// frame) and only surface as values when a caller asks for them explicitly. Everything else is
/// fatal for the running export.
#[derive(thiserror::Error, Debug)]
pub enum LiikeError {
    #[error("missing scene root: {0}")]
    MissingSceneRoot(String),

    #[error("resource materialization failed for '{uri}': {reason}")]
    ResourceMaterialization { uri: String, reason: String },

    #[error("media seek to {target_ms}ms timed out after {waited_ms}ms")]
    MediaSeekTimeout { target_ms: u64, waited_ms: u64 },

    #[error("encode session error: {0}")]
    EncodeSession(String),

    #[error("export cancelled")]
    Cancelled,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error("io error: {0}")]
    Io(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LiikeError {
    pub fn missing_root(msg: impl Into<String>) -> Self {
        Self::MissingSceneRoot(msg.into())
    }

    pub fn resource(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceMaterialization {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeSession(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Stable machine-readable code shown next to the terminal error message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSceneRoot(_) => "missing_scene_root",
            Self::ResourceMaterialization { .. } => "resource_materialization",
            Self::MediaSeekTimeout { .. } => "media_seek_timeout",
            Self::EncodeSession(_) => "encode_session",
            Self::Cancelled => "cancelled",
            Self::Validation(_) => "validation",
            Self::Serde(_) => "serde",
            Self::Io(_) => "io",
            Self::Other(_) => "internal",
        }
    }

    /// `false` for the kinds the pipeline recovers from locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ResourceMaterialization { .. } | Self::MediaSeekTimeout { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for LiikeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for LiikeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
