use std::path::{Path, PathBuf};

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::error::{LiikeError, LiikeResult};

/// Temp-file-then-rename handling for one output file.
///
/// Everything is written to `.{stem}.partial.{ext}` next to the final path. [`commit`](Self::commit)
/// renames it into place; dropping an uncommitted guard deletes the temp file, so the final path
/// only ever holds a complete file.
#[derive(Debug)]
pub struct OutputGuard {
    final_path: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    /// Create the output directory and claim the temp path, removing a stale one.
    pub fn new(final_path: &Path) -> LiikeResult<Self> {
        let name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                LiikeError::validation(format!(
                    "output path '{}' has no file name",
                    final_path.display()
                ))
            })?;
        ensure_parent_dir(final_path)?;
        let temp_path = final_path.with_file_name(partial_name(name));
        remove_if_present(&temp_path)?;
        Ok(Self {
            final_path: final_path.to_path_buf(),
            temp_path,
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Move the finished temp file to the final path.
    pub fn commit(mut self) -> LiikeResult<PathBuf> {
        if !self.temp_path.is_file() {
            return Err(LiikeError::encode(format!(
                "encoder produced no output at '{}'",
                self.temp_path.display()
            )));
        }
        // Windows refuses to rename over an existing file.
        remove_if_present(&self.final_path)?;
        std::fs::rename(&self.temp_path, &self.final_path).map_err(|e| {
            LiikeError::io(format!(
                "failed to move '{}' to '{}': {e}",
                self.temp_path.display(),
                self.final_path.display()
            ))
        })?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = remove_if_present(&self.temp_path) {
            tracing::warn!(path = %self.temp_path.display(), error = %e, "failed to remove partial output");
        }
    }
}

fn partial_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!(".{stem}.partial.{ext}"),
        _ => format!(".{name}.partial"),
    }
}

fn remove_if_present(path: &Path) -> LiikeResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LiikeError::io(format!(
            "failed to remove '{}': {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/output.rs"]
mod tests;
