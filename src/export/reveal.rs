use std::path::Path;
use std::process::Command;

use crate::foundation::error::{LiikeError, LiikeResult};

/// Show `path` in the host file manager, selected where the platform supports it.
pub fn reveal_in_file_manager(path: &Path) -> LiikeResult<()> {
    reveal_command(path)
        .spawn()
        .map(|_| ())
        .map_err(|e| LiikeError::io(format!("failed to open file manager: {e}")))
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg("-R").arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &Path) -> Command {
    let mut cmd = Command::new("explorer");
    cmd.arg(format!("/select,{}", path.display()));
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn reveal_command(path: &Path) -> Command {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut cmd = Command::new("xdg-open");
    cmd.arg(dir);
    cmd
}
