//! Atomic file replacement
//!
//! Writers put the full contents into `<name>.tmp` next to the target and
//! rename it over the target, so readers never observe a half-written file.

use crate::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Temporary sibling used while replacing `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("facmap"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` (temp file + rename)
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, contents)?;

    if let Err(e) = std::fs::rename(&temp_path, path) {
        // Leave no stray temp file behind on failure
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Replace `path` atomically and restrict it to the owner (0600 on unix)
pub fn write_atomic_private(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp_path, perms)?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
