//! Atomic output writing.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use blogbook_shared::{BlogbookError, Result};

/// What a renderer wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
}

impl RenderOutput {
    pub(crate) fn describe(path: &Path, contents: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            bytes: contents.len() as u64,
            sha256: sha256_hex(contents),
        }
    }
}

/// Write `contents` to `target` through a sibling temp file and a rename.
///
/// Parent directories are created as needed. On error the temp file is
/// removed and `target` is left untouched.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<RenderOutput> {
    let temp = temp_sibling(target, "tmp");
    if let Some(parent) = temp.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BlogbookError::io(parent, e))?;
    }

    std::fs::write(&temp, contents).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        BlogbookError::io(&temp, e)
    })?;
    std::fs::rename(&temp, target).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        BlogbookError::io(target, e)
    })?;

    debug!(path = %target.display(), size = contents.len(), "wrote output");
    Ok(RenderOutput::describe(target, contents))
}

/// `dir/.name.{suffix}` next to `target`.
pub(crate) fn temp_sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    target.with_file_name(format!(".{name}.{suffix}"))
}

fn sha256_hex(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("{:x}", hasher.finalize())
}
