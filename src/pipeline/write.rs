//! Output stage: directory creation, file naming and page writes.
//!
//! Pages are written to `<name>.tmp` and renamed into place, so a crash or a
//! full disk never leaves a truncated PNG under its final name. The rename
//! replaces any existing file of the same name without warning.

use crate::error::Pdf2PngError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub fn ensure_output_dir(dir: &Path) -> Result<(), Pdf2PngError> {
    std::fs::create_dir_all(dir).map_err(|e| Pdf2PngError::OutputDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;
    debug!("Output directory ready: {}", dir.display());
    Ok(())
}

/// File name for a 1-indexed page: `page` + zero-padded number + `.png`.
pub fn page_file_name(page_num: usize, width: usize) -> String {
    format!("page{:0width$}.png", page_num, width = width)
}

/// Write one encoded page into `dir` and return its full path.
pub fn write_page(dir: &Path, file_name: &str, png: &[u8]) -> Result<PathBuf, Pdf2PngError> {
    let path = dir.join(file_name);
    let tmp_path = dir.join(format!("{file_name}.tmp"));

    if let Err(e) = std::fs::write(&tmp_path, png) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Pdf2PngError::OutputWriteFailed { path, source: e });
    }

    std::fs::rename(&tmp_path, &path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        Pdf2PngError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;

    Ok(path)
}

/// Best-effort removal of files written by a failed run.
///
/// Returns how many were removed; failures are logged and skipped.
pub fn remove_pages(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    removed
}
