//! Input validation: make sure the source is a readable PDF before anything
//! touches the filesystem.
//!
//! This runs before the output directory is created, so a typo in the
//! source path never leaves an empty output directory behind. The `%PDF-`
//! header check gives a clear error for the common mistake of passing a PNG
//! or a Word document, instead of an opaque engine parse failure.

use crate::error::Pdf2PngError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How far into the file the `%PDF-` header may start. Readers tolerate
/// leading junk (a BOM, CRLF, mail headers) up to this offset.
pub const HEADER_SEARCH_WINDOW: usize = 1024;

const PDF_HEADER: &[u8] = b"%PDF-";

/// Validate a local file path, checking existence, read permission and
/// that a `%PDF-` header appears within the first [`HEADER_SEARCH_WINDOW`]
/// bytes.
///
/// Files shorter than the header itself are let through; the engine reports
/// those as unreadable documents.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2PngError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Pdf2PngError::FileNotFound { path });
    }

    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2PngError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2PngError::FileNotFound { path }),
    };

    // An unreadable header is left for the engine to report.
    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    if file.take(HEADER_SEARCH_WINDOW as u64).read_to_end(&mut head).is_err() {
        head.clear();
    }

    if head.len() >= PDF_HEADER.len() && find_header(&head).is_none() {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[..4]);
        return Err(Pdf2PngError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Offset of the `%PDF-` header within `head`, if present.
fn find_header(head: &[u8]) -> Option<usize> {
    head.windows(PDF_HEADER.len()).position(|w| w == PDF_HEADER)
}
