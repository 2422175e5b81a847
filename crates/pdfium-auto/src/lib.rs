//! # pdfium-auto
//!
//! Find a usable [PDFium](https://pdfium.googlesource.com/pdfium/) shared
//! library for `pdfium-render`, downloading and caching it on request.
//!
//! ## Lookup order
//!
//! 1. `PDFIUM_LIB_PATH`: an explicit library file.
//! 2. The per-version cache directory ([`cache_dir`]).
//! 3. The system library search path (only in [`bind_pdfium_offline`]).
//!
//! [`ensure_pdfium_library`] adds a fourth step: if neither 1 nor 2 yields a
//! file it downloads the platform archive from
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! and extracts the library into the cache. Binding never touches the
//! network on its own.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_from_path, ensure_pdfium_library};
//!
//! let path = ensure_pdfium_library(Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading PDFium: {}/{} bytes", downloaded, t);
//!     }
//! })).expect("download failed");
//! let pdfium = bind_pdfium_from_path(&path).expect("bind failed");
//! ```
//!
//! ## Environment variable overrides
//!
//! - `PDFIUM_LIB_PATH`: path to an existing pdfium library; skips download.
//! - `PDFIUM_AUTO_CACHE_DIR`: override the base cache directory.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// Explicit library file override.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Base cache directory override.
pub const CACHE_DIR_ENV: &str = "PDFIUM_AUTO_CACHE_DIR";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Errors returned by pdfium-auto operations.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// No prebuilt archive exists for this OS/architecture.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or write into the cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// A library file was found but could not be loaded.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    /// Nothing in the cache and no system library either.
    #[error("No PDFium library in cache or on the system library path: {0}")]
    SystemLibrary(String),
}

// ── Platforms ────────────────────────────────────────────────────────────────

/// Where the library lives in a pdfium-binaries release.
#[derive(Debug, PartialEq, Eq)]
pub struct Platform {
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    pub archive: &'static str,
    /// Path of the library inside the archive.
    pub member: &'static str,
    /// File name written into the cache.
    pub lib_name: &'static str,
}

const fn platform(archive: &'static str, lib_name: &'static str, member: &'static str) -> Platform {
    Platform {
        archive,
        member,
        lib_name,
    }
}

static PLATFORMS: &[(&str, &str, Platform)] = &[
    ("macos", "aarch64", platform("pdfium-mac-arm64.tgz", "libpdfium.dylib", "lib/libpdfium.dylib")),
    ("macos", "x86_64", platform("pdfium-mac-x64.tgz", "libpdfium.dylib", "lib/libpdfium.dylib")),
    ("linux", "x86_64", platform("pdfium-linux-x64.tgz", "libpdfium.so", "lib/libpdfium.so")),
    ("linux", "aarch64", platform("pdfium-linux-arm64.tgz", "libpdfium.so", "lib/libpdfium.so")),
    ("windows", "x86_64", platform("pdfium-win-x64.tgz", "pdfium.dll", "bin/pdfium.dll")),
    ("windows", "aarch64", platform("pdfium-win-arm64.tgz", "pdfium.dll", "bin/pdfium.dll")),
    ("windows", "x86", platform("pdfium-win-x86.tgz", "pdfium.dll", "bin/pdfium.dll")),
];

impl Platform {
    /// Look up a platform by Rust's `std::env::consts::{OS, ARCH}` names.
    pub fn lookup(os: &str, arch: &str) -> Option<&'static Platform> {
        PLATFORMS
            .iter()
            .find(|(o, a, _)| *o == os && *a == arch)
            .map(|(_, _, p)| p)
    }

    /// The platform this binary is running on.
    pub fn current() -> Result<&'static Platform, PdfiumAutoError> {
        let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);
        Self::lookup(os, arch).ok_or_else(|| PdfiumAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }

    fn download_url(&self) -> String {
        format!(
            "{RELEASE_BASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
            self.archive
        )
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Per-version cache directory for the library.
///
/// `$PDFIUM_AUTO_CACHE_DIR/pdfium-{VERSION}` when the override is set,
/// otherwise `<user cache dir>/pdf2png/pdfium-{VERSION}`.
pub fn cache_dir() -> PathBuf {
    cache_dir_from(std::env::var_os(CACHE_DIR_ENV))
}

fn cache_dir_from(override_dir: Option<OsString>) -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join(versioned);
    }

    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdf2png")
        .join(versioned)
}

/// How a library file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibrarySource {
    /// `PDFIUM_LIB_PATH` pointed at an existing file.
    EnvOverride,
    /// Already present in [`cache_dir`].
    Cache,
    /// Fetched by this process.
    Downloaded,
}

/// A library file on disk and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLibrary {
    pub path: PathBuf,
    pub source: LibrarySource,
}

/// Find a library file without using the network.
pub fn locate() -> Option<LocatedLibrary> {
    if let Some(p) = std::env::var_os(LIB_PATH_ENV).map(PathBuf::from) {
        if p.is_file() {
            return Some(LocatedLibrary {
                path: p,
                source: LibrarySource::EnvOverride,
            });
        }
    }

    let platform = Platform::current().ok()?;
    let cached = cache_dir().join(platform.lib_name);
    cached.is_file().then_some(LocatedLibrary {
        path: cached,
        source: LibrarySource::Cache,
    })
}

/// `true` if [`ensure_pdfium_library`] would not need the network.
pub fn is_pdfium_cached() -> bool {
    locate().is_some()
}

// ── Download ─────────────────────────────────────────────────────────────────

static ENSURED: OnceLock<PathBuf> = OnceLock::new();

/// Return a library path, downloading into the cache if nothing is found.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` while the archive
/// streams in. The result is memoised for the rest of the process.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = ENSURED.get() {
        return Ok(path.clone());
    }

    let path = match locate() {
        Some(found) => found.path,
        None => download_to_cache(on_progress)?.path,
    };

    Ok(ENSURED.get_or_init(|| path).clone())
}

fn download_to_cache(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<LocatedLibrary, PdfiumAutoError> {
    let platform = Platform::current()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(PdfiumAutoError::CacheDir)?;

    let archive = fetch(&platform.download_url(), on_progress)?;
    let dest = dir.join(platform.lib_name);
    extract_member(&archive, platform.member, &dest)?;

    Ok(LocatedLibrary {
        path: dest,
        source: LibrarySource::Downloaded,
    })
}

/// Reader adapter that reports cumulative bytes after every read.
struct ProgressReader<'a, R> {
    inner: R,
    read: u64,
    total: Option<u64>,
    on_progress: Option<&'a dyn Fn(u64, Option<u64>)>,
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        if let Some(cb) = self.on_progress {
            cb(self.read, self.total);
        }
        Ok(n)
    }
}

fn fetch(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut reader = ProgressReader {
        inner: response,
        read: 0,
        total,
        on_progress,
    };

    let mut buf = Vec::with_capacity(total.unwrap_or(0) as usize);
    reader
        .read_to_end(&mut buf)
        .map_err(|e| PdfiumAutoError::Download(format!("Read error: {e}")))?;
    Ok(buf)
}

/// Extract `member` from a `.tgz` into `dest`.
///
/// The file is unpacked next to `dest` and renamed into place, so an
/// interrupted extraction never leaves a half-written library in the cache.
fn extract_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    let extract_err = |e: std::io::Error| PdfiumAutoError::Extract(e.to_string());

    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        if entry.path().map_err(extract_err)?.as_ref() != Path::new(member) {
            continue;
        }

        let partial = dest.with_extension("part");
        entry
            .unpack(&partial)
            .map_err(|e| PdfiumAutoError::Extract(format!("Unpack failed: {e}")))?;
        return std::fs::rename(&partial, dest).map_err(PdfiumAutoError::CacheDir);
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

// ── Binding ──────────────────────────────────────────────────────────────────

/// Bind the library at `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Bind without downloading: env override, then cache, then system library.
pub fn bind_pdfium_offline() -> Result<Pdfium, PdfiumAutoError> {
    if let Some(found) = ENSURED.get() {
        return bind_pdfium_from_path(found);
    }
    if let Some(found) = locate() {
        return bind_pdfium_from_path(&found.path);
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::SystemLibrary(e.to_string()))
}
