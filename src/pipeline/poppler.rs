//! Rasterisation through the poppler-utils command-line tools.
//!
//! `pdfinfo` supplies the page count and page geometry, `pdftoppm` renders a
//! single page per invocation into a scratch directory that lives as long as
//! the open document. Each rendered PNG is decoded back into an RGB buffer so
//! the rest of the pipeline (encoding, naming, writing) is identical for both
//! engines.
//!
//! Tools are looked up on `PATH`, or in the directory named by
//! `POPPLER_PATH` when it is set.

use crate::error::Pdf2PngError;
use crate::pipeline::engine::{PageSize, RenderDocument, RenderEngine, RenderScale};
use image::RgbImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Environment variable naming the directory that holds `pdfinfo` and `pdftoppm`.
pub const POPPLER_PATH_ENV: &str = "POPPLER_PATH";

static PAGE_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^Page\s+(?:(\d+)\s+)?size:\s+([0-9.]+)\s+x\s+([0-9.]+)\s+pts").unwrap()
});

static PAGE_ROT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Page\s+(?:(\d+)\s+)?rot:\s+(\d+)").unwrap());

/// [`RenderEngine`] that shells out to poppler-utils.
#[derive(Debug, Clone, Default)]
pub struct PopplerEngine {
    tool_dir: Option<PathBuf>,
}

impl PopplerEngine {
    /// Use `POPPLER_PATH` if set, otherwise rely on `PATH`.
    pub fn from_env() -> Self {
        let tool_dir = std::env::var_os(POPPLER_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { tool_dir }
    }

    /// Use the tools in `dir`.
    pub fn with_tool_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_dir: Some(dir.into()),
        }
    }

    fn tool(&self, name: &str) -> PathBuf {
        let file = format!("{name}{}", std::env::consts::EXE_SUFFIX);
        match &self.tool_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    /// Run a poppler tool to completion. Only a failure to spawn is an error
    /// here; callers inspect the exit status themselves.
    fn run(&self, name: &'static str, args: &[OsString]) -> Result<Output, Pdf2PngError> {
        let program = self.tool(name);
        debug!("Running {} {:?}", program.display(), args);

        Command::new(&program).args(args).output().map_err(|e| {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                format!(
                    "'{}' not found. Install poppler-utils or set {POPPLER_PATH_ENV} \
                     to the directory containing it.",
                    program.display()
                )
            } else {
                format!("failed to run '{}': {e}", program.display())
            };
            Pdf2PngError::EngineUnavailable {
                engine: "poppler",
                detail,
            }
        })
    }
}

impl RenderEngine for PopplerEngine {
    fn name(&self) -> &'static str {
        "poppler"
    }

    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2PngError> {
        let mut args = password_args(password);
        args.push(path.into());

        let output = self.run("pdfinfo", &args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(open_error(path, password.is_some(), stderr.trim()));
        }

        let page_count = parse_page_count(&stdout).ok_or_else(|| Pdf2PngError::DocumentOpen {
            path: path.to_path_buf(),
            engine: "poppler",
            detail: "pdfinfo did not report a page count".into(),
        })?;

        let scratch = tempfile::Builder::new()
            .prefix("pdf2png-")
            .tempdir()
            .map_err(|e| Pdf2PngError::Internal(format!("scratch directory: {e}")))?;

        info!("PDF loaded: {} pages", page_count);
        Ok(Box::new(PopplerDocument {
            engine: self,
            path: path.to_path_buf(),
            password: password.map(str::to_string),
            page_count,
            scratch,
        }))
    }
}

struct PopplerDocument<'a> {
    engine: &'a PopplerEngine,
    path: PathBuf,
    password: Option<String>,
    page_count: usize,
    /// Receives one `pdftoppm` output at a time; removed on drop.
    scratch: TempDir,
}

impl PopplerDocument<'_> {
    fn page_args(&self, page_num: usize) -> Vec<OsString> {
        let mut args = password_args(self.password.as_deref());
        args.extend([
            OsString::from("-f"),
            OsString::from(page_num.to_string()),
            OsString::from("-l"),
            OsString::from(page_num.to_string()),
        ]);
        args
    }
}

impl RenderDocument for PopplerDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, index: usize) -> Result<PageSize, Pdf2PngError> {
        let page_num = index + 1;
        let mut args = self.page_args(page_num);
        args.push(self.path.clone().into_os_string());

        let output = self.engine.run("pdfinfo", &args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(Pdf2PngError::PageRender {
                page: page_num,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_page_size(&stdout, page_num).ok_or_else(|| Pdf2PngError::PageRender {
            page: page_num,
            detail: "pdfinfo did not report a page size".into(),
        })
    }

    fn render_page(&self, index: usize, scale: RenderScale) -> Result<RgbImage, Pdf2PngError> {
        let page_num = index + 1;
        let prefix = self.scratch.path().join("page");

        let mut args = self.page_args(page_num);
        args.extend([
            OsString::from("-png"),
            OsString::from("-singlefile"),
            OsString::from("-r"),
            OsString::from(scale.dpi().to_string()),
            self.path.clone().into_os_string(),
            prefix.clone().into_os_string(),
        ]);

        let output = self.engine.run("pdftoppm", &args)?;
        if !output.status.success() {
            return Err(Pdf2PngError::PageRender {
                page: page_num,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let rendered = prefix.with_extension("png");
        let image = image::open(&rendered)
            .map_err(|e| Pdf2PngError::PageRender {
                page: page_num,
                detail: format!("reading pdftoppm output: {e}"),
            })?
            .to_rgb8();

        if let Err(e) = std::fs::remove_file(&rendered) {
            warn!("Could not remove {}: {}", rendered.display(), e);
        }

        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

fn password_args(password: Option<&str>) -> Vec<OsString> {
    match password {
        Some(pwd) => vec!["-upw".into(), pwd.into()],
        None => Vec::new(),
    }
}

/// Map a failed `pdfinfo` run onto the password / corrupt-file variants.
fn open_error(path: &Path, had_password: bool, stderr: &str) -> Pdf2PngError {
    if stderr.to_lowercase().contains("incorrect password") {
        if had_password {
            Pdf2PngError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2PngError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2PngError::DocumentOpen {
            path: path.to_path_buf(),
            engine: "poppler",
            detail: stderr.to_string(),
        }
    }
}

/// Extract the `Pages:` line of `pdfinfo` output.
fn parse_page_count(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|v| v.trim().parse().ok())
}

/// Extract the size of `page_num` from `pdfinfo` output, swapping width and
/// height for pages rotated by 90° or 270° as `pdftoppm` does.
///
/// Accepts both the numbered form printed with `-f/-l` and the single
/// `Page size:` line printed without.
fn parse_page_size(info: &str, page_num: usize) -> Option<PageSize> {
    let matches_page = |num: Option<regex::Match<'_>>| match num {
        Some(m) => m.as_str().parse::<usize>().ok() == Some(page_num),
        None => true,
    };

    let caps = PAGE_SIZE_RE
        .captures_iter(info)
        .find(|c| matches_page(c.get(1)))?;
    let width_pt: f32 = caps[2].parse().ok()?;
    let height_pt: f32 = caps[3].parse().ok()?;

    let rotation: u32 = PAGE_ROT_RE
        .captures_iter(info)
        .find(|c| matches_page(c.get(1)))
        .and_then(|c| c[2].parse().ok())
        .unwrap_or(0);

    if rotation % 180 == 90 {
        Some(PageSize {
            width_pt: height_pt,
            height_pt: width_pt,
        })
    } else {
        Some(PageSize {
            width_pt,
            height_pt,
        })
    }
}
