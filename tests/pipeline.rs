//! Integration tests for the conversion loop.
//!
//! These run against an in-memory engine, so they need neither libpdfium nor
//! poppler-utils and always run. Real-engine coverage lives in `e2e.rs`.

use image::{Rgb, RgbImage};
use pdf2png::{
    convert, convert_with_engine, inspect_with_engine, ConversionConfig,
    ConversionProgressCallback, ConversionReport, FailurePolicy, PageOutput, PagePadding,
    PageSize, Pdf2PngError, RenderDocument, RenderEngine, RenderScale,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fake engine ──────────────────────────────────────────────────────────────

const LETTER: PageSize = PageSize {
    width_pt: 612.0,
    height_pt: 792.0,
};

/// Deterministic engine: each page is a flat colour derived from its index.
struct FakeEngine {
    pages: Vec<PageSize>,
    fail_on_page: Option<usize>,
    /// User password the document is encrypted with.
    password: Option<&'static str>,
    /// Fail in `open` as a truncated file would.
    truncated: bool,
    closed: Arc<AtomicUsize>,
}

impl FakeEngine {
    fn uniform(count: usize, size: PageSize) -> Self {
        Self {
            pages: vec![size; count],
            fail_on_page: None,
            password: None,
            truncated: false,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_on(mut self, page_num: usize) -> Self {
        self.fail_on_page = Some(page_num);
        self
    }

    fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    fn encrypted_with(mut self, password: &'static str) -> Self {
        self.password = Some(password);
        self
    }
}

struct FakeDocument<'a> {
    engine: &'a FakeEngine,
    /// Held for the document's lifetime, as pdfium does.
    _password: Option<&'a str>,
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2PngError> {
        if self.truncated {
            return Err(Pdf2PngError::DocumentOpen {
                path: path.to_path_buf(),
                engine: "fake",
                detail: "trailer not found".into(),
            });
        }
        match (self.password, password) {
            (Some(_), None) => Err(Pdf2PngError::PasswordRequired {
                path: path.to_path_buf(),
            }),
            (Some(expected), Some(given)) if expected != given => {
                Err(Pdf2PngError::WrongPassword {
                    path: path.to_path_buf(),
                })
            }
            _ => Ok(Box::new(FakeDocument {
                engine: self,
                _password: password,
            })),
        }
    }
}

impl RenderDocument for FakeDocument<'_> {
    fn page_count(&self) -> usize {
        self.engine.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, Pdf2PngError> {
        Ok(self.engine.pages[index])
    }

    fn render_page(&self, index: usize, scale: RenderScale) -> Result<RgbImage, Pdf2PngError> {
        let page = index + 1;
        if self.engine.fail_on_page == Some(page) {
            return Err(Pdf2PngError::PageRender {
                page,
                detail: "corrupt content stream".into(),
            });
        }
        let (w, h) = self.engine.pages[index].pixels_at(scale);
        let shade = (index * 37 % 256) as u8;
        Ok(RgbImage::from_fn(w, h, |x, _| {
            Rgb([shade, (x % 256) as u8, 255 - shade])
        }))
    }
}

impl Drop for FakeDocument<'_> {
    fn drop(&mut self) {
        self.engine.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn stub_pdf(dir: &Path) -> PathBuf {
    let path = dir.join("input.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    path
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

fn small_config() -> ConversionConfig {
    ConversionConfig::builder().dpi(36).build().unwrap()
}

// ── Output layout ────────────────────────────────────────────────────────────

#[test]
fn writes_one_numbered_png_per_page_and_nothing_else() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(3, LETTER);

    let report = convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    assert_eq!(report.pages_written, 3);
    assert_eq!(file_names(&out), ["page01.png", "page02.png", "page03.png"]);
    let nums: Vec<_> = report.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, [1, 2, 3]);
    assert_eq!(
        report.total_bytes,
        report.pages.iter().map(|p| p.file_size).sum::<u64>()
    );
    assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn pixel_dimensions_follow_dpi() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(1, LETTER);

    let config = ConversionConfig::builder().dpi(150).build().unwrap();
    let report = convert_with_engine(&engine, &source, tmp.path().join("150"), &config).unwrap();
    let page = &report.pages[0];
    assert_eq!((page.width, page.height), (1275, 1650));
    assert_eq!(image::image_dimensions(&page.path).unwrap(), (1275, 1650));

    let config = ConversionConfig::builder().dpi(72).build().unwrap();
    let report = convert_with_engine(&engine, &source, tmp.path().join("72"), &config).unwrap();
    assert_eq!(image::image_dimensions(&report.pages[0].path).unwrap(), (612, 792));
}

#[test]
fn written_files_are_rgb_pngs_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(2, LETTER);

    let report = convert_with_engine(&engine, &source, tmp.path(), &small_config()).unwrap();

    for page in &report.pages {
        let bytes = std::fs::read(&page.path).unwrap();
        assert_eq!(bytes.len() as u64, page.file_size);
        let decoded = image::open(&page.path).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }
}

#[test]
fn rerun_overwrites_with_identical_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(2, LETTER);

    let first = convert_with_engine(&engine, &source, &out, &small_config()).unwrap();
    let before: Vec<Vec<u8>> = first
        .pages
        .iter()
        .map(|p| std::fs::read(&p.path).unwrap())
        .collect();

    let second = convert_with_engine(&engine, &source, &out, &small_config()).unwrap();
    let after: Vec<Vec<u8>> = second
        .pages
        .iter()
        .map(|p| std::fs::read(&p.path).unwrap())
        .collect();

    assert_eq!(before, after);
    assert_eq!(file_names(&out), ["page01.png", "page02.png"]);
}

#[test]
fn padding_widens_for_large_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let tiny = PageSize {
        width_pt: 8.0,
        height_pt: 8.0,
    };
    let engine = FakeEngine::uniform(120, tiny);

    let report = convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    let names = file_names(&out);
    assert_eq!(names.len(), 120);
    assert_eq!(names.first().unwrap(), "page001.png");
    assert_eq!(names.last().unwrap(), "page120.png");
    assert_eq!(report.pages[9].file_name, "page010.png");
}

#[test]
fn fixed_padding_is_honoured() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(2, LETTER);
    let config = ConversionConfig::builder()
        .dpi(36)
        .padding(PagePadding::Fixed(4))
        .build()
        .unwrap();

    convert_with_engine(&engine, &source, &out, &config).unwrap();

    assert_eq!(file_names(&out), ["page0001.png", "page0002.png"]);
}

#[test]
fn empty_document_creates_directory_without_files() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(0, LETTER);

    let report = convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    assert_eq!(report.pages_written, 0);
    assert!(out.is_dir());
    assert!(file_names(&out).is_empty());
}

// ── Output directory ─────────────────────────────────────────────────────────

#[test]
fn nested_output_directory_is_created() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("public/chapters/chapter01");
    let engine = FakeEngine::uniform(1, LETTER);

    convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    assert_eq!(file_names(&out), ["page01.png"]);
}

#[test]
fn unrelated_files_in_output_directory_are_left_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("notes.txt"), b"keep me").unwrap();
    let engine = FakeEngine::uniform(1, LETTER);

    convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    assert_eq!(file_names(&out), ["notes.txt", "page01.png"]);
}

// ── Input errors ─────────────────────────────────────────────────────────────

#[test]
fn missing_source_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(1, LETTER);

    let err = convert_with_engine(&engine, tmp.path().join("nope.pdf"), &out, &small_config())
        .unwrap_err();

    assert!(matches!(err, Pdf2PngError::FileNotFound { .. }));
    assert!(!out.exists());
    assert_eq!(engine.closed.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_source_is_reported_before_engine_binding() {
    // `convert` binds pdfium; a missing file must fail first even when no
    // pdfium library is installed.
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");

    let err = convert(tmp.path().join("nope.pdf"), &out, &ConversionConfig::default())
        .unwrap_err();

    assert!(matches!(err, Pdf2PngError::FileNotFound { .. }));
    assert!(!out.exists());
}

#[test]
fn non_pdf_source_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("image.png");
    std::fs::write(&source, b"\x89PNG\r\n\x1a\n").unwrap();
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(1, LETTER);

    let err = convert_with_engine(&engine, &source, &out, &small_config()).unwrap_err();

    assert!(matches!(err, Pdf2PngError::NotAPdf { .. }));
    assert!(!out.exists());
}

#[test]
fn header_after_leading_line_break_is_converted() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("crlf.pdf");
    std::fs::write(&source, b"\r\n%PDF-1.4\n%%EOF\n").unwrap();
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(1, LETTER);

    convert_with_engine(&engine, &source, &out, &small_config()).unwrap();

    assert_eq!(file_names(&out), ["page01.png"]);
}

// ── Document open ────────────────────────────────────────────────────────────

#[test]
fn document_open_failure_writes_no_pages() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(3, LETTER).encrypted_with("secret");
    let recorder = Arc::new(RecordingCallback::default());
    let config = ConversionConfig::builder()
        .dpi(36)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = convert_with_engine(&engine, &source, &out, &config).unwrap_err();

    assert!(matches!(err, Pdf2PngError::PasswordRequired { .. }), "got {err:?}");
    assert!(!err.is_page_failure());
    assert!(file_names(&out).is_empty());
    assert_eq!(engine.closed.load(Ordering::SeqCst), 0);
    assert!(recorder.events.lock().unwrap().is_empty());
}

#[test]
fn unreadable_document_fails_before_any_page() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(2, LETTER).truncated();
    let config = ConversionConfig::builder()
        .dpi(36)
        .failure_policy(FailurePolicy::Rollback)
        .build()
        .unwrap();

    let err = convert_with_engine(&engine, &source, &out, &config).unwrap_err();

    assert!(matches!(err, Pdf2PngError::DocumentOpen { .. }), "got {err:?}");
    assert_eq!(err.page(), None);
    assert!(out.is_dir());
    assert!(file_names(&out).is_empty());
    assert_eq!(engine.closed.load(Ordering::SeqCst), 0);
}

#[test]
fn wrong_password_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(1, LETTER).encrypted_with("secret");
    let config = ConversionConfig::builder()
        .dpi(36)
        .password("guess")
        .build()
        .unwrap();

    let err = convert_with_engine(&engine, &source, tmp.path().join("out"), &config).unwrap_err();

    assert!(matches!(err, Pdf2PngError::WrongPassword { .. }), "got {err:?}");
}

#[test]
fn password_is_held_by_the_open_document() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(2, LETTER).encrypted_with("secret");
    // Built at runtime so the borrow is shorter than 'static.
    let password = String::from("sec") + "ret";
    let config = ConversionConfig::builder()
        .dpi(36)
        .password(password)
        .build()
        .unwrap();

    convert_with_engine(&engine, &source, &out, &config).unwrap();
    inspect_with_engine(&engine, &source, &config).unwrap();

    assert_eq!(file_names(&out), ["page01.png", "page02.png"]);
    assert_eq!(engine.closed.load(Ordering::SeqCst), 2);
}

// ── Page failures ────────────────────────────────────────────────────────────

#[test]
fn page_failure_keeps_earlier_pages_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(5, LETTER).failing_on(3);

    let err = convert_with_engine(&engine, &source, &out, &small_config()).unwrap_err();

    assert!(err.is_page_failure());
    assert_eq!(err.page(), Some(3));
    assert_eq!(file_names(&out), ["page01.png", "page02.png"]);
    assert_eq!(engine.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn rollback_removes_pages_written_by_failed_run() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let out = tmp.path().join("out");
    let engine = FakeEngine::uniform(5, LETTER).failing_on(4);
    let config = ConversionConfig::builder()
        .dpi(36)
        .failure_policy(FailurePolicy::Rollback)
        .build()
        .unwrap();

    let err = convert_with_engine(&engine, &source, &out, &config).unwrap_err();

    assert_eq!(err.page(), Some(4));
    assert!(out.is_dir());
    assert!(file_names(&out).is_empty());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ConversionProgressCallback for RecordingCallback {
    fn on_conversion_start(&self, total_pages: usize, _output_dir: &Path) {
        self.push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.push(format!("page {page_num}"));
    }
    fn on_page_complete(&self, page: &PageOutput, _total: usize) {
        self.push(format!("saved {}", page.file_name));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.push(format!("error {page_num}"));
    }
    fn on_conversion_complete(&self, report: &ConversionReport) {
        self.push(format!("done {}", report.pages_written));
    }
}

#[test]
fn progress_events_arrive_in_page_order() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(2, LETTER);
    let recorder = Arc::new(RecordingCallback::default());
    let config = ConversionConfig::builder()
        .dpi(36)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_with_engine(&engine, &source, tmp.path().join("out"), &config).unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        [
            "start 2",
            "page 1",
            "saved page01.png",
            "page 2",
            "saved page02.png",
            "done 2"
        ]
    );
}

#[test]
fn progress_reports_the_failing_page_and_stops() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(3, LETTER).failing_on(2);
    let recorder = Arc::new(RecordingCallback::default());
    let config = ConversionConfig::builder()
        .dpi(36)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_with_engine(&engine, &source, tmp.path().join("out"), &config).unwrap_err();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        ["start 3", "page 1", "saved page01.png", "page 2", "error 2"]
    );
}

// ── Inspection ───────────────────────────────────────────────────────────────

#[test]
fn inspect_plans_files_without_writing() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let a4 = PageSize {
        width_pt: 595.0,
        height_pt: 842.0,
    };
    let engine = FakeEngine {
        pages: vec![LETTER, a4],
        fail_on_page: None,
        password: None,
        truncated: false,
        closed: Arc::new(AtomicUsize::new(0)),
    };
    let config = ConversionConfig::builder().dpi(150).build().unwrap();

    let info = inspect_with_engine(&engine, &source, &config).unwrap();

    assert_eq!(info.page_count, 2);
    assert_eq!(info.pages[0].file_name, "page01.png");
    assert_eq!((info.pages[0].width_px, info.pages[0].height_px), (1275, 1650));
    assert_eq!(info.pages[1].file_name, "page02.png");
    assert_eq!((info.pages[1].width_px, info.pages[1].height_px), (1240, 1754));
    assert_eq!(file_names(tmp.path()), ["input.pdf"]);
}

#[test]
fn report_serialises_to_json() {
    let tmp = tempfile::tempdir().unwrap();
    let source = stub_pdf(tmp.path());
    let engine = FakeEngine::uniform(1, LETTER);

    let report =
        convert_with_engine(&engine, &source, tmp.path().join("out"), &small_config()).unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();

    assert_eq!(json["engine"], "pdfium");
    assert_eq!(json["dpi"], 36);
    assert_eq!(json["pages"][0]["file_name"], "page01.png");
}
