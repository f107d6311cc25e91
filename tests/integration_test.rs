use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use permit_pdf::config::{AppConfig, StationVariant};
use permit_pdf::export::{ExportOutcome, ExportPipeline};
use permit_pdf::fields;
use permit_pdf::form::FormState;
use permit_pdf::history::{HistoryRecord, HistoryStore, JsonFileStorage, HISTORY_CAP};
use permit_pdf::pdf::LetterPdfAssembler;
use permit_pdf::raster::{RasterOptions, Rasterizer};
use permit_pdf::template::PageTemplate;
use permit_pdf::AppError;

/// Deterministic stand-in for the glyph rasterizer: a blank page bitmap at
/// the requested density (CI has no guaranteed fonts).
struct StubRasterizer;

impl Rasterizer for StubRasterizer {
    fn rasterize(&self, _page: &PageTemplate, opts: &RasterOptions) -> Result<RgbImage, AppError> {
        let w = (85.0 * opts.scale) as u32;
        let h = (110.0 * opts.scale) as u32;
        Ok(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }
}

struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(&self, _page: &PageTemplate, _opts: &RasterOptions) -> Result<RgbImage, AppError> {
        Err(AppError::Raster("capture unavailable".to_string()))
    }
}

fn pipeline() -> ExportPipeline {
    ExportPipeline { open_fallback: false, ..Default::default() }
}

fn store_in(dir: &Path) -> HistoryStore {
    HistoryStore::load(Box::new(JsonFileStorage::new(dir.join("history.json"))))
}

fn export(
    rasterizer: &dyn Rasterizer,
    form: &FormState,
    history: &mut HistoryStore,
    out_dir: &Path,
) -> ExportOutcome {
    let cfg = AppConfig::default();
    pipeline()
        .run(
            Some(rasterizer),
            &LetterPdfAssembler,
            form,
            cfg.station(StationVariant::Gemini),
            history,
            out_dir,
        )
        .expect("export should not fail outright")
}

#[test]
fn test_export_writes_a_pdf_and_records_it() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut history = store_in(dir.path());
    let mut form = FormState::new();
    form.set(fields::MAWB, "123-45678901".to_string());
    form.set(fields::WEIGHT, "1842 KG".to_string());

    let outcome = export(&StubRasterizer, &form, &mut history, dir.path());
    let ExportOutcome::Saved { filename, path } = outcome else {
        panic!("expected a saved PDF");
    };
    assert_eq!(filename, "123-45678901_GEMINI_PTT.pdf");
    assert!(path.exists(), "PDF file was not created");

    let bytes = fs::read(&path).expect("Failed to read PDF");
    assert!(bytes.starts_with(b"%PDF"));

    let metadata = fs::metadata(&path).expect("Failed to get file metadata");
    assert!(metadata.len() > 1000, "PDF file is too small, likely empty or corrupt");

    assert_eq!(history.records().len(), 1);
    assert_eq!(history.records()[0].mawb, "123-45678901");
    assert_eq!(history.records()[0].variant, "GEMINI");
    assert_eq!(history.records()[0].filename, filename);
}

#[test]
fn test_empty_mawb_falls_back_to_unnamed() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut history = store_in(dir.path());

    let outcome = export(&StubRasterizer, &FormState::new(), &mut history, dir.path());
    let ExportOutcome::Saved { filename, .. } = outcome else {
        panic!("expected a saved PDF");
    };
    assert_eq!(filename, "unnamed_GEMINI_PTT.pdf");
    assert!(dir.path().join("unnamed_GEMINI_PTT.pdf").exists());
}

#[test]
fn test_history_cap_survives_a_reload() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut history = store_in(dir.path());
    for n in 0..25 {
        history.append(HistoryRecord::new(
            format!("{}_GEMINI_PTT.pdf", n),
            n.to_string(),
            "GEMINI".to_string(),
            b"%PDF-1.3 test",
        ));
    }

    let reloaded = store_in(dir.path());
    assert_eq!(reloaded.records().len(), HISTORY_CAP);
    assert_eq!(reloaded.records()[0].mawb, "24");
    assert_eq!(reloaded.records()[HISTORY_CAP - 1].mawb, "5");
}

#[test]
fn test_corrupt_history_file_loads_as_empty() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("history.json"), "{{ not json").expect("Failed to write");

    let history = store_in(dir.path());
    assert!(history.records().is_empty());
}

#[test]
fn test_capture_failure_takes_the_print_fallback() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut history = store_in(dir.path());
    let mut form = FormState::new();
    form.set(fields::MAWB, "074-99990000".to_string());
    form.set("BUP Info1", "PMC41407KE".to_string());
    form.set("Cartons Count1", "64".to_string());

    let outcome = export(&FailingRasterizer, &form, &mut history, dir.path());
    let ExportOutcome::FallbackPrinted { path, .. } = outcome else {
        panic!("expected the fallback page");
    };

    let html = fs::read_to_string(&path).expect("Failed to read fallback page");
    assert!(html.contains("<title>074-99990000</title>"));
    assert!(html.contains("PMC41407KE"));
    assert!(html.contains("window.print()"));

    // The fallback never records history.
    assert!(history.records().is_empty());
    assert!(!dir.path().join("history.json").exists());
}

#[test]
fn test_redownload_recreates_the_document() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut history = store_in(dir.path());
    let mut form = FormState::new();
    form.set(fields::MAWB, "160-55556666".to_string());

    let ExportOutcome::Saved { path, .. } =
        export(&StubRasterizer, &form, &mut history, dir.path())
    else {
        panic!("expected a saved PDF");
    };
    let original = fs::read(&path).expect("Failed to read PDF");
    fs::remove_file(&path).expect("Failed to remove PDF");

    let record = history.records()[0].clone();
    let rewritten = history.redownload(&record, dir.path()).expect("redownload failed");
    assert_eq!(fs::read(rewritten).expect("Failed to read"), original);
}
