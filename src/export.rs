//! The export pipeline: compose the page, rasterize it, assemble the PDF,
//! derive the filename, record it in the history and save it, with the
//! print-window fallback when capture fails. One invocation is strictly
//! sequential; nothing orders two invocations against each other.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::StationConfig;
use crate::error::AppError;
use crate::fields;
use crate::form::FormState;
use crate::history::{HistoryRecord, HistoryStore};
use crate::html;
use crate::pdf::PageAssembler;
use crate::raster::{RasterOptions, Rasterizer};
use crate::template;

/// Filename stem when the MAWB field is empty.
const UNNAMED: &str = "unnamed";

/// `{MAWB|unnamed}_{TAG}_PTT.pdf`
pub fn derive_filename(mawb: &str, tag: &str) -> String {
    format!("{}_{}_PTT.pdf", identifying_number(mawb), tag)
}

/// The number that titles the document and names the file.
pub fn identifying_number(mawb: &str) -> &str {
    if mawb.is_empty() {
        UNNAMED
    } else {
        mawb
    }
}

/// What an export invocation produced.
#[derive(Debug)]
pub enum ExportOutcome {
    /// PDF written and recorded in the history.
    Saved { filename: String, path: PathBuf },
    /// Capture failed; a printable page was written (and opened) instead.
    /// No history record.
    FallbackPrinted { path: PathBuf, reason: String },
    /// The readiness gate has not reported yet; retry is manual.
    NotReady,
}

pub struct ExportPipeline {
    pub raster_opts: RasterOptions,
    /// Whether the fallback page is handed to the platform viewer (tests
    /// turn this off).
    pub open_fallback: bool,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        ExportPipeline { raster_opts: RasterOptions::default(), open_fallback: true }
    }
}

impl ExportPipeline {
    /// Runs one export. `rasterizer` is `None` while the asset gate is not
    /// ready. Errors escape only when even the fallback page cannot be
    /// written.
    pub fn run(
        &self,
        rasterizer: Option<&dyn Rasterizer>,
        assembler: &dyn PageAssembler,
        form: &FormState,
        station: &StationConfig,
        history: &mut HistoryStore,
        out_dir: &Path,
    ) -> Result<ExportOutcome, AppError> {
        let Some(rasterizer) = rasterizer else {
            return Ok(ExportOutcome::NotReady);
        };

        let page = template::compose(form, station);
        let number = identifying_number(form.get(fields::MAWB)).to_string();
        let filename = derive_filename(form.get(fields::MAWB), &station.tag);

        let captured = rasterizer
            .rasterize(&page, &self.raster_opts)
            .and_then(|bitmap| assembler.assemble(&bitmap));

        match captured {
            Ok(bytes) => {
                let record =
                    HistoryRecord::new(filename.clone(), number, station.tag.clone(), &bytes);
                history.append(record);

                std::fs::create_dir_all(out_dir)?;
                let path = out_dir.join(&filename);
                let file = File::create(&path)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(&bytes)?;
                writer.flush()?;
                Ok(ExportOutcome::Saved { filename, path })
            }
            Err(e) => {
                log::warn!("Capture failed, taking the print fallback: {}", e);
                let shell = html::print_shell(&page, &number);
                std::fs::create_dir_all(out_dir)?;
                let path = out_dir.join(format!("{}_{}_PTT.html", number, station.tag));
                std::fs::write(&path, shell)?;
                if self.open_fallback {
                    open_document(&path);
                }
                Ok(ExportOutcome::FallbackPrinted { path, reason: e.to_string() })
            }
        }
    }
}

/// Hands a document to the platform's default handler, best effort.
fn open_document(path: &Path) {
    #[cfg(target_os = "windows")]
    let spawned = std::process::Command::new("cmd")
        .args(["/c", "start", ""])
        .arg(path)
        .spawn();
    #[cfg(target_os = "macos")]
    let spawned = std::process::Command::new("open").arg(path).spawn();
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let spawned = std::process::Command::new("xdg-open").arg(path).spawn();

    if let Err(e) = spawned {
        log::warn!("Could not open {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StationVariant};
    use crate::history::HistoryStorage;
    use image::{Rgb, RgbImage};

    struct NullStorage;

    impl HistoryStorage for NullStorage {
        fn load(&self) -> Option<String> {
            None
        }
        fn save(&self, _raw: &str) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct StubRasterizer;

    impl Rasterizer for StubRasterizer {
        fn rasterize(
            &self,
            _page: &template::PageTemplate,
            _opts: &RasterOptions,
        ) -> Result<RgbImage, AppError> {
            Ok(RgbImage::from_pixel(16, 16, Rgb([255, 255, 255])))
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn rasterize(
            &self,
            _page: &template::PageTemplate,
            _opts: &RasterOptions,
        ) -> Result<RgbImage, AppError> {
            Err(AppError::Raster("injected capture failure".to_string()))
        }
    }

    struct StubAssembler;

    impl PageAssembler for StubAssembler {
        fn assemble(&self, _bitmap: &RgbImage) -> Result<Vec<u8>, AppError> {
            Ok(b"%PDF-1.3 stub".to_vec())
        }
    }

    fn pipeline() -> ExportPipeline {
        ExportPipeline { open_fallback: false, ..Default::default() }
    }

    #[test]
    fn filenames_derive_from_the_mawb_field() {
        assert_eq!(derive_filename("123-45678901", "GEMINI"), "123-45678901_GEMINI_PTT.pdf");
        assert_eq!(derive_filename("", "CHOICE"), "unnamed_CHOICE_PTT.pdf");
    }

    #[test]
    fn not_ready_aborts_without_a_record() {
        let cfg = AppConfig::default();
        let mut history = HistoryStore::load(Box::new(NullStorage));
        let dir = tempfile::tempdir().unwrap();
        let outcome = pipeline()
            .run(
                None,
                &StubAssembler,
                &FormState::new(),
                cfg.station(StationVariant::Gemini),
                &mut history,
                dir.path(),
            )
            .unwrap();
        assert!(matches!(outcome, ExportOutcome::NotReady));
        assert!(history.records().is_empty());
    }

    #[test]
    fn a_successful_export_records_and_saves() {
        let cfg = AppConfig::default();
        let mut history = HistoryStore::load(Box::new(NullStorage));
        let dir = tempfile::tempdir().unwrap();
        let mut form = FormState::new();
        form.set(fields::MAWB, "160-11112222".to_string());

        let outcome = pipeline()
            .run(
                Some(&StubRasterizer),
                &StubAssembler,
                &form,
                cfg.station(StationVariant::Gemini),
                &mut history,
                dir.path(),
            )
            .unwrap();

        match outcome {
            ExportOutcome::Saved { filename, path } => {
                assert_eq!(filename, "160-11112222_GEMINI_PTT.pdf");
                assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.3 stub");
            }
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.records()[0].mawb, "160-11112222");
        assert_eq!(history.records()[0].variant, "GEMINI");
    }

    #[test]
    fn capture_failure_takes_the_fallback_and_records_nothing() {
        let cfg = AppConfig::default();
        let mut history = HistoryStore::load(Box::new(NullStorage));
        let dir = tempfile::tempdir().unwrap();
        let mut form = FormState::new();
        form.set(fields::MAWB, "160-33334444".to_string());
        form.set("BUP Info1", "PMC70022KE".to_string());

        let outcome = pipeline()
            .run(
                Some(&FailingRasterizer),
                &StubAssembler,
                &form,
                cfg.station(StationVariant::Choice),
                &mut history,
                dir.path(),
            )
            .unwrap();

        match outcome {
            ExportOutcome::FallbackPrinted { path, reason } => {
                let html = std::fs::read_to_string(path).unwrap();
                // The fallback page shows the same values the capture would.
                assert!(html.contains("PMC70022KE"));
                assert!(html.contains("<title>160-33334444</title>"));
                assert!(reason.contains("injected capture failure"));
            }
            other => panic!("expected FallbackPrinted, got {:?}", other),
        }
        assert!(history.records().is_empty());
    }
}
