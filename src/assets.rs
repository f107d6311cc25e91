//! Rendering assets and the readiness gate. Fonts and artwork load on a
//! background thread at startup; the export pipeline refuses to run until
//! the gate reports ready. Artwork that cannot be loaded degrades to "render
//! without it"; a missing font surfaces later as a rasterization failure.

use image::DynamicImage;
use rusttype::Font;
use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::config::AssetSources;
use crate::error::AppError;

/// Regular/bold faces the rasterizer draws with.
#[derive(Clone)]
pub struct FontPair {
    pub regular: Font<'static>,
    pub bold: Font<'static>,
}

/// Everything the rasterizer needs, loaded once per session.
pub struct RenderAssets {
    pub fonts: Option<FontPair>,
    pub logo: Option<DynamicImage>,
    pub signature: Option<DynamicImage>,
}

const REGULAR_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BOLD_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

fn font_from_path(path: &str) -> Option<Font<'static>> {
    let data = std::fs::read(path).ok()?;
    Font::try_from_vec(data)
}

/// Configured font paths first, then well-known system locations. A missing
/// bold face falls back to the regular one.
pub fn load_fonts(sources: &AssetSources) -> Option<FontPair> {
    let regular = sources
        .font
        .as_deref()
        .and_then(font_from_path)
        .or_else(|| REGULAR_CANDIDATES.iter().find_map(|p| font_from_path(p)))?;
    let bold = sources
        .font_bold
        .as_deref()
        .and_then(font_from_path)
        .or_else(|| BOLD_CANDIDATES.iter().find_map(|p| font_from_path(p)))
        .unwrap_or_else(|| regular.clone());
    Some(FontPair { regular, bold })
}

/// Loads artwork from a URL or a local file path.
pub fn load_image(source: &str) -> Result<DynamicImage, AppError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let response = ureq::get(source)
            .call()
            .map_err(|e| AppError::Image(format!("Failed to fetch URL: {}", e)))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AppError::Image(format!("Failed to read response: {}", e)))?;
        bytes
    } else {
        std::fs::read(source).map_err(|e| AppError::Image(format!("{}: {}", source, e)))?
    };

    image::load_from_memory(&bytes)
        .map_err(|e| AppError::Image(format!("Failed to decode image: {}", e)))
}

/// Loads everything; never fails. Missing pieces are logged and left out.
pub fn load_render_assets(sources: &AssetSources, offline: bool) -> RenderAssets {
    let fonts = load_fonts(sources);
    if fonts.is_none() {
        log::warn!("No usable font found; exports will take the print fallback");
    }

    let fetch = |source: &Option<String>, what: &str| -> Option<DynamicImage> {
        let source = source.as_deref()?;
        if offline && (source.starts_with("http://") || source.starts_with("https://")) {
            log::info!("Offline mode, skipping remote {}", what);
            return None;
        }
        match load_image(source) {
            Ok(art) => Some(art),
            Err(e) => {
                log::warn!("Could not load {}: {}", what, e);
                None
            }
        }
    };

    RenderAssets {
        fonts,
        logo: fetch(&sources.logo, "logo"),
        signature: fetch(&sources.signature, "signature artwork"),
    }
}

/// Two-state readiness gate: `poll` returns `None` until the background
/// loader reports, then the loaded assets forever after.
pub struct AssetGate {
    rx: Receiver<RenderAssets>,
    ready: Option<Arc<RenderAssets>>,
}

impl AssetGate {
    /// Starts the background loader.
    pub fn spawn(sources: AssetSources, offline: bool) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(load_render_assets(&sources, offline));
        });
        AssetGate { rx, ready: None }
    }

    /// An already-ready gate (tests, synchronous tooling).
    pub fn ready(assets: RenderAssets) -> Self {
        let (_tx, rx) = mpsc::channel();
        AssetGate { rx, ready: Some(Arc::new(assets)) }
    }

    pub fn poll(&mut self) -> Option<Arc<RenderAssets>> {
        if self.ready.is_none() {
            if let Ok(assets) = self.rx.try_recv() {
                self.ready = Some(Arc::new(assets));
            }
        }
        self.ready.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_stays_not_ready_until_the_loader_reports() {
        let (tx, rx) = mpsc::channel();
        let mut gate = AssetGate { rx, ready: None };
        assert!(gate.poll().is_none());
        tx.send(RenderAssets { fonts: None, logo: None, signature: None }).unwrap();
        assert!(gate.poll().is_some());
        // Ready is sticky.
        assert!(gate.poll().is_some());
    }

    #[test]
    fn a_prebuilt_gate_is_ready_immediately() {
        let mut gate =
            AssetGate::ready(RenderAssets { fonts: None, logo: None, signature: None });
        assert!(gate.poll().is_some());
    }

    #[test]
    fn image_loading_reports_missing_files() {
        assert!(matches!(
            load_image("/no/such/artwork.png"),
            Err(AppError::Image(_))
        ));
    }
}
