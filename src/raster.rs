//! Rasterization service: draws a composed [`PageTemplate`] into an RGB
//! bitmap at a configurable pixel-density scale. The export pipeline treats
//! this as an opaque service ("given a composed page, return a bitmap") and
//! recovers through the print fallback when it fails.

use image::{DynamicImage, Rgb, RgbImage};
use rusttype::{point, Font, Scale};

use crate::assets::{FontPair, RenderAssets};
use crate::error::AppError;
use crate::template::{
    PageTemplate, ACK_BREAKDOWN, ACK_DATE_TIME, ACK_LOOSE_PCS, ACK_NO_OF_PALLETS,
    ACK_RECEIVED_BY, CONDITION_LINE, PERMIT_TITLE, RETURN_LABEL, SIGNATURE_CAPTIONS,
    TABLE_HEADERS,
};

// ============================================================================
// Page geometry (CSS px at 1x; a US letter page at 96 dpi)
// ============================================================================

pub const PAGE_WIDTH_PX: f32 = 816.0;
pub const PAGE_HEIGHT_PX: f32 = 1056.0;

/// Exports capture at twice the base density.
pub const DEFAULT_SCALE: f32 = 2.0;

const PAGE_PAD: f32 = 38.0;
const CONTENT_W: f32 = PAGE_WIDTH_PX - 2.0 * PAGE_PAD;

const LOGO_WIDTH: f32 = 140.0;
const TITLE_SIZE: f32 = 26.0;
const LABEL_SIZE: f32 = 12.0;
const VALUE_SIZE: f32 = 16.0;
const PERMIT_TITLE_SIZE: f32 = 13.0;
const FIRMS_CODE_SIZE: f32 = 36.0;
const BODY_SIZE: f32 = 12.0;
const FOOTER_SIZE: f32 = 11.0;
const CAPTION_SIZE: f32 = 9.0;

const UNDERLINE_X: f32 = PAGE_PAD + 80.0;
const UNDERLINE_W: f32 = 250.0;

/// Column widths; the carrier and AWB columns have fixed widths on the
/// printed form, the other four split the remainder evenly.
const TABLE_COL_W: [f32; 6] = [115.0, 115.0, 100.0, 180.0, 115.0, 115.0];
const TABLE_HEADER_H: f32 = 34.0;
const TABLE_ROW_H: f32 = 47.0;

const SIGNATURE_IMG_H: f32 = 35.0;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ============================================================================
// Service contract
// ============================================================================

/// Capture options handed to the rasterizer by the export pipeline.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Pixel-density multiplier applied to the whole page.
    pub scale: f32,
    /// Whether unavailable logo/signature artwork is tolerated (capture
    /// proceeds without it) or treated as a rasterization failure.
    pub allow_missing_images: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        RasterOptions { scale: DEFAULT_SCALE, allow_missing_images: true }
    }
}

/// "Given a composed page, return a bitmap."
pub trait Rasterizer {
    fn rasterize(&self, page: &PageTemplate, opts: &RasterOptions) -> Result<RgbImage, AppError>;
}

// ============================================================================
// Canvas primitives
// ============================================================================

/// White page bitmap with helpers taking coordinates in 1x CSS px.
struct Canvas {
    img: RgbImage,
    scale: f32,
}

impl Canvas {
    fn new(scale: f32) -> Self {
        let w = (PAGE_WIDTH_PX * scale).round() as u32;
        let h = (PAGE_HEIGHT_PX * scale).round() as u32;
        Canvas { img: RgbImage::from_pixel(w, h, WHITE), scale }
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>) {
        let x0 = (x * self.scale).round().max(0.0) as u32;
        let y0 = (y * self.scale).round().max(0.0) as u32;
        let x1 = (((x + w) * self.scale).round() as u32).min(self.img.width());
        let y1 = (((y + h) * self.scale).round() as u32).min(self.img.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.img.put_pixel(px, py, color);
            }
        }
    }

    fn hline(&mut self, x: f32, y: f32, w: f32, thickness: f32) {
        self.fill_rect(x, y, w, thickness, BLACK);
    }

    fn vline(&mut self, x: f32, y: f32, h: f32, thickness: f32) {
        self.fill_rect(x, y, thickness, h, BLACK);
    }

    fn rect_outline(&mut self, x: f32, y: f32, w: f32, h: f32, thickness: f32) {
        self.hline(x, y, w, thickness);
        self.hline(x, y + h - thickness, w, thickness);
        self.vline(x, y, h, thickness);
        self.vline(x + w - thickness, y, h, thickness);
    }

    /// Draws `text` with its top edge at `y`, returning the advance width in
    /// CSS px. Glyph coverage is alpha-blended onto the page.
    fn text(&mut self, font: &Font, size: f32, x: f32, y: f32, text: &str) -> f32 {
        let dev_scale = Scale::uniform(size * self.scale);
        let v_metrics = font.v_metrics(dev_scale);
        let origin = point(x * self.scale, y * self.scale + v_metrics.ascent);
        let mut advance = 0.0f32;
        for glyph in font.layout(text, dev_scale, origin) {
            advance = glyph.position().x - origin.x + glyph.unpositioned().h_metrics().advance_width;
            if let Some(bb) = glyph.pixel_bounding_box() {
                let (img_w, img_h) = (self.img.width() as i32, self.img.height() as i32);
                glyph.draw(|gx, gy, coverage| {
                    let px = bb.min.x + gx as i32;
                    let py = bb.min.y + gy as i32;
                    if px >= 0 && px < img_w && py >= 0 && py < img_h {
                        let pixel = self.img.get_pixel_mut(px as u32, py as u32);
                        for c in 0..3 {
                            pixel[c] = (pixel[c] as f32 * (1.0 - coverage)).round() as u8;
                        }
                    }
                });
            }
        }
        advance / self.scale
    }

    fn text_width(&self, font: &Font, size: f32, text: &str) -> f32 {
        let dev_scale = Scale::uniform(size * self.scale);
        font.layout(text, dev_scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
            / self.scale
    }

    /// Centers `text` horizontally inside `[x, x + w]`.
    fn text_centered(&mut self, font: &Font, size: f32, x: f32, w: f32, y: f32, text: &str) {
        let tw = self.text_width(font, size, text);
        self.text(font, size, x + (w - tw) / 2.0, y, text);
    }

    /// Composites artwork against the white page (transparency flattened the
    /// same way the PDF embedder flattens it) scaled to `target_w` CSS px.
    fn draw_image(&mut self, art: &DynamicImage, x: f32, y: f32, target_w: f32) {
        let rgba = art.to_rgba8();
        let (src_w, src_h) = rgba.dimensions();
        if src_w == 0 || src_h == 0 {
            return;
        }
        let dev_w = (target_w * self.scale).round().max(1.0) as u32;
        let dev_h =
            ((target_w * self.scale) * src_h as f32 / src_w as f32).round().max(1.0) as u32;
        let resized =
            image::imageops::resize(&rgba, dev_w, dev_h, image::imageops::FilterType::Triangle);
        let x0 = (x * self.scale).round() as i64;
        let y0 = (y * self.scale).round() as i64;
        for (sx, sy, pixel) in resized.enumerate_pixels() {
            let px = x0 + sx as i64;
            let py = y0 + sy as i64;
            if px < 0 || py < 0 || px >= self.img.width() as i64 || py >= self.img.height() as i64
            {
                continue;
            }
            let alpha = pixel[3] as f32 / 255.0;
            let dst = self.img.get_pixel_mut(px as u32, py as u32);
            for c in 0..3 {
                dst[c] =
                    (pixel[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha)).round() as u8;
            }
        }
    }

    /// Width-to-height ratio of a piece of artwork.
    fn aspect(art: &DynamicImage) -> f32 {
        let (w, h) = (art.width(), art.height());
        if h == 0 {
            1.0
        } else {
            w as f32 / h as f32
        }
    }
}

// ============================================================================
// Production rasterizer
// ============================================================================

/// Draws the permit page with rusttype glyphs and the loaded artwork.
/// Constructing one never fails; a missing font surfaces as a rasterization
/// error so the export pipeline can take its fallback.
pub struct GlyphRasterizer {
    fonts: Option<FontPair>,
    logo: Option<DynamicImage>,
    signature: Option<DynamicImage>,
}

impl GlyphRasterizer {
    pub fn from_assets(assets: &RenderAssets) -> Self {
        GlyphRasterizer {
            fonts: assets.fonts.clone(),
            logo: assets.logo.clone(),
            signature: assets.signature.clone(),
        }
    }

    fn check_artwork(&self, opts: &RasterOptions) -> Result<(), AppError> {
        if opts.allow_missing_images {
            return Ok(());
        }
        if self.logo.is_none() {
            return Err(AppError::Image("logo artwork unavailable".to_string()));
        }
        if self.signature.is_none() {
            return Err(AppError::Image("signature artwork unavailable".to_string()));
        }
        Ok(())
    }

    /// Bold label + centered value over a fixed-width rule.
    fn underline_field(&self, canvas: &mut Canvas, fonts: &FontPair, y: f32, label: &str, value: &str) {
        canvas.text(&fonts.bold, LABEL_SIZE, PAGE_PAD, y + 5.0, label);
        canvas.text_centered(&fonts.regular, VALUE_SIZE, UNDERLINE_X, UNDERLINE_W, y, value);
        canvas.hline(UNDERLINE_X, y + 23.0, UNDERLINE_W, 2.0);
    }

    fn draw_table(&self, canvas: &mut Canvas, fonts: &FontPair, page: &PageTemplate, top: f32) -> f32 {
        let rows = page.rows.len() as f32;
        let table_h = TABLE_HEADER_H + rows * TABLE_ROW_H;

        // Header cells.
        let mut x = PAGE_PAD;
        for (col, header) in TABLE_HEADERS.iter().enumerate() {
            let w = TABLE_COL_W[col];
            // The carrier column header wraps after the ampersand.
            if let Some((first, second)) = header.split_once("& ").filter(|_| col == 2) {
                canvas.text_centered(&fonts.bold, LABEL_SIZE, x, w, top + 4.0, &format!("{}&", first));
                canvas.text_centered(&fonts.bold, LABEL_SIZE, x, w, top + 18.0, second);
            } else {
                canvas.text_centered(&fonts.bold, LABEL_SIZE, x, w, top + 10.0, header);
            }
            x += w;
        }

        // Cell values, centered.
        for (r, row) in page.rows.iter().enumerate() {
            let row_top = top + TABLE_HEADER_H + r as f32 * TABLE_ROW_H;
            let mut x = PAGE_PAD;
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    canvas.text_centered(
                        &fonts.regular,
                        VALUE_SIZE,
                        x,
                        TABLE_COL_W[c],
                        row_top + 14.0,
                        value,
                    );
                }
                x += TABLE_COL_W[c];
            }
        }

        // Grid: 1px inner rules, 3px outer border.
        let mut y = top + TABLE_HEADER_H;
        for _ in 0..page.rows.len() {
            canvas.hline(PAGE_PAD, y, CONTENT_W, 1.0);
            y += TABLE_ROW_H;
        }
        let mut x = PAGE_PAD;
        for w in &TABLE_COL_W[..5] {
            x += w;
            canvas.vline(x, top, table_h, 1.0);
        }
        canvas.rect_outline(PAGE_PAD, top, CONTENT_W, table_h, 3.0);

        top + table_h
    }

    fn draw_page(&self, canvas: &mut Canvas, fonts: &FontPair, page: &PageTemplate) {
        // Header: logo top-left, station name centered.
        if let Some(logo) = &self.logo {
            canvas.draw_image(logo, PAGE_PAD, 28.0, LOGO_WIDTH);
        }
        canvas.text_centered(&fonts.bold, TITLE_SIZE, PAGE_PAD, CONTENT_W, 62.0, &page.station_name);

        let mut y = 153.0;
        self.underline_field(canvas, fonts, y, "DATE:", &page.date);
        y += 43.0;

        y += 15.0;
        canvas.text(&fonts.bold, PERMIT_TITLE_SIZE, PAGE_PAD, y, PERMIT_TITLE);
        y += 36.0;

        self.underline_field(canvas, fonts, y, "FROM:", &page.from);
        y += 43.0;
        self.underline_field(canvas, fonts, y, "TRUCKING:", &page.trucking);
        y += 38.0;

        // Firms line: the code prints oversized, baseline-aligned.
        let label_w =
            canvas.text(&fonts.bold, PERMIT_TITLE_SIZE, PAGE_PAD, y + 18.0, &page.firms_label());
        canvas.text(&fonts.bold, FIRMS_CODE_SIZE, PAGE_PAD + label_w + 8.0, y, &page.firms_code);
        y += 51.0;

        for line in page.boilerplate() {
            let mut x = PAGE_PAD;
            if !line.bold.is_empty() {
                x += canvas.text(&fonts.bold, BODY_SIZE, x, y, &line.bold);
            }
            canvas.text(&fonts.regular, BODY_SIZE, x, y, &line.rest);
            y += 16.0;
        }
        y += 15.0;

        y = self.draw_table(canvas, fonts, page, y);
        y += 15.0;

        // Delivery footer.
        let bold_w = canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD, y, &page.delivered_bold());
        canvas.text(&fonts.regular, FOOTER_SIZE, PAGE_PAD + bold_w + 5.0, y, &page.address);
        y += 18.0;

        canvas.text(&fonts.regular, FOOTER_SIZE, PAGE_PAD, y, CONDITION_LINE);
        let return_w = canvas.text_width(&fonts.bold, FOOTER_SIZE, RETURN_LABEL);
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + CONTENT_W - return_w, y, RETURN_LABEL);
        y += 30.0;

        canvas.hline(PAGE_PAD, y, CONTENT_W, 1.0);
        y += 30.0;

        // Acknowledgement box.
        let box_top = y;
        let box_h = 100.0;
        let mut row_y = box_top + 14.0;
        let slot = |canvas: &mut Canvas, x: f32, w: f32, y: f32| {
            canvas.hline(x, y + 13.0, w, 1.0);
        };
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + 12.0, row_y, ACK_RECEIVED_BY);
        slot(canvas, PAGE_PAD + 112.0, 240.0, row_y);
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + 392.0, row_y, ACK_DATE_TIME);
        slot(canvas, PAGE_PAD + 472.0, CONTENT_W - 484.0, row_y);
        row_y += 27.0;
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + 12.0, row_y, ACK_LOOSE_PCS);
        slot(canvas, PAGE_PAD + 112.0, 240.0, row_y);
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + 392.0, row_y, ACK_NO_OF_PALLETS);
        slot(canvas, PAGE_PAD + 472.0, CONTENT_W - 484.0, row_y);
        row_y += 27.0;
        canvas.text(&fonts.bold, FOOTER_SIZE, PAGE_PAD + 12.0, row_y, ACK_BREAKDOWN);
        slot(canvas, PAGE_PAD + 162.0, 200.0, row_y);
        canvas.rect_outline(PAGE_PAD, box_top, CONTENT_W, box_h, 2.0);
        y = box_top + box_h + 20.0;

        // Authorized signature artwork above the caption rules, height-fit.
        if let Some(signature) = &self.signature {
            let target_w = SIGNATURE_IMG_H * Canvas::aspect(signature);
            canvas.draw_image(signature, PAGE_PAD, y, target_w);
        }
        y += SIGNATURE_IMG_H + 10.0;

        // Four captioned signature rules, two per row.
        let pair_w = CONTENT_W * 0.48;
        let right_x = PAGE_PAD + CONTENT_W - pair_w;
        for pair in SIGNATURE_CAPTIONS.chunks(2) {
            for (i, caption) in pair.iter().enumerate() {
                let x = if i == 0 { PAGE_PAD } else { right_x };
                canvas.hline(x, y + 16.0, pair_w, 2.0);
                canvas.text(&fonts.bold, CAPTION_SIZE, x, y + 21.0, caption);
            }
            y += 55.0;
        }
    }
}

impl Rasterizer for GlyphRasterizer {
    fn rasterize(&self, page: &PageTemplate, opts: &RasterOptions) -> Result<RgbImage, AppError> {
        if !(opts.scale.is_finite() && opts.scale > 0.0) {
            return Err(AppError::Raster(format!("invalid scale {}", opts.scale)));
        }
        let fonts = self
            .fonts
            .as_ref()
            .ok_or_else(|| AppError::Raster("no usable font was loaded".to_string()))?;
        self.check_artwork(opts)?;
        let mut canvas = Canvas::new(opts.scale);
        self.draw_page(&mut canvas, fonts, page);
        Ok(canvas.img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets;
    use crate::config::{AppConfig, StationVariant};
    use crate::form::FormState;
    use crate::template::compose;

    fn rasterizer() -> Option<GlyphRasterizer> {
        // Skips when the host has no usable system font.
        let fonts = assets::load_fonts(&crate::config::AssetSources::default())?;
        Some(GlyphRasterizer { fonts: Some(fonts), logo: None, signature: None })
    }

    #[test]
    fn a_fontless_rasterizer_fails_instead_of_panicking() {
        let raster = GlyphRasterizer { fonts: None, logo: None, signature: None };
        let cfg = AppConfig::default();
        let page = compose(&FormState::new(), cfg.station(StationVariant::Gemini));
        assert!(matches!(
            raster.rasterize(&page, &RasterOptions::default()),
            Err(AppError::Raster(_))
        ));
    }

    #[test]
    fn captures_at_twice_the_base_density() {
        let Some(raster) = rasterizer() else { return };
        let cfg = AppConfig::default();
        let page = compose(&FormState::new(), cfg.station(StationVariant::Gemini));
        let bitmap = raster.rasterize(&page, &RasterOptions::default()).unwrap();
        assert_eq!(bitmap.width(), (PAGE_WIDTH_PX * 2.0) as u32);
        assert_eq!(bitmap.height(), (PAGE_HEIGHT_PX * 2.0) as u32);
        // The table border alone guarantees non-white pixels.
        assert!(bitmap.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn missing_artwork_is_tolerated_only_when_permitted() {
        let Some(raster) = rasterizer() else { return };
        let cfg = AppConfig::default();
        let page = compose(&FormState::new(), cfg.station(StationVariant::Gemini));
        assert!(raster.rasterize(&page, &RasterOptions::default()).is_ok());
        let strict = RasterOptions { allow_missing_images: false, ..Default::default() };
        assert!(matches!(raster.rasterize(&page, &strict), Err(AppError::Image(_))));
    }
}
