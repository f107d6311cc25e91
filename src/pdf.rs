//! Document assembly service: embeds a captured page bitmap into a
//! letter-sized PDF. Treated by the export pipeline as an opaque service
//! ("given a bitmap, return document bytes").

use ::image::RgbImage;
use printpdf::*;
use std::io::BufWriter;

use crate::error::AppError;

/// US Letter dimensions in mm
pub const PAGE_WIDTH_MM: f32 = 215.9;
pub const PAGE_HEIGHT_MM: f32 = 279.4;

const PAGE_WIDTH_IN: f32 = 8.5;

/// "Given a bitmap, return document bytes."
pub trait PageAssembler {
    fn assemble(&self, bitmap: &RgbImage) -> Result<Vec<u8>, AppError>;
}

/// Production assembler: one portrait letter page, the bitmap placed at the
/// page origin spanning the full 8.5in x 11in.
pub struct LetterPdfAssembler;

impl PageAssembler for LetterPdfAssembler {
    fn assemble(&self, bitmap: &RgbImage) -> Result<Vec<u8>, AppError> {
        let (doc, page1, layer1) = PdfDocument::new(
            "Permit to Transfer",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);

        let (width, height) = bitmap.dimensions();
        if width == 0 || height == 0 {
            return Err(AppError::Pdf("empty page bitmap".to_string()));
        }

        let image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: bitmap.as_raw().clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI chosen so the bitmap's width is exactly the page width.
        let dpi = width as f32 / PAGE_WIDTH_IN;
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        let mut buffer = BufWriter::new(Vec::new());
        doc.save(&mut buffer).map_err(|e| AppError::Pdf(e.to_string()))?;
        buffer.into_inner().map_err(|e| AppError::Pdf(e.to_string()))
    }
}
