use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("Failed to rasterize page: {0}")]
    Raster(String),
    #[error("Failed to load image: {0}")]
    Image(String),
    #[error("History storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
