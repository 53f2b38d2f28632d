use thiserror::Error;

/// Errors produced while ordering corners or rectifying an image
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RectifyError {
    /// Wrong point count, non-finite coordinates or bad options
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Collinear or coincident corners, or a zero-sized output rectangle
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// A `DynamicImage` variant this crate cannot resample
    #[error("unsupported image layout: {0}")]
    UnsupportedImage(String),
}

pub type Result<T> = std::result::Result<T, RectifyError>;
