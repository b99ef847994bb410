use thiserror::Error;

/// Errors raised while decoding a FITS container.
#[derive(Debug, Error)]
pub enum FitsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a FITS file: {0}")]
    NotFits(String),

    #[error("HDU {hdu}: missing required keyword {keyword}")]
    MissingKeyword { hdu: usize, keyword: String },

    #[error("HDU {hdu}: invalid value for keyword {keyword}")]
    InvalidKeyword { hdu: usize, keyword: String },

    #[error("unsupported BITPIX: {0}")]
    UnsupportedBitpix(i64),

    #[error("HDU {hdu}: data truncated ({needed} bytes expected, {available} available)")]
    Truncated {
        hdu: usize,
        needed: usize,
        available: usize,
    },

    #[error("unsupported tile compression: {0}")]
    UnsupportedCompression(String),

    #[error("corrupt compressed tile {tile}: {reason}")]
    Compression { tile: usize, reason: String },

    #[error("pixel grid shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, FitsError>;
