/// FITS container decoding.
///
/// ```text
///  upload bytes (.fits / .fit / .fz / .gz)
///        │
///        ▼
///   ┌──────────┐
///   │ FitsFile │  inflate gzip, scan 2880-byte blocks → Vec<Hdu>
///   └──────────┘
///        │  read_image(index)
///        ▼
///   ┌──────────────────────┐
///   │ image / compressed   │  BITPIX decode, BSCALE/BZERO, tiles → Array2<f64>
///   └──────────────────────┘
/// ```
pub mod compressed;
pub mod error;
pub mod hdu;
pub mod header;
pub mod image;
pub mod rice;
pub mod writer;

use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use ndarray::Array2;

pub use error::{FitsError, Result};
pub use hdu::{Hdu, HduKind, ImageShape};
pub use header::{Card, Header, HeaderValue};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// An opened FITS file. Holds the (possibly inflated) bytes and the list
/// of HDUs; dropping it releases both.
#[derive(Debug)]
pub struct FitsFile<'a> {
    data: Cow<'a, [u8]>,
    hdus: Vec<Hdu>,
}

impl<'a> FitsFile<'a> {
    /// Parse a FITS file held in memory. Gzip-wrapped files are inflated
    /// first.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let data = if bytes.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut inflated)?;
            log::debug!("inflated {} gzip bytes to {}", bytes.len(), inflated.len());
            Cow::Owned(inflated)
        } else {
            Cow::Borrowed(bytes)
        };
        let hdus = hdu::scan(&data)?;
        Ok(Self { data, hdus })
    }

    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    /// Decode the first 2-D plane of the image in HDU `index`.
    pub fn read_image(&self, index: usize) -> Result<Array2<f64>> {
        let hdu = self
            .hdus
            .get(index)
            .ok_or_else(|| FitsError::NotFits(format!("no HDU {index}")))?;
        match hdu.kind {
            HduKind::CompressedImage => compressed::read_tiled_image(&self.data, hdu),
            _ => image::read_image(&self.data, hdu),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::writer::FitsWriter;
    use super::*;

    #[test]
    fn gzip_wrapped_files_open_transparently() {
        let mut w = FitsWriter::new();
        w.primary_image::<u8>(2, 2, &[1, 2, 3, 4], &[]);
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(w.as_bytes()).unwrap();
        let gz = enc.finish().unwrap();

        let fits = FitsFile::open(&gz).unwrap();
        assert_eq!(fits.hdus().len(), 1);
        let grid = fits.read_image(0).unwrap();
        assert_eq!(grid[[1, 1]], 4.0);
    }

    #[test]
    fn corrupt_gzip_is_an_io_error() {
        let err = FitsFile::open(&[0x1f, 0x8b, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, FitsError::Io(_)));
    }
}
