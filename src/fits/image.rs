//! Pixel decoding for uncompressed image HDUs.

use ndarray::Array2;

use super::error::{FitsError, Result};
use super::hdu::Hdu;
use super::header::Header;

/// Linear scaling from stored to physical values, plus the integer null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub bscale: f64,
    pub bzero: f64,
    pub blank: Option<i64>,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            bscale: 1.0,
            bzero: 0.0,
            blank: None,
        }
    }
}

impl Scaling {
    pub fn from_header(header: &Header) -> Self {
        Self {
            bscale: header.get_float("BSCALE").unwrap_or(1.0),
            bzero: header.get_float("BZERO").unwrap_or(0.0),
            blank: header.get_int("BLANK"),
        }
    }

    /// Physical value of an integer sample; the null sample becomes NaN.
    pub fn apply_int(&self, raw: i64) -> f64 {
        if self.blank == Some(raw) {
            f64::NAN
        } else {
            self.bzero + self.bscale * raw as f64
        }
    }

    pub fn apply_float(&self, raw: f64) -> f64 {
        self.bzero + self.bscale * raw
    }
}

/// Bytes per sample for a BITPIX value.
pub fn bytes_per_sample(bitpix: i64) -> Result<usize> {
    match bitpix {
        8 | 16 | 32 | 64 | -32 | -64 => Ok(bitpix.unsigned_abs() as usize / 8),
        other => Err(FitsError::UnsupportedBitpix(other)),
    }
}

fn be<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Decode big-endian samples of the given BITPIX into physical values.
pub fn decode_samples(raw: &[u8], bitpix: i64, scaling: &Scaling) -> Result<Vec<f64>> {
    let values = match bitpix {
        8 => raw.iter().map(|&b| scaling.apply_int(b as i64)).collect(),
        16 => raw
            .chunks_exact(2)
            .map(|c| scaling.apply_int(i16::from_be_bytes(be(c)) as i64))
            .collect(),
        32 => raw
            .chunks_exact(4)
            .map(|c| scaling.apply_int(i32::from_be_bytes(be(c)) as i64))
            .collect(),
        64 => raw
            .chunks_exact(8)
            .map(|c| scaling.apply_int(i64::from_be_bytes(be(c))))
            .collect(),
        -32 => raw
            .chunks_exact(4)
            .map(|c| scaling.apply_float(f32::from_be_bytes(be(c)) as f64))
            .collect(),
        -64 => raw
            .chunks_exact(8)
            .map(|c| scaling.apply_float(f64::from_be_bytes(be(c))))
            .collect(),
        other => return Err(FitsError::UnsupportedBitpix(other)),
    };
    Ok(values)
}

/// Read the first 2-D plane of a Primary or IMAGE HDU as `rows × columns`.
pub fn read_image(data: &[u8], hdu: &Hdu) -> Result<Array2<f64>> {
    let shape = hdu.image_shape().ok_or_else(|| FitsError::InvalidKeyword {
        hdu: hdu.index,
        keyword: "NAXIS".into(),
    })?;
    let bitpix = hdu.bitpix().ok_or_else(|| FitsError::MissingKeyword {
        hdu: hdu.index,
        keyword: "BITPIX".into(),
    })?;

    let needed = shape.width * shape.height * bytes_per_sample(bitpix)?;
    let available = data.len().saturating_sub(hdu.data_start);
    if available < needed {
        return Err(FitsError::Truncated {
            hdu: hdu.index,
            needed,
            available,
        });
    }

    let raw = &data[hdu.data_start..hdu.data_start + needed];
    let scaling = Scaling::from_header(&hdu.header);
    let pixels = decode_samples(raw, bitpix, &scaling)?;
    Ok(Array2::from_shape_vec((shape.height, shape.width), pixels)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::hdu::scan;
    use crate::fits::header::{Card, HeaderValue};
    use crate::fits::writer::FitsWriter;

    #[test]
    fn unsigned_16_bit_via_bzero() {
        let mut w = FitsWriter::new();
        w.primary_image::<i16>(
            2,
            2,
            &[-32768, 0, 1, 32767],
            &[Card::new("BZERO", HeaderValue::Float(32768.0), None)],
        );
        let bytes = w.into_bytes();
        let hdus = scan(&bytes).unwrap();

        let grid = read_image(&bytes, &hdus[0]).unwrap();
        assert_eq!(grid.dim(), (2, 2));
        assert_eq!(grid[[0, 0]], 0.0);
        assert_eq!(grid[[0, 1]], 32768.0);
        assert_eq!(grid[[1, 0]], 32769.0);
        assert_eq!(grid[[1, 1]], 65535.0);
    }

    #[test]
    fn rows_follow_naxis2() {
        let mut w = FitsWriter::new();
        w.primary_image::<f64>(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[]);
        let bytes = w.into_bytes();
        let hdus = scan(&bytes).unwrap();

        let grid = read_image(&bytes, &hdus[0]).unwrap();
        assert_eq!(grid.nrows(), 2);
        assert_eq!(grid.ncols(), 3);
        assert_eq!(grid[[1, 0]], 4.0);
    }

    #[test]
    fn blank_integers_become_nan() {
        let mut w = FitsWriter::new();
        w.primary_image::<i32>(
            2,
            1,
            &[-999, 7],
            &[Card::new("BLANK", HeaderValue::Integer(-999), None)],
        );
        let bytes = w.into_bytes();
        let hdus = scan(&bytes).unwrap();

        let grid = read_image(&bytes, &hdus[0]).unwrap();
        assert!(grid[[0, 0]].is_nan());
        assert_eq!(grid[[0, 1]], 7.0);
    }

    #[test]
    fn truncated_data_is_reported() {
        let mut w = FitsWriter::new();
        w.primary_image::<f32>(4, 4, &[1.0; 16], &[]);
        let bytes = w.into_bytes();
        let hdus = scan(&bytes).unwrap();
        let cut = &bytes[..hdus[0].data_start + 10];

        let err = read_image(cut, &hdus[0]).unwrap_err();
        assert!(matches!(
            err,
            FitsError::Truncated {
                needed: 64,
                available: 10,
                ..
            }
        ));
    }

    #[test]
    fn byte_images_are_unsigned() {
        let values = decode_samples(&[0, 200, 255], 8, &Scaling::default()).unwrap();
        assert_eq!(values, vec![0.0, 200.0, 255.0]);
    }
}
