use std::fmt;

use super::error::{FitsError, Result};
use super::header::{Card, Header, CARD_LEN};

/// FITS logical record length.
pub const BLOCK_LEN: usize = 2880;

/// Round `len` up to a whole number of 2880-byte blocks; `None` when the
/// padded length does not fit in `usize`.
pub fn padded_len(len: usize) -> Option<usize> {
    len.div_ceil(BLOCK_LEN).checked_mul(BLOCK_LEN)
}

// ---------------------------------------------------------------------------
// HduKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    Image,
    BinTable,
    AsciiTable,
    /// Tile-compressed image stored in a binary table (`ZIMAGE = T`).
    CompressedImage,
    Other,
}

impl HduKind {
    /// Kinds that can carry image pixels.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            HduKind::Primary | HduKind::Image | HduKind::CompressedImage
        )
    }
}

impl fmt::Display for HduKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HduKind::Primary => "PRIMARY",
            HduKind::Image => "IMAGE",
            HduKind::BinTable => "BINTABLE",
            HduKind::AsciiTable => "TABLE",
            HduKind::CompressedImage => "COMPRESSED IMAGE",
            HduKind::Other => "OTHER",
        };
        write!(f, "{s}")
    }
}

/// Width and height of the first 2-D plane of an image HDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: usize,
    pub height: usize,
}

// ---------------------------------------------------------------------------
// Hdu
// ---------------------------------------------------------------------------

/// One header-data unit and the location of its data in the file.
#[derive(Debug, Clone)]
pub struct Hdu {
    pub index: usize,
    pub kind: HduKind,
    pub header: Header,
    /// Byte offset of the data section in the (inflated) file.
    pub data_start: usize,
    /// Unpadded size of the data section as declared by the header.
    pub data_len: usize,
}

impl Hdu {
    pub fn extname(&self) -> Option<&str> {
        self.header.get_str("EXTNAME")
    }

    /// BITPIX of the pixels, taken from ZBITPIX for compressed images.
    pub fn bitpix(&self) -> Option<i64> {
        match self.kind {
            HduKind::CompressedImage => self.header.get_int("ZBITPIX"),
            _ => self.header.get_int("BITPIX"),
        }
    }

    /// Image axis lengths in FITS order (NAXIS1 first). Empty for tables.
    pub fn axes(&self) -> Vec<usize> {
        let prefix = match self.kind {
            HduKind::CompressedImage => "ZNAXIS",
            HduKind::Primary | HduKind::Image => "NAXIS",
            _ => return Vec::new(),
        };
        let naxis = self.header.get_int(prefix).unwrap_or(0).max(0);
        (1..=naxis)
            .map(|n| {
                self.header
                    .get_int(&format!("{prefix}{n}"))
                    .and_then(|v| usize::try_from(v).ok())
                    .unwrap_or(0)
            })
            .collect()
    }

    /// `Some` when this HDU holds a non-empty image with at least two axes.
    pub fn image_shape(&self) -> Option<ImageShape> {
        if !self.kind.is_image() || self.data_len == 0 {
            return None;
        }
        let axes = self.axes();
        if axes.len() < 2 || axes.iter().any(|&n| n == 0) {
            return None;
        }
        Some(ImageShape {
            width: axes[0],
            height: axes[1],
        })
    }
}

// ---------------------------------------------------------------------------
// Container scan
// ---------------------------------------------------------------------------

/// Walk the file and return every HDU in order.
///
/// The primary HDU must parse; anything after the last complete extension
/// that does not start with a valid `XTENSION` header is ignored.
pub fn scan(bytes: &[u8]) -> Result<Vec<Hdu>> {
    if bytes.is_empty() {
        return Err(FitsError::NotFits("file is empty".into()));
    }

    let mut hdus = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let index = hdus.len();
        let parsed = read_header(&bytes[offset..]).and_then(|(header, header_len)| {
            let kind = classify(index, &header)?;
            let data_len = data_len(index, &header)?;
            let padded = padded_len(data_len).ok_or_else(|| FitsError::InvalidKeyword {
                hdu: index,
                keyword: "NAXIS".into(),
            })?;
            Ok((header, header_len, kind, data_len, padded))
        });

        let (header, header_len, kind, data_len, padded) = match parsed {
            Ok(parts) => parts,
            Err(e) if index == 0 => return Err(e),
            Err(e) => {
                log::warn!(
                    "ignoring {} trailing bytes after HDU {}: {e}",
                    bytes.len() - offset,
                    index - 1
                );
                break;
            }
        };

        let data_start = offset + header_len;
        log::debug!(
            "HDU {index}: {kind} at byte {offset}, {data_len} data bytes, {} cards",
            header.len()
        );
        hdus.push(Hdu {
            index,
            kind,
            header,
            data_start,
            data_len,
        });

        offset = data_start.saturating_add(padded);
    }

    Ok(hdus)
}

/// Read cards up to and including `END`. Returns the header and the
/// number of bytes it occupies, padding included.
fn read_header(bytes: &[u8]) -> Result<(Header, usize)> {
    let mut header = Header::new();
    for (n, record) in bytes.chunks_exact(CARD_LEN).enumerate() {
        let card = Card::parse(record);
        if card.is_end() {
            header.push(card);
            let consumed = padded_len((n + 1) * CARD_LEN)
                .ok_or_else(|| FitsError::NotFits("header too long".into()))?;
            return Ok((header, consumed));
        }
        header.push(card);
    }
    Err(FitsError::NotFits("header has no END record".into()))
}

fn classify(index: usize, header: &Header) -> Result<HduKind> {
    let first = header.cards().first().map(|c| c.keyword.as_str());
    if index == 0 {
        if first != Some("SIMPLE") || header.get_bool("SIMPLE") != Some(true) {
            return Err(FitsError::NotFits(
                "primary header does not start with SIMPLE = T".into(),
            ));
        }
        return Ok(HduKind::Primary);
    }

    if first != Some("XTENSION") {
        return Err(FitsError::NotFits(format!(
            "HDU {index} does not start with XTENSION"
        )));
    }
    let kind = match header.get_str("XTENSION").map(str::trim) {
        Some("IMAGE") => HduKind::Image,
        Some("BINTABLE") if header.get_bool("ZIMAGE") == Some(true) => HduKind::CompressedImage,
        Some("BINTABLE") => HduKind::BinTable,
        Some("TABLE") => HduKind::AsciiTable,
        _ => HduKind::Other,
    };
    Ok(kind)
}

/// Size of the data section in bytes:
/// `|BITPIX| / 8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`.
fn data_len(index: usize, header: &Header) -> Result<usize> {
    let required = |keyword: &str| {
        header.get_int(keyword).ok_or_else(|| FitsError::MissingKeyword {
            hdu: index,
            keyword: keyword.to_string(),
        })
    };
    let invalid = |keyword: &str| FitsError::InvalidKeyword {
        hdu: index,
        keyword: keyword.to_string(),
    };

    let bitpix = required("BITPIX")?;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(FitsError::UnsupportedBitpix(bitpix));
    }
    let naxis = required("NAXIS")?;
    if !(0..=999).contains(&naxis) {
        return Err(invalid("NAXIS"));
    }
    if naxis == 0 {
        return Ok(0);
    }

    let mut axes = Vec::with_capacity(naxis as usize);
    for n in 1..=naxis {
        let key = format!("NAXIS{n}");
        let len = usize::try_from(required(&key)?).map_err(|_| invalid(&key))?;
        axes.push(len);
    }

    // Random groups: NAXIS1 = 0 and the groups count lives in GCOUNT.
    let random_groups = header.get_bool("GROUPS") == Some(true) && axes[0] == 0;
    let counted = if random_groups { &axes[1..] } else { &axes[..] };
    let elements = counted
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| invalid("NAXIS"))?;

    let pcount = usize::try_from(header.get_int("PCOUNT").unwrap_or(0))
        .map_err(|_| invalid("PCOUNT"))?;
    let gcount = usize::try_from(header.get_int("GCOUNT").unwrap_or(1))
        .map_err(|_| invalid("GCOUNT"))?;

    let bytes_per = bitpix.unsigned_abs() as usize / 8;
    elements
        .checked_add(pcount)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per))
        .ok_or_else(|| invalid("NAXIS"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::header::HeaderValue;
    use crate::fits::writer::FitsWriter;

    #[test]
    fn scans_primary_and_extensions_in_order() {
        let mut w = FitsWriter::new();
        w.primary_header_only(&[Card::new(
            "OBJECT",
            HeaderValue::String("M42".into()),
            None,
        )]);
        w.image_extension::<f32>(3, 2, &[0.0; 6], &[]);
        w.bintable(
            &[("FLUX", "1E")],
            4,
            &[0u8; 8],
            &[],
            &[Card::new("EXTNAME", HeaderValue::String("CATALOG".into()), None)],
        );
        let bytes = w.into_bytes();

        let hdus = scan(&bytes).unwrap();
        assert_eq!(hdus.len(), 3);
        assert_eq!(hdus[0].kind, HduKind::Primary);
        assert_eq!(hdus[0].data_len, 0);
        assert_eq!(hdus[0].image_shape(), None);

        assert_eq!(hdus[1].kind, HduKind::Image);
        assert_eq!(hdus[1].data_len, 24);
        assert_eq!(
            hdus[1].image_shape(),
            Some(ImageShape {
                width: 3,
                height: 2
            })
        );

        assert_eq!(hdus[2].kind, HduKind::BinTable);
        assert_eq!(hdus[2].extname(), Some("CATALOG"));
        assert_eq!(hdus[2].image_shape(), None);
        assert_eq!(hdus[2].data_start % BLOCK_LEN, 0);
    }

    #[test]
    fn rejects_non_fits_bytes() {
        let text = b"just some text that is definitely not an astronomical image";
        let err = scan(text).unwrap_err();
        assert!(matches!(err, FitsError::NotFits(_)));

        let err = scan(&[]).unwrap_err();
        assert!(matches!(err, FitsError::NotFits(_)));
    }

    #[test]
    fn trailing_garbage_after_last_extension_is_ignored() {
        let mut w = FitsWriter::new();
        w.primary_image::<i16>(2, 2, &[1, 2, 3, 4], &[]);
        let mut bytes = w.into_bytes();
        bytes.extend(std::iter::repeat(0u8).take(BLOCK_LEN));

        let hdus = scan(&bytes).unwrap();
        assert_eq!(hdus.len(), 1);
    }

    #[test]
    fn one_dimensional_and_empty_axes_are_not_images() {
        let mut w = FitsWriter::new();
        w.primary_header_only(&[]);
        w.image_extension::<f32>(5, 1, &[1.0; 5], &[]);
        let mut bytes = w.into_bytes();
        // Rewrite NAXIS = 2 to NAXIS = 1 in the extension header.
        let ext = BLOCK_LEN;
        let naxis_card = Card::new("NAXIS", HeaderValue::Integer(1), None).to_record();
        bytes[ext + 2 * CARD_LEN..ext + 3 * CARD_LEN].copy_from_slice(&naxis_card);

        let hdus = scan(&bytes).unwrap();
        assert_eq!(hdus[1].axes(), vec![5]);
        assert_eq!(hdus[1].image_shape(), None);
    }

    #[test]
    fn padded_len_rounds_to_blocks() {
        assert_eq!(padded_len(0), Some(0));
        assert_eq!(padded_len(1), Some(BLOCK_LEN));
        assert_eq!(padded_len(BLOCK_LEN), Some(BLOCK_LEN));
        assert_eq!(padded_len(BLOCK_LEN + 1), Some(2 * BLOCK_LEN));
        assert_eq!(padded_len(usize::MAX - 1), None);
    }

    #[test]
    fn oversized_axis_is_an_invalid_keyword() {
        // 2 * (2^63 - 1) bytes of data fits in usize, its block padding does not.
        let mut w = FitsWriter::new();
        w.header(&[
            Card::new("SIMPLE", HeaderValue::Logical(true), None),
            Card::new("BITPIX", HeaderValue::Integer(16), None),
            Card::new("NAXIS", HeaderValue::Integer(1), None),
            Card::new("NAXIS1", HeaderValue::Integer(i64::MAX), None),
        ]);

        let err = scan(w.as_bytes()).unwrap_err();
        let rejected = matches!(
            err,
            FitsError::InvalidKeyword { hdu: 0, ref keyword } if keyword == "NAXIS"
        );
        assert!(rejected, "{err:?}");
    }
}
