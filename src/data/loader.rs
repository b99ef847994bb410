use thiserror::Error;

use super::model::{BlockSummary, ImageBlock, Upload};
use crate::fits::{FitsError, FitsFile, Hdu};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an upload could not be turned into an [`ImageBlock`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// The bytes are not a readable FITS file.
    #[error("error processing file: {0}")]
    Parse(#[from] FitsError),

    /// The file parsed but none of its HDUs holds image pixels.
    #[error("no valid image data found in file")]
    NoImageData,
}

impl IngestError {
    /// Secondary line shown under the error in the UI.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            IngestError::Parse(_) => {
                Some("The file may not be a valid or uncorrupted FITS file.")
            }
            IngestError::NoImageData => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse an upload and extract the first image-bearing HDU.
///
/// The opened file lives only for the duration of this call.
pub fn ingest(upload: &Upload) -> Result<ImageBlock, IngestError> {
    let fits = FitsFile::open(&upload.bytes)?;
    let hdus = fits.hdus();

    let index = select_image_block(hdus).ok_or(IngestError::NoImageData)?;
    let pixels = fits.read_image(index)?;
    let hdu = &hdus[index];

    log::info!(
        "'{}': using HDU {index} ({}) of {}, {} x {} pixels",
        upload.name,
        hdu.kind,
        hdus.len(),
        pixels.ncols(),
        pixels.nrows()
    );

    Ok(ImageBlock {
        index,
        kind: hdu.kind,
        header: hdu.header.clone(),
        primary_header: hdus[0].header.clone(),
        pixels,
        blocks: hdus.iter().map(summarize).collect(),
    })
}

/// Index of the first HDU whose data is a non-empty image. First match wins.
pub fn select_image_block(hdus: &[Hdu]) -> Option<usize> {
    hdus.iter().position(|hdu| hdu.image_shape().is_some())
}

fn summarize(hdu: &Hdu) -> BlockSummary {
    BlockSummary {
        index: hdu.index,
        kind: hdu.kind,
        extname: hdu.extname().map(|s| s.trim().to_string()),
        axes: hdu.axes(),
        bitpix: hdu.kind.is_image().then(|| hdu.bitpix()).flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::writer::FitsWriter;
    use crate::fits::{Card, HduKind, HeaderValue};

    fn extname(name: &str) -> Card {
        Card::new("EXTNAME", HeaderValue::String(name.into()), None)
    }

    #[test]
    fn picks_image_after_header_only_primary() {
        let mut w = FitsWriter::new();
        w.primary_header_only(&[Card::new("OBJECT", HeaderValue::String("M13".into()), None)]);
        w.bintable(&[("X", "1E")], 4, &[0; 4], &[], &[extname("TABLE1")]);
        w.image_extension::<f32>(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[extname("SCI")]);
        w.image_extension::<f32>(2, 2, &[9.0; 4], &[extname("ERR")]);

        let block = ingest(&Upload::new("cluster.fits", w.into_bytes())).unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.kind, HduKind::Image);
        assert_eq!(block.header.get_str("EXTNAME"), Some("SCI"));
        assert_eq!((block.width(), block.height()), (2, 3));
        assert_eq!(block.blocks.len(), 4);
        assert_eq!(block.primary_header.get_str("OBJECT"), Some("M13"));
    }

    #[test]
    fn image_followed_by_tables_is_selected() {
        let mut w = FitsWriter::new();
        w.primary_image::<i16>(2, 2, &[1, 2, 3, 4], &[]);
        w.bintable(&[("X", "1E")], 4, &[0; 8], &[], &[extname("CAT")]);
        w.bintable(&[("Y", "1J")], 4, &[0; 4], &[], &[extname("CAT2")]);

        let block = ingest(&Upload::new("frame.fits", w.into_bytes())).unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.pixels[[1, 0]], 3.0);
    }

    #[test]
    fn no_image_hdu_is_reported_as_such() {
        let mut w = FitsWriter::new();
        w.primary_header_only(&[]);
        w.bintable(&[("X", "1E")], 4, &[0; 4], &[], &[]);

        let err = ingest(&Upload::new("table.fits", w.into_bytes())).unwrap_err();
        assert!(matches!(err, IngestError::NoImageData));
        assert_eq!(err.to_string(), "no valid image data found in file");
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn garbage_is_a_parse_error_with_hint() {
        let upload = Upload::new("photo.fits", b"\x89PNG\r\n\x1a\n".to_vec());
        let err = ingest(&upload).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
        assert!(err.to_string().starts_with("error processing file"));
        assert!(err.hint().is_some());
    }
}
