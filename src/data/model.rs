use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;

use crate::fits::{HduKind, Header, HeaderValue};

// ---------------------------------------------------------------------------
// Upload – the raw file handed over by the dialog or a drop
// ---------------------------------------------------------------------------

/// A file supplied by the user, held in memory for one ingest.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a whole file from disk. The file handle is closed before
    /// returning.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    pub fn has_extension(&self, accepted: &[String]) -> bool {
        self.extension()
            .is_some_and(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
    }
}

// ---------------------------------------------------------------------------
// BlockSummary – one line of the HDU list
// ---------------------------------------------------------------------------

/// Short description of one HDU in the uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub index: usize,
    pub kind: HduKind,
    pub extname: Option<String>,
    pub axes: Vec<usize>,
    pub bitpix: Option<i64>,
}

impl fmt::Display for BlockSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.index, self.kind)?;
        if let Some(name) = &self.extname {
            write!(f, "  {name}")?;
        }
        if !self.axes.is_empty() {
            let dims: Vec<String> = self.axes.iter().map(|a| a.to_string()).collect();
            write!(f, "  {}", dims.join(" × "))?;
        }
        if let Some(bitpix) = self.bitpix {
            write!(f, "  BITPIX {bitpix}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ImageBlock – the selected image and its header
// ---------------------------------------------------------------------------

/// The image HDU chosen for display.
#[derive(Debug, Clone)]
pub struct ImageBlock {
    /// Position of the HDU in the file.
    pub index: usize,
    pub kind: HduKind,
    pub header: Header,
    /// Header of HDU 0, consulted for `INHERIT = T` extensions.
    pub primary_header: Header,
    /// Physical pixel values, `rows × columns`, possibly containing NaN.
    pub pixels: Array2<f64>,
    /// Every HDU in the file, in order.
    pub blocks: Vec<BlockSummary>,
}

impl ImageBlock {
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Header lookup; falls back to the primary header when this HDU
    /// declares `INHERIT = T`.
    pub fn lookup(&self, keyword: &str) -> Option<&HeaderValue> {
        self.header.get(keyword).or_else(|| {
            (self.index != 0 && self.header.get_bool("INHERIT") == Some(true))
                .then(|| self.primary_header.get(keyword))
                .flatten()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::Card;

    #[test]
    fn extension_matching_is_case_insensitive() {
        let accepted = vec!["fits".to_string(), "fz".to_string()];
        assert!(Upload::new("m31.FITS", vec![]).has_extension(&accepted));
        assert!(Upload::new("frame.fits.fz", vec![]).has_extension(&accepted));
        assert!(!Upload::new("notes.txt", vec![]).has_extension(&accepted));
        assert!(!Upload::new("README", vec![]).has_extension(&accepted));
    }

    #[test]
    fn inherit_falls_back_to_primary() {
        let primary: Header = [Card::new("OBJECT", HeaderValue::String("M51".into()), None)]
            .into_iter()
            .collect();
        let mut header: Header = [Card::new("EXPTIME", HeaderValue::Float(60.0), None)]
            .into_iter()
            .collect();
        let mut block = ImageBlock {
            index: 1,
            kind: HduKind::Image,
            header: header.clone(),
            primary_header: primary,
            pixels: Array2::zeros((1, 1)),
            blocks: Vec::new(),
        };
        assert!(block.lookup("OBJECT").is_none());

        header.push(Card::new("INHERIT", HeaderValue::Logical(true), None));
        block.header = header;
        assert_eq!(block.lookup("OBJECT"), Some(&HeaderValue::String("M51".into())));
        assert_eq!(block.lookup("EXPTIME"), Some(&HeaderValue::Float(60.0)));
        assert!(block.lookup("TELESCOP").is_none());
    }

    #[test]
    fn block_summary_line() {
        let s = BlockSummary {
            index: 1,
            kind: HduKind::Image,
            extname: Some("SCI".into()),
            axes: vec![512, 256],
            bitpix: Some(-32),
        };
        assert_eq!(s.to_string(), "1  IMAGE  SCI  512 × 256  BITPIX -32");
    }
}
