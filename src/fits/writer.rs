//! Minimal FITS writer used by the sample generator and the tests.

use std::io;
use std::path::Path;

use super::hdu::BLOCK_LEN;
use super::header::{Card, HeaderValue};

/// A pixel type that can be stored in an image HDU.
pub trait Sample: Copy {
    const BITPIX: i64;
    fn put_be(self, out: &mut Vec<u8>);
}

macro_rules! impl_sample {
    ($($ty:ty => $bitpix:expr),* $(,)?) => {
        $(
            impl Sample for $ty {
                const BITPIX: i64 = $bitpix;
                fn put_be(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_sample!(u8 => 8, i16 => 16, i32 => 32, i64 => 64, f32 => -32, f64 => -64);

/// Appends HDUs to an in-memory FITS file.
#[derive(Debug, Default)]
pub struct FitsWriter {
    buf: Vec<u8>,
}

impl FitsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the cards followed by `END`, padded with blanks.
    pub fn header(&mut self, cards: &[Card]) {
        for card in cards {
            self.buf.extend_from_slice(&card.to_record());
        }
        self.buf.extend_from_slice(&Card::end().to_record());
        self.pad(b' ');
    }

    /// Write a data section, padded with zeros.
    pub fn data(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(0);
    }

    fn pad(&mut self, fill: u8) {
        let rem = self.buf.len() % BLOCK_LEN;
        if rem != 0 {
            self.buf.resize(self.buf.len() + BLOCK_LEN - rem, fill);
        }
    }

    /// Primary HDU with no data array.
    pub fn primary_header_only(&mut self, extra: &[Card]) {
        let mut cards = vec![
            Card::new("SIMPLE", HeaderValue::Logical(true), Some("conforms to FITS standard")),
            Card::new("BITPIX", HeaderValue::Integer(8), None),
            Card::new("NAXIS", HeaderValue::Integer(0), None),
            Card::new("EXTEND", HeaderValue::Logical(true), None),
        ];
        cards.extend_from_slice(extra);
        self.header(&cards);
    }

    /// Primary HDU holding a `width × height` image, row-major.
    pub fn primary_image<T: Sample>(
        &mut self,
        width: usize,
        height: usize,
        pixels: &[T],
        extra: &[Card],
    ) {
        let mut cards = vec![
            Card::new("SIMPLE", HeaderValue::Logical(true), Some("conforms to FITS standard")),
            Card::new("BITPIX", HeaderValue::Integer(T::BITPIX), None),
            Card::new("NAXIS", HeaderValue::Integer(2), None),
            Card::new("NAXIS1", HeaderValue::Integer(width as i64), None),
            Card::new("NAXIS2", HeaderValue::Integer(height as i64), None),
        ];
        cards.extend_from_slice(extra);
        self.header(&cards);
        self.data(&encode(pixels));
    }

    /// IMAGE extension holding a `width × height` image, row-major.
    pub fn image_extension<T: Sample>(
        &mut self,
        width: usize,
        height: usize,
        pixels: &[T],
        extra: &[Card],
    ) {
        let mut cards = vec![
            Card::new("XTENSION", HeaderValue::String("IMAGE".into()), Some("image extension")),
            Card::new("BITPIX", HeaderValue::Integer(T::BITPIX), None),
            Card::new("NAXIS", HeaderValue::Integer(2), None),
            Card::new("NAXIS1", HeaderValue::Integer(width as i64), None),
            Card::new("NAXIS2", HeaderValue::Integer(height as i64), None),
            Card::new("PCOUNT", HeaderValue::Integer(0), None),
            Card::new("GCOUNT", HeaderValue::Integer(1), None),
        ];
        cards.extend_from_slice(extra);
        self.header(&cards);
        self.data(&encode(pixels));
    }

    /// BINTABLE extension. `columns` are `(TTYPE, TFORM)` pairs, `table`
    /// holds the fixed-width rows and `heap` the variable-length data that
    /// follows them.
    pub fn bintable(
        &mut self,
        columns: &[(&str, &str)],
        row_len: usize,
        table: &[u8],
        heap: &[u8],
        extra: &[Card],
    ) {
        let rows = if row_len == 0 { 0 } else { table.len() / row_len };
        let mut cards = vec![
            Card::new("XTENSION", HeaderValue::String("BINTABLE".into()), Some("binary table")),
            Card::new("BITPIX", HeaderValue::Integer(8), None),
            Card::new("NAXIS", HeaderValue::Integer(2), None),
            Card::new("NAXIS1", HeaderValue::Integer(row_len as i64), None),
            Card::new("NAXIS2", HeaderValue::Integer(rows as i64), None),
            Card::new("PCOUNT", HeaderValue::Integer(heap.len() as i64), None),
            Card::new("GCOUNT", HeaderValue::Integer(1), None),
            Card::new("TFIELDS", HeaderValue::Integer(columns.len() as i64), None),
        ];
        for (n, (name, form)) in columns.iter().enumerate() {
            let n = n + 1;
            cards.push(Card::new(&format!("TTYPE{n}"), HeaderValue::String((*name).into()), None));
            cards.push(Card::new(&format!("TFORM{n}"), HeaderValue::String((*form).into()), None));
        }
        cards.extend_from_slice(extra);
        self.header(&cards);

        let mut data = Vec::with_capacity(table.len() + heap.len());
        data.extend_from_slice(table);
        data.extend_from_slice(heap);
        self.data(&data);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, &self.buf)
    }
}

fn encode<T: Sample>(pixels: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * (T::BITPIX.unsigned_abs() as usize / 8));
    for &p in pixels {
        p.put_be(&mut out);
    }
    out
}
