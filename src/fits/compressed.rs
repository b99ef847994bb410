//! Tile-compressed images (`.fz` files).
//!
//! The image is cut into rectangular tiles, each tile compressed on its
//! own and stored as one row of a binary table. The compressed bytes live
//! in the heap and are reached through the variable-length
//! `COMPRESSED_DATA` column. Floating-point images are usually quantized
//! to integers first; the per-tile `ZSCALE`/`ZZERO` columns undo that.

use std::io::Read;
use std::sync::OnceLock;

use flate2::read::GzDecoder;
use ndarray::Array2;

use super::error::{FitsError, Result};
use super::hdu::Hdu;
use super::header::Header;
use super::image::{bytes_per_sample, decode_samples, Scaling};
use super::rice;

/// Length of the dither sequence shared by every conforming writer.
const N_RANDOM: usize = 10_000;
/// Quantized value reserved for exact zeros by `SUBTRACTIVE_DITHER_2`.
const ZERO_VALUE: i64 = -2_147_483_646;
/// Largest plane (or tile) decoded, 16384 x 16384 pixels.
pub const MAX_PIXELS: usize = 1 << 28;

// ---------------------------------------------------------------------------
// Binary table layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    offset: usize,
    repeat: usize,
    code: char,
    /// Element type of a `P`/`Q` variable-length column.
    var_elem: Option<char>,
}

fn elem_width(code: char) -> Option<usize> {
    match code {
        'L' | 'B' | 'A' => Some(1),
        'I' => Some(2),
        'J' | 'E' => Some(4),
        'K' | 'D' | 'C' => Some(8),
        'M' => Some(16),
        _ => None,
    }
}

/// Parse a TFORM such as `1PB(2880)`, `8A` or `E`.
fn parse_tform(tform: &str) -> Option<(usize, char, Option<char>)> {
    let tform = tform.trim();
    let digits = tform.chars().take_while(|c| c.is_ascii_digit()).count();
    let repeat = if digits == 0 {
        1
    } else {
        tform[..digits].parse().ok()?
    };
    let mut rest = tform[digits..].chars();
    let code = rest.next()?.to_ascii_uppercase();
    let var_elem = match code {
        'P' | 'Q' => Some(rest.next()?.to_ascii_uppercase()),
        _ => None,
    };
    Some((repeat, code, var_elem))
}

impl Column {
    fn byte_len(&self) -> Option<usize> {
        match self.code {
            'P' => Some(8 * self.repeat.min(1)),
            'Q' => Some(16 * self.repeat.min(1)),
            'X' => Some(self.repeat.div_ceil(8)),
            code => elem_width(code).and_then(|w| w.checked_mul(self.repeat)),
        }
    }
}

fn columns(hdu: &Hdu) -> Result<Vec<Column>> {
    let header = &hdu.header;
    let invalid = |keyword: String| FitsError::InvalidKeyword {
        hdu: hdu.index,
        keyword,
    };
    let tfields = header.get_int("TFIELDS").ok_or_else(|| FitsError::MissingKeyword {
        hdu: hdu.index,
        keyword: "TFIELDS".into(),
    })?;

    let mut offset = 0;
    let mut out = Vec::new();
    for n in 1..=tfields.max(0) {
        let key = format!("TFORM{n}");
        let (repeat, code, var_elem) = header
            .get_str(&key)
            .and_then(parse_tform)
            .ok_or_else(|| invalid(key.clone()))?;
        let column = Column {
            name: header
                .get_str(&format!("TTYPE{n}"))
                .unwrap_or_default()
                .trim()
                .to_ascii_uppercase(),
            offset,
            repeat,
            code,
            var_elem,
        };
        offset = column
            .byte_len()
            .and_then(|len| offset.checked_add(len))
            .ok_or_else(|| invalid(key))?;
        out.push(column);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Compression parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Algorithm {
    Rice { blocksize: usize, bytepix: usize },
    Gzip1,
    Gzip2,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantize {
    NoDither,
    SubtractiveDither1,
    SubtractiveDither2,
}

fn algorithm(header: &Header) -> Result<Algorithm> {
    let name = header.get_str("ZCMPTYPE").unwrap_or_default().trim().to_ascii_uppercase();
    match name.as_str() {
        "RICE_1" | "RICE_ONE" => {
            let mut blocksize = 32;
            let mut bytepix = 4;
            for n in 1.. {
                let Some(param) = header.get_str(&format!("ZNAME{n}")) else {
                    break;
                };
                let value = header.get_int(&format!("ZVAL{n}"));
                match (param.trim().to_ascii_uppercase().as_str(), value) {
                    ("BLOCKSIZE", Some(v)) if v > 0 => blocksize = v as usize,
                    ("BYTEPIX", Some(v)) if v > 0 => bytepix = v as usize,
                    _ => {}
                }
            }
            Ok(Algorithm::Rice { blocksize, bytepix })
        }
        "GZIP_1" => Ok(Algorithm::Gzip1),
        "GZIP_2" => Ok(Algorithm::Gzip2),
        "NOCOMPRESS" => Ok(Algorithm::None),
        other => Err(FitsError::UnsupportedCompression(other.to_string())),
    }
}

fn quantize(header: &Header) -> Quantize {
    match header.get_str("ZQUANTIZ").map(|s| s.trim().to_ascii_uppercase()).as_deref() {
        Some("SUBTRACTIVE_DITHER_1") => Quantize::SubtractiveDither1,
        Some("SUBTRACTIVE_DITHER_2") => Quantize::SubtractiveDither2,
        _ => Quantize::NoDither,
    }
}

/// The dither sequence: a Park–Miller generator seeded with 1, stored
/// as single-precision fractions.
fn randoms() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let a = 16807.0f64;
        let m = 2147483647.0f64;
        let mut seed = 1.0f64;
        (0..N_RANDOM)
            .map(|_| {
                let temp = a * seed;
                seed = temp - m * (temp / m).trunc();
                (seed / m) as f32
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Tile decoding
// ---------------------------------------------------------------------------

/// Per-tile inputs shared by all tiles of an image.
struct Layout<'a> {
    hdu: &'a Hdu,
    heap: &'a [u8],
    columns: Vec<Column>,
    algorithm: Algorithm,
    zbitpix: i64,
    quantize: Quantize,
    zdither0: i64,
    scaling: Scaling,
}

impl Layout<'_> {
    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Bytes of a variable-length column cell, or `None` when the column
    /// is absent or the cell is empty.
    fn var_cell(&self, row: &[u8], name: &str, tile: usize) -> Result<Option<(&[u8], char)>> {
        let Some(col) = self.column(name) else {
            return Ok(None);
        };
        let Some(elem) = col.var_elem else {
            return Ok(None);
        };
        let desc = row.get(col.offset..).unwrap_or_default();
        let (count, offset) = match col.code {
            'P' => (
                read_be::<4>(desc).map(|b| u32::from_be_bytes(b) as usize),
                desc.get(4..)
                    .and_then(read_be::<4>)
                    .map(|b| u32::from_be_bytes(b) as usize),
            ),
            _ => (
                read_be::<8>(desc).map(|b| u64::from_be_bytes(b) as usize),
                desc.get(8..)
                    .and_then(read_be::<8>)
                    .map(|b| u64::from_be_bytes(b) as usize),
            ),
        };
        let corrupt = |reason: &str| FitsError::Compression {
            tile,
            reason: reason.to_string(),
        };
        let (count, offset) = count.zip(offset).ok_or_else(|| corrupt("short descriptor"))?;
        if count == 0 {
            return Ok(None);
        }
        let width = elem_width(elem).ok_or_else(|| corrupt("bad element type"))?;
        let len = count
            .checked_mul(width)
            .ok_or_else(|| corrupt("descriptor length overflows"))?;
        let bytes = offset
            .checked_add(len)
            .and_then(|end| self.heap.get(offset..end))
            .ok_or_else(|| corrupt("descriptor points outside the heap"))?;
        Ok(Some((bytes, elem)))
    }

    fn scalar(&self, row: &[u8], name: &str, keyword: &str) -> Option<f64> {
        match self.column(name) {
            Some(col) if col.var_elem.is_none() => {
                let cell = row.get(col.offset..)?;
                match col.code {
                    'D' => read_be::<8>(cell).map(f64::from_be_bytes),
                    'E' => read_be::<4>(cell).map(|b| f32::from_be_bytes(b) as f64),
                    'J' => read_be::<4>(cell).map(|b| i32::from_be_bytes(b) as f64),
                    'K' => read_be::<8>(cell).map(|b| i64::from_be_bytes(b) as f64),
                    _ => None,
                }
            }
            _ => self.hdu.header.get_float(keyword),
        }
    }

    fn is_float(&self) -> bool {
        self.zbitpix < 0
    }

    /// Decode one tile to physical values.
    fn decode_tile(&self, row: &[u8], tile: usize, npix: usize) -> Result<Vec<f64>> {
        let corrupt = |reason: String| FitsError::Compression { tile, reason };

        let Some((data, _)) = self.var_cell(row, "COMPRESSED_DATA", tile)? else {
            return self.decode_fallback(row, tile, npix);
        };

        let zscale = self.scalar(row, "ZSCALE", "ZSCALE");
        let zzero = self.scalar(row, "ZZERO", "ZZERO").unwrap_or(0.0);
        let zblank = self
            .scalar(row, "ZBLANK", "ZBLANK")
            .map(|v| v as i64)
            .or(if self.is_float() {
                None
            } else {
                self.scaling.blank
            });
        let quantized = self.is_float() && zscale.is_some();

        // Width of the integers or floats inside the decompressed stream.
        let sample_bitpix = if quantized { 32 } else { self.zbitpix };

        let ints: Vec<i64> = match self.algorithm {
            Algorithm::Rice { blocksize, bytepix } => {
                let bytepix = if quantized { 4 } else { bytepix };
                rice::decode(data, npix, blocksize, bytepix, tile)?
            }
            Algorithm::Gzip1 | Algorithm::Gzip2 | Algorithm::None => {
                let mut raw = match self.algorithm {
                    Algorithm::None => data.to_vec(),
                    _ => gunzip(data).map_err(|e| corrupt(format!("gzip: {e}")))?,
                };
                let width = bytes_per_sample(sample_bitpix)?;
                if self.algorithm == Algorithm::Gzip2 {
                    raw = unshuffle(&raw, width);
                }
                if raw.len() < npix * width {
                    return Err(corrupt(format!(
                        "{} bytes decompressed, {} expected",
                        raw.len(),
                        npix * width
                    )));
                }
                raw.truncate(npix * width);
                if sample_bitpix < 0 {
                    // Lossless float tile.
                    return decode_samples(&raw, sample_bitpix, &self.scaling);
                }
                decode_ints(&raw, width)
            }
        };

        if ints.len() != npix {
            return Err(corrupt(format!("{} pixels decoded, {npix} expected", ints.len())));
        }

        if let (true, Some(scale)) = (quantized, zscale) {
            Ok(self.unquantize(&ints, tile, scale, zzero, zblank))
        } else {
            let scaling = Scaling {
                blank: zblank,
                ..self.scaling
            };
            Ok(ints.into_iter().map(|v| scaling.apply_int(v)).collect())
        }
    }

    /// Tiles that failed to compress are stored gzipped or raw in
    /// separate columns.
    fn decode_fallback(&self, row: &[u8], tile: usize, npix: usize) -> Result<Vec<f64>> {
        let corrupt = |reason: String| FitsError::Compression { tile, reason };

        if let Some((data, _)) = self.var_cell(row, "GZIP_COMPRESSED_DATA", tile)? {
            let raw = gunzip(data).map_err(|e| corrupt(format!("gzip: {e}")))?;
            let width = bytes_per_sample(self.zbitpix)?;
            let raw = raw
                .get(..npix * width)
                .ok_or_else(|| corrupt("short gzip tile".into()))?;
            return decode_samples(raw, self.zbitpix, &self.scaling);
        }

        if let Some((data, elem)) = self.var_cell(row, "UNCOMPRESSED_DATA", tile)? {
            let bitpix = match elem {
                'B' => 8,
                'I' => 16,
                'J' => 32,
                'K' => 64,
                'E' => -32,
                'D' => -64,
                other => return Err(corrupt(format!("unsupported element type {other}"))),
            };
            let width = bytes_per_sample(bitpix)?;
            let raw = data
                .get(..npix * width)
                .ok_or_else(|| corrupt("short raw tile".into()))?;
            return decode_samples(raw, bitpix, &self.scaling);
        }

        Err(corrupt("tile has no data".into()))
    }

    fn unquantize(
        &self,
        ints: &[i64],
        tile: usize,
        scale: f64,
        zero: f64,
        blank: Option<i64>,
    ) -> Vec<f64> {
        if self.quantize == Quantize::NoDither {
            return ints
                .iter()
                .map(|&v| {
                    if Some(v) == blank {
                        f64::NAN
                    } else {
                        v as f64 * scale + zero
                    }
                })
                .collect();
        }

        let rand = randoms();
        let seed_of = |iseed: usize| (rand[iseed] * 500.0) as usize;
        let row = tile as i64 + self.zdither0;
        let mut iseed = ((row - 1).rem_euclid(N_RANDOM as i64)) as usize;
        let mut next = seed_of(iseed);

        ints.iter()
            .map(|&v| {
                let out = if Some(v) == blank {
                    f64::NAN
                } else if self.quantize == Quantize::SubtractiveDither2 && v == ZERO_VALUE {
                    0.0
                } else {
                    (v as f64 - rand[next] as f64 + 0.5) * scale + zero
                };
                next += 1;
                if next == N_RANDOM {
                    iseed = (iseed + 1) % N_RANDOM;
                    next = seed_of(iseed);
                }
                out
            })
            .collect()
    }
}

fn read_be<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes.get(..N)?);
    Some(out)
}

fn decode_ints(raw: &[u8], width: usize) -> Vec<i64> {
    raw.chunks_exact(width)
        .map(|c| match width {
            1 => c[0] as i64,
            2 => i16::from_be_bytes([c[0], c[1]]) as i64,
            4 => i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as i64,
            _ => read_be::<8>(c).map(i64::from_be_bytes).unwrap_or_default(),
        })
        .collect()
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Undo GZIP_2 byte shuffling: all most-significant bytes first, then the
/// next byte of every value, and so on.
fn unshuffle(raw: &[u8], width: usize) -> Vec<u8> {
    let n = raw.len() / width;
    let mut out = vec![0u8; n * width];
    for i in 0..n {
        for j in 0..width {
            out[i * width + j] = raw[j * n + i];
        }
    }
    out
}

/// Decode the first 2-D plane of a tile-compressed image HDU.
pub fn read_tiled_image(data: &[u8], hdu: &Hdu) -> Result<Array2<f64>> {
    let header = &hdu.header;
    let missing = |keyword: &str| FitsError::MissingKeyword {
        hdu: hdu.index,
        keyword: keyword.to_string(),
    };

    let invalid = |keyword: &str| FitsError::InvalidKeyword {
        hdu: hdu.index,
        keyword: keyword.to_string(),
    };

    let axes = hdu.axes();
    let shape = hdu.image_shape().ok_or_else(|| missing("ZNAXIS"))?;
    // The compressed data does not bound the declared size, so cap it
    // before anything is allocated.
    shape
        .width
        .checked_mul(shape.height)
        .filter(|&n| n <= MAX_PIXELS)
        .ok_or_else(|| invalid("ZNAXIS"))?;
    let zbitpix = header.get_int("ZBITPIX").ok_or_else(|| missing("ZBITPIX"))?;
    bytes_per_sample(zbitpix)?;

    let row_len = header.get_int("NAXIS1").ok_or_else(|| missing("NAXIS1"))? as usize;
    let nrows = header.get_int("NAXIS2").ok_or_else(|| missing("NAXIS2"))? as usize;
    let theap = header
        .get_int("THEAP")
        .map(|v| v as usize)
        .unwrap_or(row_len * nrows);

    let available = data.len().saturating_sub(hdu.data_start);
    if available < hdu.data_len {
        return Err(FitsError::Truncated {
            hdu: hdu.index,
            needed: hdu.data_len,
            available,
        });
    }
    let section = &data[hdu.data_start..hdu.data_start + hdu.data_len];
    let heap = section.get(theap..).unwrap_or_default();

    let layout = Layout {
        hdu,
        heap,
        columns: columns(hdu)?,
        algorithm: algorithm(header)?,
        zbitpix,
        quantize: quantize(header),
        zdither0: header.get_int("ZDITHER0").unwrap_or(1),
        scaling: Scaling::from_header(header),
    };

    // Tile sizes default to whole rows.
    let tile_dims: Vec<usize> = (1..=axes.len())
        .map(|n| {
            let default = if n == 1 { axes[0] } else { 1 };
            header
                .get_int(&format!("ZTILE{n}"))
                .map(|v| v.max(1) as usize)
                .unwrap_or(default)
        })
        .collect();
    let (tw, th) = (tile_dims[0].min(shape.width), tile_dims[1].min(shape.height));
    let tiles_x = shape.width.div_ceil(tw);
    let tiles_y = shape.height.div_ceil(th);
    let plane_tiles = tiles_x * tiles_y;
    if nrows < plane_tiles {
        return Err(FitsError::Compression {
            tile: nrows,
            reason: format!("{nrows} tiles stored, {plane_tiles} needed"),
        });
    }

    // Deeper axes only contribute their first slice.
    let depth = tile_dims[2..]
        .iter()
        .zip(&axes[2..])
        .try_fold(1usize, |acc, (&t, &n)| acc.checked_mul(t.min(n)))
        .filter(|&d| d <= MAX_PIXELS)
        .ok_or_else(|| invalid("ZTILE"))?;

    log::debug!(
        "HDU {}: {:?}, {} x {} tiles of {} x {}",
        hdu.index,
        layout.algorithm,
        tiles_x,
        tiles_y,
        tw,
        th
    );

    let mut grid = Array2::<f64>::zeros((shape.height, shape.width));
    for tile in 0..plane_tiles {
        let (ix, iy) = (tile % tiles_x, tile / tiles_x);
        let x0 = ix * tw;
        let y0 = iy * th;
        let w = tw.min(shape.width - x0);
        let h = th.min(shape.height - y0);

        let npix = (w * h)
            .checked_mul(depth)
            .filter(|&n| n <= MAX_PIXELS)
            .ok_or_else(|| invalid("ZTILE"))?;
        let row = &section[tile * row_len..(tile + 1) * row_len];
        let values = layout.decode_tile(row, tile, npix)?;
        for y in 0..h {
            for x in 0..w {
                grid[[y0 + y, x0 + x]] = values[y * w + x];
            }
        }
    }
    Ok(grid)
}
