//! Rice decoding for `RICE_1` compressed tiles.
//!
//! A tile starts with the first pixel stored verbatim in `bytepix` bytes.
//! The remaining bit stream is split into blocks of `blocksize` pixel
//! differences. Each block begins with an `fsbits`-wide code selecting
//! the split level `fs`:
//! - code 0: every difference in the block is zero
//! - code `fsmax + 1`: differences are stored verbatim
//! - otherwise: each difference is a unary high part followed by `fs` low bits
//!
//! Differences are zig-zag mapped so small negative values stay small.

use super::error::{FitsError, Result};

/// Bit-stream parameters for one sample width.
struct Params {
    fsbits: i32,
    fsmax: i32,
    bbits: i32,
}

fn params(bytepix: usize) -> Option<Params> {
    match bytepix {
        1 => Some(Params {
            fsbits: 3,
            fsmax: 6,
            bbits: 8,
        }),
        2 => Some(Params {
            fsbits: 4,
            fsmax: 14,
            bbits: 16,
        }),
        4 => Some(Params {
            fsbits: 5,
            fsmax: 25,
            bbits: 32,
        }),
        _ => None,
    }
}

struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
    tile: usize,
}

impl Bytes<'_> {
    fn next(&mut self) -> Result<u64> {
        let b = self.data.get(self.pos).copied().ok_or_else(|| FitsError::Compression {
            tile: self.tile,
            reason: "Rice stream ended early".into(),
        })?;
        self.pos += 1;
        Ok(b as u64)
    }
}

fn unzigzag(diff: u64) -> u32 {
    let diff = diff as u32;
    if diff & 1 == 0 {
        diff >> 1
    } else {
        !(diff >> 1)
    }
}

/// Decode `npix` samples. One- and two-byte samples come back as the
/// stored unsigned byte and signed 16-bit value; four-byte samples as
/// signed 32-bit values.
pub fn decode(
    input: &[u8],
    npix: usize,
    blocksize: usize,
    bytepix: usize,
    tile: usize,
) -> Result<Vec<i64>> {
    let p = params(bytepix).ok_or_else(|| {
        FitsError::UnsupportedCompression(format!("RICE_1 with BYTEPIX = {bytepix}"))
    })?;
    if blocksize == 0 {
        return Err(FitsError::Compression {
            tile,
            reason: "BLOCKSIZE is zero".into(),
        });
    }
    let mask: u32 = if p.bbits == 32 {
        u32::MAX
    } else {
        (1u32 << p.bbits) - 1
    };

    let mut src = Bytes {
        data: input,
        pos: 0,
        tile,
    };
    let mut lastpix: u32 = 0;
    for _ in 0..bytepix {
        lastpix = (lastpix << 8) | src.next()? as u32;
    }

    let mut out: Vec<u32> = Vec::with_capacity(npix);
    let mut b = src.next()?;
    let mut nbits: i32 = 8;
    let mut i = 0;

    while i < npix {
        nbits -= p.fsbits;
        while nbits < 0 {
            b = (b << 8) | src.next()?;
            nbits += 8;
        }
        let fs = (b >> nbits) as i32 - 1;
        b &= (1u64 << nbits) - 1;
        let imax = (i + blocksize).min(npix);

        if fs < 0 {
            // Low entropy: the whole block repeats the previous pixel.
            out.resize(imax, lastpix);
            i = imax;
        } else if fs == p.fsmax {
            // High entropy: differences stored in bbits each.
            while i < imax {
                let mut k = p.bbits - nbits;
                let mut diff = b << k;
                k -= 8;
                while k >= 0 {
                    b = src.next()?;
                    diff |= b << k;
                    k -= 8;
                }
                if nbits > 0 {
                    b = src.next()?;
                    diff |= b >> (-k);
                    b &= (1u64 << nbits) - 1;
                } else {
                    b = 0;
                }
                lastpix = unzigzag(diff).wrapping_add(lastpix) & mask;
                out.push(lastpix);
                i += 1;
            }
        } else {
            while i < imax {
                while b == 0 {
                    nbits += 8;
                    b = src.next()?;
                }
                let nzero = nbits - (64 - b.leading_zeros()) as i32;
                nbits -= nzero + 1;
                b ^= 1u64 << nbits;
                nbits -= fs;
                while nbits < 0 {
                    b = (b << 8) | src.next()?;
                    nbits += 8;
                }
                let diff = ((nzero as u64) << fs) | (b >> nbits);
                b &= (1u64 << nbits) - 1;
                lastpix = unzigzag(diff).wrapping_add(lastpix) & mask;
                out.push(lastpix);
                i += 1;
            }
        }
    }

    let signed = out
        .into_iter()
        .map(|v| match bytepix {
            1 => v as u8 as i64,
            2 => v as u16 as i16 as i64,
            _ => v as i32 as i64,
        })
        .collect();
    Ok(signed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    struct BitWriter {
        out: Vec<u8>,
        acc: u8,
        filled: u32,
    }

    impl BitWriter {
        fn put(&mut self, value: u64, nbits: u32) {
            for shift in (0..nbits).rev() {
                self.acc = (self.acc << 1) | ((value >> shift) & 1) as u8;
                self.filled += 1;
                if self.filled == 8 {
                    self.out.push(self.acc);
                    self.acc = 0;
                    self.filled = 0;
                }
            }
        }

        fn finish(mut self) -> Vec<u8> {
            if self.filled > 0 {
                self.out.push(self.acc << (8 - self.filled));
            }
            self.out
        }
    }

    /// Reference encoder producing all three block flavours.
    pub(crate) fn encode(values: &[i64], blocksize: usize, bytepix: usize) -> Vec<u8> {
        let p = params(bytepix).unwrap();
        let width = p.bbits as u32;
        let wrap = |v: i64| -> i64 {
            match bytepix {
                1 => v as u8 as i64,
                2 => v as u16 as i16 as i64,
                _ => v as u32 as i32 as i64,
            }
        };
        let zig = |d: i64| -> u64 {
            let d = match bytepix {
                1 => d as u8 as i8 as i64,
                2 => d as u16 as i16 as i64,
                _ => d as u32 as i32 as i64,
            };
            let mapped = if d < 0 { !(d << 1) } else { d << 1 };
            mapped as u64 & ((1u64 << width) - 1)
        };

        let mut w = BitWriter {
            out: Vec::new(),
            acc: 0,
            filled: 0,
        };
        let first = wrap(values[0]);
        w.put(first as u64 & ((1u64 << width) - 1), width);

        let mut last = first;
        for block in values.chunks(blocksize) {
            let diffs: Vec<u64> = block
                .iter()
                .map(|&v| {
                    let v = wrap(v);
                    let d = zig(v - last);
                    last = v;
                    d
                })
                .collect();
            let sum: u64 = diffs.iter().sum();
            if sum == 0 {
                w.put(0, p.fsbits as u32);
                continue;
            }
            let mean = sum / diffs.len() as u64;
            let fs = (64 - mean.leading_zeros()).saturating_sub(1) as i32;
            if fs >= p.fsmax {
                w.put((p.fsmax + 1) as u64, p.fsbits as u32);
                for d in diffs {
                    w.put(d, width);
                }
            } else {
                w.put((fs + 1) as u64, p.fsbits as u32);
                for d in diffs {
                    let top = d >> fs;
                    w.put(1, top as u32 + 1);
                    w.put(d & ((1u64 << fs) - 1), fs as u32);
                }
            }
        }
        w.finish()
    }

    #[test]
    fn constant_tile_is_one_low_entropy_block() {
        // First pixel 5, then a zero fs code in 5 bits.
        let decoded = decode(&[0, 0, 0, 5, 0], 4, 32, 4, 0).unwrap();
        assert_eq!(decoded, vec![5, 5, 5, 5]);
    }

    #[test]
    fn smooth_ramp_32_bit() {
        let values: Vec<i64> = (0..100).map(|i| 1000 + 3 * i - (i % 7)).collect();
        let encoded = encode(&values, 32, 4);
        assert_eq!(decode(&encoded, values.len(), 32, 4, 0).unwrap(), values);
    }

    #[test]
    fn noisy_signed_16_bit() {
        let mut seed: u32 = 12345;
        let values: Vec<i64> = (0..77)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                ((seed >> 16) as i16) as i64
            })
            .collect();
        let encoded = encode(&values, 16, 2);
        assert_eq!(decode(&encoded, values.len(), 16, 2, 0).unwrap(), values);
    }

    #[test]
    fn mixed_blocks_8_bit() {
        let mut values = vec![10i64; 20];
        values.extend([0, 255, 3, 250, 7, 128, 1, 254]);
        values.extend((0..20).map(|i| 100 + i));
        let encoded = encode(&values, 8, 1);
        assert_eq!(decode(&encoded, values.len(), 8, 1, 0).unwrap(), values);
    }

    #[test]
    fn short_stream_is_an_error() {
        let values: Vec<i64> = (0..64).map(|i| i * i).collect();
        let encoded = encode(&values, 32, 4);
        let err = decode(&encoded[..encoded.len() / 2], values.len(), 32, 4, 3).unwrap_err();
        assert!(matches!(err, FitsError::Compression { tile: 3, .. }));
    }

    #[test]
    fn unsupported_bytepix() {
        let err = decode(&[0; 16], 1, 32, 8, 0).unwrap_err();
        assert!(matches!(err, FitsError::UnsupportedCompression(_)));
    }
}
