use std::path::Path;

use anyhow::Context;
use astro_glance::fits::writer::FitsWriter;
use astro_glance::fits::{Card, HeaderValue};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;

fn gaussian(r2: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-r2 / (2.0 * sigma.powi(2))).exp()
}

struct Star {
    x: f64,
    y: f64,
    flux: f64,
}

/// Sky background with read noise plus a Gaussian PSF per star.
fn render_field(stars: &[Star], sigma: f64, rng: &mut SimpleRng) -> Vec<f32> {
    let mut pixels = Vec::with_capacity(WIDTH * HEIGHT);
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let signal: f64 = stars
                .iter()
                .map(|s| {
                    let r2 = (col as f64 - s.x).powi(2) + (row as f64 - s.y).powi(2);
                    gaussian(r2, sigma, s.flux / (2.0 * std::f64::consts::PI * sigma * sigma))
                })
                .sum();
            pixels.push((signal + rng.gauss(250.0, 6.0)) as f32);
        }
    }
    pixels
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn string(keyword: &str, value: &str, comment: &str) -> Card {
    Card::new(keyword, HeaderValue::String(value.into()), Some(comment))
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);

    let stars: Vec<Star> = (0..60)
        .map(|_| Star {
            x: rng.next_f64() * WIDTH as f64,
            y: rng.next_f64() * HEIGHT as f64,
            // A few bright stars over many faint ones.
            flux: 2_000.0 * (1.0 / rng.next_f64().max(0.02)),
        })
        .collect();

    let mut pixels = render_field(&stars, 1.8, &mut rng);

    // Dead pixels and a saturated hot pixel, to exercise sanitization.
    for _ in 0..12 {
        let i = (rng.next_u64() % pixels.len() as u64) as usize;
        pixels[i] = f32::NAN;
    }
    pixels[WIDTH * 10 + 10] = f32::INFINITY;

    let mut w = FitsWriter::new();
    w.primary_header_only(&[
        string("OBJECT", "Synthetic field", "target name"),
        string("TELESCOP", "Astro Glance 0.4m", "telescope"),
        Card::new("EXPTIME", HeaderValue::Float(120.0), Some("[s] exposure time")),
        Card::commentary("COMMENT", "Generated by generate_sample"),
    ]);
    w.image_extension::<f32>(
        WIDTH,
        HEIGHT,
        &pixels,
        &[
            string("EXTNAME", "SCI", "extension name"),
            Card::new("INHERIT", HeaderValue::Logical(true), Some("inherit primary keywords")),
            string("BUNIT", "ADU", "pixel unit"),
        ],
    );

    // Source catalog: X, Y, FLUX as big-endian f32.
    let mut table = Vec::with_capacity(stars.len() * 12);
    for s in &stars {
        for v in [s.x as f32, s.y as f32, s.flux as f32] {
            table.extend_from_slice(&v.to_be_bytes());
        }
    }
    w.bintable(
        &[("X", "1E"), ("Y", "1E"), ("FLUX", "1E")],
        12,
        &table,
        &[],
        &[string("EXTNAME", "CATALOG", "extension name")],
    );

    let output_path = Path::new("sample_field.fits");
    w.write_to(output_path)
        .with_context(|| format!("writing {}", output_path.display()))?;

    println!(
        "Wrote {WIDTH} × {HEIGHT} star field with {} catalog rows to {}",
        stars.len(),
        output_path.display()
    );
    Ok(())
}
