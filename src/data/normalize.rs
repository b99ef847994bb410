use ndarray::Array2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stretch selection
// ---------------------------------------------------------------------------

/// Which stretch the preview uses; the percentile bounds come from the
/// viewer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StretchMode {
    Linear,
    #[default]
    Percentile,
}

impl StretchMode {
    pub fn label(self) -> &'static str {
        match self {
            StretchMode::Linear => "Min / max",
            StretchMode::Percentile => "Percentile clip",
        }
    }
}

/// A fully specified mapping from physical values to 8-bit intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stretch {
    /// Scale `[min, max]` of the grid onto `[0, 255]`.
    Linear,
    /// Clip to the `lower`/`upper` percentiles (0–100), then scale.
    Percentile { lower: f64, upper: f64 },
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Percentile `q` (0–100) of already sorted values, interpolating linearly
/// between the two nearest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Map a sanitized grid to 8-bit intensities of the same shape.
///
/// A degenerate range (every value equal, or both percentiles equal)
/// yields an all-zero preview.
pub fn normalize(grid: &Array2<f64>, stretch: Stretch) -> Array2<u8> {
    if grid.is_empty() {
        return Array2::zeros(grid.raw_dim());
    }

    let (lo, hi) = match stretch {
        Stretch::Linear => {
            let min = grid.iter().copied().fold(f64::INFINITY, f64::min);
            let max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min, max)
        }
        Stretch::Percentile { lower, upper } => {
            let mut sorted: Vec<f64> = grid.iter().copied().collect();
            sorted.sort_unstable_by(f64::total_cmp);
            (percentile(&sorted, lower), percentile(&sorted, upper))
        }
    };

    linear_map(grid, lo, hi)
}

/// `round(255 * (clip(v, lo, hi) - lo) / (hi - lo))`.
fn linear_map(grid: &Array2<f64>, lo: f64, hi: f64) -> Array2<u8> {
    let range = hi - lo;
    if range <= 0.0 || !range.is_finite() {
        return Array2::zeros(grid.raw_dim());
    }
    grid.mapv(|v| {
        let scaled = 255.0 * (v.clamp(lo, hi) - lo) / range;
        scaled.round().clamp(0.0, 255.0) as u8
    })
}
