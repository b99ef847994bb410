use ndarray::Array2;

/// A grid with every non-finite sample replaced by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub grid: Array2<f64>,
    /// How many NaN / ±inf samples were replaced.
    pub replaced: usize,
}

/// Replace NaN, +inf and -inf with 0.0.
pub fn sanitize(grid: &Array2<f64>) -> Sanitized {
    let mut replaced = 0;
    let grid = grid.mapv(|v| {
        if v.is_finite() {
            v
        } else {
            replaced += 1;
            0.0
        }
    });
    Sanitized { grid, replaced }
}

/// Arithmetic mean over every element; `None` for an empty grid.
pub fn mean_brightness(grid: &Array2<f64>) -> Option<f64> {
    grid.mean()
}

/// Summary shown next to the mean brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

pub fn frame_stats(grid: &Array2<f64>) -> Option<FrameStats> {
    let mean = mean_brightness(grid)?;
    let min = grid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(FrameStats {
        min,
        max,
        mean,
        std_dev: grid.std(0.0),
    })
}

/// Area the brightness is averaged over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    WholeFrame,
    /// Interactive selection; not implemented, the whole frame is used.
    Selection,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::WholeFrame => "Whole image",
            Region::Selection => "Select region",
        }
    }

    pub fn is_implemented(self) -> bool {
        self == Region::WholeFrame
    }
}
