//! Display-range normalization
//!
//! After extraction every volume is rescaled once into `[0, 1]` using an
//! [`IntensityWindow`]. The window is either the full intensity range or a
//! percentile range that ignores a fraction of outliers at each end.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest window width used as a divisor during rescaling
pub const WINDOW_EPSILON: f32 = 1e-6;

/// How the load-time display window is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Minimum and maximum of the whole grid
    FullRange,
    /// Values at the given percentiles (0-100) of the sorted grid
    Percentile { lower: f32, upper: f32 },
}

impl Default for NormalizationMode {
    fn default() -> Self {
        NormalizationMode::Percentile {
            lower: 2.0,
            upper: 98.0,
        }
    }
}

/// Intensity bounds mapped to 0 and 1
///
/// `upper > lower` always holds; construct through [`IntensityWindow::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityWindow {
    lower: f32,
    upper: f32,
}

impl IntensityWindow {
    /// Create a window, substituting `[lower, lower + 1]` when the range collapses
    ///
    /// For magnitudes where a unit step is below f32 precision the fallback
    /// width grows to a few ulps of `lower`.
    pub fn new(lower: f32, upper: f32) -> Self {
        if upper > lower {
            IntensityWindow { lower, upper }
        } else {
            let step = 1.0f32.max(lower.abs() * f32::EPSILON * 2.0);
            IntensityWindow {
                lower,
                upper: lower + step,
            }
        }
    }

    pub fn lower(&self) -> f32 {
        self.lower
    }

    pub fn upper(&self) -> f32 {
        self.upper
    }

    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// Map a raw intensity into `[0, 1]`
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        ((value - self.lower) / self.width().max(WINDOW_EPSILON)).clamp(0.0, 1.0)
    }
}

/// Computes display windows and rescales grids
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntensityNormalizer {
    mode: NormalizationMode,
}

impl IntensityNormalizer {
    pub fn new(mode: NormalizationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Compute the window for `values` according to the configured mode
    pub fn compute_window(&self, values: &[f32]) -> IntensityWindow {
        let window = match self.mode {
            NormalizationMode::FullRange => full_range(values),
            NormalizationMode::Percentile { lower, upper } => percentile_range(values, lower, upper),
        };
        debug!(
            mode = ?self.mode,
            lower = window.lower(),
            upper = window.upper(),
            samples = values.len(),
            "Intensity window computed"
        );
        window
    }

    /// Compute the window from `raw` and return the rescaled grid
    pub fn normalize(&self, raw: &[f32]) -> (IntensityWindow, Vec<f32>) {
        let window = self.compute_window(raw);
        let mut grid = raw.to_vec();
        rescale(&mut grid, window);
        (window, grid)
    }
}

/// Window spanning the minimum and maximum of `values`
pub fn full_range(values: &[f32]) -> IntensityWindow {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if values.is_empty() {
        return IntensityWindow::new(0.0, 1.0);
    }
    IntensityWindow::new(min, max)
}

/// Window between the `lower` and `upper` percentiles of `values`
///
/// Sorts a copy of the data and takes the samples at `floor(N * p / 100)`,
/// clamped into `[0, N - 1]`.
pub fn percentile_range(values: &[f32], lower: f32, upper: f32) -> IntensityWindow {
    if values.is_empty() {
        return IntensityWindow::new(0.0, 1.0);
    }

    let mut scratch = values.to_vec();
    scratch.par_sort_unstable_by(f32::total_cmp);

    let n = scratch.len();
    let rank = |p: f32| -> usize {
        let idx = (n as f64 * p as f64 / 100.0).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(n - 1)
        }
    };

    IntensityWindow::new(scratch[rank(lower)], scratch[rank(upper)])
}

/// Rescale every element of `grid` through `window`
pub fn rescale(grid: &mut [f32], window: IntensityWindow) {
    grid.par_iter_mut().for_each(|v| *v = window.apply(*v));
}
