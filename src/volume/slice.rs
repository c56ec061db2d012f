//! Orthogonal slice extraction
//!
//! A slice is the 2D cross-section of the grid at a fixed index along one
//! axis. Its layout is fixed per axis (see [`PlaneAxis::orthogonal`]): cell
//! `(u, v)` lives at `data[v * width + u]`, where `u` runs along the first
//! orthogonal axis and `v` along the second.
//!
//! Each sampled value passes through a [`ContrastWindow`]. This window is
//! applied on top of the load-time normalization and can be switched off on
//! its own.

use crate::axis::PlaneAxis;
use crate::volume::store::VolumeStore;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Interactive level/width contrast remap over the normalized `[0, 1]` domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContrastWindow {
    /// Centre of the window
    pub level: f32,
    /// Span of the window
    pub width: f32,
    /// When false, samples pass through unchanged
    pub enabled: bool,
}

impl Default for ContrastWindow {
    fn default() -> Self {
        Self {
            level: 0.5,
            width: 1.0,
            enabled: true,
        }
    }
}

impl ContrastWindow {
    /// Enabled window with the given level and width
    pub fn new(level: f32, width: f32) -> Self {
        Self {
            level,
            width,
            enabled: true,
        }
    }

    /// Window that leaves samples untouched
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Remap a normalized sample
    ///
    /// Values at or below `level - width / 2` map to 0, values at or above
    /// `level + width / 2` map to 1, with linear interpolation in between.
    /// The sign of `width` is ignored.
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        if !self.enabled {
            return value;
        }
        let half = self.width.abs() * 0.5;
        let low = self.level - half;
        let high = self.level + half;
        if value <= low {
            0.0
        } else if value >= high {
            1.0
        } else {
            (value - low) / (high - low)
        }
    }
}

/// 2D slice samples for one `(axis, index)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct SliceBuffer {
    pub axis: PlaneAxis,
    pub index: usize,
    /// Number of columns (extent of the first orthogonal axis)
    pub width: usize,
    /// Number of rows (extent of the second orthogonal axis)
    pub height: usize,
    /// Row-major samples in `[0, 1]`
    pub data: Vec<f32>,
}

impl SliceBuffer {
    /// Empty buffer for `axis`, ready to be filled by [`SliceSampler::sample_into`]
    pub fn empty(axis: PlaneAxis) -> Self {
        Self {
            axis,
            index: 0,
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    /// Sample at column `u`, row `v`
    pub fn get(&self, u: usize, v: usize) -> Option<f32> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.data.get(v * self.width + u).copied()
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.width.max(1))
    }
}

/// Buffer size `(width, height)` for slices along `axis` of a grid sized `dims`
pub fn slice_extent(dims: [usize; 3], axis: PlaneAxis) -> (usize, usize) {
    let (u, v) = axis.orthogonal();
    (dims[u.index()], dims[v.index()])
}

/// Extracts contrast-windowed slices from a [`VolumeStore`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SliceSampler {
    contrast: ContrastWindow,
}

impl SliceSampler {
    pub fn new(contrast: ContrastWindow) -> Self {
        Self { contrast }
    }

    pub fn contrast(&self) -> ContrastWindow {
        self.contrast
    }

    pub fn set_contrast(&mut self, contrast: ContrastWindow) {
        self.contrast = contrast;
    }

    /// Sample a fresh buffer; `index` is clamped to the valid range
    pub fn sample(&self, store: &VolumeStore, axis: PlaneAxis, index: usize) -> SliceBuffer {
        let mut buffer = SliceBuffer::empty(axis);
        self.sample_into(store, axis, index, &mut buffer);
        buffer
    }

    /// Overwrite `buffer` with the slice at `(axis, index)`, reusing its allocation
    pub fn sample_into(
        &self,
        store: &VolumeStore,
        axis: PlaneAxis,
        index: usize,
        buffer: &mut SliceBuffer,
    ) {
        let dims = store.dimensions();
        let index = index.min(store.max_index(axis));
        let (width, height) = slice_extent(dims, axis);
        let grid = store.grid();
        let [nx, ny, _] = dims;

        // Strides of the (u, v) axes in the linear grid, plus the fixed-axis offset
        let (base, stride_u, stride_v) = match axis {
            PlaneAxis::X => (index, nx, nx * ny),
            PlaneAxis::Y => (index * nx, 1, nx * ny),
            PlaneAxis::Z => (index * nx * ny, 1, nx),
        };

        buffer.data.clear();
        buffer.data.reserve(width * height);
        for v in 0..height {
            let row = base + v * stride_v;
            buffer
                .data
                .extend((0..width).map(|u| self.contrast.apply(grid[row + u * stride_u])));
        }
        buffer.axis = axis;
        buffer.index = index;
        buffer.width = width;
        buffer.height = height;

        trace!(axis = %axis, index, width, height, "Slice sampled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::header::{ElementEncoding, VolumeHeader};
    use crate::volume::normalize::NormalizationMode;

    fn ramp_store(dims: [usize; 3]) -> VolumeStore {
        let header = VolumeHeader::new(dims, ElementEncoding::Float32);
        let n = header.num_voxels();
        let raw = (0..n).map(|i| i as f32).collect();
        VolumeStore::new(header, raw, NormalizationMode::FullRange)
    }

    #[test]
    fn test_contrast_identity_default() {
        let window = ContrastWindow::default();
        for v in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(window.apply(v), v);
        }
    }

    #[test]
    fn test_contrast_window_edges() {
        let window = ContrastWindow::new(0.5, 0.5);
        assert_eq!(window.apply(0.25), 0.0);
        assert_eq!(window.apply(0.1), 0.0);
        assert_eq!(window.apply(0.75), 1.0);
        assert_eq!(window.apply(0.9), 1.0);
        assert_eq!(window.apply(0.5), 0.5);
        assert_eq!(window.apply(0.375), 0.25);
    }

    #[test]
    fn test_contrast_zero_width_is_threshold() {
        let window = ContrastWindow::new(0.3, 0.0);
        assert_eq!(window.apply(0.3), 0.0);
        assert_eq!(window.apply(0.31), 1.0);
    }

    #[test]
    fn test_contrast_negative_width_matches_positive() {
        let negative = ContrastWindow::new(0.5, -0.4);
        let positive = ContrastWindow::new(0.5, 0.4);
        for value in [0.0, 0.3, 0.4, 0.5, 0.6, 0.7, 1.0] {
            assert_eq!(negative.apply(value), positive.apply(value), "value {}", value);
        }
        assert!((negative.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_contrast_disabled_passthrough() {
        let mut window = ContrastWindow::new(0.5, 0.1);
        window.enabled = false;
        assert_eq!(window.apply(0.42), 0.42);
        assert_eq!(ContrastWindow::disabled().apply(0.9), 0.9);
    }

    #[test]
    fn test_buffer_dimensions_per_axis() {
        let store = ramp_store([3, 4, 5]);
        let sampler = SliceSampler::default();

        let x = sampler.sample(&store, PlaneAxis::X, 1);
        assert_eq!((x.width, x.height), (4, 5));
        let y = sampler.sample(&store, PlaneAxis::Y, 1);
        assert_eq!((y.width, y.height), (3, 5));
        let z = sampler.sample(&store, PlaneAxis::Z, 1);
        assert_eq!((z.width, z.height), (3, 4));

        for buffer in [x, y, z] {
            assert_eq!(buffer.data.len(), buffer.width * buffer.height);
        }
    }

    #[test]
    fn test_sample_matches_voxels() {
        let store = ramp_store([3, 4, 5]);
        let sampler = SliceSampler::new(ContrastWindow::disabled());

        let x = sampler.sample(&store, PlaneAxis::X, 2);
        assert_eq!(x.get(3, 4), store.voxel(2, 3, 4));
        let y = sampler.sample(&store, PlaneAxis::Y, 3);
        assert_eq!(y.get(1, 2), store.voxel(1, 3, 2));
        let z = sampler.sample(&store, PlaneAxis::Z, 4);
        assert_eq!(z.get(2, 1), store.voxel(2, 1, 4));
    }

    #[test]
    fn test_index_clamped() {
        let store = ramp_store([2, 2, 3]);
        let buffer = SliceSampler::default().sample(&store, PlaneAxis::Z, 99);
        assert_eq!(buffer.index, 2);
        assert_eq!(buffer.get(1, 1), store.voxel(1, 1, 2));
    }

    #[test]
    fn test_sample_into_reuses_allocation() {
        let store = ramp_store([8, 8, 8]);
        let sampler = SliceSampler::default();
        let mut buffer = sampler.sample(&store, PlaneAxis::Z, 0);
        let ptr = buffer.data.as_ptr();

        sampler.sample_into(&store, PlaneAxis::Z, 5, &mut buffer);
        assert_eq!(buffer.index, 5);
        assert_eq!(buffer.data.as_ptr(), ptr);
    }

    #[test]
    fn test_rows() {
        let store = ramp_store([3, 2, 1]);
        let buffer = SliceSampler::default().sample(&store, PlaneAxis::Z, 0);
        let rows: Vec<&[f32]> = buffer.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], store.voxel(0, 1, 0).unwrap());
    }
}
