//! Loaded volume storage
//!
//! A [`VolumeStore`] owns the parsed header and the normalized grid of one
//! loaded volume. The grid only changes through [`VolumeStore::renormalize`],
//! which replaces it wholesale.

use crate::axis::PlaneAxis;
use crate::format::header::VolumeHeader;
use crate::volume::normalize::{IntensityNormalizer, IntensityWindow, NormalizationMode};
use glam::Vec3;
use tracing::info;

/// Header and normalized intensities of a loaded volume
#[derive(Debug, Clone)]
pub struct VolumeStore {
    header: VolumeHeader,
    mode: NormalizationMode,
    window: IntensityWindow,
    /// Extracted intensities, kept so the display window can be recomputed
    raw: Vec<f32>,
    grid: Vec<f32>,
}

impl VolumeStore {
    /// Normalize an extracted grid and take ownership of it
    ///
    /// `raw` must hold exactly `header.num_voxels()` values, as produced by
    /// [`VoxelExtractor::extract`](crate::format::voxel::VoxelExtractor::extract).
    pub fn new(header: VolumeHeader, raw: Vec<f32>, mode: NormalizationMode) -> Self {
        debug_assert_eq!(raw.len(), header.num_voxels());
        let (window, grid) = IntensityNormalizer::new(mode).normalize(&raw);
        VolumeStore {
            header,
            mode,
            window,
            raw,
            grid,
        }
    }

    pub fn header(&self) -> &VolumeHeader {
        &self.header
    }

    /// Grid size `[nx, ny, nz]`
    pub fn dimensions(&self) -> [usize; 3] {
        self.header.dimensions
    }

    /// Voxel size in millimetres
    pub fn spacing(&self) -> [f32; 3] {
        self.header.spacing
    }

    /// Window used for the current normalization
    pub fn window(&self) -> IntensityWindow {
        self.window
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Normalized grid, indexed `x + nx * (y + ny * z)`
    pub fn grid(&self) -> &[f32] {
        &self.grid
    }

    /// Number of slices along `axis`
    pub fn slice_count(&self, axis: PlaneAxis) -> usize {
        self.header.dimensions[axis.index()]
    }

    /// Highest valid slice index along `axis`
    pub fn max_index(&self, axis: PlaneAxis) -> usize {
        self.slice_count(axis) - 1
    }

    /// Size of the volume in millimetres (dimensions × spacing)
    pub fn physical_extent(&self) -> Vec3 {
        let [nx, ny, nz] = self.header.dimensions;
        let [dx, dy, dz] = self.header.spacing;
        Vec3::new(nx as f32 * dx, ny as f32 * dy, nz as f32 * dz)
    }

    #[inline]
    pub(crate) fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        let [nx, ny, _] = self.header.dimensions;
        x + nx * (y + ny * z)
    }

    /// Normalized value at `(x, y, z)`, or `None` outside the grid
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        let [nx, ny, nz] = self.header.dimensions;
        if x >= nx || y >= ny || z >= nz {
            return None;
        }
        Some(self.grid[self.linear_index(x, y, z)])
    }

    /// Recompute the window with `mode` and rebuild the normalized grid
    pub fn renormalize(&mut self, mode: NormalizationMode) {
        let (window, grid) = IntensityNormalizer::new(mode).normalize(&self.raw);
        info!(
            mode = ?mode,
            lower = window.lower(),
            upper = window.upper(),
            "Volume renormalized"
        );
        self.mode = mode;
        self.window = window;
        self.grid = grid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::header::ElementEncoding;

    fn ramp_store(dims: [usize; 3], mode: NormalizationMode) -> VolumeStore {
        let header = VolumeHeader::new(dims, ElementEncoding::Float32);
        let raw = (0..header.num_voxels()).map(|i| i as f32).collect();
        VolumeStore::new(header, raw, mode)
    }

    #[test]
    fn test_voxel_bounds() {
        let store = ramp_store([4, 3, 2], NormalizationMode::FullRange);
        assert_eq!(store.voxel(0, 0, 0), Some(0.0));
        assert_eq!(store.voxel(3, 2, 1), Some(1.0));
        assert_eq!(store.voxel(4, 0, 0), None);
        assert_eq!(store.voxel(0, 3, 0), None);
        assert_eq!(store.voxel(0, 0, 2), None);
    }

    #[test]
    fn test_grid_layout() {
        let store = ramp_store([4, 3, 2], NormalizationMode::FullRange);
        let expected = (1 + 4 * (2 + 3 * 1)) as f32 / 23.0;
        assert_eq!(store.voxel(1, 2, 1), Some(expected));
    }

    #[test]
    fn test_slice_counts() {
        let store = ramp_store([5, 6, 7], NormalizationMode::FullRange);
        assert_eq!(store.slice_count(PlaneAxis::X), 5);
        assert_eq!(store.max_index(PlaneAxis::Y), 5);
        assert_eq!(store.max_index(PlaneAxis::Z), 6);
    }

    #[test]
    fn test_physical_extent() {
        let header =
            VolumeHeader::new([10, 20, 5], ElementEncoding::UInt8).with_spacing([1.0, 0.5, 4.0]);
        let store = VolumeStore::new(header, vec![0.0; 1000], NormalizationMode::FullRange);
        assert_eq!(store.physical_extent(), Vec3::new(10.0, 10.0, 20.0));
    }

    #[test]
    fn test_renormalize_replaces_grid() {
        let mut store = ramp_store([10, 10, 1], NormalizationMode::FullRange);
        assert_eq!(store.window().lower(), 0.0);
        assert_eq!(store.voxel(5, 0, 0), Some(5.0 / 99.0));

        store.renormalize(NormalizationMode::Percentile {
            lower: 10.0,
            upper: 90.0,
        });
        assert_eq!(store.window().lower(), 10.0);
        assert_eq!(store.window().upper(), 90.0);
        assert_eq!(store.voxel(5, 0, 0), Some(0.0));
        assert_eq!(store.voxel(9, 9, 0), Some(1.0));

        store.renormalize(NormalizationMode::FullRange);
        assert_eq!(store.voxel(5, 0, 0), Some(5.0 / 99.0));
    }
}
