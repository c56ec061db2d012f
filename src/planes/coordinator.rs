//! Three-plane navigation
//!
//! The coordinator owns one [`PlaneState`] per axis. It converts normalized
//! positions into slice indices and plane placements, and resamples a plane's
//! buffer only when its slice index actually changes.
//!
//! The display volume is centred at the origin and spans `[-0.5, 0.5]` along
//! each local axis; [`MultiPlaneCoordinator::display_scale`] stretches it to
//! the physical proportions of the scan.

use crate::axis::PlaneAxis;
use crate::planes::state::PlaneState;
use crate::volume::slice::{ContrastWindow, SliceSampler};
use crate::volume::store::VolumeStore;
use glam::Vec3;
use tracing::{debug, trace};

/// Initial position of every plane
const INITIAL_POSITION: f32 = 0.5;

/// Owns the three plane cursors of a loaded volume
#[derive(Debug, Clone)]
pub struct MultiPlaneCoordinator {
    planes: [PlaneState; 3],
    max_index: [usize; 3],
    sampler: SliceSampler,
    display_scale: Vec3,
}

impl MultiPlaneCoordinator {
    /// Create planes at the volume centre and sample their initial slices
    pub fn new(store: &VolumeStore, contrast: ContrastWindow) -> Self {
        let max_index = PlaneAxis::ALL.map(|axis| store.max_index(axis));
        let planes = PlaneAxis::ALL.map(|axis| {
            let index = index_for_position(INITIAL_POSITION, max_index[axis.index()]);
            PlaneState::new(axis, INITIAL_POSITION, index)
        });

        let extent = store.physical_extent();
        let display_scale = extent / extent.max_element();

        let mut coordinator = Self {
            planes,
            max_index,
            sampler: SliceSampler::new(contrast),
            display_scale,
        };
        coordinator.resample_all(store);

        debug!(
            extent = ?extent,
            display_scale = ?display_scale,
            "Plane coordinator initialized"
        );
        coordinator
    }

    /// Read access to the plane for `axis`
    pub fn plane(&self, axis: PlaneAxis) -> &PlaneState {
        &self.planes[axis.index()]
    }

    pub fn planes(&self) -> &[PlaneState; 3] {
        &self.planes
    }

    /// Number of times the plane for `axis` has been sampled
    pub fn resample_count(&self, axis: PlaneAxis) -> u64 {
        self.plane(axis).resample_count()
    }

    /// Highest slice index along `axis`
    pub fn max_index(&self, axis: PlaneAxis) -> usize {
        self.max_index[axis.index()]
    }

    /// Scale that gives the unit display cube the scan's physical proportions
    ///
    /// The longest physical side maps to 1.
    pub fn display_scale(&self) -> Vec3 {
        self.display_scale
    }

    /// Current contrast window
    pub fn contrast(&self) -> ContrastWindow {
        self.sampler.contrast()
    }

    /// Local placement of the plane for `axis` within the unit display cube
    pub fn plane_local_position(&self, axis: PlaneAxis) -> Vec3 {
        let mut position = Vec3::ZERO;
        position[axis.index()] = self.plane(axis).local_offset();
        position
    }

    /// Move the plane for `axis` to `normalized_position`
    ///
    /// The position is clamped to `[0, 1]` and converted to the nearest slice
    /// index. The buffer is resampled only when that index changes.
    ///
    /// # Returns
    /// Whether the plane's buffer was resampled
    pub fn update_plane_position(
        &mut self,
        store: &VolumeStore,
        axis: PlaneAxis,
        normalized_position: f32,
    ) -> bool {
        let position = clamp_unit(normalized_position);
        let index = index_for_position(position, self.max_index(axis));

        let sampler = self.sampler;
        let plane = &mut self.planes[axis.index()];
        plane.set_position(position);

        if index == plane.current_index() {
            trace!(axis = %axis, index, "Plane index unchanged, skipping resample");
            return false;
        }

        plane.set_index(index);
        sampler.sample_into(store, axis, index, plane.buffer_for_resample());
        trace!(axis = %axis, index, position, "Plane resampled");
        true
    }

    /// Move the sagittal (X) plane
    pub fn set_sagittal(&mut self, store: &VolumeStore, normalized_position: f32) -> bool {
        self.update_plane_position(store, PlaneAxis::X, normalized_position)
    }

    /// Move the coronal (Y) plane
    pub fn set_coronal(&mut self, store: &VolumeStore, normalized_position: f32) -> bool {
        self.update_plane_position(store, PlaneAxis::Y, normalized_position)
    }

    /// Move the axial (Z) plane
    pub fn set_axial(&mut self, store: &VolumeStore, normalized_position: f32) -> bool {
        self.update_plane_position(store, PlaneAxis::Z, normalized_position)
    }

    /// Change the contrast window and resample all three planes
    pub fn set_window(&mut self, store: &VolumeStore, contrast: ContrastWindow) {
        self.sampler.set_contrast(contrast);
        debug!(
            level = contrast.level,
            width = contrast.width,
            enabled = contrast.enabled,
            "Contrast window changed"
        );
        self.resample_all(store);
    }

    /// Resample every plane at its current index
    ///
    /// Needed after the store's grid has been renormalized.
    pub fn resample_all(&mut self, store: &VolumeStore) {
        let sampler = self.sampler;
        for plane in self.planes.iter_mut() {
            let axis = plane.axis();
            let index = plane.current_index();
            sampler.sample_into(store, axis, index, plane.buffer_for_resample());
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Slice index nearest to `position`, clamped to `0..=max_index`
pub fn index_for_position(position: f32, max_index: usize) -> usize {
    let index = (clamp_unit(position) * max_index as f32).round() as usize;
    index.min(max_index)
}
