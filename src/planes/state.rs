//! Per-axis slice cursor

use crate::axis::PlaneAxis;
use crate::volume::slice::SliceBuffer;

/// Cursor and cached slice for one axis
///
/// `current_index == round(normalized_position * max_index)` holds after every
/// update. State is only mutated through
/// [`MultiPlaneCoordinator`](crate::planes::coordinator::MultiPlaneCoordinator).
#[derive(Debug, Clone)]
pub struct PlaneState {
    axis: PlaneAxis,
    current_index: usize,
    normalized_position: f32,
    buffer: SliceBuffer,
    resample_count: u64,
}

impl PlaneState {
    pub(crate) fn new(axis: PlaneAxis, normalized_position: f32, current_index: usize) -> Self {
        Self {
            axis,
            current_index,
            normalized_position,
            buffer: SliceBuffer::empty(axis),
            resample_count: 0,
        }
    }

    pub fn axis(&self) -> PlaneAxis {
        self.axis
    }

    /// Slice index currently shown
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Position along the axis in `[0, 1]`
    pub fn normalized_position(&self) -> f32 {
        self.normalized_position
    }

    /// Offset of the plane from the volume centre, in `[-0.5, 0.5]`
    pub fn local_offset(&self) -> f32 {
        self.normalized_position - 0.5
    }

    /// Most recently sampled slice
    pub fn buffer(&self) -> &SliceBuffer {
        &self.buffer
    }

    /// Number of times the buffer has been (re)sampled
    pub fn resample_count(&self) -> u64 {
        self.resample_count
    }

    pub(crate) fn set_position(&mut self, normalized_position: f32) {
        self.normalized_position = normalized_position;
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.current_index = index;
    }

    /// Buffer to overwrite; counts as one resample
    pub(crate) fn buffer_for_resample(&mut self) -> &mut SliceBuffer {
        self.resample_count += 1;
        &mut self.buffer
    }
}
