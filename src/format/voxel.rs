//! Voxel payload decoding
//!
//! Turns the raw payload bytes into a dense `f32` grid laid out as
//! `x + nx * (y + ny * z)`. The decode routine is chosen once per payload from
//! the header's element encoding and byte order.

use crate::axis::PlaneAxis;
use crate::error::{LoadReport, LoadWarning};
use crate::format::header::{ByteOrder, ElementEncoding, VolumeHeader};
use bytes::Buf;
use tracing::debug;

/// Decodes payload bytes into an intensity grid
///
/// While copying into the grid, the extractor walks `flip_axis` in reverse so
/// that slice 0 along that axis corresponds to the last slice in the file.
/// This reconciles the file's storage order with the display convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelExtractor {
    flip_axis: Option<PlaneAxis>,
}

impl Default for VoxelExtractor {
    fn default() -> Self {
        Self {
            flip_axis: Some(PlaneAxis::Z),
        }
    }
}

impl VoxelExtractor {
    /// Create an extractor reversing `flip_axis` (or nothing for `None`)
    pub fn new(flip_axis: Option<PlaneAxis>) -> Self {
        Self { flip_axis }
    }

    /// Axis reversed during extraction
    pub fn flip_axis(&self) -> Option<PlaneAxis> {
        self.flip_axis
    }

    /// Decode `payload` into a grid of exactly `header.num_voxels()` values
    ///
    /// A short payload is zero-padded and a long one truncated, each with a
    /// [`LoadWarning::LengthMismatch`]. Non-finite samples become 0.
    pub fn extract(
        &self,
        header: &VolumeHeader,
        payload: &[u8],
        report: &mut LoadReport,
    ) -> Vec<f32> {
        let expected = header.num_voxels();
        let width = header.encoding.size();
        let available = payload.len() / width;

        if available != expected {
            report.warn(LoadWarning::LengthMismatch {
                expected,
                actual: available,
            });
        }

        let used = available.min(expected);
        let mut values = Vec::with_capacity(expected);
        decode_payload(
            &payload[..used * width],
            header.encoding,
            header.byte_order,
            &mut values,
        );
        values.resize(expected, 0.0);

        apply_scaling(&mut values, header.scl_slope, header.scl_inter);

        let replaced = sanitize(&mut values);
        if replaced > 0 {
            report.warn(LoadWarning::NonFiniteValues { count: replaced });
        }

        debug!(
            voxels = expected,
            decoded = used,
            encoding = ?header.encoding,
            flip_axis = ?self.flip_axis,
            "Payload decoded"
        );

        match self.flip_axis {
            Some(axis) => reverse_axis(&values, header.dimensions, axis),
            None => values,
        }
    }
}

fn decode_lanes(mut bytes: &[u8], width: usize, out: &mut Vec<f32>, read: impl Fn(&mut &[u8]) -> f32) {
    while bytes.remaining() >= width {
        out.push(read(&mut bytes));
    }
}

/// Decode whole elements of `bytes` into `out`
pub fn decode_payload(
    bytes: &[u8],
    encoding: ElementEncoding,
    byte_order: ByteOrder,
    out: &mut Vec<f32>,
) {
    use ByteOrder::{Big, Little};
    use ElementEncoding::*;

    let width = encoding.size();
    match (encoding, byte_order) {
        (Int8, _) => decode_lanes(bytes, width, out, |b| b.get_i8() as f32),
        (UInt8, _) => decode_lanes(bytes, width, out, |b| b.get_u8() as f32),
        (Int16, Little) => decode_lanes(bytes, width, out, |b| b.get_i16_le() as f32),
        (Int16, Big) => decode_lanes(bytes, width, out, |b| b.get_i16() as f32),
        (UInt16, Little) => decode_lanes(bytes, width, out, |b| b.get_u16_le() as f32),
        (UInt16, Big) => decode_lanes(bytes, width, out, |b| b.get_u16() as f32),
        (Int32, Little) => decode_lanes(bytes, width, out, |b| b.get_i32_le() as f32),
        (Int32, Big) => decode_lanes(bytes, width, out, |b| b.get_i32() as f32),
        (UInt32, Little) => decode_lanes(bytes, width, out, |b| b.get_u32_le() as f32),
        (UInt32, Big) => decode_lanes(bytes, width, out, |b| b.get_u32() as f32),
        (Float32, Little) => decode_lanes(bytes, width, out, |b| b.get_f32_le()),
        (Float32, Big) => decode_lanes(bytes, width, out, |b| b.get_f32()),
        (Float64, Little) => decode_lanes(bytes, width, out, |b| b.get_f64_le() as f32),
        (Float64, Big) => decode_lanes(bytes, width, out, |b| b.get_f64() as f32),
    }
}

fn apply_scaling(values: &mut [f32], slope: f32, inter: f32) {
    if !slope.is_finite() || slope == 0.0 || (slope == 1.0 && inter == 0.0) {
        return;
    }
    let inter = if inter.is_finite() { inter } else { 0.0 };
    for v in values.iter_mut() {
        *v = *v * slope + inter;
    }
}

/// Replace NaN and infinite values with 0, returning how many were replaced
fn sanitize(values: &mut [f32]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = 0.0;
        replaced += 1;
    }
    replaced
}

fn reverse_axis(values: &[f32], dims: [usize; 3], axis: PlaneAxis) -> Vec<f32> {
    let [nx, ny, nz] = dims;
    let mut out = Vec::with_capacity(values.len());

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let (sx, sy, sz) = match axis {
                    PlaneAxis::X => (nx - 1 - x, y, z),
                    PlaneAxis::Y => (x, ny - 1 - y, z),
                    PlaneAxis::Z => (x, y, nz - 1 - z),
                };
                out.push(values[sx + nx * (sy + ny * sz)]);
            }
        }
    }
    out
}
