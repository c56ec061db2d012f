//! NIfTI-1 decoding
//!
//! - [`header`] - 348-byte header parsing and encoding
//! - [`voxel`] - payload decoding into a flat `f32` grid

pub mod header;
pub mod voxel;

pub use header::{ByteOrder, ElementEncoding, Orientation, StorageLayout, VolumeHeader};
pub use voxel::VoxelExtractor;
