//! Loaded volume and slice extraction

pub mod loader;
pub mod normalize;
pub mod slice;
pub mod store;

pub use loader::{LoadedVolume, PendingLoad, VolumeLoader};
pub use normalize::{IntensityNormalizer, IntensityWindow, NormalizationMode};
pub use slice::{ContrastWindow, SliceBuffer, SliceSampler};
pub use store::VolumeStore;
