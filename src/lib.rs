//! Multi-planar reconstruction of NIfTI volumes
//!
//! This library loads NIfTI-1 volumes (`.nii`, `.nii.gz` and paired
//! `.hdr`/`.img` files), normalizes their intensities to `[0, 1]` and serves
//! the three orthogonal slices through a movable cursor. It contains no
//! rendering; slice buffers are handed to whatever draws them.
//!
//! # Features
//!
//! - **Tolerant header parsing** - Either byte order, both dimension conventions, coerced bad values
//! - **Single decode path per load** - Element encoding is resolved once, never per voxel
//! - **Two windowing stages** - Load-time percentile or full-range normalization plus an interactive contrast window
//! - **Change-detected resampling** - Plane buffers are only rewritten when their slice index changes
//! - **Background loading** - Large volumes can load on a worker thread with an explicit completion signal
//!
//! # Quick Start
//!
//! ```no_run
//! use nifti_mpr::{PlaneAxis, VolumeViewer};
//!
//! let mut viewer = VolumeViewer::default();
//! if viewer.load("brain.nii.gz") {
//!     let (nx, ny, nz) = viewer.dimensions()?;
//!     viewer.set_normalized_position(PlaneAxis::Z, 0.5)?;
//!
//!     let axial = viewer.plane(PlaneAxis::Z)?.buffer();
//!     println!("{}x{}x{}, axial {}x{}", nx, ny, nz, axial.width, axial.height);
//! }
//! # Ok::<(), nifti_mpr::VolumeError>(())
//! ```
//!
//! ## Loading Without Blocking
//!
//! ```no_run
//! use nifti_mpr::VolumeViewer;
//!
//! let mut viewer = VolumeViewer::default();
//! viewer.begin_load("large.nii.gz")?;
//!
//! loop {
//!     // One tick of the host loop
//!     if let Some(result) = viewer.poll_load() {
//!         result?;
//!         break;
//!     }
//! #   std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), nifti_mpr::VolumeError>(())
//! ```
//!
//! # Architecture
//!
//! - **`format`** - File decoding
//!   - `header` - NIfTI-1 header (348 bytes)
//!   - `voxel` - Payload decoding, scaling and depth-axis flip
//!
//! - **`volume`** - Loaded data
//!   - `normalize` - Intensity windows
//!   - `store` - Normalized voxel grid
//!   - `slice` - Slice sampling and contrast window
//!   - `loader` - File-to-store pipeline, blocking or on a worker thread
//!
//! - **`planes`** - Navigation
//!   - `coordinator` - The three plane cursors
//!   - `interaction` - Drag and key input for one plane
//!
//! - **`viewer`** - `VolumeViewer` facade
//! - **`config`** / **`session`** - JSON configuration and saved sessions
//! - **`error`** - `VolumeError` and load warnings
//!
//! # Error Handling
//!
//! Fatal problems return `Err(VolumeError)`; [`VolumeViewer::load`] reports
//! them as `false`. Recoverable problems (short payloads, unknown encodings,
//! bad dimensions) are collected as [`error::LoadWarning`]s and logged.
//!
//! ```no_run
//! use nifti_mpr::{VolumeError, VolumeViewer};
//!
//! let mut viewer = VolumeViewer::default();
//! match viewer.try_load("scan.nii") {
//!     Ok(report) if report.is_clean() => println!("Loaded"),
//!     Ok(report) => println!("Loaded with {} warnings", report.warnings.len()),
//!     Err(VolumeError::Io(e)) => eprintln!("Cannot read file: {}", e),
//!     Err(e) => eprintln!("Not a usable volume: {}", e),
//! }
//! ```

pub mod axis;
pub mod compression;
pub mod config;
pub mod error;
pub mod format;
pub mod planes;
pub mod session;
pub mod viewer;
pub mod volume;

// Re-export commonly used types
pub use axis::PlaneAxis;
pub use config::ViewerConfig;
pub use error::{Result, VolumeError};
pub use viewer::VolumeViewer;
