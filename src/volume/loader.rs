//! File-to-volume loading pipeline
//!
//! [`VolumeLoader`] runs header parsing, payload extraction and normalization
//! for a file on disk. [`VolumeLoader::load_path`] blocks the calling thread
//! until the volume is ready. [`VolumeLoader::spawn`] runs the same pipeline
//! on a worker thread and hands back a [`PendingLoad`], which is completed
//! through a oneshot channel rather than a shared flag.
//!
//! # Examples
//!
//! ```no_run
//! use nifti_mpr::volume::loader::VolumeLoader;
//!
//! # fn main() -> Result<(), nifti_mpr::VolumeError> {
//! let loader = VolumeLoader::default();
//! let mut pending = loader.spawn("brain.nii.gz")?;
//!
//! // Once per frame:
//! if let Some(result) = pending.try_take() {
//!     let loaded = result?;
//!     println!("{:?}", loaded.store.dimensions());
//! }
//! # Ok(())
//! # }
//! ```

use crate::compression::{inflate_if_needed, read_file};
use crate::config::ViewerConfig;
use crate::error::{LoadReport, Result, VolumeError};
use crate::format::header::{StorageLayout, VolumeHeader};
use crate::format::voxel::VoxelExtractor;
use crate::volume::normalize::NormalizationMode;
use crate::volume::store::VolumeStore;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info};

/// A successfully loaded volume together with its load warnings
#[derive(Debug, Clone)]
pub struct LoadedVolume {
    pub store: VolumeStore,
    pub report: LoadReport,
    /// File the volume was read from, if any
    pub source: Option<PathBuf>,
}

/// Runs the header → payload → normalization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeLoader {
    extractor: VoxelExtractor,
    mode: NormalizationMode,
}

impl VolumeLoader {
    pub fn new(extractor: VoxelExtractor, mode: NormalizationMode) -> Self {
        Self { extractor, mode }
    }

    /// Loader using the normalization mode and flip axis of `config`
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(VoxelExtractor::new(config.flip_axis), config.normalization)
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Load a volume from `path`, blocking until normalization completes
    ///
    /// Accepts `.nii`, `.nii.gz` and paired `.hdr`/`.img` files (either part
    /// optionally gzipped). Compression is detected from content.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<LoadedVolume> {
        let path = path.as_ref();
        let started = Instant::now();
        debug!(path = %path.display(), "Loading volume");

        let bytes = read_file(path)?;
        let mut report = LoadReport::new();
        let header = VolumeHeader::decode(&bytes, &mut report)?;

        let store = match header.layout {
            StorageLayout::SingleFile => {
                let payload = bytes.get(header.vox_offset..).unwrap_or(&[]);
                self.build(header, payload, &mut report)
            }
            StorageLayout::Paired => {
                let data_path = paired_data_path(path)?;
                debug!(data = %data_path.display(), "Reading paired image file");
                let data = read_file(&data_path)?;
                let payload = data.get(header.vox_offset..).unwrap_or(&[]);
                self.build(header, payload, &mut report)
            }
        };

        info!(
            path = %path.display(),
            dimensions = ?store.dimensions(),
            spacing = ?store.spacing(),
            encoding = ?store.header().encoding,
            window_lower = store.window().lower(),
            window_upper = store.window().upper(),
            warnings = report.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Volume loaded"
        );

        Ok(LoadedVolume {
            store,
            report,
            source: Some(path.to_path_buf()),
        })
    }

    /// Load a single-file volume from an in-memory (optionally gzipped) buffer
    pub fn load_bytes(&self, bytes: Vec<u8>) -> Result<LoadedVolume> {
        let bytes = inflate_if_needed(bytes)?;
        let mut report = LoadReport::new();
        let header = VolumeHeader::decode(&bytes, &mut report)?;

        if header.layout == StorageLayout::Paired {
            return Err(VolumeError::Format(
                "paired header without image data".to_string(),
            ));
        }

        let payload = bytes.get(header.vox_offset..).unwrap_or(&[]);
        let store = self.build(header, payload, &mut report);
        Ok(LoadedVolume {
            store,
            report,
            source: None,
        })
    }

    fn build(&self, header: VolumeHeader, payload: &[u8], report: &mut LoadReport) -> VolumeStore {
        let raw = self.extractor.extract(&header, payload, report);
        VolumeStore::new(header, raw, self.mode)
    }

    /// Start loading `path` on a worker thread
    pub fn spawn(&self, path: impl Into<PathBuf>) -> Result<PendingLoad> {
        let path = path.into();
        let (tx, rx) = oneshot::channel();
        let loader = *self;
        let worker_path = path.clone();

        std::thread::Builder::new()
            .name("volume-loader".to_string())
            .spawn(move || {
                let result = loader.load_path(&worker_path);
                // The receiver may have been dropped; the result is discarded then.
                let _ = tx.send(result);
            })?;

        Ok(PendingLoad { path, rx })
    }
}

/// Handle to a load running on a worker thread
///
/// The result can be polled from a tick loop with [`PendingLoad::try_take`],
/// awaited with [`PendingLoad::wait`], or waited for synchronously with
/// [`PendingLoad::blocking_wait`]. Dropping the handle discards the result.
#[derive(Debug)]
pub struct PendingLoad {
    path: PathBuf,
    rx: oneshot::Receiver<Result<LoadedVolume>>,
}

impl PendingLoad {
    /// File being loaded
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the result if the load has finished
    ///
    /// Returns `Some` exactly once; later calls report the load as aborted.
    pub fn try_take(&mut self) -> Option<Result<LoadedVolume>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(VolumeError::LoadAborted(format!(
                "loader for {} exited without a result",
                self.path.display()
            )))),
        }
    }

    /// Wait for the result asynchronously
    pub async fn wait(self) -> Result<LoadedVolume> {
        let path = self.path;
        self.rx.await.map_err(|_| {
            VolumeError::LoadAborted(format!(
                "loader for {} exited without a result",
                path.display()
            ))
        })?
    }

    /// Block the current thread until the result is available
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_wait(self) -> Result<LoadedVolume> {
        let path = self.path;
        self.rx.blocking_recv().map_err(|_| {
            VolumeError::LoadAborted(format!(
                "loader for {} exited without a result",
                path.display()
            ))
        })?
    }
}

/// Locate the `.img` (or `.img.gz`) file paired with a header file
pub fn paired_data_path(header_path: &Path) -> Result<PathBuf> {
    let mut stem = header_path.to_path_buf();
    if stem.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
        stem.set_extension("");
    }

    let plain = stem.with_extension("img");
    let gzipped = stem.with_extension("img.gz");
    for candidate in [plain, gzipped] {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(VolumeError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no image file paired with {}", header_path.display()),
    )))
}
