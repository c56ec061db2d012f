//! Public viewer facade
//!
//! [`VolumeViewer`] ties the pipeline together: it loads a volume, owns the
//! resulting [`VolumeStore`] and [`MultiPlaneCoordinator`], and answers the
//! queries a rendering layer needs. All queries on a viewer without a loaded
//! volume fail with [`VolumeError::NotLoaded`].
//!
//! # Examples
//!
//! ```no_run
//! use nifti_mpr::{PlaneAxis, VolumeViewer};
//!
//! # fn main() -> Result<(), nifti_mpr::VolumeError> {
//! let mut viewer = VolumeViewer::default();
//! if !viewer.load("brain.nii.gz") {
//!     return Ok(());
//! }
//!
//! let (nx, ny, nz) = viewer.dimensions()?;
//! println!("{} x {} x {}", nx, ny, nz);
//!
//! viewer.set_normalized_position(PlaneAxis::Z, 0.3)?;
//! viewer.set_window(0.4, 0.6);
//! let axial = viewer.plane(PlaneAxis::Z)?.buffer();
//! println!("axial slice {} is {}x{}", axial.index, axial.width, axial.height);
//! # Ok(())
//! # }
//! ```

use crate::axis::PlaneAxis;
use crate::config::ViewerConfig;
use crate::error::{LoadReport, Result, VolumeError};
use crate::planes::coordinator::MultiPlaneCoordinator;
use crate::planes::interaction::PlaneInteractionController;
use crate::planes::state::PlaneState;
use crate::session::SessionState;
use crate::volume::loader::{LoadedVolume, PendingLoad, VolumeLoader};
use crate::volume::normalize::NormalizationMode;
use crate::volume::slice::{ContrastWindow, SliceBuffer, SliceSampler};
use crate::volume::store::VolumeStore;
use glam::Vec3;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Everything that exists only while a volume is loaded
#[derive(Debug)]
struct ActiveVolume {
    store: VolumeStore,
    coordinator: MultiPlaneCoordinator,
    report: LoadReport,
    source: Option<PathBuf>,
}

/// Loads a volume and serves slices of it
#[derive(Debug, Default)]
pub struct VolumeViewer {
    config: ViewerConfig,
    contrast: ContrastWindow,
    active: Option<ActiveVolume>,
    pending: Option<PendingLoad>,
}

impl VolumeViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            contrast: config.contrast,
            active: None,
            pending: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    fn loader(&self) -> VolumeLoader {
        VolumeLoader::from_config(&self.config)
    }

    /// Load `path`, replacing any current volume
    ///
    /// Returns false if the file could not be loaded; the viewer is then in
    /// the not-loaded state.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load(path) {
            Ok(_) => true,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load volume");
                false
            }
        }
    }

    /// Load `path`, returning the warnings raised while loading
    ///
    /// # Errors
    ///
    /// Any fatal load error. The previous volume and any in-flight background
    /// load are discarded either way.
    pub fn try_load(&mut self, path: impl AsRef<Path>) -> Result<&LoadReport> {
        if let Some(previous) = self.pending.take() {
            warn!(path = %previous.path().display(), "Abandoning in-flight load");
        }
        self.active = None;
        let loaded = self.loader().load_path(path)?;
        Ok(&self.install(loaded).report)
    }

    /// Start loading `path` on a worker thread
    ///
    /// The current volume stays available until [`VolumeViewer::poll_load`]
    /// picks up the result. A load already in flight is abandoned.
    pub fn begin_load(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let pending = self.loader().spawn(path)?;
        if let Some(previous) = self.pending.replace(pending) {
            warn!(path = %previous.path().display(), "Abandoning in-flight load");
        }
        Ok(())
    }

    /// Whether a background load is in flight
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Install the result of a background load if it has finished
    ///
    /// Returns `None` while the load is still running or when none was
    /// started. A failed load leaves the viewer in the not-loaded state.
    pub fn poll_load(&mut self) -> Option<Result<()>> {
        let mut pending = self.pending.take()?;
        match pending.try_take() {
            None => {
                self.pending = Some(pending);
                None
            }
            Some(Ok(loaded)) => {
                self.install(loaded);
                Some(Ok(()))
            }
            Some(Err(e)) => {
                error!(path = %pending.path().display(), error = %e, "Background load failed");
                self.active = None;
                Some(Err(e))
            }
        }
    }

    fn install(&mut self, loaded: LoadedVolume) -> &ActiveVolume {
        let LoadedVolume {
            store,
            report,
            source,
        } = loaded;
        let coordinator = MultiPlaneCoordinator::new(&store, self.contrast);
        info!(
            source = ?source,
            dimensions = ?store.dimensions(),
            warnings = report.warnings.len(),
            "Volume installed"
        );
        self.active.insert(ActiveVolume {
            store,
            coordinator,
            report,
            source,
        })
    }

    /// Discard the current volume
    pub fn unload(&mut self) {
        self.active = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    fn active(&self) -> Result<&ActiveVolume> {
        self.active.as_ref().ok_or(VolumeError::NotLoaded)
    }

    fn active_mut(&mut self) -> Result<&mut ActiveVolume> {
        self.active.as_mut().ok_or(VolumeError::NotLoaded)
    }

    /// Warnings raised by the last successful load
    pub fn load_report(&self) -> Result<&LoadReport> {
        Ok(&self.active()?.report)
    }

    /// File the current volume was loaded from
    pub fn source(&self) -> Result<Option<&Path>> {
        Ok(self.active()?.source.as_deref())
    }

    pub fn store(&self) -> Result<&VolumeStore> {
        Ok(&self.active()?.store)
    }

    pub fn coordinator(&self) -> Result<&MultiPlaneCoordinator> {
        Ok(&self.active()?.coordinator)
    }

    /// Grid size `(nx, ny, nz)`
    pub fn dimensions(&self) -> Result<(usize, usize, usize)> {
        let [nx, ny, nz] = self.active()?.store.dimensions();
        Ok((nx, ny, nz))
    }

    /// Voxel size in millimetres
    pub fn voxel_spacing(&self) -> Result<(f32, f32, f32)> {
        let [dx, dy, dz] = self.active()?.store.spacing();
        Ok((dx, dy, dz))
    }

    /// Normalized intensity at `(x, y, z)`
    ///
    /// Coordinates outside the grid read as 0.
    pub fn voxel_value(&self, x: usize, y: usize, z: usize) -> Result<f32> {
        Ok(self.active()?.store.voxel(x, y, z).unwrap_or(0.0))
    }

    /// Number of slices along `axis`
    pub fn slice_count(&self, axis: PlaneAxis) -> Result<usize> {
        Ok(self.active()?.store.slice_count(axis))
    }

    /// Freshly sampled slice at `index` along `axis` with the current contrast
    ///
    /// Independent of the three planes; `index` is clamped.
    pub fn slice_buffer(&self, axis: PlaneAxis, index: usize) -> Result<SliceBuffer> {
        let active = self.active()?;
        Ok(SliceSampler::new(self.contrast).sample(&active.store, axis, index))
    }

    /// Move the plane for `axis`; returns whether it was resampled
    pub fn set_normalized_position(&mut self, axis: PlaneAxis, position: f32) -> Result<bool> {
        let active = self.active_mut()?;
        Ok(active
            .coordinator
            .update_plane_position(&active.store, axis, position))
    }

    /// Plane state for `axis`
    pub fn plane(&self, axis: PlaneAxis) -> Result<&PlaneState> {
        Ok(self.active()?.coordinator.plane(axis))
    }

    /// Current contrast window
    pub fn contrast(&self) -> ContrastWindow {
        self.contrast
    }

    /// Set the contrast level and width, keeping its enabled state
    ///
    /// Takes effect on the next load if nothing is loaded.
    pub fn set_window(&mut self, level: f32, width: f32) {
        let contrast = ContrastWindow {
            level,
            width,
            enabled: self.contrast.enabled,
        };
        self.apply_contrast(contrast);
    }

    /// Switch the contrast window on or off
    pub fn set_contrast_enabled(&mut self, enabled: bool) {
        let contrast = ContrastWindow {
            enabled,
            ..self.contrast
        };
        self.apply_contrast(contrast);
    }

    fn apply_contrast(&mut self, contrast: ContrastWindow) {
        self.contrast = contrast;
        if let Some(active) = self.active.as_mut() {
            active.coordinator.set_window(&active.store, contrast);
        }
    }

    /// Recompute the load-time normalization with `mode`
    ///
    /// Also becomes the mode for later loads.
    pub fn renormalize(&mut self, mode: NormalizationMode) -> Result<()> {
        self.config.normalization = mode;
        let active = self.active_mut()?;
        active.store.renormalize(mode);
        active.coordinator.resample_all(&active.store);
        Ok(())
    }

    /// Controller for the plane that `facing` points along, using the configured input settings
    pub fn controller(&self, facing: Vec3) -> PlaneInteractionController {
        PlaneInteractionController::new(facing, self.config.key_step, self.config.drag)
    }

    /// Run `f` with mutable access to the planes of the loaded volume
    ///
    /// Used to drive a [`PlaneInteractionController`] each tick.
    pub fn with_planes<R>(
        &mut self,
        f: impl FnOnce(&mut MultiPlaneCoordinator, &VolumeStore) -> R,
    ) -> Result<R> {
        let active = self.active_mut()?;
        Ok(f(&mut active.coordinator, &active.store))
    }

    /// Snapshot of the current view
    pub fn session_state(&self) -> SessionState {
        let mut session = SessionState {
            contrast: self.contrast,
            normalization: self.config.normalization,
            ..SessionState::default()
        };
        if let Some(active) = &self.active {
            session.source = active.source.clone();
            session.positions = PlaneAxis::ALL.map(|axis| active.coordinator.plane(axis).normalized_position());
            session.normalization = active.store.mode();
        }
        session
    }

    /// Restore a saved view
    ///
    /// Loads the session's volume unless it is already the current one, then
    /// applies normalization, contrast and plane positions.
    ///
    /// # Errors
    ///
    /// Any error from loading the session's volume. Without a source and
    /// without a loaded volume only the windowing settings are applied.
    pub fn apply_session(&mut self, session: &SessionState) -> Result<()> {
        self.config.normalization = session.normalization;
        self.contrast = session.contrast;

        if let Some(source) = &session.source {
            let current = self.active.as_ref().and_then(|a| a.source.as_deref());
            if current != Some(source.as_path()) {
                self.try_load(source)?;
            }
        }

        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if active.store.mode() != session.normalization {
            active.store.renormalize(session.normalization);
        }
        active.coordinator.set_window(&active.store, session.contrast);
        for axis in PlaneAxis::ALL {
            active
                .coordinator
                .update_plane_position(&active.store, axis, session.position(axis));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::header::{ElementEncoding, VolumeHeader};

    fn write_ramp(dir: &Path, name: &str, dims: [usize; 3]) -> PathBuf {
        let header = VolumeHeader::new(dims, ElementEncoding::UInt8);
        let mut bytes = header.encode();
        bytes.resize(VolumeHeader::DEFAULT_VOX_OFFSET, 0);
        bytes.extend((0..header.num_voxels()).map(|i| i as u8));
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn full_range_viewer() -> VolumeViewer {
        VolumeViewer::new(
            ViewerConfig::default()
                .with_normalization(NormalizationMode::FullRange)
                .with_flip_axis(None),
        )
    }

    #[test]
    fn test_queries_require_volume() {
        let mut viewer = VolumeViewer::default();
        assert!(!viewer.is_loaded());
        assert!(matches!(viewer.dimensions(), Err(VolumeError::NotLoaded)));
        assert!(matches!(viewer.voxel_value(0, 0, 0), Err(VolumeError::NotLoaded)));
        assert!(matches!(
            viewer.slice_buffer(PlaneAxis::X, 0),
            Err(VolumeError::NotLoaded)
        ));
        assert!(matches!(
            viewer.set_normalized_position(PlaneAxis::Y, 0.5),
            Err(VolumeError::NotLoaded)
        ));
        assert!(matches!(
            viewer.renormalize(NormalizationMode::FullRange),
            Err(VolumeError::NotLoaded)
        ));

        // Contrast changes are kept for the next load
        viewer.set_window(0.3, 0.2);
        assert_eq!(viewer.contrast(), ContrastWindow::new(0.3, 0.2));
    }

    #[test]
    fn test_load_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [4, 3, 2]);
        let mut viewer = full_range_viewer();

        assert!(viewer.load(&path));
        assert!(viewer.is_loaded());
        assert_eq!(viewer.dimensions().unwrap(), (4, 3, 2));
        assert_eq!(viewer.voxel_spacing().unwrap(), (1.0, 1.0, 1.0));
        assert_eq!(viewer.slice_count(PlaneAxis::Y).unwrap(), 3);
        assert_eq!(viewer.voxel_value(3, 2, 1).unwrap(), 1.0);
        assert_eq!(viewer.voxel_value(9, 9, 9).unwrap(), 0.0);
        assert_eq!(viewer.source().unwrap(), Some(path.as_path()));
        assert!(viewer.load_report().unwrap().is_clean());

        let slice = viewer.slice_buffer(PlaneAxis::X, 1).unwrap();
        assert_eq!((slice.width, slice.height), (3, 2));
    }

    #[test]
    fn test_failed_load_clears_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [2, 2, 2]);
        let mut viewer = full_range_viewer();
        assert!(viewer.load(&path));

        assert!(!viewer.load(dir.path().join("missing.nii")));
        assert!(!viewer.is_loaded());
    }

    #[test]
    fn test_window_and_toggle_resample_planes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [4, 4, 4]);
        let mut viewer = full_range_viewer();
        assert!(viewer.load(&path));
        let before = viewer.plane(PlaneAxis::Z).unwrap().resample_count();

        viewer.set_window(0.0, 0.0);
        let plane = viewer.plane(PlaneAxis::Z).unwrap();
        assert_eq!(plane.resample_count(), before + 1);
        assert!(plane.buffer().data.iter().all(|&v| v == 0.0 || v == 1.0));

        viewer.set_contrast_enabled(false);
        assert!(!viewer.contrast().enabled);
        assert_eq!(viewer.contrast().width, 0.0);
        let plane = viewer.plane(PlaneAxis::Z).unwrap();
        let index = plane.current_index();
        assert_eq!(plane.buffer().get(1, 1), viewer.store().unwrap().voxel(1, 1, index));
    }

    #[test]
    fn test_renormalize_updates_planes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [10, 10, 1]);
        let mut viewer = full_range_viewer();
        assert!(viewer.load(&path));

        let mode = NormalizationMode::Percentile {
            lower: 10.0,
            upper: 90.0,
        };
        viewer.renormalize(mode).unwrap();
        assert_eq!(viewer.store().unwrap().mode(), mode);
        assert_eq!(viewer.config().normalization, mode);
        assert_eq!(viewer.plane(PlaneAxis::Z).unwrap().buffer().get(0, 0), Some(0.0));
    }

    #[test]
    fn test_background_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [3, 3, 3]);
        let mut viewer = full_range_viewer();

        viewer.begin_load(&path).unwrap();
        assert!(viewer.is_loading());
        let result = loop {
            if let Some(result) = viewer.poll_load() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        };
        assert!(result.is_ok());
        assert!(viewer.is_loaded());
        assert!(!viewer.is_loading());
        assert!(viewer.poll_load().is_none());
    }

    #[test]
    fn test_sync_load_supersedes_background_load() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_ramp(dir.path(), "a.nii", [3, 3, 3]);
        let second = write_ramp(dir.path(), "b.nii", [5, 5, 5]);
        let mut viewer = full_range_viewer();

        viewer.begin_load(&first).unwrap();
        assert!(viewer.load(&second));
        assert!(!viewer.is_loading());

        // Give the abandoned worker time to finish
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(viewer.poll_load().is_none());
        assert_eq!(viewer.dimensions().unwrap(), (5, 5, 5));
        assert_eq!(viewer.source().unwrap(), Some(second.as_path()));
    }

    #[test]
    fn test_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ramp(dir.path(), "ramp.nii", [5, 5, 5]);
        let mut viewer = full_range_viewer();
        assert!(viewer.load(&path));
        viewer.set_normalized_position(PlaneAxis::X, 0.25).unwrap();
        viewer.set_window(0.4, 0.5);

        let session = viewer.session_state();
        assert_eq!(session.source.as_deref(), Some(path.as_path()));
        assert_eq!(session.positions, [0.25, 0.5, 0.5]);

        let mut restored = full_range_viewer();
        restored.apply_session(&session).unwrap();
        assert!(restored.is_loaded());
        assert_eq!(restored.plane(PlaneAxis::X).unwrap().current_index(), 1);
        assert_eq!(restored.contrast(), ContrastWindow::new(0.4, 0.5));
        assert_eq!(restored.session_state(), session);
    }

    #[test]
    fn test_controller_uses_config() {
        let viewer = VolumeViewer::new(ViewerConfig::default().with_drag(
            crate::planes::interaction::DragConfig { sensitivity: 0.1 },
        ));
        let controller = viewer.controller(Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(controller.axis(), PlaneAxis::Z);
        assert_eq!(controller.drag_config().sensitivity, 0.1);
    }
}
