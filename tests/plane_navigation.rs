//! Plane navigation through the viewer facade

use glam::{Vec2, Vec3};
use nifti_mpr::format::header::{ElementEncoding, VolumeHeader};
use nifti_mpr::planes::{KeyStepConfig, PlanePose, StepInput};
use nifti_mpr::session::SessionState;
use nifti_mpr::volume::NormalizationMode;
use nifti_mpr::{PlaneAxis, ViewerConfig, VolumeViewer};
use std::path::{Path, PathBuf};

fn write_volume(dir: &Path, dims: [usize; 3], spacing: [f32; 3]) -> PathBuf {
    let header = VolumeHeader::new(dims, ElementEncoding::UInt16).with_spacing(spacing);
    let mut bytes = header.encode();
    bytes.resize(VolumeHeader::DEFAULT_VOX_OFFSET, 0);
    bytes.extend((0..header.num_voxels()).flat_map(|i| (i as u16).to_le_bytes()));
    let path = dir.join("volume.nii");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn loaded_viewer(dir: &Path, dims: [usize; 3], spacing: [f32; 3], config: ViewerConfig) -> VolumeViewer {
    let path = write_volume(dir, dims, spacing);
    let mut viewer = VolumeViewer::new(config.with_normalization(NormalizationMode::FullRange));
    assert!(viewer.load(&path));
    viewer
}

#[test]
fn test_index_matches_rounded_position_for_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let mut viewer = loaded_viewer(dir.path(), [9, 17, 33], [1.0; 3], ViewerConfig::default());

    for axis in PlaneAxis::ALL {
        let max = viewer.slice_count(axis).unwrap() - 1;
        for step in -20..=120 {
            let x = step as f32 / 100.0;
            viewer.set_normalized_position(axis, x).unwrap();
            let plane = viewer.plane(axis).unwrap();
            let expected = (x.clamp(0.0, 1.0) * max as f32).round() as usize;
            assert_eq!(plane.current_index(), expected);
            assert_eq!(plane.buffer().index, expected);
        }
    }
}

#[test]
fn test_repeat_position_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mut viewer = loaded_viewer(dir.path(), [8, 8, 8], [1.0; 3], ViewerConfig::default());

    assert!(viewer.set_normalized_position(PlaneAxis::X, 0.9).unwrap());
    let count = viewer.plane(PlaneAxis::X).unwrap().resample_count();
    let buffer = viewer.plane(PlaneAxis::X).unwrap().buffer().clone();

    assert!(!viewer.set_normalized_position(PlaneAxis::X, 0.9).unwrap());
    let plane = viewer.plane(PlaneAxis::X).unwrap();
    assert_eq!(plane.resample_count(), count);
    assert_eq!(plane.buffer(), &buffer);
}

#[test]
fn test_planes_sized_by_orthogonal_extents() {
    let dir = tempfile::tempdir().unwrap();
    let viewer = loaded_viewer(dir.path(), [6, 5, 4], [1.0; 3], ViewerConfig::default());

    let sizes: Vec<(usize, usize)> = PlaneAxis::ALL
        .iter()
        .map(|&axis| {
            let buffer = viewer.plane(axis).unwrap().buffer();
            (buffer.width, buffer.height)
        })
        .collect();
    assert_eq!(sizes, vec![(5, 4), (6, 4), (6, 5)]);
}

#[test]
fn test_display_scale_follows_spacing() {
    let dir = tempfile::tempdir().unwrap();
    let viewer = loaded_viewer(dir.path(), [64, 64, 16], [0.5, 0.5, 4.0], ViewerConfig::default());

    let coordinator = viewer.coordinator().unwrap();
    assert_eq!(coordinator.display_scale(), Vec3::new(0.5, 0.5, 1.0));
}

#[test]
fn test_key_stepping_through_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let config = ViewerConfig::default().with_key_step(KeyStepConfig::new(0.5).with_range(0.0, 0.8));
    let mut viewer = loaded_viewer(dir.path(), [11, 11, 11], [1.0; 3], config);
    let controller = viewer.controller(Vec3::new(0.1, 0.95, 0.2));
    assert_eq!(controller.axis(), PlaneAxis::Y);

    let forward = StepInput {
        forward: true,
        backward: false,
    };
    // Ten ticks at 0.1 s: +0.5 would overshoot, the range stops at 0.8
    for _ in 0..10 {
        viewer
            .with_planes(|coordinator, store| controller.step(forward, 0.1, coordinator, store))
            .unwrap();
    }
    let plane = viewer.plane(PlaneAxis::Y).unwrap();
    assert_eq!(plane.normalized_position(), 0.8);
    assert_eq!(plane.current_index(), 8);
}

#[test]
fn test_drag_through_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let mut viewer = loaded_viewer(dir.path(), [11, 11, 11], [1.0; 3], ViewerConfig::default());
    let mut controller = viewer.controller(Vec3::X);

    // Camera looking at the volume from +Z; screen y grows downwards
    let camera = |p: Vec3| Vec2::new(400.0 + p.x * 200.0, 300.0 - p.y * 200.0);
    let pose = PlanePose::new(Vec3::ZERO, Vec3::X);

    viewer
        .with_planes(|coordinator, _| controller.begin_drag(Vec2::new(400.0, 300.0), coordinator))
        .unwrap();
    // Drag left by 60 px with the default sensitivity: -0.3
    viewer
        .with_planes(|coordinator, store| {
            controller.drag_to(Vec2::new(340.0, 310.0), pose, &camera, coordinator, store)
        })
        .unwrap();
    controller.end_drag();

    let plane = viewer.plane(PlaneAxis::X).unwrap();
    assert!((plane.local_offset() + 0.3).abs() < 1e-5);
    assert_eq!(plane.current_index(), 2);
}

#[test]
fn test_session_restores_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut viewer = loaded_viewer(dir.path(), [10, 10, 10], [1.0; 3], ViewerConfig::default());
    viewer.set_normalized_position(PlaneAxis::Y, 1.0).unwrap();
    viewer.set_window(0.3, 0.4);
    viewer.set_contrast_enabled(false);

    let session_path = dir.path().join("session.json");
    viewer.session_state().save(&session_path).unwrap();

    let mut restored = VolumeViewer::default();
    restored
        .apply_session(&SessionState::load(&session_path).unwrap())
        .unwrap();

    assert!(restored.is_loaded());
    assert_eq!(restored.plane(PlaneAxis::Y).unwrap().current_index(), 9);
    assert!(!restored.contrast().enabled);
    assert_eq!(restored.contrast().level, 0.3);
    assert_eq!(
        restored.store().unwrap().mode(),
        NormalizationMode::FullRange
    );
}
