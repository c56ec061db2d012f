//! Slice Export Example
//!
//! Loads a NIfTI volume on a worker thread, prints its geometry and writes the
//! three centre slices as 8-bit PGM images.
//!
//! # Usage
//!
//! ```bash
//! # Writes brain_sagittal.pgm, brain_coronal.pgm and brain_axial.pgm
//! cargo run --example slice_export brain.nii.gz brain
//!
//! # With a configuration file
//! cargo run --example slice_export brain.nii.gz brain viewer.json
//!
//! # More detail
//! RUST_LOG=nifti_mpr=debug cargo run --example slice_export brain.nii.gz brain
//! ```

use nifti_mpr::error::Result;
use nifti_mpr::volume::SliceBuffer;
use nifti_mpr::{PlaneAxis, ViewerConfig, VolumeViewer};
use std::env;
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    if let Err(e) = run() {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: cargo run --example slice_export <volume> [output-prefix] [config.json]");
        std::process::exit(2);
    }
    let input = &args[1];
    let prefix = args.get(2).cloned().unwrap_or_else(|| "slice".to_string());
    let config = match args.get(3) {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    let mut viewer = VolumeViewer::new(config);
    let started = Instant::now();
    viewer.begin_load(input)?;
    println!("[INFO] Loading {}...", input);

    // Stand-in for a render loop ticking at ~60 Hz
    let mut ticks = 0u32;
    loop {
        if let Some(result) = viewer.poll_load() {
            result?;
            break;
        }
        ticks += 1;
        thread::sleep(Duration::from_millis(16));
    }
    println!(
        "[INFO] Loaded in {:.2?} ({} ticks without blocking)",
        started.elapsed(),
        ticks
    );

    let (nx, ny, nz) = viewer.dimensions()?;
    let (dx, dy, dz) = viewer.voxel_spacing()?;
    let store = viewer.store()?;
    println!("  Dimensions: {} x {} x {}", nx, ny, nz);
    println!("  Spacing:    {:.3} x {:.3} x {:.3} mm", dx, dy, dz);
    println!("  Encoding:   {:?}", store.header().encoding);
    println!(
        "  Window:     [{:.3}, {:.3}]",
        store.window().lower(),
        store.window().upper()
    );

    let report = viewer.load_report()?;
    for warning in &report.warnings {
        println!("  [WARN] {}", warning);
    }

    for axis in PlaneAxis::ALL {
        let plane = viewer.plane(axis)?;
        let path = format!("{}_{}.pgm", prefix, axis.plane_name());
        write_pgm(&path, plane.buffer())?;
        println!(
            "[INFO] {} slice {}/{} -> {}",
            axis.plane_name(),
            plane.current_index(),
            viewer.slice_count(axis)? - 1,
            path
        );
    }

    Ok(())
}

/// Write a slice as a binary greyscale PGM, top row first
fn write_pgm(path: &str, slice: &SliceBuffer) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write!(file, "P5\n{} {}\n255\n", slice.width, slice.height)?;
    for row in slice.rows().collect::<Vec<_>>().into_iter().rev() {
        let bytes: Vec<u8> = row
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        file.write_all(&bytes)?;
    }
    file.flush()?;
    Ok(())
}
