//! Error and warning types for volume loading and navigation
//!
//! Fatal conditions are reported as [`VolumeError`] and abort a load attempt.
//! Recoverable conditions are reported as [`LoadWarning`] and collected into a
//! [`LoadReport`] while the load carries on.

use thiserror::Error;
use tracing::warn;

/// Volume pipeline error types
///
/// All fallible operations in this library return `Result<T, VolumeError>`.
#[derive(Error, Debug)]
pub enum VolumeError {
    /// The `sizeof_hdr` field does not hold the fixed header size
    ///
    /// This error occurs when:
    /// - The file is not a NIfTI-1 file (e.g. NIfTI-2, Analyze with a custom header)
    /// - The file is truncated before the end of the header
    ///
    /// # Example
    /// ```no_run
    /// # use nifti_mpr::error::VolumeError;
    /// let err = VolumeError::HeaderSize {
    ///     expected: 348,
    ///     actual: 540,
    /// };
    /// ```
    #[error("Invalid header size: expected {expected}, got {actual}")]
    HeaderSize {
        /// Header size required by the format
        expected: usize,
        /// Size declared by (or available in) the file
        actual: usize,
    },

    /// Magic string at the end of the header is not `n+1` or `ni1`
    #[error("Invalid magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Malformed content that is not covered by a more specific variant
    ///
    /// Raised for corrupt or truncated gzip streams and for paired headers
    /// loaded without their image file.
    #[error("Invalid format: {0}")]
    Format(String),

    /// I/O error while reading a volume, a paired data file or a session file
    ///
    /// This error wraps standard library I/O errors and occurs when:
    /// - The file does not exist or cannot be opened
    /// - The paired `.img` file for a `.hdr` header is missing
    ///
    /// # Example
    /// ```no_run
    /// # use nifti_mpr::error::VolumeError;
    /// # use std::io;
    /// let io_err = io::Error::new(io::ErrorKind::NotFound, "scan.nii not found");
    /// let err = VolumeError::Io(io_err);
    /// ```
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or session JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A slice or voxel query was issued before a volume was loaded
    ///
    /// Callers must check `is_loaded()` first; this is a caller error rather
    /// than a condition to retry.
    #[error("No volume loaded")]
    NotLoaded,

    /// A background load ended without delivering a result
    #[error("Load aborted: {0}")]
    LoadAborted(String),
}

/// Result type alias for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Non-fatal conditions raised while loading a volume
///
/// None of these block the load; each is logged when raised and kept in the
/// [`LoadReport`] returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Datatype code outside the supported set; payload read as 32-bit float
    #[error("Unsupported element encoding {code}, reinterpreting as float32")]
    UnsupportedEncoding {
        /// Raw datatype code from the header
        code: i16,
    },

    /// Payload element count differs from the product of the dimensions
    #[error("Payload length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// Elements required by the header dimensions
        expected: usize,
        /// Whole elements present in the payload
        actual: usize,
    },

    /// A dimension resolved to zero or less and was coerced to 1
    #[error("Dimension {axis} resolved to {value}, using 1")]
    DimensionCoerced {
        /// Axis number (0 = x, 1 = y, 2 = z)
        axis: usize,
        /// Value found in the header
        value: i64,
    },

    /// A voxel spacing entry was not a positive finite number
    #[error("Spacing {axis} is {value}, using 1.0")]
    SpacingDefaulted {
        /// Axis number (0 = x, 1 = y, 2 = z)
        axis: usize,
        /// Value found in the header
        value: f32,
    },

    /// NaN or infinite samples were replaced with 0
    #[error("{count} non-finite samples replaced with 0")]
    NonFiniteValues {
        /// Number of replaced samples
        count: usize,
    },

    /// Single-file `vox_offset` pointed into the header and was moved past it
    #[error("vox_offset {declared} overlaps the header, using {used}")]
    VoxOffsetAdjusted {
        /// Offset declared in the header
        declared: f32,
        /// Offset actually used
        used: usize,
    },
}

/// Warnings collected during a single load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Warnings in the order they were raised
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning and record it
    pub fn warn(&mut self, warning: LoadWarning) {
        warn!(%warning, "Volume load warning");
        self.warnings.push(warning);
    }

    /// Whether the load finished without any warning
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Whether a warning matching `predicate` was raised
    pub fn has(&self, predicate: impl Fn(&LoadWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }

    /// Append the warnings of another report
    pub fn merge(&mut self, other: LoadReport) {
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VolumeError::HeaderSize {
            expected: 348,
            actual: 540,
        };
        assert_eq!(err.to_string(), "Invalid header size: expected 348, got 540");
        assert_eq!(VolumeError::NotLoaded.to_string(), "No volume loaded");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VolumeError = io_err.into();
        assert!(matches!(err, VolumeError::Io(_)));
    }

    #[test]
    fn test_report_collects_warnings() {
        let mut report = LoadReport::new();
        assert!(report.is_clean());

        report.warn(LoadWarning::LengthMismatch {
            expected: 64,
            actual: 57,
        });
        report.warn(LoadWarning::NonFiniteValues { count: 3 });

        assert_eq!(report.warnings.len(), 2);
        assert!(report.has(|w| matches!(w, LoadWarning::NonFiniteValues { count: 3 })));
        assert!(!report.has(|w| matches!(w, LoadWarning::UnsupportedEncoding { .. })));
    }

    #[test]
    fn test_report_merge() {
        let mut a = LoadReport::new();
        a.warn(LoadWarning::DimensionCoerced { axis: 2, value: 0 });
        let mut b = LoadReport::new();
        b.warn(LoadWarning::SpacingDefaulted { axis: 0, value: -1.0 });

        a.merge(b);
        assert_eq!(a.warnings.len(), 2);
    }
}
