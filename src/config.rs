//! Viewer configuration
//!
//! [`ViewerConfig`] collects every tunable of the pipeline: how intensities
//! are normalized at load time, which axis the extractor reverses, the
//! initial contrast window and the input settings of the plane controllers.
//! It can be built in code or read from JSON; missing JSON fields take their
//! default values.
//!
//! # Examples
//!
//! ```
//! use nifti_mpr::config::ViewerConfig;
//! use nifti_mpr::volume::normalize::NormalizationMode;
//!
//! let config = ViewerConfig::from_json_str(r#"{ "normalization": { "mode": "full_range" } }"#).unwrap();
//! assert_eq!(config.normalization, NormalizationMode::FullRange);
//! assert_eq!(config.contrast.level, 0.5);
//! ```

use crate::axis::PlaneAxis;
use crate::error::Result;
use crate::planes::interaction::{DragConfig, KeyStepConfig};
use crate::volume::normalize::NormalizationMode;
use crate::volume::slice::ContrastWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Settings for loading and viewing a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Load-time intensity normalization
    pub normalization: NormalizationMode,
    /// Axis whose order is reversed during extraction (None = keep file order)
    pub flip_axis: Option<PlaneAxis>,
    /// Initial interactive contrast window
    pub contrast: ContrastWindow,
    /// Key-repeat stepping of the plane controllers
    pub key_step: KeyStepConfig,
    /// Pointer drag of the plane controllers
    pub drag: DragConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationMode::default(),
            flip_axis: Some(PlaneAxis::Z),
            contrast: ContrastWindow::default(),
            key_step: KeyStepConfig::default(),
            drag: DragConfig::default(),
        }
    }
}

impl ViewerConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalization(mut self, normalization: NormalizationMode) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_flip_axis(mut self, flip_axis: Option<PlaneAxis>) -> Self {
        self.flip_axis = flip_axis;
        self
    }

    pub fn with_contrast(mut self, contrast: ContrastWindow) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn with_key_step(mut self, key_step: KeyStepConfig) -> Self {
        self.key_step = key_step;
        self
    }

    pub fn with_drag(mut self, drag: DragConfig) -> Self {
        self.drag = drag;
        self
    }

    /// Parse a configuration from JSON
    ///
    /// # Errors
    ///
    /// - [`VolumeError::Json`](crate::error::VolumeError::Json) - Malformed JSON or mistyped fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration file
    ///
    /// # Errors
    ///
    /// - [`VolumeError::Io`](crate::error::VolumeError::Io) - File could not be read
    /// - [`VolumeError::Json`](crate::error::VolumeError::Json) - File is not valid configuration JSON
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Pretty-printed JSON form
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
