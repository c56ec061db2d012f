//! Saved viewing session
//!
//! A [`SessionState`] records what is needed to restore a view: the volume
//! file, the three plane positions and both windowing settings. It is written
//! and read as JSON through an explicit save/load call.

use crate::axis::PlaneAxis;
use crate::error::Result;
use crate::volume::normalize::NormalizationMode;
use crate::volume::slice::ContrastWindow;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Serializable snapshot of a viewing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Volume file the session was viewing
    pub source: Option<PathBuf>,
    /// Normalized plane positions, indexed by axis
    pub positions: [f32; 3],
    pub contrast: ContrastWindow,
    pub normalization: NormalizationMode,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            source: None,
            positions: [0.5; 3],
            contrast: ContrastWindow::default(),
            normalization: NormalizationMode::default(),
        }
    }
}

impl SessionState {
    /// Normalized position recorded for `axis`
    pub fn position(&self, axis: PlaneAxis) -> f32 {
        self.positions[axis.index()]
    }

    /// Write the session to `path` as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        info!(path = %path.display(), "Session saved");
        Ok(())
    }

    /// Read a session previously written by [`SessionState::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let session = serde_json::from_slice(&std::fs::read(path)?)?;
        info!(path = %path.display(), "Session loaded");
        Ok(session)
    }
}
