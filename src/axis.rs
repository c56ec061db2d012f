//! Spatial axes of the voxel grid

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three spatial axes of the grid
///
/// The grid is indexed `[x, y, z]` in file order. For a volume stored in the
/// usual radiological orientation the axes correspond to the sagittal (X),
/// coronal (Y) and axial (Z) slicing directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneAxis {
    /// First axis (sagittal slices)
    X,
    /// Second axis (coronal slices)
    Y,
    /// Third axis (axial slices)
    Z,
}

impl PlaneAxis {
    /// All axes in grid order
    pub const ALL: [PlaneAxis; 3] = [PlaneAxis::X, PlaneAxis::Y, PlaneAxis::Z];

    /// Position of this axis in `[x, y, z]` tuples
    pub fn index(self) -> usize {
        match self {
            PlaneAxis::X => 0,
            PlaneAxis::Y => 1,
            PlaneAxis::Z => 2,
        }
    }

    /// Axis at position `index` (0, 1 or 2)
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlaneAxis::X),
            1 => Some(PlaneAxis::Y),
            2 => Some(PlaneAxis::Z),
            _ => None,
        }
    }

    /// The two axes spanning a slice orthogonal to this one, as (columns, rows)
    ///
    /// This fixes the layout of every slice buffer:
    /// - X: columns follow Y, rows follow Z
    /// - Y: columns follow X, rows follow Z
    /// - Z: columns follow X, rows follow Y
    pub fn orthogonal(self) -> (PlaneAxis, PlaneAxis) {
        match self {
            PlaneAxis::X => (PlaneAxis::Y, PlaneAxis::Z),
            PlaneAxis::Y => (PlaneAxis::X, PlaneAxis::Z),
            PlaneAxis::Z => (PlaneAxis::X, PlaneAxis::Y),
        }
    }

    /// Anatomical name of the plane orthogonal to this axis
    pub fn plane_name(self) -> &'static str {
        match self {
            PlaneAxis::X => "sagittal",
            PlaneAxis::Y => "coronal",
            PlaneAxis::Z => "axial",
        }
    }
}

impl fmt::Display for PlaneAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaneAxis::X => "x",
            PlaneAxis::Y => "y",
            PlaneAxis::Z => "z",
        };
        f.write_str(name)
    }
}
