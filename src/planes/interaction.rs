//! Pointer and keyboard control of a single plane
//!
//! A [`PlaneInteractionController`] is bound to one axis for its lifetime.
//! The axis is picked once, from the plane's facing direction in the volume's
//! local frame. Two input modes feed the coordinator:
//!
//! - **Key stepping**: while forward/backward is held, the position moves by
//!   `±speed · dt` per tick and is kept inside a configurable sub-range.
//! - **Pointer drag**: the pointer displacement since the press is projected
//!   onto the plane's facing direction as seen on screen, scaled by a
//!   sensitivity and added to the local coordinate captured at the press.
//!
//! # Examples
//!
//! ```no_run
//! use glam::{Vec2, Vec3};
//! use nifti_mpr::planes::interaction::{PlaneInteractionController, PlanePose, ScreenProjector};
//! # use nifti_mpr::planes::coordinator::MultiPlaneCoordinator;
//! # use nifti_mpr::volume::store::VolumeStore;
//!
//! struct Ortho;
//! impl ScreenProjector for Ortho {
//!     fn world_to_screen(&self, point: Vec3) -> Vec2 {
//!         Vec2::new(point.x, -point.y) * 100.0
//!     }
//! }
//!
//! # fn run(coordinator: &mut MultiPlaneCoordinator, store: &VolumeStore) {
//! let mut controller = PlaneInteractionController::new(Vec3::X, Default::default(), Default::default());
//! controller.begin_drag(Vec2::new(10.0, 10.0), coordinator);
//! let pose = PlanePose::new(Vec3::ZERO, Vec3::X);
//! controller.drag_to(Vec2::new(40.0, 10.0), pose, &Ortho, coordinator, store);
//! controller.end_drag();
//! # }
//! ```

use crate::axis::PlaneAxis;
use crate::planes::coordinator::MultiPlaneCoordinator;
use crate::volume::store::VolumeStore;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Maps world-space points to screen-space pixels
///
/// Implemented by whatever owns the active camera.
pub trait ScreenProjector {
    fn world_to_screen(&self, point: Vec3) -> Vec2;
}

impl<F> ScreenProjector for F
where
    F: Fn(Vec3) -> Vec2,
{
    fn world_to_screen(&self, point: Vec3) -> Vec2 {
        self(point)
    }
}

/// World-space placement of a plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePose {
    pub origin: Vec3,
    /// Outward-facing direction; need not be unit length
    pub facing: Vec3,
}

impl PlanePose {
    pub fn new(origin: Vec3, facing: Vec3) -> Self {
        Self { origin, facing }
    }
}

/// Key-repeat stepping settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStepConfig {
    /// Normalized units per second
    pub speed: f32,
    /// Lowest reachable normalized position
    pub min: f32,
    /// Highest reachable normalized position
    pub max: f32,
}

impl Default for KeyStepConfig {
    fn default() -> Self {
        Self {
            speed: 0.25,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl KeyStepConfig {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    /// Restrict stepping to `[min, max]`
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn clamp(&self, position: f32) -> f32 {
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        position.clamp(low, high)
    }
}

/// Pointer drag settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Local units per screen pixel of projected displacement
    pub sensitivity: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self { sensitivity: 0.005 }
    }
}

/// State captured on pointer press; lives until release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub start_pointer: Vec2,
    /// Plane's local coordinate along its axis at press time, in `[-0.5, 0.5]`
    pub start_local: f32,
}

/// Key direction held during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepInput {
    pub forward: bool,
    pub backward: bool,
}

impl StepInput {
    fn direction(self) -> f32 {
        match (self.forward, self.backward) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

/// Converts drag and key input into position updates for one plane
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneInteractionController {
    axis: PlaneAxis,
    key_step: KeyStepConfig,
    drag: DragConfig,
    session: Option<DragSession>,
}

impl PlaneInteractionController {
    /// Bind a controller to the axis that `facing` points along most
    ///
    /// `facing` is the plane's outward direction in the volume's local frame.
    pub fn new(facing: Vec3, key_step: KeyStepConfig, drag: DragConfig) -> Self {
        let axis = dominant_axis(facing);
        debug!(facing = ?facing, axis = %axis, "Plane controller bound");
        Self {
            axis,
            key_step,
            drag,
            session: None,
        }
    }

    /// Controller for a known axis
    pub fn for_axis(axis: PlaneAxis, key_step: KeyStepConfig, drag: DragConfig) -> Self {
        Self {
            axis,
            key_step,
            drag,
            session: None,
        }
    }

    pub fn axis(&self) -> PlaneAxis {
        self.axis
    }

    pub fn key_step(&self) -> KeyStepConfig {
        self.key_step
    }

    pub fn drag_config(&self) -> DragConfig {
        self.drag
    }

    /// Active drag, if the pointer is pressed
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Apply one tick of key stepping
    ///
    /// Holding both keys, or neither, leaves the plane untouched.
    ///
    /// # Returns
    /// Whether the plane was resampled
    pub fn step(
        &self,
        input: StepInput,
        dt: f32,
        coordinator: &mut MultiPlaneCoordinator,
        store: &VolumeStore,
    ) -> bool {
        let direction = input.direction();
        if direction == 0.0 {
            return false;
        }
        let current = coordinator.plane(self.axis).normalized_position();
        let target = self
            .key_step
            .clamp(current + direction * self.key_step.speed * dt);
        trace!(axis = %self.axis, current, target, "Key step");
        coordinator.update_plane_position(store, self.axis, target)
    }

    /// Start a drag at `pointer`, capturing the plane's current local coordinate
    pub fn begin_drag(&mut self, pointer: Vec2, coordinator: &MultiPlaneCoordinator) {
        let start_local = coordinator.plane(self.axis).local_offset();
        self.session = Some(DragSession {
            start_pointer: pointer,
            start_local,
        });
        debug!(axis = %self.axis, start_local, "Drag started");
    }

    /// Continue the active drag to `pointer`
    ///
    /// Does nothing without an active drag, or when the plane faces the
    /// camera head-on so its axis has no on-screen direction.
    ///
    /// # Returns
    /// Whether the plane was resampled
    pub fn drag_to(
        &self,
        pointer: Vec2,
        pose: PlanePose,
        projector: &impl ScreenProjector,
        coordinator: &mut MultiPlaneCoordinator,
        store: &VolumeStore,
    ) -> bool {
        let Some(session) = self.session else {
            return false;
        };

        let screen_origin = projector.world_to_screen(pose.origin);
        let screen_tip = projector.world_to_screen(pose.origin + pose.facing.normalize_or_zero());
        let screen_axis = (screen_tip - screen_origin).normalize_or_zero();
        if screen_axis == Vec2::ZERO {
            trace!(axis = %self.axis, "Plane axis degenerate on screen");
            return false;
        }

        let displacement = pointer - session.start_pointer;
        let delta = displacement.dot(screen_axis) * self.drag.sensitivity;
        let local = (session.start_local + delta).clamp(-0.5, 0.5);
        coordinator.update_plane_position(store, self.axis, local + 0.5)
    }

    /// Release the pointer
    pub fn end_drag(&mut self) {
        if self.session.take().is_some() {
            debug!(axis = %self.axis, "Drag ended");
        }
    }
}

/// Axis of the largest-magnitude component of `direction`
///
/// Ties resolve to the lower axis.
pub fn dominant_axis(direction: Vec3) -> PlaneAxis {
    let magnitude = direction.abs();
    if magnitude.x >= magnitude.y && magnitude.x >= magnitude.z {
        PlaneAxis::X
    } else if magnitude.y >= magnitude.z {
        PlaneAxis::Y
    } else {
        PlaneAxis::Z
    }
}
