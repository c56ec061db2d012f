//! Three orthogonal planes and the input that moves them

pub mod coordinator;
pub mod interaction;
pub mod state;

pub use coordinator::MultiPlaneCoordinator;
pub use interaction::{
    DragConfig, DragSession, KeyStepConfig, PlaneInteractionController, PlanePose,
    ScreenProjector, StepInput,
};
pub use state::PlaneState;
