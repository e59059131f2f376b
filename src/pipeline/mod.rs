//! Document pipeline: draft → refined → pending review → approved/rejected → finalized.

pub mod draft;
pub mod state;

pub use draft::{DraftPipeline, Refiner};
pub use state::{DraftState, StateTransition};
