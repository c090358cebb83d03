//! Persistence overlay manager

pub mod overlay;

pub use overlay::{setup_overlay, OverlayOutcome};
