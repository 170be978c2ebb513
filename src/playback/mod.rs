//! Ambience playback
//!
//! - Playback state and observer snapshot
//! - Controller owning the live graph
//! - Activation gate following the focus-mode flag

pub mod controller;
pub mod gate;
pub mod state;

pub use controller::PlaybackController;
pub use gate::ActivationGate;
pub use state::{PlaybackState, PlaybackStatus};
