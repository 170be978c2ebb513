//! Ambience - ambient noise for a gallery focus mode
//!
//! A soft brown-noise bed that fades in when the full-screen slideshow opens
//! and fades out when it closes.
//!
//! # Architecture
//!
//! - `noise`: synthesizes a looping noise cycle and builds the
//!   source → low-pass → high-shelf → gain graph
//! - `playback`: controller owning at most one live graph, plus the gate that
//!   follows the focus-mode flag
//! - `engine`: audio contexts (offline renderer, output device) and the graph
//!   they render
//!
//! ```
//! use std::sync::Arc;
//! use ambience::engine::{AudioContext, OfflineContext};
//! use ambience::{ActivationGate, AmbientConfig};
//!
//! let ctx = Arc::new(OfflineContext::new(8000));
//! let mut gate = ActivationGate::with_override(false, Some(ctx.clone()), AmbientConfig::default());
//!
//! gate.set_enabled(true);
//! assert!(gate.is_playing());
//!
//! gate.set_enabled(false);
//! assert!(!gate.is_playing());
//! ctx.advance(0.7);
//! assert!(ctx.connected().is_empty());
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod noise;
pub mod playback;

pub use config::{AmbientConfig, NoiseColor};
pub use error::{AmbientError, Result};
pub use noise::NoiseGenerator;
pub use playback::{ActivationGate, PlaybackController, PlaybackState, PlaybackStatus};
