//! DSP building blocks
//!
//! Filters and parameter automation used by the ambience graph.

mod automation;
mod biquad;

pub use automation::{AutomationEvent, AutomationParam};
pub use biquad::{Biquad, FilterSpec, FilterType};
