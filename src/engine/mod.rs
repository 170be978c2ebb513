//! Audio Engine Module
//!
//! Everything between the noise generator and the speakers:
//! - Noise buffers and level helpers
//! - Audio graphs and the output bus
//! - Audio contexts (offline renderer, output device)
//! - WAV export

pub mod buffer;
pub mod context;
#[cfg(feature = "device")]
pub mod device;
pub mod graph;
pub mod io;
pub mod offline;

pub use buffer::NoiseBuffer;
pub use context::{
    AudioContext, ContextFactory, ContextSource, ContextState, Task, UnavailableFactory,
};
#[cfg(feature = "device")]
pub use device::{DeviceContext, DeviceFactory};
pub use graph::{
    AudioGraph, GainNode, GraphId, GraphTopology, LoopSource, OutputBus, SharedGraph,
    SourceState,
};
pub use io::{export_wav, ExportFormat, WavSink};
pub use offline::{OfflineContext, OfflineFactory, RENDER_QUANTUM};
