//! Audio context abstraction
//!
//! The platform capability the ambience plays through: a sample clock, an
//! output destination, a timer facility and a suspend/resume/close lifecycle.
//!
//! On platforms with an autoplay policy the context must be created or
//! resumed from a user-initiated event. That is the caller's contract; nothing
//! here can check it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::engine::graph::{GraphId, SharedGraph};
use crate::error::{AmbientError, Result};

/// Lifecycle of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    /// Created but not rendering (autoplay policy, or explicitly suspended)
    #[default]
    Suspended,
    Running,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Suspended => write!(f, "suspended"),
            ContextState::Running => write!(f, "running"),
            ContextState::Closed => write!(f, "closed"),
        }
    }
}

/// Deferred work scheduled on a context
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Audio rendering capability
pub trait AudioContext: Send + Sync {
    /// Device sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Context time in seconds; frozen while not running
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    /// Start or continue rendering
    fn resume(&self) -> Result<()>;

    /// Release the device; a closed context cannot be resumed
    fn close(&self) -> Result<()>;

    /// Route a graph to the output destination
    fn connect(&self, graph: SharedGraph) -> Result<()>;

    /// Remove a graph from the output destination
    fn disconnect(&self, id: GraphId);

    /// Ids of the graphs currently routed to the destination
    fn connected(&self) -> Vec<GraphId>;

    /// Run `task` once after `delay` of wall-clock time
    fn schedule(&self, delay: Duration, task: Task);
}

/// Creates contexts on demand
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn AudioContext>>;
}

/// Factory for platforms without any audio capability
#[derive(Debug, Clone, Default)]
pub struct UnavailableFactory {
    reason: Option<String>,
}

impl UnavailableFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl ContextFactory for UnavailableFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        Err(AmbientError::ContextUnavailable {
            reason: self
                .reason
                .clone()
                .unwrap_or_else(|| "no audio backend on this platform".to_string()),
        })
    }
}

/// Where the controller gets its context from, and whether it owns it
pub enum ContextSource {
    /// Supplied by the caller, who stays responsible for closing it
    Borrowed(Arc<dyn AudioContext>),
    /// Created lazily by the controller, which closes it on teardown
    Owned(Box<dyn ContextFactory>),
}

impl ContextSource {
    pub fn borrowed(context: Arc<dyn AudioContext>) -> Self {
        ContextSource::Borrowed(context)
    }

    pub fn owned(factory: impl ContextFactory + 'static) -> Self {
        ContextSource::Owned(Box::new(factory))
    }

    /// The platform default: the output device when built with the `device`
    /// feature, otherwise an unavailable backend
    pub fn platform_default() -> Self {
        #[cfg(feature = "device")]
        {
            Self::owned(crate::engine::device::DeviceFactory::default())
        }
        #[cfg(not(feature = "device"))]
        {
            Self::owned(UnavailableFactory::with_reason(
                "built without the `device` feature",
            ))
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ContextSource::Owned(_))
    }
}

impl fmt::Debug for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextSource::Borrowed(ctx) => f
                .debug_tuple("Borrowed")
                .field(&ctx.state())
                .finish(),
            ContextSource::Owned(_) => f.write_str("Owned"),
        }
    }
}
