//! Offline audio context
//!
//! Renders the output bus into memory on a virtual clock. Nothing happens
//! until `advance` is called: it renders in 128-frame quanta and fires the
//! timers that fall due along the way, so a whole session can be replayed
//! deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

use crate::engine::context::{AudioContext, ContextFactory, ContextState, Task};
use crate::engine::graph::{lock, GraphId, OutputBus, SharedGraph};
use crate::error::{AmbientError, Result};

/// Frames rendered per step
pub const RENDER_QUANTUM: usize = 128;

struct PendingTask {
    due: f64,
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct Clock {
    /// Frames rendered while running; drives `current_time`
    frames: u64,
    /// Virtual wall-clock seconds; drives timers
    wall: f64,
    state: ContextState,
}

/// In-memory context on a virtual clock
pub struct OfflineContext {
    sample_rate: u32,
    bus: OutputBus,
    clock: Mutex<Clock>,
    timers: Mutex<Vec<PendingTask>>,
    next_seq: Mutex<u64>,
    resume_failure: Option<String>,
}

impl OfflineContext {
    /// A running context
    pub fn new(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, ContextState::Running, None)
    }

    /// A context that waits for `resume`, as an autoplay policy would leave it
    pub fn suspended(sample_rate: u32) -> Self {
        Self::with_state(sample_rate, ContextState::Suspended, None)
    }

    /// A suspended context whose `resume` is always rejected
    pub fn with_resume_failure(sample_rate: u32, reason: impl Into<String>) -> Self {
        Self::with_state(sample_rate, ContextState::Suspended, Some(reason.into()))
    }

    fn with_state(sample_rate: u32, state: ContextState, resume_failure: Option<String>) -> Self {
        Self {
            sample_rate,
            bus: OutputBus::new(),
            clock: Mutex::new(Clock {
                state,
                ..Clock::default()
            }),
            timers: Mutex::new(Vec::new()),
            next_seq: Mutex::new(0),
            resume_failure,
        }
    }

    /// Virtual wall-clock seconds elapsed
    pub fn wall_time(&self) -> f64 {
        lock(&self.clock).wall
    }

    /// Timers scheduled but not yet fired
    pub fn pending_tasks(&self) -> usize {
        lock(&self.timers).len()
    }

    /// Advance by `secs`, returning the rendered mono output
    ///
    /// Suspended or closed contexts produce silence and keep their audio
    /// clock still, but timers keep firing.
    pub fn advance(&self, secs: f64) -> Vec<f32> {
        let total = (secs.max(0.0) * self.sample_rate as f64).round() as usize;
        let mut output = vec![0.0; total];

        let mut offset = 0;
        while offset < total {
            let block = RENDER_QUANTUM.min(total - offset);
            let (running, start_time) = {
                let clock = lock(&self.clock);
                (
                    clock.state == ContextState::Running,
                    clock.frames as f64 / self.sample_rate as f64,
                )
            };

            if running {
                self.bus.render(&mut output[offset..offset + block], start_time);
            }

            let wall = {
                let mut clock = lock(&self.clock);
                if running {
                    clock.frames += block as u64;
                }
                clock.wall += block as f64 / self.sample_rate as f64;
                clock.wall
            };

            self.fire_due(wall);
            offset += block;
        }

        output
    }

    fn fire_due(&self, wall: f64) {
        let mut due: Vec<PendingTask> = {
            let mut timers = lock(&self.timers);
            let (ready, waiting): (Vec<_>, Vec<_>) =
                timers.drain(..).partition(|t| t.due <= wall + 1e-9);
            *timers = waiting;
            ready
        };

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        for pending in due {
            (pending.task)();
        }
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).frames as f64 / self.sample_rate as f64
    }

    fn state(&self) -> ContextState {
        lock(&self.clock).state
    }

    fn resume(&self) -> Result<()> {
        let mut clock = lock(&self.clock);
        match clock.state {
            ContextState::Closed => Err(AmbientError::ContextClosed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                if let Some(reason) = &self.resume_failure {
                    return Err(AmbientError::ContextInit {
                        reason: reason.clone(),
                    });
                }
                clock.state = ContextState::Running;
                debug!("Offline context resumed at {:.3}s", clock.wall);
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        let mut clock = lock(&self.clock);
        if clock.state == ContextState::Closed {
            return Err(AmbientError::ContextClosed);
        }
        clock.state = ContextState::Closed;
        drop(clock);

        self.bus.disconnect_all();
        Ok(())
    }

    fn connect(&self, graph: SharedGraph) -> Result<()> {
        if self.state() == ContextState::Closed {
            return Err(AmbientError::ContextClosed);
        }
        self.bus.connect(graph);
        Ok(())
    }

    fn disconnect(&self, id: GraphId) {
        self.bus.disconnect(id);
    }

    fn connected(&self) -> Vec<GraphId> {
        self.bus.connected_ids()
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let due = self.wall_time() + delay.as_secs_f64();
        let seq = {
            let mut next = lock(&self.next_seq);
            *next += 1;
            *next
        };
        lock(&self.timers).push(PendingTask { due, seq, task });
    }
}

/// Creates offline contexts and keeps a handle to each one
#[derive(Clone, Default)]
pub struct OfflineFactory {
    sample_rate: u32,
    start_suspended: bool,
    created: Arc<Mutex<Vec<Arc<OfflineContext>>>>,
}

impl OfflineFactory {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Contexts start suspended and are resumed by the controller
    pub fn suspended(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            start_suspended: true,
            ..Self::default()
        }
    }

    /// Every context created so far, oldest first
    pub fn created(&self) -> Vec<Arc<OfflineContext>> {
        lock(&self.created).clone()
    }

    /// The most recently created context
    pub fn latest(&self) -> Option<Arc<OfflineContext>> {
        lock(&self.created).last().cloned()
    }
}

impl ContextFactory for OfflineFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        let context = Arc::new(if self.start_suspended {
            OfflineContext::suspended(self.sample_rate)
        } else {
            OfflineContext::new(self.sample_rate)
        });
        lock(&self.created).push(context.clone());
        Ok(context)
    }
}
