//! Audio graph
//!
//! One playback session: a looping buffer source feeding two cascaded biquads
//! and an automated gain stage. Graphs are shared between their controller
//! and the output bus they are connected to.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::dsp::{AutomationParam, Biquad, FilterSpec};
use crate::engine::buffer::NoiseBuffer;
use crate::error::{AmbientError, Result};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generation token identifying one graph instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphId(pub u64);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Playback state of a buffer source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    #[default]
    Unstarted,
    Playing,
    Stopped,
}

/// Looping reader over a noise buffer
#[derive(Debug, Clone)]
pub struct LoopSource {
    buffer: NoiseBuffer,
    position: usize,
    state: SourceState,
}

impl LoopSource {
    pub fn new(buffer: NoiseBuffer) -> Self {
        Self {
            buffer,
            position: 0,
            state: SourceState::Unstarted,
        }
    }

    pub fn buffer(&self) -> &NoiseBuffer {
        &self.buffer
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Begin playback immediately
    pub fn start(&mut self) {
        if self.state == SourceState::Unstarted {
            self.state = SourceState::Playing;
        }
    }

    /// Stop playback
    ///
    /// Fails when the source is not playing; callers stopping during teardown
    /// treat that as already done.
    pub fn stop(&mut self, graph: GraphId) -> Result<()> {
        match self.state {
            SourceState::Playing => {
                self.state = SourceState::Stopped;
                Ok(())
            }
            SourceState::Unstarted | SourceState::Stopped => {
                self.state = SourceState::Stopped;
                Err(AmbientError::SourceStop { graph })
            }
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.state != SourceState::Playing {
            return 0.0;
        }
        let sample = self.buffer.looped(self.position);
        self.position = (self.position + 1) % self.buffer.len().max(1);
        sample
    }
}

/// Gain stage with an automated multiplier
#[derive(Debug, Clone)]
pub struct GainNode {
    pub gain: AutomationParam,
}

impl GainNode {
    pub fn new(value: f32) -> Self {
        Self {
            gain: AutomationParam::new(value),
        }
    }
}

/// Static description of a graph, for inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphTopology {
    /// Node kinds from source to gain
    pub chain: Vec<&'static str>,
    pub filters: Vec<FilterSpec>,
    pub buffer_len: usize,
    pub looping: bool,
}

/// One live playback session
#[derive(Debug, Clone)]
pub struct AudioGraph {
    id: GraphId,
    sample_rate: u32,
    pub source: LoopSource,
    pub lowpass: Biquad,
    pub high_shelf: Biquad,
    pub gain: GainNode,
    scratch: Vec<f32>,
}

impl AudioGraph {
    pub fn new(
        id: GraphId,
        sample_rate: u32,
        source: LoopSource,
        lowpass: Biquad,
        high_shelf: Biquad,
        gain: GainNode,
    ) -> Self {
        Self {
            id,
            sample_rate,
            source,
            lowpass,
            high_shelf,
            gain,
            scratch: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn topology(&self) -> GraphTopology {
        GraphTopology {
            chain: vec!["buffer_source", "lowpass", "highshelf", "gain"],
            filters: vec![self.lowpass.spec(), self.high_shelf.spec()],
            buffer_len: self.source.buffer().len(),
            looping: true,
        }
    }

    /// Mix this graph's output into `out`, the first frame at `start_time`
    pub fn render_into(&mut self, out: &mut [f32], start_time: f64) {
        if self.source.state() != SourceState::Playing {
            return;
        }

        self.scratch.resize(out.len(), 0.0);
        self.gain
            .gain
            .fill(&mut self.scratch, start_time, self.sample_rate);

        for (slot, gain) in out.iter_mut().zip(self.scratch.iter()) {
            let x = self.source.next_sample();
            let filtered = self.high_shelf.process(self.lowpass.process(x));
            *slot += filtered * gain;
        }
    }
}

/// A graph shared between its owner and the output bus
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Destination that mixes every connected graph
#[derive(Debug, Default)]
pub struct OutputBus {
    graphs: Mutex<Vec<(GraphId, SharedGraph)>>,
}

impl OutputBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a graph; connecting the same id twice is a no-op
    pub fn connect(&self, graph: SharedGraph) {
        let id = lock(&graph).id();
        let mut graphs = lock(&self.graphs);
        if !graphs.iter().any(|(existing, _)| *existing == id) {
            graphs.push((id, graph));
        }
    }

    /// Disconnect by id; returns whether the graph was connected
    pub fn disconnect(&self, id: GraphId) -> bool {
        let mut graphs = lock(&self.graphs);
        let before = graphs.len();
        graphs.retain(|(existing, _)| *existing != id);
        graphs.len() != before
    }

    pub fn disconnect_all(&self) {
        lock(&self.graphs).clear();
    }

    pub fn connected_ids(&self) -> Vec<GraphId> {
        lock(&self.graphs).iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.graphs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite `out` with the mix of all connected graphs
    pub fn render(&self, out: &mut [f32], start_time: f64) {
        out.fill(0.0);
        let graphs = lock(&self.graphs);
        for (_, graph) in graphs.iter() {
            lock(graph).render_into(out, start_time);
        }
    }
}
