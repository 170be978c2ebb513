//! Output device context (cpal)
//!
//! The cpal stream lives on its own thread, since streams cannot move between
//! threads on every host. The context talks to it through shared atomics and
//! a shutdown channel; the data callback renders the output bus.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, info, warn};

use crate::engine::context::{AudioContext, ContextFactory, ContextState, Task};
use crate::engine::graph::{lock, GraphId, OutputBus, SharedGraph};
use crate::error::{AmbientError, Result};

/// State shared with the audio thread
struct Shared {
    bus: OutputBus,
    frames: AtomicU64,
    running: AtomicBool,
}

/// Context backed by the default output device
pub struct DeviceContext {
    sample_rate: u32,
    shared: Arc<Shared>,
    state: Mutex<ContextState>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl DeviceContext {
    /// Open the default output device
    pub fn open() -> Result<Self> {
        let shared = Arc::new(Shared {
            bus: OutputBus::new(),
            frames: AtomicU64::new(0),
            running: AtomicBool::new(true),
        });

        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<u32, AmbientError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_shared = shared.clone();

        thread::Builder::new()
            .name("ambience-output".to_string())
            .spawn(move || run_stream(thread_shared, ready_tx, shutdown_rx))?;

        let sample_rate = ready_rx.recv().map_err(|_| AmbientError::ContextInit {
            reason: "audio thread exited before reporting".to_string(),
        })??;

        info!("Opened output device at {} Hz", sample_rate);

        Ok(Self {
            sample_rate,
            shared,
            state: Mutex::new(ContextState::Running),
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }
}

fn run_stream(
    shared: Arc<Shared>,
    ready: mpsc::Sender<std::result::Result<u32, AmbientError>>,
    shutdown: mpsc::Receiver<()>,
) {
    let stream = match build_stream(shared) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let (stream, sample_rate) = stream;

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(AmbientError::ContextInit {
            reason: format!("Failed to start audio stream: {}", e),
        }));
        return;
    }

    let _ = ready.send(Ok(sample_rate));

    // Blocks until close() sends or the context is dropped
    let _ = shutdown.recv();
    drop(stream);
    debug!("Output stream released");
}

fn build_stream(shared: Arc<Shared>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AmbientError::ContextUnavailable {
            reason: "No audio output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| AmbientError::ContextInit {
            reason: format!("Failed to get audio config: {}", e),
        })?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AmbientError::ContextInit {
            reason: format!("Unsupported sample format: {:?}", config.sample_format()),
        });
    }

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let mut mono: Vec<f32> = Vec::new();

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if !shared.running.load(Ordering::Acquire) {
                    data.fill(0.0);
                    return;
                }

                mono.resize(frames, 0.0);
                let start = shared.frames.load(Ordering::Acquire) as f64 / sample_rate as f64;
                shared.bus.render(&mut mono, start);

                for (frame, sample) in data.chunks_mut(channels.max(1)).zip(mono.iter()) {
                    frame.fill(*sample);
                }
                shared.frames.fetch_add(frames as u64, Ordering::AcqRel);
            },
            |err| warn!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AmbientError::ContextInit {
            reason: format!("Failed to build audio stream: {}", e),
        })?;

    Ok((stream, sample_rate))
}

impl AudioContext for DeviceContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.shared.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> ContextState {
        *lock(&self.state)
    }

    fn resume(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match *state {
            ContextState::Closed => Err(AmbientError::ContextClosed),
            _ => {
                self.shared.running.store(true, Ordering::Release);
                *state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if *state == ContextState::Closed {
            return Err(AmbientError::ContextClosed);
        }
        *state = ContextState::Closed;
        self.shared.running.store(false, Ordering::Release);
        self.shared.bus.disconnect_all();
        if let Some(tx) = lock(&self.shutdown).take() {
            let _ = tx.send(());
        }
        Ok(())
    }

    fn connect(&self, graph: SharedGraph) -> Result<()> {
        if self.state() == ContextState::Closed {
            return Err(AmbientError::ContextClosed);
        }
        self.shared.bus.connect(graph);
        Ok(())
    }

    fn disconnect(&self, id: GraphId) {
        self.shared.bus.disconnect(id);
    }

    fn connected(&self) -> Vec<GraphId> {
        self.shared.bus.connected_ids()
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let spawned = thread::Builder::new()
            .name("ambience-timer".to_string())
            .spawn(move || {
                thread::sleep(delay);
                task();
            });
        if let Err(e) = spawned {
            warn!("Could not spawn timer thread: {}", e);
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if let Some(tx) = lock(&self.shutdown).take() {
            let _ = tx.send(());
        }
    }
}

/// Opens the default output device on demand
#[derive(Debug, Clone, Default)]
pub struct DeviceFactory;

impl ContextFactory for DeviceFactory {
    fn create(&self) -> Result<Arc<dyn AudioContext>> {
        Ok(Arc::new(DeviceContext::open()?))
    }
}
