//! Playback controller
//!
//! Owns at most one live audio graph and moves it through start, fade-out
//! and release. The delayed release after a fade is keyed to the graph it was
//! scheduled for: when it fires after a newer graph has been started, it
//! only tears down its own graph and leaves the controller alone.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::AmbientConfig;
use crate::engine::graph::lock;
use crate::engine::{AudioContext, ContextSource, ContextState, GraphId, SharedGraph};
use crate::error::Result;
use crate::noise::NoiseGenerator;
use crate::playback::state::{PlaybackState, PlaybackStatus};

/// A graph owned by the controller
#[derive(Clone)]
struct ActiveGraph {
    id: GraphId,
    graph: SharedGraph,
}

impl ActiveGraph {
    /// Stop the source, treating an already stopped source as done
    fn stop_source(&self) {
        if let Err(e) = lock(&self.graph).source.stop(self.id) {
            debug!("Ignoring stop failure: {}", e);
        }
    }
}

struct ControllerInner {
    state: PlaybackState,
    audio_error: Option<String>,
    context: Option<Arc<dyn AudioContext>>,
    graph: Option<ActiveGraph>,
    /// Graph fading out while its release is pending
    fading: Option<ActiveGraph>,
    next_generation: u64,
    rng: StdRng,
}

/// Start/stop/volume control over one ambience graph
pub struct PlaybackController {
    inner: Arc<Mutex<ControllerInner>>,
    source: ContextSource,
    generator: NoiseGenerator,
}

impl PlaybackController {
    /// Create an idle controller
    ///
    /// No context is touched until the first `start`.
    pub fn new(source: ContextSource, config: AmbientConfig) -> Self {
        Self::with_rng(source, config, StdRng::from_entropy())
    }

    /// Create an idle controller with a reproducible noise seed
    pub fn with_seed(source: ContextSource, config: AmbientConfig, seed: u64) -> Self {
        Self::with_rng(source, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(source: ContextSource, config: AmbientConfig, rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                state: PlaybackState::Idle,
                audio_error: None,
                context: None,
                graph: None,
                fading: None,
                next_generation: 0,
                rng,
            })),
            source,
            generator: NoiseGenerator::new(config),
        }
    }

    pub fn config(&self) -> &AmbientConfig {
        self.generator.config()
    }

    /// Whether the controller will close its context on teardown
    pub fn owns_context(&self) -> bool {
        self.source.is_owned()
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Start playback with a fresh graph
    ///
    /// Must be called from a user-initiated event on platforms with an
    /// autoplay policy. Any existing graph is torn down first, so repeated
    /// calls never leave more than one graph owned by the controller.
    ///
    /// Returns false and records `audio_error` if no context could be
    /// acquired.
    pub fn start(&self) -> bool {
        self.try_start().is_ok()
    }

    /// `start` returning the failure itself
    ///
    /// The error is recorded in `audio_error` as well.
    pub fn try_start(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        debug!("[AMBIENCE] Start requested in state {}", inner.state);
        inner.state = PlaybackState::Starting;

        let ctx = match self.acquire_context(&mut inner) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Failed to start ambience: {}", e);
                inner.state = PlaybackState::Errored;
                inner.audio_error = Some(e.to_string());
                return Err(e);
            }
        };

        // Tear down both the live and the fading graph before building anew;
        // a pending release then finds its graph already gone
        let previous = inner.graph.take().into_iter().chain(inner.fading.take());
        for old in previous {
            debug!("[AMBIENCE] Replacing graph {}", old.id);
            old.stop_source();
            ctx.disconnect(old.id);
        }

        inner.next_generation += 1;
        let id = GraphId(inner.next_generation);
        let graph = self.generator.generate(
            id,
            ctx.sample_rate(),
            ctx.current_time(),
            &mut inner.rng,
        );
        let graph: SharedGraph = Arc::new(Mutex::new(graph));

        if let Err(e) = ctx.connect(graph.clone()) {
            warn!("Failed to connect ambience graph: {}", e);
            inner.state = PlaybackState::Errored;
            inner.audio_error = Some(e.to_string());
            return Err(e);
        }
        lock(&graph).source.start();

        inner.graph = Some(ActiveGraph { id, graph });
        inner.state = PlaybackState::Playing;
        inner.audio_error = None;
        debug!("[AMBIENCE] Graph {} playing", id);
        Ok(())
    }

    /// Fade out and release the current graph
    ///
    /// Reports "not playing" at once; the nodes are released after the
    /// configured release delay. Without a graph this is a no-op.
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);

        let Some(active) = inner.graph.take() else {
            if matches!(inner.state, PlaybackState::Playing | PlaybackState::Starting) {
                inner.state = PlaybackState::Idle;
            }
            return;
        };

        let open_context = inner
            .context
            .clone()
            .filter(|ctx| ctx.state() != ContextState::Closed);

        let Some(ctx) = open_context else {
            // Nothing left to fade through
            debug!("[AMBIENCE] Context closed, releasing graph {} now", active.id);
            active.stop_source();
            if let Some(ctx) = &inner.context {
                ctx.disconnect(active.id);
            }
            inner.state = PlaybackState::Idle;
            return;
        };

        let config = self.generator.config();
        let now = ctx.current_time();
        {
            let mut graph = lock(&active.graph);
            let current = graph.gain.gain.value_at(now);
            graph.gain.gain.cancel_scheduled_values(now);
            graph.gain.gain.set_value_at_time(current, now);
            graph
                .gain
                .gain
                .linear_ramp_to_value_at_time(0.0, now + config.fade_out_secs as f64);
        }

        inner.state = PlaybackState::FadingOut;
        inner.fading = Some(active.clone());
        debug!(
            "[AMBIENCE] Fading out graph {} at {:.3}s",
            active.id, now
        );

        let delay = seconds(config.release_delay_secs);
        let controller = Arc::downgrade(&self.inner);
        let context = Arc::downgrade(&ctx);
        ctx.schedule(
            delay,
            Box::new(move || release_faded(active, context, controller)),
        );
    }

    /// Set the gain of the live graph, clamped to [0, 1]
    ///
    /// Cancels any fade in progress. No-op while idle or fading out.
    /// Returns the value that was applied.
    pub fn set_volume(&self, volume: f32) -> f32 {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };

        let inner = lock(&self.inner);
        if let Some(active) = &inner.graph {
            lock(&active.graph).gain.gain.set_value(volume);
        }
        volume
    }

    /// Immediate stop, then close the context if this controller owns it
    ///
    /// Safe to call more than once. Close failures are ignored.
    pub fn teardown(&self) {
        let mut inner = lock(&self.inner);

        if let Some(active) = inner.graph.take() {
            active.stop_source();
            if let Some(ctx) = &inner.context {
                ctx.disconnect(active.id);
            }
        }
        // A fading graph finishes its fade; its release is already scheduled
        inner.state = PlaybackState::Idle;

        let Some(ctx) = inner.context.take() else {
            return;
        };
        if self.source.is_owned() && ctx.state() != ContextState::Closed {
            match ctx.close() {
                Ok(()) => debug!("[AMBIENCE] Closed owned context"),
                Err(e) => debug!("Ignoring context close failure: {}", e),
            }
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        lock(&self.inner).state
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    pub fn audio_error(&self) -> Option<String> {
        lock(&self.inner).audio_error.clone()
    }

    /// Id of the graph the controller currently owns
    pub fn live_graph(&self) -> Option<GraphId> {
        lock(&self.inner).graph.as_ref().map(|g| g.id)
    }

    /// Gain of the owned graph at the context's current time
    pub fn current_gain(&self) -> Option<f32> {
        let inner = lock(&self.inner);
        let active = inner.graph.as_ref()?;
        let now = inner.context.as_ref()?.current_time();
        let gain = lock(&active.graph).gain.gain.value_at(now);
        Some(gain)
    }

    /// The context in use, once acquired
    pub fn context(&self) -> Option<Arc<dyn AudioContext>> {
        lock(&self.inner).context.clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        let inner = lock(&self.inner);
        PlaybackStatus {
            state: inner.state,
            is_playing: inner.state.is_playing(),
            audio_error: inner.audio_error.clone(),
            graph: inner.graph.as_ref().map(|g| g.id),
        }
    }

    // ========================================================================
    // Context acquisition
    // ========================================================================

    fn acquire_context(&self, inner: &mut ControllerInner) -> Result<Arc<dyn AudioContext>> {
        match &self.source {
            ContextSource::Borrowed(ctx) => {
                inner.context = Some(ctx.clone());
                resume_if_suspended(ctx.as_ref())?;
                Ok(ctx.clone())
            }
            ContextSource::Owned(factory) => {
                if let Some(ctx) = inner.context.clone() {
                    if ctx.state() != ContextState::Closed {
                        resume_if_suspended(ctx.as_ref())?;
                        return Ok(ctx);
                    }
                    debug!("[AMBIENCE] Owned context was closed, creating a new one");
                    inner.context = None;
                }

                let ctx = factory.create()?;
                info!("Created audio context at {} Hz", ctx.sample_rate());
                inner.context = Some(ctx.clone());
                resume_if_suspended(ctx.as_ref())?;
                Ok(ctx)
            }
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn resume_if_suspended(ctx: &dyn AudioContext) -> Result<()> {
    if ctx.state() == ContextState::Suspended {
        ctx.resume()?;
    }
    Ok(())
}

fn seconds(secs: f32) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0) as f64).unwrap_or(Duration::ZERO)
}

/// Deferred release of a faded graph
///
/// Only touches the graph it was scheduled for. The controller moves to
/// idle only if that graph is still the one fading.
fn release_faded(
    active: ActiveGraph,
    context: Weak<dyn AudioContext>,
    controller: Weak<Mutex<ControllerInner>>,
) {
    active.stop_source();
    if let Some(ctx) = context.upgrade() {
        ctx.disconnect(active.id);
    }

    if let Some(inner) = controller.upgrade() {
        let mut inner = lock(&inner);
        if inner.fading.as_ref().map(|g| g.id) == Some(active.id) {
            inner.fading = None;
            if inner.state == PlaybackState::FadingOut {
                inner.state = PlaybackState::Idle;
            }
        }
    }
    debug!("[AMBIENCE] Released graph {}", active.id);
}
