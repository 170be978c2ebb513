//! Activation gate
//!
//! Follows an external `enabled` flag (the focus mode being on or off) and
//! starts or stops the ambience on each change. Dropping the gate stops
//! playback and closes the context if the gate created it.

use std::sync::Arc;

use crate::config::AmbientConfig;
use crate::engine::{AudioContext, ContextSource};
use crate::playback::controller::PlaybackController;
use crate::playback::state::{PlaybackState, PlaybackStatus};

/// Ties ambience playback to an enabled flag
pub struct ActivationGate {
    controller: PlaybackController,
    enabled: bool,
}

impl ActivationGate {
    /// Create a gate and apply the initial flag
    ///
    /// With `enabled` true playback starts right away, so the caller must be
    /// inside a user-initiated event on platforms with an autoplay policy.
    pub fn new(enabled: bool, source: ContextSource, config: AmbientConfig) -> Self {
        Self::with_controller(enabled, PlaybackController::new(source, config))
    }

    /// Gate over a caller-supplied context, or a platform default one
    pub fn with_override(
        enabled: bool,
        context_override: Option<Arc<dyn AudioContext>>,
        config: AmbientConfig,
    ) -> Self {
        let source = match context_override {
            Some(ctx) => ContextSource::borrowed(ctx),
            None => ContextSource::platform_default(),
        };
        Self::new(enabled, source, config)
    }

    /// Gate around an existing controller
    pub fn with_controller(enabled: bool, controller: PlaybackController) -> Self {
        let gate = Self {
            controller,
            enabled,
        };
        gate.apply();
        gate
    }

    /// Update the flag; playback only reacts to actual changes
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.apply();
    }

    fn apply(&self) {
        if self.enabled {
            self.controller.start();
        } else {
            self.controller.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn audio_error(&self) -> Option<String> {
        self.controller.audio_error()
    }

    /// Set the ambience volume, clamped to [0, 1]
    pub fn set_volume(&self, volume: f32) -> f32 {
        self.controller.set_volume(volume)
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.controller.status()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }
}

impl Drop for ActivationGate {
    fn drop(&mut self) {
        self.controller.stop();
        self.controller.teardown();
    }
}
