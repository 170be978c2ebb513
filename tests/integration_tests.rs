//! Integration Tests
//!
//! End-to-end focus-mode sessions driven through the public API on an
//! offline context.

use std::sync::Arc;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use ambience::engine::buffer::{calculate_peak, calculate_rms};
use ambience::engine::{AudioContext, ContextSource, ContextState, GraphId, OfflineContext, OfflineFactory};
use ambience::{ActivationGate, AmbientConfig, NoiseGenerator, PlaybackController, PlaybackState};

const SR: u32 = 8000;

fn offline() -> Arc<OfflineContext> {
    Arc::new(OfflineContext::new(SR))
}

fn gate(enabled: bool, ctx: &Arc<OfflineContext>) -> ActivationGate {
    ActivationGate::with_override(enabled, Some(ctx.clone()), AmbientConfig::default())
}

// === Focus Mode Sessions ===

#[test]
fn test_focus_mode_session() {
    let ctx = offline();
    let mut gate = gate(false, &ctx);
    assert!(!gate.is_playing());
    assert_eq!(gate.audio_error(), None);

    gate.set_enabled(true);
    assert!(gate.is_playing());
    assert_eq!(ctx.connected().len(), 1);

    let audible = ctx.advance(2.0);
    assert!(calculate_rms(&audible) > -80.0);

    gate.set_enabled(false);
    assert!(!gate.is_playing());
    assert_eq!(ctx.connected().len(), 1, "fading graph stays connected");

    ctx.advance(0.7);
    assert!(ctx.connected().is_empty());
    assert_eq!(gate.state(), PlaybackState::Idle);

    let after = ctx.advance(0.5);
    assert_eq!(calculate_peak(&after), f32::NEG_INFINITY);
}

#[test]
fn test_fade_in_starts_silent() {
    let ctx = offline();
    let _gate = gate(true, &ctx);

    let first = ctx.advance(0.05);
    let later = ctx.advance(1.5);
    let tail = &later[later.len() - SR as usize / 2..];

    assert!(calculate_peak(&first) < calculate_peak(tail) - 12.0);
}

#[test]
fn test_fade_out_reaches_silence_before_release() {
    let ctx = offline();
    let mut gate = gate(true, &ctx);
    ctx.advance(2.0);

    gate.set_enabled(false);
    let fade = ctx.advance(0.55);

    // Last 50 ms are past the 0.5 s ramp but before the 0.6 s release
    let after_ramp = &fade[fade.len() - SR as usize / 20..];
    assert_eq!(calculate_peak(after_ramp), f32::NEG_INFINITY);
    assert_eq!(ctx.connected().len(), 1);
}

#[test]
fn test_rapid_toggle_leaves_one_graph() {
    let ctx = offline();
    let mut gate = gate(true, &ctx);
    ctx.advance(0.3);

    gate.set_enabled(false);
    ctx.advance(0.2);
    gate.set_enabled(true);
    assert_eq!(ctx.connected(), vec![GraphId(2)]);
    ctx.advance(0.1);
    assert_eq!(ctx.connected().len(), 1);

    gate.set_enabled(false);
    gate.set_enabled(true);
    assert_eq!(ctx.connected(), vec![GraphId(3)]);

    // Let every stale release timer fire
    ctx.advance(1.5);

    assert!(gate.is_playing());
    assert_eq!(gate.audio_error(), None);
    assert_eq!(ctx.connected(), vec![GraphId(3)]);
    assert_eq!(gate.controller().live_graph(), Some(GraphId(3)));
}

#[test]
fn test_reenable_during_fade_keeps_one_graph_audible() {
    let ctx = offline();
    let mut gate = gate(true, &ctx);
    ctx.advance(1.0);

    gate.set_enabled(false);
    ctx.advance(0.1);
    gate.set_enabled(true);

    // Check every render quantum across the old release window
    for _ in 0..60 {
        ctx.advance(0.0125);
        assert_eq!(ctx.connected().len(), 1);
    }
    assert!(gate.is_playing());
}

#[test]
fn test_double_start_replaces_graph() {
    let ctx = offline();
    let controller = PlaybackController::new(ContextSource::borrowed(ctx.clone()), AmbientConfig::default());

    assert!(controller.start());
    assert!(controller.start());

    assert_eq!(ctx.connected(), vec![GraphId(2)]);
}

// === Volume ===

#[test]
fn test_volume_clamps() {
    let ctx = offline();
    let gate = gate(true, &ctx);

    for (input, expected) in [(-1.0, 0.0), (0.3, 0.3), (1.0, 1.0), (4.0, 1.0)] {
        assert_eq!(gate.set_volume(input), expected);
        assert_relative_eq!(gate.controller().current_gain().unwrap(), expected);
    }
}

#[test]
fn test_volume_without_graph_is_noop() {
    let ctx = offline();
    let gate = gate(false, &ctx);
    assert_eq!(gate.set_volume(0.5), 0.5);
    assert_eq!(gate.controller().current_gain(), None);
}

// === Context Ownership ===

#[test]
fn test_owned_context_lifecycle() {
    let factory = OfflineFactory::new(SR);
    let mut gate = ActivationGate::new(false, ContextSource::owned(factory.clone()), AmbientConfig::default());
    assert!(factory.created().is_empty(), "context is created lazily");

    gate.set_enabled(true);
    gate.set_enabled(false);
    gate.set_enabled(true);
    assert_eq!(factory.created().len(), 1);

    let ctx = factory.latest().unwrap();
    drop(gate);
    assert_eq!(ctx.state(), ContextState::Closed);
}

#[test]
fn test_suspended_context_is_resumed() {
    let ctx = Arc::new(OfflineContext::suspended(SR));
    let gate = gate(true, &ctx);
    assert!(gate.is_playing());
    assert_eq!(ctx.state(), ContextState::Running);
}

#[test]
fn test_resume_failure_reports_error() {
    let ctx = Arc::new(OfflineContext::with_resume_failure(SR, "gesture required"));
    let gate = gate(true, &ctx);

    assert!(!gate.is_playing());
    let err = gate.audio_error().unwrap();
    assert!(err.contains("gesture required"), "{}", err);
    assert!(ctx.connected().is_empty());
}

// === Generator ===

#[test]
fn test_generator_topology_matches_config() {
    let config = AmbientConfig {
        lowpass_hz: 500.0,
        target_gain: 0.2,
        ..Default::default()
    };
    let mut rng = rand::thread_rng();
    let graph = NoiseGenerator::new(config).generate(GraphId(9), 44100, 0.0, &mut rng);
    let topology = graph.topology();

    assert_eq!(topology.buffer_len, 88200);
    assert_eq!(topology.filters[0].frequency, 500.0);
    assert_relative_eq!(graph.gain.gain.value_at(1.5), 0.2);
}
