//! Playback state
//!
//! States of the ambience controller and the snapshot it reports to
//! observers.

use std::fmt;

use serde::Serialize;

use crate::engine::GraphId;

/// Playback states of the ambience controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing playing (initial, and after a completed stop)
    #[default]
    Idle,
    /// Acquiring the context and building a graph
    Starting,
    /// A graph is connected and audible
    Playing,
    /// Stop requested; the graph is fading and awaits release
    FadingOut,
    /// The last start failed; cleared by the next start
    Errored,
}

impl PlaybackState {
    /// Whether the controller reports itself as playing
    ///
    /// A fading graph is still audible but already counts as stopped, so
    /// callers never wait on the fade to update their UI.
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Starting => write!(f, "Starting"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::FadingOut => write!(f, "FadingOut"),
            PlaybackState::Errored => write!(f, "Errored"),
        }
    }
}

/// What an observer sees of the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub audio_error: Option<String>,
    /// Graph owned by the controller, if any
    pub graph: Option<GraphId>,
}
