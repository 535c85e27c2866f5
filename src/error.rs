use serenity::model::id::GuildId;
use thiserror::Error;

use crate::sources::ResolutionError;

/// Errors surfaced to whoever asked a guild's player to do something.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The source URL could not be turned into a stream. Never retried.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The requester is not in a voice channel, or the channel could not be joined.
    #[error("no reachable voice channel: {0}")]
    NoVoiceChannel(String),

    /// The voice transport refused to start, pause or stop a track.
    #[error("voice transport error: {0}")]
    Transport(String),

    #[error("playback loop for guild {0} is no longer running")]
    ControllerGone(GuildId),
}

impl PlaybackError {
    /// Short text suitable for showing to the person who issued the command.
    pub fn user_message(&self) -> String {
        match self {
            Self::Resolution(e) => format!("Could not load that track: {e}"),
            Self::NoVoiceChannel(_) => "Join a voice channel first".to_string(),
            Self::Transport(e) => format!("Playback failed: {e}"),
            Self::ControllerGone(_) => "The player for this server stopped, try again".to_string(),
        }
    }
}
