use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use crate::sources::ResolvedTrack;

/// Things the playback loop tells users about without being asked.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A queued track started after the previous one ended.
    NowPlaying(ResolvedTrack),
    /// The queue ran dry; the idle window has started.
    NothingQueued,
    /// The idle window passed with nothing queued and the bot left voice.
    IdleDisconnected,
    /// A queued track could not be started; playback stopped.
    PlaybackFailed { url: String, reason: String },
}

/// Delivers [`Notice`]s to the text channel the guild last played from.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, guild_id: GuildId, channel_id: ChannelId, notice: Notice);
}
