use async_trait::async_trait;
use serenity::{
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tracing::warn;

use crate::{
    audio::notice::{Notice, Notifier},
    ui::{buttons, embeds},
};

/// Posts playback notices to a Discord text channel.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn render(notice: Notice) -> CreateMessage {
    match notice {
        Notice::NowPlaying(track) => CreateMessage::new()
            .embed(embeds::create_now_playing_embed(&track))
            .components(buttons::create_player_buttons()),
        Notice::NothingQueued => CreateMessage::new().embed(embeds::create_info_embed(
            "📭 Queue finished",
            "Add a track with /play or I will leave the voice channel shortly.",
        )),
        Notice::IdleDisconnected => CreateMessage::new()
            .content("📭 Playback finished, left the voice channel."),
        Notice::PlaybackFailed { url, reason } => CreateMessage::new().embed(
            embeds::create_error_embed("Playback failed", &format!("{url}\n{reason}")),
        ),
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, guild_id: GuildId, channel_id: ChannelId, notice: Notice) {
        if let Err(e) = channel_id.send_message(&self.http, render(notice)).await {
            warn!("Could not post notice in guild {}: {:?}", guild_id, e);
        }
    }
}
