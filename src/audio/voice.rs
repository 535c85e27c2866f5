use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::transport::{CompletionHook, VoiceSession, VoiceTransport};
use crate::error::PlaybackError;

/// Songbird-backed voice transport.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, PlaybackError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| PlaybackError::NoVoiceChannel(format!("could not join {channel_id}: {e}")))?;

        {
            let mut handler = call.lock().await;
            if !handler.is_deaf() {
                if let Err(e) = handler.deafen(true).await {
                    debug!("Deafen failed in guild {}: {:?}", guild_id, e);
                }
            }
        }

        info!("🔊 Joined voice channel {} in guild {}", channel_id, guild_id);

        Ok(Arc::new(SongbirdSession {
            guild_id,
            manager: self.manager.clone(),
            call,
            http: self.http.clone(),
            track: Mutex::new(None),
        }))
    }
}

pub struct SongbirdSession {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    track: Mutex<Option<TrackHandle>>,
}

impl SongbirdSession {
    fn current(&self) -> Option<TrackHandle> {
        self.track.lock().clone()
    }

    async fn mode(&self) -> Option<PlayMode> {
        let handle = self.current()?;
        handle.get_info().await.ok().map(|state| state.playing)
    }
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn play(&self, stream_url: &str, on_complete: CompletionHook) -> Result<(), PlaybackError> {
        let input: Input = HttpRequest::new(self.http.clone(), stream_url.to_string()).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.stop();
            call.play_input(input)
        };

        let notifier = TrackEndNotifier {
            guild_id: self.guild_id,
            hook: on_complete,
        };
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| PlaybackError::Transport(format!("could not watch track: {e}")))?;
        }

        *self.track.lock() = Some(handle);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        if let Some(handle) = self.current() {
            handle
                .pause()
                .map_err(|e| PlaybackError::Transport(e.to_string()))?;
        }
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        if let Some(handle) = self.current() {
            handle
                .play()
                .map_err(|e| PlaybackError::Transport(e.to_string()))?;
        }
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.track.lock().take();
        if let Some(handle) = handle {
            // Already-finished tracks refuse control messages
            let _ = handle.stop();
        }
    }

    async fn disconnect(&self) -> Result<(), PlaybackError> {
        self.track.lock().take();
        self.manager
            .remove(self.guild_id)
            .await
            .map_err(|e| PlaybackError::Transport(format!("leave failed: {e}")))?;
        info!("👋 Left voice in guild {}", self.guild_id);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        matches!(self.mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.mode().await, Some(PlayMode::Pause))
    }

    async fn is_connected(&self) -> bool {
        self.call.lock().await.current_connection().is_some()
    }
}

/// Forwards songbird's end/error events for one track into its completion hook.
#[derive(Clone)]
struct TrackEndNotifier {
    guild_id: GuildId,
    hook: CompletionHook,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };

        if let Some(ref reason) = error {
            warn!("❌ Track failed in guild {}: {}", self.guild_id, reason);
        } else {
            debug!("Track ended in guild {}", self.guild_id);
        }

        self.hook.complete(error);
        None
    }
}
