use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::debug;

use super::controller::GuildMessage;
use crate::error::PlaybackError;

/// Opens voice sessions. One session per guild at a time.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, PlaybackError>;
}

/// A live voice connection for one guild.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    /// Starts streaming `stream_url`, replacing whatever was playing.
    ///
    /// The transport must call `on_complete` once the track ends, is stopped,
    /// or fails, passing the failure reason in the last case.
    async fn play(&self, stream_url: &str, on_complete: CompletionHook) -> Result<(), PlaybackError>;
    async fn pause(&self) -> Result<(), PlaybackError>;
    async fn resume(&self) -> Result<(), PlaybackError>;
    /// Stops the current track. Its completion hook fires as a normal end.
    async fn stop(&self);
    async fn disconnect(&self) -> Result<(), PlaybackError>;
    async fn is_playing(&self) -> bool;
    async fn is_paused(&self) -> bool;
    async fn is_connected(&self) -> bool;
}

/// Hands a track's completion back to the guild's playback loop.
///
/// Safe to call from any thread; the send never blocks. Clones share one
/// delivery, so only the first `complete` per playback start reaches the loop.
#[derive(Clone)]
pub struct CompletionHook {
    tx: flume::Sender<GuildMessage>,
    generation: u64,
    fired: Arc<AtomicBool>,
}

impl CompletionHook {
    pub(crate) fn new(tx: flume::Sender<GuildMessage>, generation: u64) -> Self {
        Self {
            tx,
            generation,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn complete(&self, error: Option<String>) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }

        let message = GuildMessage::TrackEnded {
            generation: self.generation,
            error,
        };
        if self.tx.send(message).is_err() {
            debug!("Playback loop gone, dropping completion {}", self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_completion_is_delivered() {
        let (tx, rx) = flume::unbounded();
        let hook = CompletionHook::new(tx, 3);
        let clone = hook.clone();

        hook.complete(Some("decoder died".into()));
        clone.complete(None);

        let delivered: Vec<_> = rx.drain().collect();
        assert_eq!(delivered.len(), 1);
        match &delivered[0] {
            GuildMessage::TrackEnded { generation, error } => {
                assert_eq!(*generation, 3);
                assert_eq!(error.as_deref(), Some("decoder died"));
            }
            _ => panic!("unexpected message"),
        }
    }

    #[test]
    fn completing_after_loop_exit_is_harmless() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        CompletionHook::new(tx, 1).complete(None);
    }
}
