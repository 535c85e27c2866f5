//! In-memory transport and notifier for exercising the playback loop.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use super::{
    notice::{Notice, Notifier},
    transport::{CompletionHook, VoiceSession, VoiceTransport},
};
use crate::error::PlaybackError;

#[derive(Default)]
pub struct FakeTransport {
    sessions: Mutex<Vec<Arc<FakeSession>>>,
    refuse: AtomicBool,
}

impl FakeTransport {
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Most recently opened session.
    pub fn session(&self) -> Arc<FakeSession> {
        self.sessions
            .lock()
            .last()
            .cloned()
            .expect("no session was opened")
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, PlaybackError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(PlaybackError::NoVoiceChannel(format!("cannot join {channel_id}")));
        }
        let session = Arc::new(FakeSession::new());
        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

/// Records what it was asked to play. Stopping fires the completion hook,
/// the same way songbird reports a stopped track as ended.
pub struct FakeSession {
    played: Mutex<Vec<String>>,
    hooks: Mutex<Vec<CompletionHook>>,
    paused: AtomicBool,
    // Track ended on the transport side, completion not delivered
    silent: AtomicBool,
    connected: AtomicBool,
    disconnects: AtomicUsize,
}

impl FakeSession {
    fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
            silent: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }

    pub fn hook(&self) -> CompletionHook {
        self.hooks.lock().last().cloned().expect("nothing was played")
    }

    /// Ends the current track as the transport would.
    pub fn finish(&self, error: Option<String>) {
        self.hook().complete(error);
    }

    /// The transport stops reporting playback without firing the hook.
    pub fn go_silent(&self) {
        self.silent.store(true, Ordering::SeqCst);
    }

    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn is_paused_now(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceSession for FakeSession {
    async fn play(&self, stream_url: &str, on_complete: CompletionHook) -> Result<(), PlaybackError> {
        self.played.lock().push(stream_url.to_string());
        self.hooks.lock().push(on_complete);
        self.paused.store(false, Ordering::SeqCst);
        self.silent.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        let hook = self.hooks.lock().last().cloned();
        if let Some(hook) = hook {
            hook.complete(None);
        }
    }

    async fn disconnect(&self) -> Result<(), PlaybackError> {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        !self.is_paused_now()
            && !self.silent.load(Ordering::SeqCst)
            && !self.hooks.lock().is_empty()
    }

    async fn is_paused(&self) -> bool {
        self.is_paused_now() && !self.silent.load(Ordering::SeqCst)
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _guild_id: GuildId, _channel_id: ChannelId, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
