//! Per-guild playback state machine.
//!
//! Every guild gets its own loop task. Commands from the UI and completions
//! from the voice transport arrive as messages on one channel, so a guild
//! never has two advances in flight. Idle timers post a message back instead
//! of being cancelled; a timer that wakes into a changed state is ignored.

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::{
    notice::{Notice, Notifier},
    queue::{QueueStore, TrackRequest},
    transport::{CompletionHook, VoiceSession, VoiceTransport},
};
use crate::{
    error::PlaybackError,
    sources::{ResolutionError, ResolvedTrack, Resolver},
};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolution runs inside the guild loop; past this the request is failed so
/// queued commands get through.
pub const RESOLVE_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No track and no session.
    Idle,
    Playing,
    Paused,
    /// A track ended with nothing queued; the idle window is running.
    Draining,
}

#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub url: String,
    /// The requester's current voice channel, if any.
    pub voice_channel: Option<ChannelId>,
    /// Where follow-up notices for this guild are posted.
    pub text_channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    Started(ResolvedTrack),
    Queued { position: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub state: PlayerState,
    pub current: Option<ResolvedTrack>,
    pub pending: usize,
}

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum GuildMessage {
    Play(PlayRequest, Reply<Result<PlayOutcome, PlaybackError>>),
    Pause(Reply<Result<bool, PlaybackError>>),
    Resume(Reply<Result<bool, PlaybackError>>),
    Skip(Reply<Result<bool, PlaybackError>>),
    Restart(Reply<Result<bool, PlaybackError>>),
    Stop(Reply<()>),
    Status(Reply<PlayerStatus>),
    SessionLost,
    TrackEnded { generation: u64, error: Option<String> },
    IdleElapsed { epoch: u64 },
}

struct Collaborators {
    store: Arc<QueueStore>,
    resolver: Arc<dyn Resolver>,
    transport: Arc<dyn VoiceTransport>,
    notifier: Arc<dyn Notifier>,
    idle_timeout: Duration,
}

/// Owns one playback loop per guild and hands out handles to them.
pub struct PlaybackController {
    deps: Arc<Collaborators>,
    players: DashMap<GuildId, GuildHandle>,
}

impl PlaybackController {
    pub fn new(
        store: Arc<QueueStore>,
        resolver: Arc<dyn Resolver>,
        transport: Arc<dyn VoiceTransport>,
        notifier: Arc<dyn Notifier>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            deps: Arc::new(Collaborators {
                store,
                resolver,
                transport,
                notifier,
                idle_timeout,
            }),
            players: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.deps.store
    }

    /// Handle for the guild's loop, starting the loop on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle(&self, guild_id: GuildId) -> GuildHandle {
        self.players
            .entry(guild_id)
            .or_insert_with(|| GuildPlayer::spawn(guild_id, self.deps.clone()))
            .clone()
    }

    /// Handle for the guild's loop if one was ever started.
    pub fn existing(&self, guild_id: GuildId) -> Option<GuildHandle> {
        self.players.get(&guild_id).map(|handle| handle.clone())
    }
}

/// Cheap, cloneable front for one guild's playback loop.
#[derive(Clone)]
pub struct GuildHandle {
    guild_id: GuildId,
    tx: flume::Sender<GuildMessage>,
}

impl GuildHandle {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(Reply<T>) -> GuildMessage,
    ) -> Result<T, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send_async(message(reply))
            .await
            .map_err(|_| PlaybackError::ControllerGone(self.guild_id))?;
        response
            .await
            .map_err(|_| PlaybackError::ControllerGone(self.guild_id))
    }

    /// Plays `request.url` now if nothing is active, otherwise queues it.
    pub async fn play(&self, request: PlayRequest) -> Result<PlayOutcome, PlaybackError> {
        self.request(|reply| GuildMessage::Play(request, reply)).await?
    }

    /// Returns whether anything changed.
    pub async fn pause(&self) -> Result<bool, PlaybackError> {
        self.request(GuildMessage::Pause).await?
    }

    pub async fn resume(&self) -> Result<bool, PlaybackError> {
        self.request(GuildMessage::Resume).await?
    }

    pub async fn skip(&self) -> Result<bool, PlaybackError> {
        self.request(GuildMessage::Skip).await?
    }

    /// Plays the current track again from the start, ahead of the queue.
    pub async fn restart(&self) -> Result<bool, PlaybackError> {
        self.request(GuildMessage::Restart).await?
    }

    /// Stops playback, clears the queue and leaves voice.
    pub async fn stop(&self) -> Result<(), PlaybackError> {
        self.request(GuildMessage::Stop).await
    }

    pub async fn status(&self) -> Result<PlayerStatus, PlaybackError> {
        self.request(GuildMessage::Status).await
    }

    /// Tells the loop the voice connection was closed from outside.
    pub fn session_lost(&self) {
        let _ = self.tx.send(GuildMessage::SessionLost);
    }
}

struct NowPlaying {
    request: TrackRequest,
    track: ResolvedTrack,
}

struct GuildPlayer {
    guild_id: GuildId,
    deps: Arc<Collaborators>,
    tx: flume::Sender<GuildMessage>,
    state: PlayerState,
    session: Option<Arc<dyn VoiceSession>>,
    current: Option<NowPlaying>,
    // Bumped on every start; completions carrying an older value are stale
    generation: u64,
    // Bumped on every idle window; timers carrying an older value are stale
    drain_epoch: u64,
    text_channel: Option<ChannelId>,
}

impl GuildPlayer {
    fn spawn(guild_id: GuildId, deps: Arc<Collaborators>) -> GuildHandle {
        let (tx, rx) = flume::unbounded();
        let player = Self {
            guild_id,
            deps,
            tx: tx.clone(),
            state: PlayerState::Idle,
            session: None,
            current: None,
            generation: 0,
            drain_epoch: 0,
            text_channel: None,
        };

        tokio::spawn(player.run(rx));
        debug!("Started playback loop for guild {}", guild_id);

        GuildHandle { guild_id, tx }
    }

    async fn run(mut self, rx: flume::Receiver<GuildMessage>) {
        while let Ok(message) = rx.recv_async().await {
            self.dispatch(message).await;
        }
    }

    async fn dispatch(&mut self, message: GuildMessage) {
        match message {
            GuildMessage::Play(request, reply) => {
                let _ = reply.send(self.play(request).await);
            }
            GuildMessage::Pause(reply) => {
                let _ = reply.send(self.pause().await);
            }
            GuildMessage::Resume(reply) => {
                let _ = reply.send(self.resume().await);
            }
            GuildMessage::Skip(reply) => {
                let _ = reply.send(self.skip().await);
            }
            GuildMessage::Restart(reply) => {
                let _ = reply.send(self.restart().await);
            }
            GuildMessage::Stop(reply) => {
                self.stop().await;
                let _ = reply.send(());
            }
            GuildMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            GuildMessage::SessionLost => self.session_lost().await,
            GuildMessage::TrackEnded { generation, error } => {
                self.track_ended(generation, error).await
            }
            GuildMessage::IdleElapsed { epoch } => self.idle_elapsed(epoch).await,
        }
    }

    async fn play(&mut self, request: PlayRequest) -> Result<PlayOutcome, PlaybackError> {
        let Some(voice_channel) = request.voice_channel else {
            return Err(PlaybackError::NoVoiceChannel(
                "requester is not in a voice channel".to_string(),
            ));
        };
        self.text_channel = Some(request.text_channel);

        match self.state {
            PlayerState::Playing | PlayerState::Paused => {
                self.deps
                    .store
                    .enqueue(self.guild_id, TrackRequest::new(request.url));
                let position = self.deps.store.len(self.guild_id);
                info!("📋 Queued at position {} in guild {}", position, self.guild_id);
                Ok(PlayOutcome::Queued { position })
            }
            PlayerState::Idle | PlayerState::Draining => {
                match self
                    .start(TrackRequest::new(request.url), Some(voice_channel))
                    .await
                {
                    Ok(track) => Ok(PlayOutcome::Started(track)),
                    Err(e) => {
                        warn!("❌ Could not start playback in guild {}: {}", self.guild_id, e);
                        // A pending idle window keeps its own session
                        if self.state == PlayerState::Idle {
                            self.teardown().await;
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Resolves and starts `request`. On error the state is left unchanged.
    async fn start(
        &mut self,
        request: TrackRequest,
        voice_channel: Option<ChannelId>,
    ) -> Result<ResolvedTrack, PlaybackError> {
        let track =
            match tokio::time::timeout(RESOLVE_DEADLINE, self.deps.resolver.resolve(&request.url))
                .await
            {
                Ok(resolved) => resolved?,
                Err(_) => {
                    return Err(ResolutionError::Timeout {
                        url: request.url.clone(),
                        after: RESOLVE_DEADLINE,
                    }
                    .into())
                }
            };
        let session = self.ensure_session(voice_channel).await?;

        self.generation += 1;
        let hook = CompletionHook::new(self.tx.clone(), self.generation);
        session.play(&track.stream_url, hook).await?;

        info!("🎵 Now playing in guild {}: {}", self.guild_id, track.title);
        self.state = PlayerState::Playing;
        self.current = Some(NowPlaying {
            request,
            track: track.clone(),
        });
        Ok(track)
    }

    async fn ensure_session(
        &mut self,
        voice_channel: Option<ChannelId>,
    ) -> Result<Arc<dyn VoiceSession>, PlaybackError> {
        if let Some(session) = &self.session {
            if session.is_connected().await {
                return Ok(session.clone());
            }
        }

        let channel_id = voice_channel.ok_or_else(|| {
            PlaybackError::NoVoiceChannel("voice connection lost".to_string())
        })?;
        let session = self.deps.transport.connect(self.guild_id, channel_id).await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn pause(&mut self) -> Result<bool, PlaybackError> {
        if self.state != PlayerState::Playing {
            return Ok(false);
        }
        let Some(session) = self.session.clone() else {
            return Ok(false);
        };
        // The track may have ended with its completion still in the channel
        if !session.is_playing().await {
            return Ok(false);
        }

        session.pause().await?;
        self.state = PlayerState::Paused;
        info!("⏸️ Paused in guild {}", self.guild_id);
        Ok(true)
    }

    async fn resume(&mut self) -> Result<bool, PlaybackError> {
        if self.state != PlayerState::Paused {
            return Ok(false);
        }
        let Some(session) = self.session.clone() else {
            return Ok(false);
        };
        if !session.is_paused().await {
            return Ok(false);
        }

        session.resume().await?;
        self.state = PlayerState::Playing;
        info!("▶️ Resumed in guild {}", self.guild_id);
        Ok(true)
    }

    /// Stopping the source is enough: its completion drives the advance.
    async fn skip(&mut self) -> Result<bool, PlaybackError> {
        if self.state != PlayerState::Playing {
            return Ok(false);
        }
        let Some(session) = self.session.clone() else {
            return Ok(false);
        };
        if !session.is_playing().await {
            return Ok(false);
        }

        info!("⏭️ Skipping in guild {}", self.guild_id);
        session.stop().await;
        Ok(true)
    }

    async fn restart(&mut self) -> Result<bool, PlaybackError> {
        if !matches!(self.state, PlayerState::Playing | PlayerState::Paused) {
            return Ok(false);
        }
        let (Some(session), Some(current)) = (self.session.clone(), self.current.as_ref()) else {
            return Ok(false);
        };

        info!("🔁 Restarting {} in guild {}", current.track.title, self.guild_id);
        self.deps
            .store
            .requeue_front(self.guild_id, current.request.clone());
        session.stop().await;
        Ok(true)
    }

    async fn stop(&mut self) {
        // The stopped track's completion must not advance anything
        self.generation += 1;
        self.drain_epoch += 1;
        self.deps.store.clear(self.guild_id);
        self.teardown().await;
        info!("⏹️ Stopped and cleared queue in guild {}", self.guild_id);
    }

    fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state,
            current: self.current.as_ref().map(|now| now.track.clone()),
            pending: self.deps.store.len(self.guild_id),
        }
    }

    async fn session_lost(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        // A reconnect may have replaced the session the event was about
        if session.is_connected().await {
            return;
        }

        info!("🔌 Voice connection closed externally in guild {}", self.guild_id);
        self.generation += 1;
        self.drain_epoch += 1;
        self.deps.store.clear(self.guild_id);
        self.session = None;
        self.current = None;
        self.state = PlayerState::Idle;
    }

    async fn track_ended(&mut self, generation: u64, error: Option<String>) {
        if generation != self.generation
            || !matches!(self.state, PlayerState::Playing | PlayerState::Paused)
        {
            debug!(
                "Ignoring stale completion {} (current {}, {:?}) in guild {}",
                generation, self.generation, self.state, self.guild_id
            );
            return;
        }

        let finished = self.current.take();
        if let (Some(reason), Some(finished)) = (error, finished) {
            // No retry cap: a permanently broken stream keeps cycling here
            warn!(
                "⚠️ {} failed mid-stream in guild {}: {}. Retrying",
                finished.request.url, self.guild_id, reason
            );
            self.deps.store.requeue_front(self.guild_id, finished.request);
        }

        self.state = PlayerState::Draining;
        self.advance().await;
    }

    async fn advance(&mut self) {
        let Some(next) = self.deps.store.dequeue_front(self.guild_id) else {
            self.begin_idle_window().await;
            return;
        };

        let url = next.url.clone();
        match self.start(next, None).await {
            Ok(track) => self.announce(Notice::NowPlaying(track)).await,
            Err(e) => {
                error!("❌ Could not play {} in guild {}: {}", url, self.guild_id, e);
                self.announce(Notice::PlaybackFailed {
                    url,
                    reason: e.user_message(),
                })
                .await;
                self.teardown().await;
            }
        }
    }

    async fn begin_idle_window(&mut self) {
        self.state = PlayerState::Draining;
        self.drain_epoch += 1;

        let epoch = self.drain_epoch;
        let timeout = self.deps.idle_timeout;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(GuildMessage::IdleElapsed { epoch });
        });

        info!(
            "📭 Queue empty in guild {}, leaving in {:?} unless something is queued",
            self.guild_id, timeout
        );
        self.announce(Notice::NothingQueued).await;
    }

    async fn idle_elapsed(&mut self, epoch: u64) {
        if self.state != PlayerState::Draining || epoch != self.drain_epoch {
            debug!("Ignoring stale idle timer {} in guild {}", epoch, self.guild_id);
            return;
        }

        if !self.deps.store.is_empty(self.guild_id) {
            self.advance().await;
            return;
        }

        let was_connected = match &self.session {
            Some(session) => session.is_connected().await,
            None => false,
        };
        self.teardown().await;

        if was_connected {
            info!("🚪 Idle timeout reached, left voice in guild {}", self.guild_id);
            self.announce(Notice::IdleDisconnected).await;
        }
    }

    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop().await;
            if let Err(e) = session.disconnect().await {
                warn!("Disconnect failed in guild {}: {}", self.guild_id, e);
            }
        }
        self.current = None;
        self.state = PlayerState::Idle;
    }

    async fn announce(&self, notice: Notice) {
        match self.text_channel {
            Some(channel_id) => {
                self.deps
                    .notifier
                    .notify(self.guild_id, channel_id, notice)
                    .await
            }
            None => debug!("No text channel for guild {}, dropping {:?}", self.guild_id, notice),
        }
    }
}
