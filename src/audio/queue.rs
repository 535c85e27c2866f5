use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::collections::VecDeque;
use tracing::debug;

/// A pending play request. The URL stays opaque until it is resolved at play time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub url: String,
}

impl TrackRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<&str> for TrackRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// Pending tracks per guild.
///
/// A guild with no entry behaves exactly like a guild with an empty queue;
/// entries are created on first write. Each guild's controller loop is the
/// only writer for that guild apart from direct `enqueue` calls, so the map's
/// shard locks are the only synchronisation needed.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GuildId, VecDeque<TrackRequest>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track to the end of the guild's queue.
    pub fn enqueue(&self, guild_id: GuildId, request: TrackRequest) {
        debug!("➕ Queued {} for guild {}", request.url, guild_id);
        self.queues.entry(guild_id).or_default().push_back(request);
    }

    /// Removes and returns the oldest pending track (FIFO).
    pub fn dequeue_front(&self, guild_id: GuildId) -> Option<TrackRequest> {
        let next = self.queues.get_mut(&guild_id)?.pop_front();
        if let Some(ref request) = next {
            debug!("➡️ Next for guild {}: {}", guild_id, request.url);
        }
        next
    }

    /// Puts a track ahead of everything already queued.
    ///
    /// Used for retrying a failed track and for restarting the current one.
    pub fn requeue_front(&self, guild_id: GuildId, request: TrackRequest) {
        debug!("↩️ Requeued {} at the front for guild {}", request.url, guild_id);
        self.queues.entry(guild_id).or_default().push_front(request);
    }

    pub fn clear(&self, guild_id: GuildId) {
        if let Some(mut queue) = self.queues.get_mut(&guild_id) {
            queue.clear();
        }
        debug!("🗑️ Cleared queue for guild {}", guild_id);
    }

    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        self.queues
            .get(&guild_id)
            .map_or(true, |queue| queue.is_empty())
    }

    pub fn len(&self, guild_id: GuildId) -> usize {
        self.queues.get(&guild_id).map_or(0, |queue| queue.len())
    }

    /// Copy of the pending tracks in play order.
    pub fn snapshot(&self, guild_id: GuildId) -> Vec<TrackRequest> {
        self.queues
            .get(&guild_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }
}
