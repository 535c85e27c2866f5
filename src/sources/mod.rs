//! Turning a user-supplied URL into something the voice transport can stream.

pub mod ytdlp;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use ytdlp::YtDlpResolver;

/// Failure to turn a source URL into a playable stream.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("could not run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("yt-dlp failed for {url}: {message}")]
    Extractor { url: String, message: String },

    #[error("unreadable yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no audio stream found for {0}")]
    MissingStream(String),

    #[error("gave up resolving {url} after {}s", .after.as_secs())]
    Timeout { url: String, after: Duration },
}

/// Everything needed to play and announce a track.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    /// Direct media URL handed to the transport.
    pub stream_url: String,
    pub title: String,
    /// `None` for live streams and sources that do not report a length.
    pub duration: Option<Duration>,
    /// Page URL shown to users.
    pub canonical_url: String,
    pub id: String,
}

impl ResolvedTrack {
    pub fn thumbnail_url(&self) -> String {
        format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.id)
    }
}

/// Source of stream URLs and metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedTrack, ResolutionError>;
}
