//! # yt-dlp Resolver
//!
//! Turns a page URL into a direct audio stream by asking the `yt-dlp`
//! executable for its JSON description of the page.
//!
//! ## Invocation
//!
//! - `--no-playlist`: a watch URL inside a playlist resolves to one video
//! - `--dump-json`: metadata only, nothing is downloaded
//! - `-f bestaudio[ext=m4a]/bestaudio/best`
//! - `--socket-timeout 15`: a stalled connection fails instead of hanging
//!
//! The whole run is bounded by [`RESOLVE_TIMEOUT`]; the child is killed when
//! the deadline passes.

use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::{ResolutionError, ResolvedTrack, Resolver};

/// Format selection: prefer m4a so the stream decodes with the AAC/MP4 codecs.
const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// Upper bound for one yt-dlp run, permit wait included.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(25);

const SOCKET_TIMEOUT_SECS: &str = "15";

/// Resolver backed by the `yt-dlp` executable.
pub struct YtDlpResolver {
    program: String,
    // Limits concurrent yt-dlp processes to avoid rate limiting
    permits: Semaphore,
}

/// The subset of `yt-dlp --dump-json` output we use.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    url: Option<String>,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            program: program.into(),
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Checks that the executable starts and reports a version.
    pub async fn verify(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.program).arg("--version").output().await?;
        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn parse_info(source_url: &str, stdout: &str) -> Result<ResolvedTrack, ResolutionError> {
        let info: YtDlpInfo = serde_json::from_str(stdout.trim())?;

        let stream_url = info
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ResolutionError::MissingStream(source_url.to_string()))?;

        Ok(ResolvedTrack {
            stream_url,
            title: info.title.unwrap_or_else(|| "Unknown title".to_string()),
            duration: info
                .duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            canonical_url: info.webpage_url.unwrap_or_else(|| source_url.to_string()),
            id: info.id,
        })
    }
}

fn check_url(url: &str) -> Result<(), ResolutionError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ResolutionError::InvalidUrl(url.to_string())),
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedTrack, ResolutionError> {
        check_url(url)?;

        match tokio::time::timeout(RESOLVE_TIMEOUT, self.run(url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("⏰ yt-dlp timed out after {:?} for {}", RESOLVE_TIMEOUT, url);
                Err(ResolutionError::Timeout {
                    url: url.to_string(),
                    after: RESOLVE_TIMEOUT,
                })
            }
        }
    }
}

impl YtDlpResolver {
    async fn run(&self, url: &str) -> Result<ResolvedTrack, ResolutionError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ResolutionError::Extractor {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        debug!("🔍 Resolving {} with {}", url, self.program);

        // Dropping the output future on timeout must not leave yt-dlp behind
        let output = Command::new(&self.program)
            .args([
                "--no-playlist",
                "--dump-json",
                "--quiet",
                "--no-warnings",
                "--socket-timeout",
                SOCKET_TIMEOUT_SECS,
                "-f",
                AUDIO_FORMAT,
                url,
            ])
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("❌ yt-dlp failed for {}: {}", url, message);
            return Err(ResolutionError::Extractor {
                url: url.to_string(),
                message,
            });
        }

        let track = Self::parse_info(url, &String::from_utf8_lossy(&output.stdout))?;
        info!("🎯 Resolved {} -> {}", url, track.title);
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_dump_json() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "duration": 213,
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "url": "https://rr1.googlevideo.com/videoplayback?id=1",
            "formats": []
        }"#;

        let track = YtDlpResolver::parse_info("https://youtu.be/dQw4w9WgXcQ", json).unwrap();

        assert_eq!(
            track,
            ResolvedTrack {
                stream_url: "https://rr1.googlevideo.com/videoplayback?id=1".into(),
                title: "Never Gonna Give You Up".into(),
                duration: Some(Duration::from_secs(213)),
                canonical_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
                id: "dQw4w9WgXcQ".into(),
            }
        );
    }

    #[test]
    fn live_streams_have_no_duration() {
        let json = r#"{"id": "live1", "title": "Radio", "duration": null,
                       "webpage_url": "https://www.youtube.com/watch?v=live1",
                       "url": "https://cdn.example/live.m3u8"}"#;
        let track = YtDlpResolver::parse_info("https://www.youtube.com/watch?v=live1", json).unwrap();
        assert_eq!(track.duration, None);
    }

    #[test]
    fn missing_fields_fall_back_to_source() {
        let json = r#"{"id": "abc", "url": "https://cdn.example/a.m4a"}"#;
        let track = YtDlpResolver::parse_info("https://example.com/a", json).unwrap();
        assert_eq!(track.title, "Unknown title");
        assert_eq!(track.canonical_url, "https://example.com/a");
    }

    #[test]
    fn missing_stream_url_is_an_error() {
        let json = r#"{"id": "abc", "title": "No formats"}"#;
        let err = YtDlpResolver::parse_info("https://example.com/a", json).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingStream(_)));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        let err = YtDlpResolver::parse_info("https://example.com/a", "ERROR: nope").unwrap_err();
        assert!(matches!(err, ResolutionError::Parse(_)));
    }

    #[test]
    fn only_web_urls_are_accepted() {
        assert!(check_url("https://www.youtube.com/watch?v=x").is_ok());
        assert!(check_url("http://example.com/a.mp3").is_ok());
        assert!(matches!(
            check_url("never gonna give you up"),
            Err(ResolutionError::InvalidUrl(_))
        ));
        assert!(matches!(
            check_url("file:///etc/passwd"),
            Err(ResolutionError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn rejects_bad_url_without_spawning() {
        let resolver = YtDlpResolver::new("/nonexistent/yt-dlp", 1);
        let err = resolver.resolve("not a url").await.unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidUrl(_)));
    }
}
