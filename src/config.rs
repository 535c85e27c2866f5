use anyhow::{Context, Result};
use std::time::Duration;

use crate::audio::controller::DEFAULT_IDLE_TIMEOUT;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Register commands in one guild during development

    // Playback
    pub idle_timeout: Duration,

    // yt-dlp
    pub ytdlp_path: String,
    pub resolver_concurrency: usize,
}

impl Config {
    /// Loads the configuration from the environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            discord_token: lookup("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            application_id: lookup("APPLICATION_ID")
                .context("APPLICATION_ID is not set")?
                .parse()
                .context("APPLICATION_ID must be a number")?,
            guild_id: lookup("GUILD_ID").and_then(|s| s.parse().ok()),

            idle_timeout: match lookup("IDLE_TIMEOUT") {
                Some(value) if !value.trim().is_empty() => humantime::parse_duration(value.trim())
                    .with_context(|| format!("IDLE_TIMEOUT is not a duration: {value}"))?,
                _ => DEFAULT_IDLE_TIMEOUT,
            },

            ytdlp_path: lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
            resolver_concurrency: lookup("RESOLVER_CONCURRENCY")
                .unwrap_or_else(|| "3".to_string())
                .parse()
                .context("RESOLVER_CONCURRENCY must be a number")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Rejects values the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN is empty");
        }

        if self.idle_timeout.is_zero() {
            anyhow::bail!("Idle timeout must be greater than 0");
        }

        if self.resolver_concurrency == 0 {
            anyhow::bail!("Resolver concurrency must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging, without the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Playback: idle timeout {}\n  \
            Resolver: {} ({} concurrent)",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            humantime::format_duration(self.idle_timeout),
            self.ytdlp_path,
            self.resolver_concurrency,
        )
    }
}
