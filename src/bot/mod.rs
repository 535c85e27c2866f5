//! # Bot Module
//!
//! Discord front end for queuecast.
//!
//! [`QueuecastBot`] implements Serenity's [`EventHandler`] trait and turns
//! gateway events into calls on the shared [`PlaybackController`]:
//!
//! - `/play` and `/queue` slash commands
//! - Player buttons on the now-playing card
//! - Voice state updates for the bot's own user
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # fn example(controller: Arc<queuecast::audio::controller::PlaybackController>) -> anyhow::Result<()> {
//! use queuecast::{bot::QueuecastBot, config::Config};
//!
//! let config = Config::load()?;
//! let bot = QueuecastBot::new(config, controller);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod handlers;
pub mod notifier;

pub use notifier::DiscordNotifier;

use crate::{audio::controller::PlaybackController, config::Config};

/// Main Discord event handler.
pub struct QueuecastBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Per-guild playback, shared with the notifier side
    controller: Arc<PlaybackController>,
}

impl QueuecastBot {
    pub fn new(config: Config, controller: Arc<PlaybackController>) -> Self {
        Self {
            config: Arc::new(config),
            controller,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// With `GUILD_ID` set, commands go to that guild only and show up almost
    /// immediately. Otherwise they are registered globally, which Discord can
    /// take up to an hour to propagate.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ Bot is not a member of guild {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Guild command registration failed: {:?}", e);
                        anyhow::anyhow!(
                            "Could not register guild commands. Check the 'applications.commands' scope."
                        )
                    })?;
                info!("✅ Guild commands registered for {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Global command registration failed: {:?}", e);
                    anyhow::anyhow!(
                        "Could not register global commands. Check the 'applications.commands' scope."
                    )
                })?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for QueuecastBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Command registration failed: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error handling command: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error handling component: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Reports the bot being kicked or moved out of voice to its guild player.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot left voice in guild {}", guild_id);
        match self.controller.existing(guild_id) {
            Some(player) => player.session_lost(),
            None => debug!("No player for guild {}, nothing to clean up", guild_id),
        }
    }
}
