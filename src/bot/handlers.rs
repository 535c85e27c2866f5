use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::controller::{PlayOutcome, PlayRequest},
    bot::QueuecastBot,
    ui::{
        buttons::{self, PlayerAction},
        embeds,
    },
};

/// Handles slash commands
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &QueuecastBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Command used outside a server"))?;

    info!(
        "📝 /{} used by {} in guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, guild_id, bot).await?,
        "queue" => handle_queue(ctx, command, guild_id, bot).await?,
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Unknown command")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

/// Handles the player buttons
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &QueuecastBot,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Button used outside a server"))?;

    info!(
        "🔘 {} pressed by {} in guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    let Some(action) = PlayerAction::from_custom_id(&component.data.custom_id) else {
        return reply_ephemeral(ctx, &component, "❌ Unknown action").await;
    };

    let content = match bot.controller.existing(guild_id) {
        None => action.noop_message().to_string(),
        Some(player) => {
            let result = match action {
                PlayerAction::Pause => player.pause().await,
                PlayerAction::Resume => player.resume().await,
                PlayerAction::Skip => player.skip().await,
                PlayerAction::Restart => player.restart().await,
                PlayerAction::Stop => player.stop().await.map(|_| true),
            };
            match result {
                Ok(true) => action.done_message().to_string(),
                Ok(false) => action.noop_message().to_string(),
                Err(e) => {
                    warn!("{:?} failed in guild {}: {}", action, guild_id, e);
                    e.user_message()
                }
            }
        }
    };

    reply_ephemeral(ctx, &component, &content).await
}

async fn reply_ephemeral(ctx: &Context, component: &ComponentInteraction, content: &str) -> Result<()> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_play(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &QueuecastBot,
) -> Result<()> {
    let url = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "url")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("url option missing"))?
        .trim()
        .to_string();

    // Resolving can take a few seconds
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let request = PlayRequest {
        url: url.clone(),
        voice_channel: user_voice_channel(ctx, guild_id, command.user.id),
        text_channel: command.channel_id,
    };

    let response = match bot.controller.handle(guild_id).play(request).await {
        Ok(PlayOutcome::Started(track)) => EditInteractionResponse::new()
            .embed(embeds::create_now_playing_embed(&track))
            .components(buttons::create_player_buttons()),
        Ok(PlayOutcome::Queued { position }) => {
            EditInteractionResponse::new().embed(embeds::create_queued_embed(&url, position))
        }
        Err(e) => {
            warn!("❌ /play {} failed in guild {}: {}", url, guild_id, e);
            EditInteractionResponse::new()
                .embed(embeds::create_error_embed("Playback failed", &e.user_message()))
        }
    };

    command.edit_response(&ctx.http, response).await?;

    Ok(())
}

async fn handle_queue(
    ctx: &Context,
    command: CommandInteraction,
    guild_id: GuildId,
    bot: &QueuecastBot,
) -> Result<()> {
    let current = match bot.controller.existing(guild_id) {
        Some(player) => player.status().await?.current,
        None => None,
    };
    let pending = bot.controller.store().snapshot(guild_id);
    let embed = embeds::create_queue_embed(current.as_ref(), &pending);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
