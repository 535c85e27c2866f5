use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

fn all_commands() -> Vec<CreateCommand> {
    vec![play_command(), queue_command()]
}

/// Registers global commands
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registers commands for a single guild (development)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play audio from a video link")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "url", "Video link")
                .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show what is playing and what is queued")
}
