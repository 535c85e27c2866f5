use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, model::id::ApplicationId, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

use queuecast::audio::{
    controller::PlaybackController, queue::QueueStore, voice::SongbirdTransport,
};
use queuecast::bot::{DiscordNotifier, QueuecastBot};
use queuecast::config::Config;
use queuecast::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("queuecast=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting queuecast v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    let resolver = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.resolver_concurrency,
    ));
    let songbird = Songbird::serenity();
    let http = Arc::new(Http::new(&config.discord_token));

    let controller = Arc::new(PlaybackController::new(
        Arc::new(QueueStore::new()),
        resolver,
        Arc::new(SongbirdTransport::new(songbird.clone())),
        Arc::new(DiscordNotifier::new(http)),
        config.idle_timeout,
    ));

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let handler = QueuecastBot::new(config.clone(), controller);

    let mut client = Client::builder(&config.discord_token, intents)
        .application_id(ApplicationId::new(config.application_id))
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing shards...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    let resolver = YtDlpResolver::new(config.ytdlp_path.clone(), 1);
    let version = resolver.verify().await?;
    println!("OK (yt-dlp {version})");
    Ok(())
}
