use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use clipreel_core::{
    BotConfig, Dispatcher, FfmpegRenderer, StagingArea, format_bytes,
    config::{DEFAULT_MAX_CLIPS, DEFAULT_MAX_FILE_SIZE, DEFAULT_READING_SPEED, TOKEN_ENV_VAR},
};
use dotenv::dotenv;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    poller::UpdatePoller,
    telegram::{TelegramApi, TelegramTransport},
};

mod lanes;
mod poller;
mod telegram;

#[derive(Parser)]
#[command(name = "clipreel")]
#[command(about = "Telegram bot that stitches captioned clips into a single video")]
struct Cli {
    /// Bot API token from @BotFather
    #[arg(long, env = TOKEN_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    /// Largest clip accepted, in bytes
    #[arg(long, env = "CLIPREEL_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Most clips a single reel may hold
    #[arg(long, env = "CLIPREEL_MAX_CLIPS", default_value_t = DEFAULT_MAX_CLIPS)]
    max_clips: usize,

    /// Caption characters a viewer reads per second
    #[arg(long, env = "CLIPREEL_READING_SPEED", default_value_t = DEFAULT_READING_SPEED)]
    reading_speed: f64,

    /// Where downloads and renders are staged. Defaults to the user cache dir.
    #[arg(long, env = "CLIPREEL_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Font used for captions. Defaults to the ffmpeg/fontconfig default.
    #[arg(long, env = "CLIPREEL_FONT_FILE")]
    font_file: Option<PathBuf>,

    /// Bot API server, for self-hosted instances
    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    api_url: String,

    /// Long-poll timeout in seconds
    #[arg(long, env = "CLIPREEL_POLL_TIMEOUT", default_value_t = 30)]
    poll_timeout: u64,
}

impl Cli {
    fn into_config(self) -> Result<BotConfig> {
        let config = BotConfig::new(self.token)?
            .with_max_clips(self.max_clips)
            .with_max_file_size(self.max_file_size)
            .with_reading_speed(self.reading_speed)
            .with_font_file(self.font_file)
            .with_staging_dir(self.staging_dir);
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let api_url = cli.api_url.clone();
    let poll_timeout = cli.poll_timeout;
    let config = cli.into_config()?;

    let api = Arc::new(TelegramApi::new(&api_url, &config.token));
    let me = api.get_me().await.context("bot token rejected by the Bot API")?;
    info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        max_clips = config.limits.max_clips,
        max_file_size = %format_bytes(config.limits.max_file_size),
        "bot connected"
    );
    api.delete_webhook()
        .await
        .context("failed to switch the bot to polling")?;

    if let Err(e) = FfmpegRenderer::check_available().await {
        warn!(error = %e, "ffmpeg is not usable, renders will fail");
    }

    let staging = StagingArea::new(&config.staging_dir);
    staging
        .ensure()
        .await
        .with_context(|| format!("cannot create {}", config.staging_dir.display()))?;
    info!(dir = %staging.root().display(), "staging clips");

    let transport = Arc::new(TelegramTransport::new(Arc::clone(&api)));
    let renderer = Arc::new(FfmpegRenderer::new(config.render.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        config.limits.clone(),
        staging,
        transport,
        renderer,
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
        }
        let _ = shutdown_tx.send(());
    });

    UpdatePoller::new(api, dispatcher, poll_timeout)
        .run(shutdown_rx)
        .await?;
    info!("bye");
    Ok(())
}
