use std::sync::Arc;

use anyhow::Context;

use connect_hub::bot::{BotDeps, ConnectHubBot, activity_routes, run};
use connect_hub::channels::{ChannelManager, CliChannel, TelegramChannel};
use connect_hub::config::BotConfig;
use connect_hub::recognizers::EnglishDateTimeRecognizer;
use connect_hub::registration::HttpRegistrationClient;
use connect_hub::store::{LibSqlStore, MemoryStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("invalid configuration")?;

    eprintln!("ConnectHub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow: {}", config.flow);
    eprintln!("   Registration API: {}", config.registration_url);
    eprintln!(
        "   Activity endpoint: http://0.0.0.0:{}/api/messages",
        config.http_port
    );

    // ── State store ──────────────────────────────────────────────────────
    let store: Arc<dyn StateStore> = if config.db_path == ":memory:" {
        Arc::new(MemoryStore::new())
    } else {
        let path = std::path::Path::new(&config.db_path);
        Arc::new(
            LibSqlStore::new_local(path)
                .await
                .with_context(|| format!("failed to open database at {}", config.db_path))?,
        )
    };
    eprintln!("   State: {}", config.db_path);

    let deps = BotDeps {
        store,
        dates: Arc::new(EnglishDateTimeRecognizer::new()),
        submitter: Arc::new(HttpRegistrationClient::new(&config.registration_url)),
    };
    let bot = Arc::new(ConnectHubBot::from_config(&config, deps));

    // ── Channels ─────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    channels.add(Box::new(CliChannel::new()));

    if let Some(token) = config.telegram_token.clone() {
        let allowed = &config.telegram_allowed_users;
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if allowed.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                allowed.join(", ")
            }
        );
        channels.add(Box::new(TelegramChannel::new(token, allowed.clone())));
    }

    eprintln!("   Channels: {}", channels.names().join(", "));
    eprintln!("   Type a message and press Enter. Ctrl+C to exit.\n");

    // ── HTTP activity endpoint ───────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.http_port))?;
    let app = activity_routes(Arc::clone(&bot));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Activity endpoint stopped: {e}");
        }
    });
    tracing::info!(port = config.http_port, "Activity endpoint started");

    run(bot, channels).await?;

    Ok(())
}
