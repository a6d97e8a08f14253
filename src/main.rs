//! Subreddit Relay — Binary Entrypoint
//! Wires config, the Reddit source, the Discord notifier, and signal-driven
//! shutdown around the relay loop.

use anyhow::Result;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subreddit_relay::{Config, DiscordNotifier, Ledger, RedditSource, Relay};

/// Console logs, filtered by RUST_LOG, falling back to LOG_LEVEL, then info.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the variables come from the real
    // environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("termination signal received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    let source = RedditSource::new(
        config.reddit_client_id.clone(),
        config.reddit_client_secret.clone(),
        config.reddit_user_agent.clone(),
        config.subreddit.clone(),
    );
    let notifier =
        DiscordNotifier::new(config.webhook_url.clone()).with_shutdown(shutdown_rx.clone());
    let ledger = Ledger::load(&config.ledger_path);

    Relay::new(
        Box::new(source),
        Box::new(notifier),
        ledger,
        config.minimum_score,
        config.sleep_time,
    )
    .run(shutdown_rx)
    .await;

    Ok(())
}
