mod input;
mod render;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use inbox_db::Database;
use inbox_session::{IdentityMode, SessionConfig, ensure_seeded};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::input::Input;
use crate::render::Presenter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inbox=debug,inbox_session=debug,inbox_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config
    let db_path: PathBuf = std::env::var("INBOX_DB_PATH")
        .unwrap_or_else(|_| "inbox.db".into())
        .into();
    let config = SessionConfig {
        message_interval: Duration::from_secs(env_or("INBOX_MESSAGE_INTERVAL_SECS", 20)?),
        banner_visible: Duration::from_secs(env_or("INBOX_BANNER_SECS", 5)?),
        search_debounce: Duration::from_millis(env_or("INBOX_SEARCH_DEBOUNCE_MS", 300)?),
        label_refresh: Duration::from_secs(env_or("INBOX_LABEL_REFRESH_SECS", 60)?),
        highlight_cache_capacity: env_or("INBOX_HIGHLIGHT_CACHE", 100)?,
        identity: env_or("INBOX_IDENTITY", IdentityMode::Tuple)?,
        simulate: true,
    };
    anyhow::ensure!(
        !config.message_interval.is_zero(),
        "INBOX_MESSAGE_INTERVAL_SECS must be positive"
    );
    anyhow::ensure!(
        !config.label_refresh.is_zero(),
        "INBOX_LABEL_REFRESH_SECS must be positive"
    );

    // Init database
    let db = Arc::new(Database::open(&db_path)?);
    ensure_seeded(&db, chrono::Local::now())?;

    info!(
        "Inbox on {} (new message every {:?}, identity {:?})",
        db_path.display(),
        config.message_interval,
        config.identity
    );

    let (handle, mut events, task) = inbox_session::spawn(db, config);
    handle.activate();

    let mut presenter = Presenter::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", input::HELP);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(event) = events.recv() => {
                if let Some(text) = presenter.handle(event) {
                    println!("{}", text);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("stdin closed");
                    break;
                };
                let input = match input::parse(&line) {
                    Ok(input) => input,
                    Err(msg) => {
                        println!("{}", msg);
                        continue;
                    }
                };
                match input {
                    Input::Quit => break,
                    Input::Help => println!("{}", input::HELP),
                    Input::Print => print!("{}", presenter.list()),
                    Input::ShowRemark(user) => match handle.remark(user.as_str()).await {
                        Some(remark) => println!("{} is shown as '{}'", user, remark),
                        None => println!("no remark for {}", user),
                    },
                    Input::Open(index) if index >= presenter.rows().len() => {
                        println!("no row {}", index);
                    }
                    other => {
                        if let Some(command) = other.into_command() {
                            handle.send(command);
                        }
                    }
                }
            }
        }
    }

    handle.shutdown();
    if let Err(e) = task.await {
        warn!("Session task ended abnormally: {}", e);
    }
    Ok(())
}

/// Parse an env var, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}='{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
