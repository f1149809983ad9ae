use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use warp::Filter;

use jawline::analyzer::gemini::GeminiAnalyzer;
use jawline::auth::{AllowList, SqliteAllowList, StaticAllowList};
use jawline::banner::{BannerInfo, print_banner};
use jawline::config::Secrets;
use jawline::consts::{DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES, default_secrets_path};
use jawline::notify::telegram::TelegramMessenger;
use jawline::notify::{Dispatcher, Messenger};
use jawline::session::Pipeline;
use jawline::web::{self, AppState};

const DEFAULT_LOG_FILTER: &str = "jawline=info,warp=warn";

#[derive(Parser)]
#[command(
    name = "jawline",
    version,
    about = "Rate a side profile photo and deliver the verdict over Telegram."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Secrets file (default: ./secrets.toml, then ~/.jawline/secrets.toml)
    #[arg(short, long)]
    secrets: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Gemini model name
    #[arg(short, long)]
    model: Option<String>,

    /// Read subscribers from this SQLite database instead of `[allowed_users]`
    #[arg(long)]
    allow_list_db: Option<String>,

    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration, print a summary and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let secrets_path = match cli.secrets.clone() {
        Some(path) => path,
        None => default_secrets_path()
            .context("cannot determine home directory; pass --secrets")?,
    };
    let secrets = Secrets::load(&secrets_path)?;

    let (allow_list, allow_label): (Arc<dyn AllowList>, String) = match &cli.allow_list_db {
        Some(db) => (Arc::new(SqliteAllowList::open(db)?), db.clone()),
        None => (
            Arc::new(StaticAllowList::new(secrets.allowed_users.clone())),
            secrets_path.display().to_string(),
        ),
    };

    let analyzer = GeminiAnalyzer::new(cli.model.clone(), secrets.google_api_key.clone())?;
    let model = analyzer.model().to_string();

    let messenger = match &secrets.telegram_bot_token {
        Some(token) => Some(Arc::new(TelegramMessenger::new(token.clone())?) as Arc<dyn Messenger>),
        None => None,
    };
    let dispatcher = Dispatcher::new(messenger, secrets.admin_chat_id.clone());

    let check_only = matches!(cli.command, Some(Command::Check));
    let listen = cli.bind.to_string();
    print_banner(&BannerInfo {
        listen: (!check_only).then_some(listen.as_str()),
        model: &model,
        subscribers: allow_list.len()?,
        allow_list: &allow_label,
        inference: secrets.google_api_key.is_some(),
        notifications: dispatcher.is_enabled(),
        admin_copy: dispatcher.is_enabled() && dispatcher.admin_chat().is_some(),
        max_upload_bytes: cli.max_upload_bytes,
    });

    if check_only {
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let pipeline = Pipeline::new(Arc::new(analyzer), dispatcher);
    let state = Arc::new(AppState::new(
        allow_list,
        pipeline,
        shutdown.clone(),
        cli.max_upload_bytes,
    )?);
    let routes = web::routes(state).with(warp::trace::request());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, shutting down");
                signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl+C"),
        }
    });

    let stop = shutdown.clone();
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(cli.bind, async move { stop.cancelled().await })
        .with_context(|| format!("failed to bind {}", cli.bind))?;

    tracing::info!(%addr, "listening");
    server.await;
    println!("goodbye.");
    Ok(())
}
