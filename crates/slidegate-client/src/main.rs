//! slidegate: slide-to-confirm remote actuation client.
//!
//! Connects to a controller over WebSocket, shows one slider per door the
//! controller announces, and sends a command when a slider is released past
//! 90 % of its travel.  In the challenge-response profile the controller
//! answers with a challenge that the client solves with the secret key
//! carried in the page URL fragment.
//!
//! # Usage
//!
//! ```text
//! slidegate [OPTIONS]
//!
//! Options:
//!   --url <URL>             Page URL, e.g. https://door.example/alice#<key>
//!   -c, --config <PATH>     TOML settings file
//!   --reconnect-ms <MS>     Delay before reconnecting [default: 2000]
//!   --profile <PROFILE>     direct | challenge-response [default: challenge-response]
//!   --track-length <LEN>    Slider track length [default: 300]
//!   --thumb-length <LEN>    Slider thumb length [default: 60]
//!   -v, --verbose           More logging (repeat for trace)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Flag             |
//! |--------------------------|------------------|
//! | `SLIDEGATE_URL`          | `--url`          |
//! | `SLIDEGATE_CONFIG`       | `--config`       |
//! | `SLIDEGATE_RECONNECT_MS` | `--reconnect-ms` |
//! | `SLIDEGATE_PROFILE`      | `--profile`      |
//!
//! Flags and environment variables take precedence over the settings file,
//! which takes precedence over the built-in defaults.  `RUST_LOG` overrides
//! `--verbose`.  Logs go to stderr; the console surface goes to stdout.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use slidegate_client::application::session::{Session, UiEvent};
use slidegate_client::infrastructure::{
    console::{self, ConsoleRenderer},
    crypto::BoxSolver,
    storage::config::{load_settings, ClientConfig, ProfileName, SettingsFile},
    transport::{websocket::WsConnector, SessionTransport},
};
use slidegate_core::{CommandProtocol, ProtocolProfile};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Slide-to-confirm remote actuation client.
#[derive(Debug, Parser)]
#[command(
    name = "slidegate",
    about = "Slide-to-confirm remote actuation client",
    version
)]
struct Cli {
    /// Page URL of the controller.  The fragment carries the base64 secret
    /// key used to solve challenges.
    #[arg(long, env = "SLIDEGATE_URL")]
    url: Option<String>,

    /// TOML settings file.
    #[arg(short, long, env = "SLIDEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Delay between a dropped connection and the next attempt, in ms.
    #[arg(long, env = "SLIDEGATE_RECONNECT_MS")]
    reconnect_ms: Option<u64>,

    /// How confirmed gestures reach the controller.
    #[arg(long, env = "SLIDEGATE_PROFILE")]
    profile: Option<ProfileName>,

    /// Length of a slider track.
    #[arg(long)]
    track_length: Option<f64>,

    /// Length of a slider thumb.
    #[arg(long)]
    thumb_length: Option<f64>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Applies the command-line layer on top of `settings`.
    fn apply(self, mut settings: SettingsFile) -> SettingsFile {
        if let Some(url) = self.url {
            settings.session.url = Some(url);
        }
        if let Some(ms) = self.reconnect_ms {
            settings.session.reconnect_ms = ms;
        }
        if let Some(profile) = self.profile {
            settings.session.profile = profile;
        }
        if let Some(length) = self.track_length {
            settings.track.length = length;
        }
        if let Some(thumb) = self.thumb_length {
            settings.track.thumb = thumb;
        }
        settings
    }

    /// Resolves defaults, the settings file and the command line into a
    /// [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed, or if
    /// the resulting URL is missing or unusable.
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let settings = match &self.config {
            Some(path) => load_settings(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => SettingsFile::default(),
        };
        let settings = self.apply(settings);
        ClientConfig::from_settings(&settings).context("invalid configuration")
    }
}

fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.into_client_config()?;
    info!(
        "slidegate starting: controller={}, profile={:?}",
        config.ws_url, config.profile
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(run(config));

    // The stdin reader sits in a blocking read that cannot be cancelled.
    runtime.shutdown_background();
    info!("slidegate stopped");
    Ok(())
}

async fn run(config: ClientConfig) {
    let mut protocol = CommandProtocol::new(config.profile, Box::new(BoxSolver::new()));
    if !protocol.validate_key(config.key_material())
        && config.profile == ProtocolProfile::ChallengeResponse
    {
        warn!("no usable key in the URL fragment; load one with `key <material>`");
    }

    let transport = SessionTransport::new(WsConnector, config.ws_url.clone(), config.reconnect_delay);
    let (ui_tx, ui_rx) = mpsc::channel(64);

    tokio::spawn(console::read_commands(tokio::io::stdin(), ui_tx.clone()));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                let _ = ui_tx.send(UiEvent::Quit).await;
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    Session::new(transport, protocol, config.track)
        .run(ui_rx, ConsoleRenderer::new(std::io::stdout()))
        .await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
