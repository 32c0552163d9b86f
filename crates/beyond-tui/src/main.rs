use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use beyond_core::config::ENDPOINT_ENV;
use beyond_core::{Config, HttpChatClient, NetworkBridge, SystemClipboard};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod highlight;
mod input;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

/// Env var holding the log filter, e.g. `BEYOND_LOG=debug`
const LOG_ENV: &str = "BEYOND_LOG";

#[derive(Parser)]
#[command(name = "beyond")]
#[command(about = "Terminal chat client for the Beyond Ai assistant")]
#[command(version)]
struct Cli {
    /// Chat endpoint URL (overrides the config file)
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => {
            let path = Config::get_config_path()?;
            let config = Config::load()?;
            // First run: leave a file with the defaults for the user to edit
            if !path.exists() {
                match config.save() {
                    Ok(()) => tracing::info!(path = %path.display(), "wrote default config"),
                    Err(e) => tracing::warn!("could not write default config: {}", e),
                }
            }
            config
        }
    };

    let mut config = config.with_env_overrides();
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("beyond.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = init_logging() {
        eprintln!("beyond: logging disabled: {:#}", e);
    }
    let config = load_config(&cli)?;

    let client = HttpChatClient::new(&config.endpoint, config.request_timeout())?;
    tracing::info!(endpoint = client.endpoint(), "starting");
    let bridge = NetworkBridge::new(Arc::new(client));

    let mut events = EventHandler::new(config.tick_rate());
    let mut app = App::new(
        &config,
        bridge,
        Box::new(SystemClipboard::default()),
        events.sender(),
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!("exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    let mut redraw = true;
    while !app.should_quit {
        if redraw {
            terminal.draw(|frame| ui::render(app, frame))?;
        }

        redraw = match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        };
    }
    Ok(())
}
