use anyhow::Result;
use clap::Parser;
use heritage_core::config::SERVER_URL_ENV;
use heritage_core::{ChatController, Config, HeritageClient};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "heritage")]
#[command(version, about = "Ask questions about UNESCO World Heritage sites from the terminal")]
struct Cli {
    /// Base URL of the Q&A server (overrides HERITAGE_SERVER_URL and the config file)
    #[arg(short, long)]
    server: Option<String>,
    /// Append logs to this file instead of the default cache location
    #[arg(long)]
    log_file: Option<std::path::PathBuf>,
    /// Remember the server URL in the config file
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring unreadable config file");
        Config::new()
    });
    let env_url = std::env::var(SERVER_URL_ENV).ok();
    let server_url = config.resolve_server_url(cli.server.as_deref(), env_url.as_deref());

    if cli.save {
        config.server_url = Some(server_url.clone());
        config.save()?;
    }

    tracing::info!(server = %server_url, "starting");

    let client = HeritageClient::new(&server_url);
    let mut controller = ChatController::new(client);
    controller.load_filters();
    let mut app = App::new(controller, server_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "exiting with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(event) = app.controller.next_event() => app.controller.handle_event(event),
            else => break,
        }
    }

    Ok(())
}
