use anyhow::Result;
use site2persona_core::{AnalysisService, Config, Controller};
use tracing::{info, warn};

mod app;
mod clipboard;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {e}");
    }

    let config = Config::load()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Could not read config file, using defaults");
            Config::new()
        })
        .with_env_overrides();

    // A missing key doesn't block startup; requests will fail until one is set
    if !config.has_api_key() {
        warn!("API key is missing: set GEMINI_API_KEY (or API_KEY)");
    }
    info!(model = config.model(), "Starting site2persona");

    let service = AnalysisService::from_config(&config);
    let mut app = App::new(Controller::new(service), !config.has_api_key());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!("Exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
