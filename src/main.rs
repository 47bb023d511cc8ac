//! PawHub - drive planning for community animal welfare groups
//!
//! Runs the interactive drive creation wizard by default; `create`, `show`
//! and `export-sightings` work without a terminal UI.

use std::io;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::info;

use pawhub::application::{App, AppMode};
use pawhub::cli::{self, Cli, Command};
use pawhub::infrastructure::{connect, init_logging, AppConfig};
use pawhub::presentation::{render_ui, InputHandler};

const TICK: Duration = Duration::from_millis(100);

/// Entry point for the PawHub client.
///
/// # Errors
///
/// Returns an error if logging cannot be set up, the backend cannot be
/// reached for a command, or the terminal fails during the wizard.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let config = args.app_config();
    init_logging(&config.log_file)?;
    info!(backend = ?config.backend.mode, "pawhub starting");

    match args.command {
        None | Some(Command::Wizard) => run_wizard(&config)?,
        Some(Command::Create { draft }) => {
            let route = cli::create_from_file(&config.backend, &draft)?;
            println!("{route}");
        }
        Some(Command::Show { id, dashboard }) => {
            println!("{}", cli::show_drive(&config.backend, &id, dashboard)?);
        }
        Some(Command::ExportSightings(export)) => {
            let (file, count) = cli::export_sightings(&export)?;
            println!("Exported {count} sightings to {file}");
        }
    }

    Ok(())
}

fn run_wizard(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repository = connect(&config.backend)?;
    let mut app = App::new(repository);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Main application event loop.
///
/// Polls for key presses with a short timeout so that submission results are
/// picked up while the user is idle. Runs until 'q' is pressed in normal mode.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q')
                            if app.mode == AppMode::Normal && key.modifiers.is_empty() =>
                        {
                            return Ok(());
                        }
                        _ => InputHandler::handle_key_event(app, key.code, key.modifiers),
                    }
                }
            }
        }

        app.tick();
    }
}
