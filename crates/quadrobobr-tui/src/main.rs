//! Quadrobobr Admin - terminal console for the quad-bike rental site.
//!
//! Signs an administrator in against the site's REST API, keeps the session
//! across restarts, and guards every console view behind that session.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quadrobobr_core::auth::SessionManager;
use quadrobobr_core::config::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name in the data directory
const LOG_FILE: &str = "quadrobobr-admin.log";

const USAGE: &str = "\
Usage: quadrobobr-admin [COMMAND]

Without a command the terminal console starts.

Commands:
  --login [EMAIL]  Sign in from the command line
  --logout         Clear the stored session
  --whoami         Print the signed-in admin profile
  --help           Show this message

Environment:
  QUADROBOBR_API_URL        API base URL (default https://api.kvadrobobr.ru)
  QUADROBOBR_SESSION_STORE  file | keyring
  QUADROBOBR_EMAIL          Pre-filled login email
  RUST_LOG                  Log filter (default warn)";

/// What to do instead of (or before) starting the console
#[derive(Debug, PartialEq)]
enum Command {
    Console,
    Login(Option<String>),
    Logout,
    Whoami,
    Help,
}

/// Parse command-line arguments. Returns the offending argument on failure.
fn parse_command(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        None => Ok(Command::Console),
        Some("--login") => Ok(Command::Login(args.get(1).cloned())),
        Some("--logout") => Ok(Command::Logout),
        Some("--whoami") => Ok(Command::Whoami),
        Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => Err(other.to_string()),
    }
}

/// Initialize the tracing subscriber, writing to a file so the TUI stays clean
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring unreadable config: {:#}", e);
        Config::default()
    });
    let data_dir = config.data_dir()?;
    let log_guard = init_tracing(&data_dir)?;

    let session = SessionManager::open(&config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_command(&args) {
        Ok(Command::Console) => {}
        Ok(Command::Login(email)) => return login_command(config, &session, email).await,
        Ok(Command::Logout) => {
            session.logout();
            println!("Signed out.");
            return Ok(());
        }
        Ok(Command::Whoami) => return whoami_command(&session),
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Err(unknown) => {
            warn!(argument = %unknown, "Unknown argument");
            eprintln!("Unknown argument: {}\n\n{}", unknown, USAGE);
            // exit() skips destructors; flush the log writer first
            drop(log_guard);
            std::process::exit(2);
        }
    }

    info!("Quadrobobr admin starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::with_session(config, session);
    app.refresh_unread_count();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Quadrobobr admin shutting down");
    drop(log_guard);
    Ok(())
}

/// Sign in without the TUI, prompting for whatever was not supplied
async fn login_command(
    mut config: Config,
    session: &Arc<SessionManager>,
    email_arg: Option<String>,
) -> Result<()> {
    let email = match email_arg {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ")?;

    println!("\nSigning in...");
    match session.login(&email, &password).await {
        Ok(identity) => {
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {} <{}>", identity.display_name(), identity.email);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last_email) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn whoami_command(session: &SessionManager) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    match session.identity() {
        Some(identity) => println!("{}", serde_json::to_string_pretty(&identity)?),
        None => println!("Signed in (profile unavailable)."),
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // The guard decides the view on every pass
        app.resolve_route();

        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for session changes and completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
