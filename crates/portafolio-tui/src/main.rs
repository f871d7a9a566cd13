//! Portafolio - a terminal client for the academic portfolio service.
//!
//! Teachers and administrators sign in, browse and maintain course
//! portfolios organized by week and category, upload files and query the
//! uploaded documents. The session is persisted between runs and checked
//! before any protected view renders.

mod app;
mod form;
mod ui;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portafolio_core::auth::{CredentialStore, FileStore, SessionContext};
use portafolio_core::utils::{format_expiry, is_plausible_email};
use portafolio_core::{ApiClient, Config};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "portafolio.log";

const USAGE: &str = "\
Usage: portafolio [COMMAND]

Without a command the interactive client starts.

Commands:
  --login    Sign in from the command line and save the session
  --status   Show the saved session
  --logout   Remove the saved session
  --forget   Remove the saved session and the remembered password
  --help     Show this message";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so events go to a daily log file in the
/// cache directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(cache_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(cache_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    })
}

fn cache_dir_for(config: &Config) -> PathBuf {
    config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"))
}

fn open_session(config: &Config, cache_dir: &Path) -> Result<SessionContext<FileStore>> {
    let store = FileStore::open(cache_dir)?;
    let mut session = SessionContext::new(store).with_lifetime_minutes(config.session_minutes());
    session.sanitize()?;
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = load_config();
    let cache_dir = cache_dir_for(&config);
    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
    let _log_guard = init_tracing(&cache_dir);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        return match command.as_str() {
            "--login" => cli_login(config, &cache_dir).await,
            "--status" => cli_status(&config, &cache_dir),
            "--logout" => cli_logout(&config, &cache_dir, false),
            "--forget" => cli_logout(&config, &cache_dir, true),
            "--help" | "-h" => {
                println!("{}", USAGE);
                Ok(())
            }
            other => Err(anyhow!("Unknown argument: {}\n\n{}", other, USAGE)),
        };
    }

    info!("Portafolio starting");

    // Create the app before touching the terminal so startup errors print normally
    let mut app = App::with_config(config, &cache_dir)?;
    app.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

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

    info!("Portafolio shutting down");
    Ok(())
}

/// Prompt for credentials on the terminal, sign in and save the session.
async fn cli_login(mut config: Config, cache_dir: &Path) -> Result<()> {
    let default_email = config.last_email.clone().unwrap_or_default();
    if default_email.is_empty() {
        print!("Email: ");
    } else {
        print!("Email [{}]: ", default_email);
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = match line.trim() {
        "" => default_email,
        typed => typed.to_string(),
    };
    if !is_plausible_email(&email) {
        return Err(anyhow!("Enter a valid email address"));
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err(anyhow!("Password required"));
    }

    let api = ApiClient::new(&config.api_url())?;
    let grant = api.authenticate(&email, &password).await?;

    let mut session = open_session(&config, cache_dir)?;
    session.establish(&grant)?;

    if let Err(e) = CredentialStore::store(&email, &password) {
        eprintln!("Warning: could not remember password: {}", e);
    }
    config.last_email = Some(email.clone());
    config.save()?;

    let snapshot = session.snapshot();
    let role = snapshot
        .role()
        .map(|r| r.display_name().to_string())
        .unwrap_or_else(|| "no recognized role".to_string());
    let until = snapshot.expiry_millis().map(format_expiry).unwrap_or_default();
    println!("Signed in as {} ({}), session valid until {}", email, role, until);
    Ok(())
}

fn cli_status(config: &Config, cache_dir: &Path) -> Result<()> {
    let session = open_session(config, cache_dir)?;
    let snapshot = session.snapshot();
    if !snapshot.is_valid() {
        println!("Not signed in");
        return Ok(());
    }

    println!("Signed in as {}", snapshot.email.as_deref().unwrap_or("(unknown email)"));
    println!("  User id: {}", snapshot.user_id.as_deref().unwrap_or("-"));
    println!("  Role:    {}", snapshot.role.as_deref().unwrap_or("-"));
    if let Some(expiry) = snapshot.expiry_millis() {
        println!(
            "  Expires: {} ({} min left)",
            format_expiry(expiry),
            snapshot.minutes_until_expiry(portafolio_core::auth::now_millis())
        );
    }
    println!("  Backend: {}", config.api_url());
    Ok(())
}

fn cli_logout(config: &Config, cache_dir: &Path, forget: bool) -> Result<()> {
    let mut session = open_session(config, cache_dir)?;
    let email = session.snapshot().email.or_else(|| config.last_email.clone());
    session.purge()?;
    println!("Session removed");

    if forget {
        if let Some(email) = email {
            match CredentialStore::delete(&email) {
                Ok(()) => println!("Forgot saved password for {}", email),
                Err(e) => eprintln!("No saved password removed for {}: {:#}", email, e),
            }
        }
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply finished background tasks and re-check the session
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
