mod api;
mod app;
mod config;
mod shell;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::AppConfig;
use shell::Action;

#[derive(Parser, Debug)]
#[command(name = "stackprobe")]
#[command(author = "Sean Fournier")]
#[command(version)]
#[command(about = "A terminal client for smoke-testing a full stack backend")]
struct Args {
    /// Backend origin the /api/* paths are resolved against
    #[arg(short, long, value_name = "URL")]
    base_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ping the backend once, print the response and exit
    #[arg(long, conflicts_with_all = ["add_item", "latest"])]
    ping: bool,

    /// Add one test item, print the response and exit
    #[arg(long, conflicts_with = "latest")]
    add_item: bool,

    /// Fetch the latest item, print the response and exit
    #[arg(long)]
    latest: bool,
}

impl Args {
    fn one_shot(&self) -> Option<Action> {
        if self.ping {
            Some(Action::Ping)
        } else if self.add_item {
            Some(Action::AddItem)
        } else if self.latest {
            Some(Action::GetLatestItem)
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging (stderr, so the TUI and one-shot output stay clean)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    }
    .with_base_url(args.base_url.clone());

    tracing::info!("Using backend at {}", config.base_url);

    let app = App::new(&config)?;

    // Handle CLI-only commands
    if let Some(action) = args.one_shot() {
        return run_once(app, action).await;
    }

    // Run TUI
    run_tui(app)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_once(mut app: App, action: Action) -> Result<ExitCode> {
    app.shell.trigger(action);
    let ok = match app.shell.next_completion().await {
        Some(completion) => completion.result.is_ok(),
        None => false,
    };

    println!("{}", app.shell.output());
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc if app.popup == Popup::None => {
                            return Ok(())
                        }
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => app.handle_key(key),
                    }
                }
            }
        }

        // Pick up any responses that resolved meanwhile
        app.tick();
    }
}
