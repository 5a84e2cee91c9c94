use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use profview::api::ApiClient;
use profview::app::App;
use profview::config::{Cli, Config};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io::Stdout;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn init_logger(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_input(key);
                }
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_cli(Cli::from_args())?;
    init_logger(&config.log_file)?;
    info!("starting against {}", config.base_url);

    let client = ApiClient::new(config.base_url.clone(), config.timeout)
        .context("failed to create the HTTP client")?;
    let mut app = App::new(Arc::new(client), config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    app.start();
    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("bye");
    result
}
