mod app;
mod launcher;
mod model;
mod msg;

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use app::App;
use launcher::Workflow;
use launcher::browser::SystemBrowser;
use launcher::shell::SystemShell;
use model::config::LauncherConfig;
use msg::Msg;

fn main() -> Result<()> {
    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "doa-launcher")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "doa-launcher.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter("doa_launcher=info")
        .init();

    tracing::info!("doa-launcher {} starting", env!("CARGO_PKG_VERSION"));

    let config = LauncherConfig::load()?;
    let base_dir = std::env::current_dir().context("cannot read current directory")?;
    let workflow = Workflow::new(
        config,
        Arc::new(SystemShell),
        Arc::new(SystemBrowser),
        base_dir,
    )?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel::<Msg>();
    let mut app = App::new(workflow, tx.clone());

    let result = run(&mut terminal, &mut app, tx, rx);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!("event loop failed: {e:?}");
        eprintln!("doa-launcher error: {e:?}");
    }

    if let Some(message) = app.exit_message.take() {
        println!("{message}");
    }

    tracing::info!("doa-launcher exiting");
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: mpsc::Sender<Msg>,
    rx: mpsc::Receiver<Msg>,
) -> Result<()> {
    // Input thread — reads terminal events and forwards as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            let msg = match event::read() {
                Ok(Event::Key(k)) => Msg::Key(k),
                Ok(Event::Resize(..)) => Msg::Resize,
                Ok(_) => continue,
                Err(err) => {
                    let _ = tx_input.send(Msg::InputFailed(err.to_string()));
                    break;
                }
            };
            if tx_input.send(msg).is_err() {
                break;
            }
        }
    });

    // Tick thread — drives the spinner and preview supervision
    let tx_tick = tx;
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(50));
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    terminal.draw(|f| app.view(f))?;

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit {
            break;
        }

        terminal.draw(|f| app.view(f))?;
    }

    Ok(())
}
