use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::launcher::Workflow;
use crate::launcher::error::LauncherError;
use crate::launcher::preview::PreviewServer;
use crate::launcher::progress::LogLevel;
use crate::launcher::shell::Interrupt;
use crate::model::menu::{Action, MenuItem};
use crate::model::mode::Mode;
use crate::msg::Msg;

const BANNER: &str = r#"   ___    ___     _        __                            _
  /   \  /___\   /_\      / /  __ _ _   _ _ __   ___| |__   ___ _ __
 / /\ / //  //  //_\\    / /  / _` | | | | '_ \ / __| '_ \ / _ \ '__|
/ /_// / \_//  /  _  \  / /__| (_| | |_| | | | | (__| | | |  __/ |
/___,'  \___/   \_/ \_/  \____/\__,_|\__,_|_| |_|\___|_| |_|\___|_|"#;

const TAGLINE: &str = "CLI Launcher for your favourite web3 pvp game Daughter Of Aether S1";

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const MAX_LOG_LINES: usize = 500;

struct Spinner {
    label: String,
    frame: usize,
    last_advance: Instant,
}

/// The thread running the current action.
struct Worker {
    handle: JoinHandle<()>,
    interrupt: Interrupt,
}

pub struct App {
    pub mode: Mode,
    selected: usize,
    log: VecDeque<(LogLevel, String)>,
    spinner: Option<Spinner>,
    spinner_interval: Duration,
    preview: Option<PreviewServer>,
    worker: Option<Worker>,
    workflow: Workflow,
    pub event_tx: mpsc::Sender<Msg>,
    pub should_quit: bool,
    /// Printed to stdout once the terminal is restored.
    pub exit_message: Option<String>,
}

impl App {
    pub fn new(workflow: Workflow, event_tx: mpsc::Sender<Msg>) -> Self {
        let spinner_interval = Duration::from_millis(workflow.config().ui.spinner_interval_ms);

        let mut app = Self {
            mode: Mode::Menu,
            selected: 0,
            log: VecDeque::new(),
            spinner: None,
            spinner_interval,
            preview: None,
            worker: None,
            workflow,
            event_tx,
            should_quit: false,
            exit_message: None,
        };

        let state = app.workflow.install_state();
        let line = format!(
            "Install directory: {} ({})",
            app.workflow.install_dir().display(),
            state.label()
        );
        app.push_log(LogLevel::Info, line);
        app
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::Resize => {}
            Msg::InputFailed(err) => {
                tracing::error!("input failed: {err}");
                self.exit_message = Some(format!("Prompt failed {err}"));
                self.should_quit = true;
            }
            Msg::Log(level, message) => self.push_log(level, message),
            Msg::StepStarted(label) => {
                self.spinner = Some(Spinner {
                    label,
                    frame: 0,
                    last_advance: Instant::now(),
                });
            }
            Msg::StepFinished => self.spinner = None,
            Msg::ActionFinished(action, result) => self.finish_action(action, result),
            Msg::Tick => self.handle_tick(),
        }
        Ok(())
    }

    /// Stop anything the launcher started. Called once the loop ends.
    ///
    /// A running action is interrupted and joined, so its commands and any preview
    /// server it started are gone before this returns.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            tracing::info!("interrupting {}", self.mode.label());
            worker.interrupt.trigger();
            if worker.handle.join().is_err() {
                tracing::error!("action worker panicked");
            }
        }

        self.stop_preview();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.exit_message = Some("Prompt failed ^C".to_string());
            self.should_quit = true;
            return;
        }

        if self.mode != Mode::Menu {
            return;
        }

        match key.code {
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected = (self.selected + 1).min(MenuItem::ALL.len() - 1);
            }
            KeyCode::Enter => self.dispatch(MenuItem::ALL[self.selected]),
            _ => {}
        }
    }

    fn dispatch(&mut self, item: MenuItem) {
        tracing::info!("menu selection: {}", item.label());

        match item {
            MenuItem::CliVersion => self.push_log(
                LogLevel::Info,
                format!("DOA-Launcher version: {}", env!("CARGO_PKG_VERSION")),
            ),
            MenuItem::AppVersion => {
                let general = &self.workflow.config().general;
                let line = format!("{} version: {}", general.app_name, general.app_version);
                self.push_log(LogLevel::Info, line);

                let state = self.workflow.install_state();
                self.push_log(LogLevel::Info, format!("Local copy: {}", state.label()));
            }
            MenuItem::Exit => {
                self.exit_message = Some("Exiting DOA-Launcher.".to_string());
                self.should_quit = true;
            }
            MenuItem::Install | MenuItem::Launch | MenuItem::Update => {
                if let Some(action) = item.action() {
                    self.start_action(action);
                }
            }
        }
    }

    fn start_action(&mut self, action: Action) {
        // The new server would fight the old one for the same port.
        if action != Action::Install {
            self.stop_preview();
        }

        self.mode = Mode::Running(action);

        let interrupt = Interrupt::default();
        let workflow = self.workflow.clone().with_interrupt(interrupt.clone());
        let cancelled = interrupt.clone();
        let tx = self.event_tx.clone();
        let handle = thread::spawn(move || {
            let result = workflow.run(action, &tx);
            if cancelled.is_triggered() {
                // Dropping the result stops a server nobody will take ownership of.
                drop(result);
                return;
            }
            let _ = tx.send(Msg::ActionFinished(action, result));
        });

        self.worker = Some(Worker { handle, interrupt });
    }

    fn finish_action(
        &mut self,
        action: Action,
        result: Result<Option<PreviewServer>, LauncherError>,
    ) {
        self.mode = Mode::Menu;
        self.spinner = None;
        self.worker = None;

        match result {
            Ok(Some(server)) => self.preview = Some(server),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("{} failed: {err}", action.label());
                self.push_log(LogLevel::Error, err.to_string());
            }
        }
    }

    fn stop_preview(&mut self) {
        if let Some(mut server) = self.preview.take() {
            server.stop();
            let line = format!("Stopped the preview server at {}.", server.url());
            self.push_log(LogLevel::Info, line);
        }
    }

    fn handle_tick(&mut self) {
        if let Some(spinner) = self.spinner.as_mut()
            && spinner.last_advance.elapsed() >= self.spinner_interval
        {
            spinner.frame = (spinner.frame + 1) % SPINNER_FRAMES.len();
            spinner.last_advance = Instant::now();
        }

        if let Some(server) = self.preview.as_mut()
            && server.poll_exited()
        {
            let line = format!("The preview server at {} has stopped.", server.url());
            self.preview = None;
            self.push_log(LogLevel::Warn, line);
        }
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.log.push_back((level, message));
        while self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&self, frame: &mut Frame) {
        let banner_height = BANNER.lines().count() as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(banner_height), // banner + tagline
                Constraint::Min(1),                // body
                Constraint::Length(1),             // status bar
            ])
            .split(frame.area());

        self.render_banner(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(1)])
            .split(chunks[1]);

        self.render_menu(frame, body[0]);
        self.render_log(frame, body[1]);
        self.render_status_bar(frame, chunks[2]);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = BANNER
            .lines()
            .map(|line| {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            TAGLINE,
            Style::default().fg(Color::Gray),
        )));

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let locked = self.mode != Mode::Menu;
        let item_style = if locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };

        let items: Vec<ListItem> = MenuItem::ALL
            .iter()
            .map(|item| ListItem::new(item.label()).style(item_style))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Select an option ")
                    .borders(Borders::ALL),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(if locked { Color::DarkGray } else { Color::Cyan })
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_log(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .log
            .iter()
            .map(|(level, message)| {
                Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(level.color()),
                ))
            })
            .collect();

        // Keep the newest lines visible.
        let visible = area.height.saturating_sub(2) as usize;
        let offset = lines.len().saturating_sub(visible) as u16;

        let log = Paragraph::new(lines)
            .block(Block::default().title(" Output ").borders(Borders::ALL))
            .scroll((offset, 0));
        frame.render_widget(log, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::Menu => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Running(_) => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };

        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let step = match &self.spinner {
            Some(spinner) => format!(" {} {}", SPINNER_FRAMES[spinner.frame], spinner.label),
            None if self.mode == Mode::Menu => " ↑/↓ move  enter select  ctrl+c quit".to_string(),
            None => String::new(),
        };

        let preview = match &self.preview {
            Some(server) => format!(" | preview: {} ", server.url()),
            None => String::new(),
        };

        let info = Span::styled(
            format!("{step}{preview}"),
            Style::default().fg(Color::Gray).bg(Color::DarkGray),
        );

        let bar = Line::from(vec![mode_span, info]);
        let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }
}
