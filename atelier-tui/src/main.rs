//! Atelier TUI entry point.

use atelier_client::RestClient;
use atelier_tui::commands;
use atelier_tui::config::TuiConfig;
use atelier_tui::error::TuiError;
use atelier_tui::events::TuiEvent;
use atelier_tui::jobs::Jobs;
use atelier_tui::keys::{map_input_key, map_key, Action, InputKey};
use atelier_tui::logging;
use atelier_tui::nav::View;
use atelier_tui::notifications::NotificationLevel;
use atelier_tui::persistence;
use atelier_tui::state::{App, Modal, Services};
use atelier_tui::views::render_view;
use atelier_tui::widgets::TextInput;
use crossterm::{
    event::{self, Event as CrosstermEvent, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

const HELP: &str = "Tab/Shift+Tab or 1-9 switch view • j/k move • h/l focus • Enter open • \
g generate or continue • Esc cancel • : command palette • / search • n new • e edit • \
d delete • s share • t next tab • [ ] page • c clear filters • space mark • x expand • \
Ctrl+r refresh • q quit";

#[tokio::main]
async fn main() -> Result<(), TuiError> {
    let config = TuiConfig::load()?;
    logging::init(&config)?;

    let rest = RestClient::new(&config.api)?;
    let services = Services::new(rest, &config.polling);
    let mut app = App::new(config, services);
    match persistence::load(&app.config.persistence_path) {
        Ok(Some(state)) => app.restore(&state),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable persisted state"),
    }

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    let jobs = Jobs::new(event_tx.clone());

    spawn_input_reader(event_tx.clone());
    jobs.load_session(&app.services);
    app.load_view(&jobs);

    let tick_rate = Duration::from_millis(app.config.refresh_interval_ms);
    let mut ticker = tokio::time::interval(tick_rate);

    loop {
        terminal.draw(|f| render_view(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => app.on_tick(),
            Some(event) = event_rx.recv() => {
                if handle_event(&mut app, &jobs, event) {
                    break;
                }
            }
        }
    }

    app.shutdown();
    if let Err(err) = persistence::save(&app.config.persistence_path, &app.persisted_state()) {
        tracing::warn!(error = %err, "failed to persist UI state");
    }
    tracing::info!("atelier tui stopped");

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                let event = match evt {
                    CrosstermEvent::Key(key) => TuiEvent::Input(key),
                    CrosstermEvent::Resize(width, height) => TuiEvent::Resize { width, height },
                    _ => continue,
                };
                if sender.blocking_send(event).is_err() {
                    break;
                }
            }
        }
    });
}

/// Returns `true` when the app should exit.
fn handle_event(app: &mut App, jobs: &Jobs, event: TuiEvent) -> bool {
    match event {
        TuiEvent::Input(key) => {
            if app.command_palette.is_some() || app.search.is_some() {
                handle_text_input(app, jobs, key);
            } else if let Some(action) = map_key(key) {
                return handle_action(app, jobs, action);
            }
        }
        TuiEvent::Work(result) => app.apply(*result, jobs),
        TuiEvent::ApiError(message) => app.notify(NotificationLevel::Error, message),
        TuiEvent::Tick => app.on_tick(),
        TuiEvent::Resize { .. } => {}
    }
    false
}

fn handle_text_input(app: &mut App, jobs: &Jobs, key: KeyEvent) {
    let Some(input_key) = map_input_key(key) else {
        return;
    };
    let palette = app.command_palette.is_some();
    let Some(input) = app.command_palette.as_mut().or(app.search.as_mut()) else {
        return;
    };
    match input_key {
        InputKey::Char(c) => input.push(c),
        InputKey::Backspace => input.backspace(),
        InputKey::Cancel => {
            app.command_palette = None;
            app.search = None;
        }
        InputKey::Submit => {
            let text = input.take();
            app.command_palette = None;
            app.search = None;
            if palette {
                match commands::parse(&text) {
                    Ok(command) => {
                        tracing::debug!(command = command.name(), "command submitted");
                        app.execute(command, jobs);
                    }
                    Err(err) => app.notify(NotificationLevel::Error, err.to_string()),
                }
            } else {
                app.submit_search(&text, jobs);
            }
        }
    }
}

fn handle_action(app: &mut App, jobs: &Jobs, action: Action) -> bool {
    match action {
        Action::Quit => return true,
        Action::NextView => app.cycle_view(true, jobs),
        Action::PrevView => app.cycle_view(false, jobs),
        Action::SwitchView(index) => {
            if let Some(view) = View::from_index(index) {
                app.switch_view(view, jobs);
            }
        }
        Action::MoveDown => app.select_next(),
        Action::MoveUp => app.select_previous(),
        Action::MoveLeft => app.move_focus(false),
        Action::MoveRight => app.move_focus(true),
        Action::Select => app.toggle_mark(),
        Action::ToggleExpand => app.toggle_expand(),
        Action::NewItem => app.open_palette_for(false),
        Action::EditItem => app.open_palette_for(true),
        Action::DeleteItem => app.delete(jobs),
        Action::Generate => app.generate(jobs),
        Action::Share => app.share(),
        Action::NextTab => app.next_tab(jobs),
        Action::NextPage => app.change_page(true, jobs),
        Action::PrevPage => app.change_page(false, jobs),
        Action::ClearFilters => app.clear_filters(jobs),
        Action::OpenHelp => {
            app.modal = Some(Modal {
                title: "Keybindings".to_string(),
                message: HELP.to_string(),
            })
        }
        Action::OpenSearch => app.open_search(),
        Action::OpenCommand => app.command_palette = Some(TextInput::new()),
        Action::Refresh => app.refresh(jobs),
        Action::Confirm => app.confirm(jobs),
        Action::Cancel => app.cancel(),
    }
    false
}
