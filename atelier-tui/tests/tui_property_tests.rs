use atelier_client::{ApiConfig, PollingConfig, RestClient, StudioApi};
use atelier_core::{HistoryTab, NotificationBanner, QuotaType, TaskStatus, DEFAULT_VIDEO_MODEL};
use atelier_test_utils::{fixtures, status, succeeded_image, succeeded_video, FakeStudioApi};
use atelier_tui::commands::{self, Command, CommandError, FilterCommand};
use atelier_tui::config::{ConfigError, TuiConfig};
use atelier_tui::events::{TuiEvent, WorkResult};
use atelier_tui::jobs::Jobs;
use atelier_tui::keys::{map_key, Action};
use atelier_tui::nav::View;
use atelier_tui::notifications::NotificationLevel;
use atelier_tui::persistence::{self, PersistedState};
use atelier_tui::state::{App, Services};
use atelier_tui::views::render_view;
use atelier_tui::theme::{cost_color, history_status_color, task_status_color, AtelierTheme};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use proptest::prelude::*;
use ratatui::{backend::TestBackend, Terminal};
use std::sync::Arc;
use tokio::sync::mpsc;

const CONFIG: &str = r#"
refresh_interval_ms = 2000
persistence_path = "tmp/atelier-tui.json"
log_path = "tmp/atelier-tui.log"
log_level = "info"
log_format = "json"

[api]
base_url = "http://localhost:8080"
request_timeout_ms = 30000

[polling]
video_interval_ms = 5000
image_interval_ms = 5000
chain_interval_ms = 2000

[theme]
name = "atelier"
"#;

fn base_config() -> TuiConfig {
    TuiConfig::from_toml(CONFIG).unwrap()
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

/// App wired to a scripted backend. Admin-only REST calls would go to a
/// closed port, so tests stay on the generation and history paths.
fn test_app(fake: Arc<FakeStudioApi>) -> (App, Jobs, mpsc::Receiver<TuiEvent>) {
    let rest = RestClient::new(&ApiConfig::new("http://127.0.0.1:9")).unwrap();
    let api: Arc<dyn StudioApi> = fake;
    let services = Services::with_api(rest, api, &PollingConfig::default());
    let (tx, rx) = mpsc::channel(32);
    (App::new(base_config(), services), Jobs::new(tx), rx)
}

async fn next_work(app: &mut App, jobs: &Jobs, rx: &mut mpsc::Receiver<TuiEvent>) {
    match rx.recv().await {
        Some(TuiEvent::Work(result)) => app.apply(*result, jobs),
        other => panic!("expected a job result, got {:?}", other),
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn sample_config_is_valid() {
    base_config().validate().unwrap();
}

#[test]
fn config_requires_http_base_url() {
    let mut config = base_config();
    config.api.base_url = "ftp://studio".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "api.base_url",
            ..
        })
    ));
}

#[test]
fn config_requires_theme_name() {
    let mut config = base_config();
    config.theme.name = "unknown".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn config_rejects_unknown_log_level() {
    let mut config = base_config();
    config.log_level = "verbose".to_string();
    assert!(config.validate().is_err());
}

// ============================================================================
// Navigation and theme
// ============================================================================

#[test]
fn view_cycle_visits_every_view() {
    let mut view = View::Generate;
    for _ in 0..View::all().len() {
        view = view.next();
    }
    assert_eq!(view, View::Generate);
    assert_eq!(View::Generate.previous(), View::Prompts);
    assert!(View::Analytics.requires_admin());
    assert!(!View::History.requires_admin());
}

#[test]
fn theme_colors_follow_status() {
    let theme = AtelierTheme::atelier();
    assert_eq!(task_status_color(TaskStatus::Failed, &theme), theme.error);
    assert_eq!(task_status_color(TaskStatus::Succeeded, &theme), theme.success);
    assert_eq!(history_status_color(Some("completed"), &theme), theme.success);
    assert_eq!(history_status_color(None, &theme), theme.text_dim);
    assert_eq!(cost_color(1.0, 0.0, &theme), theme.text_dim);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn persisted_state_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    assert_eq!(persistence::load(&path).unwrap(), None);

    let state = PersistedState {
        active_view: View::History,
        history_tab: HistoryTab::ImageEnrichment,
    };
    persistence::save(&path, &state).unwrap();
    assert_eq!(persistence::load(&path).unwrap(), Some(state));
}

#[test]
fn persisted_state_without_tab_defaults_to_video() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"active_view":"Projects"}"#).unwrap();
    let state = persistence::load(&path).unwrap().unwrap();
    assert_eq!(state.active_view, View::Projects);
    assert_eq!(state.history_tab, HistoryTab::Video);
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn palette_parses_quota_and_filters() {
    match commands::parse("quota cost 25 weekly").unwrap() {
        Command::Quota { quota, all } => {
            assert!(!all);
            assert_eq!(quota.kind, QuotaType::CostLimit);
            assert_eq!(quota.limit, Some(25.0));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        commands::parse("filter from 2024-05-01").unwrap(),
        Command::Filter(FilterCommand::From(NaiveDate::from_ymd_opt(2024, 5, 1)))
    );
    assert_eq!(commands::parse("   "), Err(CommandError::Empty));
    assert!(matches!(
        commands::parse("teleport"),
        Err(CommandError::Unknown(_))
    ));
}

// ============================================================================
// App behavior against a scripted backend
// ============================================================================

#[tokio::test(start_paused = true)]
async fn generate_binds_exactly_one_video() {
    let fake = Arc::new(FakeStudioApi::new());
    fake.script_status(
        "task-1",
        vec![status("RUNNING"), succeeded_video("https://x")],
    );
    let (mut app, jobs, mut rx) = test_app(fake.clone());

    app.execute(Command::Prompt("a cat on a skateboard".into()), &jobs);
    app.generate(&jobs);
    assert!(app.generate_view.is_running());

    next_work(&mut app, &jobs, &mut rx).await;

    assert!(!app.generate_view.is_running());
    assert_eq!(app.generate_view.error, None);
    let videos = app.generate_view.videos();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].url, "https://x");
    assert_eq!(app.generate_view.selected, Some(0));
    assert_eq!(fake.video_requests()[0].model, DEFAULT_VIDEO_MODEL);
    assert!(matches!(
        app.notifications.last().map(|n| n.level),
        Some(NotificationLevel::Success)
    ));
}

#[tokio::test(start_paused = true)]
async fn image_results_show_the_revised_prompt() {
    let fake = Arc::new(FakeStudioApi::new());
    fake.script_status("task-1", vec![status("RUNNING"), succeeded_image("https://img")]);
    let (mut app, jobs, mut rx) = test_app(fake);

    app.switch_view(View::Images, &jobs);
    app.execute(Command::Prompt("a lighthouse at dusk".into()), &jobs);
    app.generate(&jobs);
    next_work(&mut app, &jobs, &mut rx).await;

    assert_eq!(app.image_view.images().len(), 1);
    assert_eq!(app.image_view.revised_prompt(), Some("a revised prompt"));

    let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
    terminal.draw(|f| render_view(f, &app)).unwrap();
    let screen: String = terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect();
    assert!(screen.contains("Revised prompt"));
    assert!(screen.contains("a revised prompt"));
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_generation_clears_the_running_state() {
    let fake = Arc::new(FakeStudioApi::new());
    fake.script_status("task-1", vec![status("RUNNING")]);
    let (mut app, jobs, mut rx) = test_app(fake);

    app.execute(Command::Prompt("endless".into()), &jobs);
    app.generate(&jobs);
    app.cancel();

    next_work(&mut app, &jobs, &mut rx).await;

    assert!(!app.generate_view.is_running());
    assert!(app.generate_view.outcome.is_none());
    assert_eq!(
        app.notifications.last().map(|n| n.message.as_str()),
        Some("Generation cancelled.")
    );
}

#[tokio::test(start_paused = true)]
async fn escape_dismisses_the_banner_before_cancelling() {
    let fake = Arc::new(FakeStudioApi::new());
    fake.script_status("task-1", vec![status("RUNNING")]);
    let (mut app, jobs, _rx) = test_app(fake);
    app.apply(
        WorkResult::Session {
            user: Err("401".into()),
            banner: Some(NotificationBanner {
                messages: vec!["Maintenance at noon".into()],
            }),
        },
        &jobs,
    );
    app.execute(Command::Prompt("endless".into()), &jobs);
    app.generate(&jobs);

    assert_eq!(
        app.notifications.last().map(|n| n.footer_text()).as_deref(),
        Some("INFO: Maintenance at noon (Esc to dismiss)")
    );
    app.cancel();
    assert!(app.generate_view.is_running());
    assert!(app.notifications.iter().all(|n| !n.dismissable));
}

#[tokio::test]
async fn admin_views_are_gated() {
    let (mut app, jobs, _rx) = test_app(Arc::new(FakeStudioApi::new()));
    app.switch_view(View::Analytics, &jobs);
    assert_eq!(app.active_view, View::Generate);
    assert!(matches!(
        app.notifications.last().map(|n| n.level),
        Some(NotificationLevel::Warning)
    ));

    app.cycle_view(false, &jobs);
    assert_eq!(app.active_view, View::Prompts);
    app.cycle_view(false, &jobs);
    assert_eq!(app.active_view, View::Groups);
}

#[tokio::test]
async fn history_view_loads_rows_for_the_active_tab() {
    let fake = Arc::new(FakeStudioApi::new());
    fake.set_history(HistoryTab::Video, fixtures::history_page(3, 3));
    let (mut app, jobs, mut rx) = test_app(fake.clone());

    app.switch_view(View::History, &jobs);
    assert!(app.history_view.loading);
    next_work(&mut app, &jobs, &mut rx).await;

    assert!(!app.history_view.loading);
    assert_eq!(app.history_view.state.rows.len(), 3);
    assert_eq!(app.history_view.selected, Some(0));
    assert_eq!(fake.history_calls(), 1);

    app.select_previous();
    assert_eq!(app.history_view.selected, Some(2));
}

#[tokio::test]
async fn graph_commands_edit_the_selected_node() {
    let (mut app, jobs, mut rx) = test_app(Arc::new(FakeStudioApi::new()));
    app.switch_view(View::InfiniteGraph, &jobs);

    app.execute(Command::AddVideo("https://cdn.example/clip.mp4".into()), &jobs);
    next_work(&mut app, &jobs, &mut rx).await;
    assert_eq!(app.graph_view.graph.nodes().len(), 1);

    app.select_next();
    let id = app.graph_view.selected.unwrap();
    app.execute(Command::Prompt("sunset over the bay".into()), &jobs);
    assert_eq!(app.graph_view.error, None);
    assert_eq!(
        app.graph_view.graph.node(id).map(|n| n.data.prompt.as_str()),
        Some("sunset over the bay")
    );

    app.execute(Command::Duration(0), &jobs);
    assert!(app.graph_view.error.is_some());
}

#[tokio::test]
async fn commands_outside_their_view_are_reported() {
    let (mut app, jobs, _rx) = test_app(Arc::new(FakeStudioApi::new()));
    app.execute(Command::Connect, &jobs);
    assert_eq!(
        app.generate_view.error.as_deref(),
        Some("`connect` does not apply to Generate.")
    );
}

proptest! {
    #[test]
    fn keybinding_digit_switches_view(digit in 0u8..=9u8) {
        let ch = char::from(b'0' + digit);
        let action = map_key(key(KeyCode::Char(ch)));
        let expected = if ch == '0' { 9 } else { usize::from(digit) - 1 };
        prop_assert!(matches!(action, Some(Action::SwitchView(i)) if i == expected));
    }

    #[test]
    fn ctrl_keys_never_insert_characters(ch in proptest::char::range('a', 'z')) {
        let event = KeyEvent {
            code: KeyCode::Char(ch),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        };
        let action = map_key(event);
        match ch {
            'c' => prop_assert_eq!(action, Some(Action::Cancel)),
            'r' => prop_assert_eq!(action, Some(Action::Refresh)),
            _ => prop_assert_eq!(action, None),
        }
    }

    #[test]
    fn cost_color_is_monotonic(peak in 1.0f64..1000.0, a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let theme = AtelierTheme::atelier();
        let rank = |c| {
            if c == theme.success { 0 } else if c == theme.warning { 1 } else { 2 }
        };
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            rank(cost_color(low * peak, peak, &theme)) <= rank(cost_color(high * peak, peak, &theme))
        );
    }

    #[test]
    fn palette_never_panics(input in ".{0,40}") {
        let _ = commands::parse(&input);
    }
}
