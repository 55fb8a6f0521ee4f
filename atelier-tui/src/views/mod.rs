//! View rendering dispatch.

pub mod analytics;
pub mod configurations;
pub mod generate;
pub mod graph;
pub mod groups;
pub mod helpers;
pub mod history;
pub mod images;
pub mod projects;
pub mod prompts;

pub use helpers::{centered, error_line, revised_prompt_strip, two_column};

use crate::nav::View;
use crate::state::App;
use crate::theme::notification_color;
use crate::widgets::InputBox;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

pub fn render_view(f: &mut Frame<'_>, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, app, layout[0]);

    match app.active_view {
        View::Generate => generate::render(f, app, layout[1]),
        View::Images => images::render(f, app, layout[1]),
        View::History => history::render(f, app, layout[1]),
        View::InfiniteGraph => graph::render(f, app, layout[1]),
        View::Projects => projects::render(f, app, layout[1]),
        View::Groups => groups::render(f, app, layout[1]),
        View::Analytics => analytics::render(f, app, layout[1]),
        View::Configurations => configurations::render(f, app, layout[1]),
        View::Prompts => prompts::render(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);

    if let Some(modal) = &app.modal {
        let area = centered(f.size(), 60, 30);
        let paragraph = Paragraph::new(modal.message.as_str())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(modal.title.as_str())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border_focus)),
            );
        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let user = app
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "signed out".to_string());
    let titles: Vec<Line> = View::all()
        .iter()
        .filter(|v| !v.requires_admin() || app.is_admin())
        .map(|v| Line::from(v.title()))
        .collect();
    let selected = View::all()
        .iter()
        .filter(|v| !v.requires_admin() || app.is_admin())
        .position(|v| *v == app.active_view)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(app.theme.text_dim))
        .highlight_style(
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title(Span::styled(
            format!("ATELIER | {}", user),
            Style::default().fg(app.theme.primary),
        )));
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    if let Some(input) = &app.command_palette {
        InputBox {
            title: "Command",
            prefix: ":",
            input,
            style: Style::default().fg(app.theme.primary),
        }
        .render(f, area);
        return;
    }
    if let Some(input) = &app.search {
        InputBox {
            title: "Search",
            prefix: "/",
            input,
            style: Style::default().fg(app.theme.secondary),
        }
        .render(f, area);
        return;
    }

    let help = "Tab switch view • j/k move • g generate • : command • / search • ? help • q quit";
    let (text, style) = match app.notifications.last() {
        Some(note) => (
            note.footer_text(),
            Style::default().fg(notification_color(note.level, &app.theme)),
        ),
        None => (help.to_string(), Style::default().fg(app.theme.text_dim)),
    };
    let footer = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(style);
    f.render_widget(footer, area);
}
