//! Raw application configuration document, editable by admins.

use crate::state::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.configurations_view;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let body = match &view.document {
        Some(document) => serde_json::to_string_pretty(document)
            .unwrap_or_else(|err| format!("unprintable document: {}", err)),
        None => "Loading…".to_string(),
    };
    let title = if view.dirty {
        "Configurations  [modified, :save to write]"
    } else {
        "Configurations"
    };
    f.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL)),
        chunks[0],
    );

    let status = match &view.error {
        Some(error) => Line::from(Span::styled(error.as_str(), Style::default().fg(app.theme.error))),
        None => Line::from(Span::styled(
            ":set <key> <json> then :save",
            Style::default().fg(app.theme.text_dim),
        )),
    };
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );
}
