//! Shared prompt gallery.

use crate::state::App;
use crate::views::{error_line, two_column};
use crate::widgets::DetailPanel;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.prompts_view;
    let (left, detail_area) = two_column(area, 55);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(left);

    let items: Vec<ListItem> = view
        .page
        .rows
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::raw(entry.prompt_text.clone()),
                Span::styled(
                    format!("  {}", entry.keywords.join(", ")),
                    Style::default().fg(app.theme.tertiary),
                ),
            ]))
        })
        .collect();
    let title = format!(
        "Prompts  page {}/{}{}",
        view.page_number,
        view.total_pages(),
        view.tags
            .as_deref()
            .map(|t| format!("  tags: {}", t))
            .unwrap_or_default()
    );
    let mut state = ListState::default();
    state.select(view.selected);
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, chunks[0], &mut state);

    let status = error_line(view.error.as_deref(), &app.theme).unwrap_or_else(|| {
        Line::from(Span::styled(
            "n save prompt • / filter by tags • d delete",
            Style::default().fg(app.theme.text_dim),
        ))
    });
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );

    let mut fields = Vec::new();
    if let Some(entry) = view.selected.and_then(|i| view.page.rows.get(i)) {
        fields.push(("Prompt", entry.prompt_text.clone()));
        fields.push(("Keywords", entry.keywords.join(", ")));
        if let Some(name) = &entry.created_by_name {
            fields.push(("By", name.clone()));
        }
        if let Some(email) = &entry.created_by_email {
            fields.push(("Email", email.clone()));
        }
    }
    DetailPanel {
        title: "Prompt",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, detail_area);
}
