//! Sharing groups and the items shared into them.

use crate::state::App;
use crate::views::{error_line, two_column};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.groups_view;
    let (left, right) = two_column(area, 40);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(left);

    let focused = Style::default().fg(app.theme.border_focus);
    let unfocused = Style::default().fg(app.theme.border);

    let groups: Vec<ListItem> = view
        .groups
        .iter()
        .map(|g| ListItem::new(format!("{} ({})", g.name, g.members.len())))
        .collect();
    let mut group_state = ListState::default();
    group_state.select(view.selected);
    let list = List::new(groups)
        .block(
            Block::default()
                .title("Groups  (Enter open, n new)")
                .borders(Borders::ALL)
                .border_style(if view.focus_items { unfocused } else { focused }),
        )
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, left_chunks[0], &mut group_state);

    let mut lines = Vec::new();
    if let Some(group) = view.selected_group() {
        lines.push(Line::from(vec![
            Span::styled("Members: ", Style::default().fg(app.theme.secondary)),
            Span::raw(group.members.join(", ")),
        ]));
    }
    if let Some(line) = error_line(view.error.as_deref(), &app.theme) {
        lines.push(line);
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        left_chunks[1],
    );

    let items: Vec<ListItem> = view
        .items
        .iter()
        .map(|item| {
            let kind = if item.is_video() { "video" } else { "image" };
            ListItem::new(vec![
                Line::from(format!(
                    "[{}] {}",
                    kind,
                    item.prompt.as_deref().unwrap_or("(no prompt)")
                )),
                Line::from(Span::styled(
                    format!(
                        "   shared by {}  {}",
                        item.shared_by_user_email.as_deref().unwrap_or("?"),
                        item.model_used.as_deref().unwrap_or("")
                    ),
                    Style::default().fg(app.theme.text_muted),
                )),
            ])
        })
        .collect();
    let mut item_state = ListState::default();
    item_state.select(if view.focus_items { view.item_selected } else { None });
    let list = List::new(items)
        .block(
            Block::default()
                .title("Shared items  (l focus, d delete)")
                .borders(Borders::ALL)
                .border_style(if view.focus_items { focused } else { unfocused }),
        )
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, right, &mut item_state);
}
