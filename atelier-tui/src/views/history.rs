//! Per-tab generation history with filters and paging.

use crate::state::App;
use crate::theme::history_status_color;
use crate::views::two_column;
use crate::widgets::{DetailPanel, FilterBar, FilterOption};
use atelier_core::HistoryTab;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.history_view;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let tabs: Vec<FilterOption> = HistoryTab::all()
        .iter()
        .map(|tab| FilterOption::new(tab.title(), *tab == view.tab))
        .collect();
    FilterBar {
        title: "Tab (t)",
        filters: &tabs,
        active_style: Style::default().fg(app.theme.bg).bg(app.theme.primary),
        inactive_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, chunks[0]);

    render_filters(f, app, chunks[1]);

    let (list_area, detail_area) = two_column(chunks[2], 55);
    render_rows(f, app, list_area);
    render_detail(f, app, detail_area);
}

fn render_filters(f: &mut Frame<'_>, app: &App, area: Rect) {
    let state = &app.history_view.state;
    let filters = &state.filters;
    let mut options = Vec::new();
    if let Some(date) = filters.start_date {
        options.push(FilterOption::new(format!("from {}", date), true));
    }
    if let Some(date) = filters.end_date {
        options.push(FilterOption::new(format!("to {}", date), true));
    }
    if let Some(status) = &filters.status {
        options.push(FilterOption::new(format!("status {}", status), true));
    }
    if let Some(model) = &filters.model {
        options.push(FilterOption::new(format!("model {}", model), true));
    }
    if filters.is_edited {
        options.push(FilterOption::new("edited", true));
    }
    if filters.only_success {
        options.push(FilterOption::new("success only", true));
    }
    if !state.search_text.is_empty() {
        options.push(FilterOption::new(format!("search \"{}\"", state.search_text), true));
    }
    if options.is_empty() {
        options.push(FilterOption::new("no filters (:filter …, / search)", false));
    }
    FilterBar {
        title: "Filters (c clears)",
        filters: &options,
        active_style: Style::default().fg(app.theme.tertiary),
        inactive_style: Style::default().fg(app.theme.text_muted),
    }
    .render(f, area);
}

fn render_rows(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.history_view;
    let state = &view.state;
    let title = format!(
        "{}  page {}/{}  ({} total){}",
        view.tab.title(),
        state.page,
        state.total_pages(),
        state.total,
        if view.loading { "  loading…" } else { "" }
    );

    if state.rows.is_empty() {
        let text = match &state.error {
            Some(error) => Line::from(Span::styled(error.as_str(), Style::default().fg(app.theme.error))),
            None if view.loading || !state.has_fetched => Line::from("Loading…"),
            None => Line::from("Nothing here yet."),
        };
        let paragraph =
            Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state
        .rows
        .iter()
        .map(|row| {
            let status = row.status.as_deref();
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<9}", status.unwrap_or("-")),
                    Style::default().fg(history_status_color(status, &app.theme)),
                ),
                Span::raw(" "),
                Span::raw(truncate(row.prompt.as_deref().unwrap_or(""), 60)),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(view.selected);
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_detail(f: &mut Frame<'_>, app: &App, area: Rect) {
    let mut fields = Vec::new();
    if let Some(row) = app.history_view.selected_row() {
        let optional = [
            ("Prompt", &row.prompt),
            ("User", &row.user_email),
            ("Triggered", &row.trigger_time),
            ("Status", &row.status),
            ("Model", &row.model_used),
            ("Resolution", &row.resolution),
            ("Project", &row.project_name),
            ("Error", &row.error_message),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                fields.push((label, value.clone()));
            }
        }
        for uri in row.gcs_uris() {
            fields.push(("GCS", uri));
        }
        for url in row.display_urls() {
            fields.push(("URL", url.to_string()));
        }
    }
    DetailPanel {
        title: "Details  (s share, :clip, :upscale)",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, area);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("éééééé", 4), "ééé…");
    }
}
