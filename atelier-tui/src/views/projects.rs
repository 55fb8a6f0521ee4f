//! Creative projects with quota settings and assets.

use crate::state::App;
use crate::views::{error_line, two_column};
use crate::widgets::DetailPanel;
use atelier_core::{Membership, QuotaPeriod, QuotaType};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.projects_view;
    let (list_area, right) = two_column(area, 40);

    let list_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(list_area);

    let items: Vec<ListItem> = view
        .projects
        .iter()
        .map(|p| ListItem::new(format!("{} ({} members)", p.name, p.members().len())))
        .collect();
    let mut state = ListState::default();
    state.select(view.selected);
    let list = List::new(items)
        .block(Block::default().title("Projects  (Enter open, n new)").borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, list_chunks[0], &mut state);

    let status = error_line(view.error.as_deref(), &app.theme)
        .unwrap_or_else(|| Line::from(":members add|remove, :import, :quota, :unrestricted"));
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL)),
        list_chunks[1],
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)])
        .split(right);

    let mut fields = Vec::new();
    if let Some(project) = view.selected_project() {
        fields.push(("Name", project.name.clone()));
        fields.push(("Members", project.members().join(", ")));
        if let Some(by) = &project.created_by {
            fields.push(("Created by", by.clone()));
        }
        match &view.config {
            Some(config) => {
                fields.push(("Unrestricted", config.unrestricted.to_string()));
                fields.push(("Quota", quota_text(config.quota.kind, config.quota.limit, config.quota.period)));
            }
            None => fields.push(("Quota", "press Enter to load".to_string())),
        }
    }
    DetailPanel {
        title: "Project",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, chunks[0]);

    let assets: Vec<ListItem> = view
        .assets
        .iter()
        .map(|asset| {
            ListItem::new(format!(
                "[{}] {}",
                asset.kind.as_deref().unwrap_or("asset"),
                asset.prompt.as_deref().unwrap_or("(no prompt)")
            ))
        })
        .collect();
    f.render_widget(
        List::new(assets).block(Block::default().title("Assets").borders(Borders::ALL)),
        chunks[1],
    );
}

fn quota_text(kind: QuotaType, limit: Option<f64>, period: QuotaPeriod) -> String {
    let period = match period {
        QuotaPeriod::Daily => "day",
        QuotaPeriod::Weekly => "week",
    };
    match (kind, limit) {
        (QuotaType::NoLimit, _) => "no limit".to_string(),
        (QuotaType::CostLimit, Some(limit)) => format!("${:.2} per {}", limit, period),
        (QuotaType::GenerationQuantity, Some(limit)) => format!("{} generations per {}", limit, period),
        (_, None) => "limit not set".to_string(),
    }
}
