//! Cost analytics for admins.

use crate::state::App;
use crate::theme::cost_color;
use crate::widgets::{DetailPanel, ProgressBar};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.analytics_view;
    let range = match (view.range.start_date, view.range.end_date) {
        (None, None) => "all time".to_string(),
        (start, end) => format!(
            "{} to {}",
            start.map(|d| d.to_string()).unwrap_or_else(|| "…".into()),
            end.map(|d| d.to_string()).unwrap_or_else(|| "…".into()),
        ),
    };

    let Some(report) = &view.report else {
        let text = match (&view.error, view.loading) {
            (Some(error), _) => Line::from(Span::styled(error.as_str(), Style::default().fg(app.theme.error))),
            (None, true) => Line::from("Loading…"),
            (None, false) => Line::from("No data. Ctrl+r to load."),
        };
        f.render_widget(
            Paragraph::new(text).block(
                Block::default()
                    .title(format!("Analytics ({})", range))
                    .borders(Borders::ALL),
            ),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    let summary = &report.summary;
    DetailPanel {
        title: &format!("Summary ({})", range),
        fields: vec![
            ("Total", format!("${:.2}", summary.total_cost)),
            ("Video", format!("${:.2}", summary.total_video_cost)),
            ("Image", format!("${:.2}", summary.total_image_cost)),
            (
                "Generations",
                report.model_distribution.total_generations().to_string(),
            ),
        ],
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, top[0]);

    let message = match &view.error {
        Some(error) => Line::from(Span::styled(error.as_str(), Style::default().fg(app.theme.error))),
        None => Line::from(":filter from|to YYYY-MM-DD, c clears"),
    };
    f.render_widget(
        Paragraph::new(message).block(Block::default().title("Range").borders(Borders::ALL)),
        top[1],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_daily(f, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(columns[1]);

    let users: Vec<ListItem> = report
        .top_users
        .iter()
        .map(|u| ListItem::new(format!("{:<32} ${:.2}", u.user_email, u.total_cost)))
        .collect();
    f.render_widget(
        List::new(users).block(Block::default().title("Top users").borders(Borders::ALL)),
        right[0],
    );

    let models: Vec<ListItem> = report
        .model_distribution
        .video
        .iter()
        .chain(report.model_distribution.image.iter())
        .map(|m| ListItem::new(format!("{:<40} {}", m.label(), m.generation_count)))
        .collect();
    f.render_widget(
        List::new(models).block(Block::default().title("Models").borders(Borders::ALL)),
        right[1],
    );

    let projects: Vec<ListItem> = view
        .by_project
        .iter()
        .flat_map(|r| r.project_consumption.iter())
        .map(|p| ListItem::new(format!("{:<32} ${:.2}", p.project_name, p.total_cost)))
        .collect();
    f.render_widget(
        List::new(projects).block(Block::default().title("Projects").borders(Borders::ALL)),
        right[2],
    );
}

fn render_daily(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(report) = &app.analytics_view.report else {
        return;
    };
    let block = Block::default().title("Daily cost").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let peak = report.peak_daily_cost();
    let visible = usize::from(inner.height / 3);
    let days: Vec<_> = report
        .daily_consumption
        .iter()
        .rev()
        .take(visible)
        .collect();
    let constraints: Vec<Constraint> = days.iter().map(|_| Constraint::Length(3)).collect();
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);
    for (day, slot) in days.iter().zip(slots.iter()) {
        ProgressBar {
            title: day.consumption_date.clone(),
            value: day.total_cost,
            max: peak,
            label: format!(
                "${:.2} (video ${:.2}, image ${:.2})",
                day.total_cost, day.video_cost, day.image_cost
            ),
            style: Style::default().fg(cost_color(day.total_cost, peak, &app.theme)),
        }
        .render(f, *slot);
    }
}
