//! Image generation, enrichment and imitation.

use crate::state::App;
use crate::views::{error_line, revised_prompt_strip, two_column};
use crate::widgets::{DetailPanel, FilterBar, FilterOption};
use crate::commands::ImageMode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.image_view;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let modes: Vec<FilterOption> = [ImageMode::Generate, ImageMode::Enrich, ImageMode::Imitate]
        .iter()
        .map(|mode| FilterOption::new(mode.title(), *mode == view.mode))
        .collect();
    FilterBar {
        title: "Mode (t)",
        filters: &modes,
        active_style: Style::default().fg(app.theme.bg).bg(app.theme.primary),
        inactive_style: Style::default().fg(app.theme.text_dim),
    }
    .render(f, chunks[0]);

    let (form_area, results_area) = two_column(chunks[1], 45);

    let mut fields = vec![
        ("Prompt", view.prompt.clone()),
        ("Model", view.model.clone()),
        ("Aspect", view.aspect_ratio.clone()),
        ("Samples", view.sample_count.to_string()),
    ];
    if view.mode.needs_source() {
        let source = view
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none, use :source <path>)".to_string());
        fields.push(("Source", source));
    }
    if let Some(project) = &view.project_id {
        fields.push(("Project", project.clone()));
    }
    DetailPanel {
        title: view.mode.title(),
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, form_area);

    let results_area =
        revised_prompt_strip(f, results_area, view.revised_prompt(), &app.theme);
    let images = view.images();
    if images.is_empty() {
        let mut lines = vec![Line::from(if view.is_running() {
            "Generating… Esc to cancel"
        } else {
            "No images yet."
        })];
        if let Some(line) = error_line(view.error.as_deref(), &app.theme) {
            lines.push(line);
        }
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Images").borders(Borders::ALL));
        f.render_widget(paragraph, results_area);
        return;
    }

    let items: Vec<ListItem> = images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            ListItem::new(vec![
                Line::from(format!("#{} {}", i + 1, image.gcs_uri)),
                Line::from(format!("   {}", image.display_url().unwrap_or(""))),
            ])
        })
        .collect();
    let title = match view.outcome.as_ref().and_then(|o| o.model.as_deref()) {
        Some(model) => format!("Images ({})", model),
        None => "Images".to_string(),
    };
    let mut state = ListState::default();
    state.select(view.selected);
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, results_area, &mut state);
}
