//! Video generation form and results.

use crate::state::App;
use crate::theme::history_status_color;
use crate::views::{error_line, revised_prompt_strip, two_column};
use crate::widgets::{DetailPanel, StatusIndicator};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let (form_area, right) = two_column(area, 45);
    render_form(f, app, form_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(7),
        ])
        .split(right);
    render_status(f, app, chunks[0]);
    render_results(f, app, chunks[1]);
    render_upscales(f, app, chunks[2]);
}

fn render_form(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.generate_view;
    let params = &view.params;
    let mut fields = vec![
        ("Prompt", view.prompt.clone()),
        ("Model", params.model.clone()),
        ("Aspect", params.aspect_ratio.clone()),
        ("Duration", format!("{}s", params.duration)),
        ("Samples", params.sample_count.to_string()),
        ("Resolution", params.resolution.clone()),
        ("Audio", on_off(params.generate_audio)),
        ("Enhance", on_off(params.enhance_prompt)),
    ];
    if let Some(uri) = &view.first_frame {
        fields.push(("First frame", uri.clone()));
    }
    if let Some(uri) = &view.last_frame {
        fields.push(("Last frame", uri.clone()));
    }
    if let Some(project) = &view.project_id {
        fields.push(("Project", project.clone()));
    }
    DetailPanel {
        title: "Video  (:prompt, :model, … then g)",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, area);
}

fn render_status(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.generate_view;
    let (status, color) = if view.is_running() {
        ("Generating… Esc to cancel".to_string(), app.theme.primary)
    } else if let Some(error) = &view.error {
        (error.clone(), app.theme.error)
    } else if let Some(processed) = &view.processed {
        (
            format!("{} {}", processed.message, processed.processed_video_uri),
            app.theme.success,
        )
    } else {
        ("Idle".to_string(), app.theme.text_dim)
    };
    StatusIndicator {
        title: "Status".to_string(),
        status,
        style: Style::default().fg(color),
    }
    .render(f, area);
}

fn render_results(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.generate_view;
    let area = revised_prompt_strip(f, area, view.revised_prompt(), &app.theme);
    let items: Vec<ListItem> = view
        .videos()
        .iter()
        .enumerate()
        .map(|(i, video)| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("#{} {}", i + 1, video.gcs_uri),
                    Style::default().fg(app.theme.text),
                )),
                Line::from(Span::styled(
                    format!("   {}", video.url),
                    Style::default().fg(app.theme.text_muted),
                )),
            ])
        })
        .collect();

    if items.is_empty() {
        let mut lines = vec![Line::from("No videos yet.")];
        if let Some(line) = error_line(view.error.as_deref(), &app.theme) {
            lines.push(line);
        }
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Videos").borders(Borders::ALL));
        f.render_widget(paragraph, area);
        return;
    }

    let mut state = ListState::default();
    state.select(view.selected);
    let list = List::new(items)
        .block(
            Block::default()
                .title("Videos  (:clip, :dub, :upscale)")
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_upscales(f: &mut Frame<'_>, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .generate_view
        .upscale_jobs
        .iter()
        .map(|job| {
            let color = history_status_color(Some(job.status.as_str()), &app.theme);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<10}", job.status), Style::default().fg(color)),
                Span::raw(format!(
                    " {} {}",
                    job.resolution.as_deref().unwrap_or("-"),
                    job.download_url().unwrap_or(""),
                )),
            ]))
        })
        .collect();
    let list = List::new(items).block(Block::default().title("Upscales").borders(Borders::ALL));
    f.render_widget(list, area);
}

fn on_off(value: bool) -> String {
    let text = if value { "on" } else { "off" };
    text.to_string()
}
