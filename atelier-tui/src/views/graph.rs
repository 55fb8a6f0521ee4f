//! Infinite node graph of chained clips.

use crate::state::App;
use crate::views::{error_line, two_column};
use crate::widgets::{DetailPanel, TreeStyle, TreeWidget};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let view = &app.graph_view;
    let (tree_area, right) = two_column(area, 50);

    let items = view.tree_items();
    let selected = view
        .selected
        .and_then(|id| items.iter().position(|item| item.id == id));
    let title = format!(
        "Clips ({} nodes, {} edges){}",
        view.graph.nodes().len(),
        view.graph.edges().len(),
        if view.is_running() { "  generating…" } else { "" }
    );
    TreeWidget {
        title: &title,
        items: &items,
        selected,
        style: TreeStyle {
            normal: Style::default().fg(app.theme.text),
            pending: Style::default().fg(app.theme.warning),
            marked: Style::default().fg(app.theme.tertiary),
            selected: Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight),
        },
    }
    .render(f, tree_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(right);

    let mut fields = Vec::new();
    if let Some(node) = view.selected.and_then(|id| view.graph.node(id)) {
        let data = &node.data;
        fields.push(("Node", node.id.to_string()));
        fields.push(("Prompt", data.prompt.clone()));
        fields.push(("Model", data.params.model.clone()));
        fields.push(("Duration", format!("{}s", data.params.duration)));
        fields.push(("Aspect", data.params.aspect_ratio.clone()));
        match (&data.source_file, data.remote_url()) {
            (Some(file), _) => fields.push(("File", file.file_name.clone())),
            (None, Some(url)) => fields.push(("Video", url.to_string())),
            (None, None) => {}
        }
        if let Some(start) = data.start_time {
            fields.push(("Frame at", format!("{:.1}s", start)));
        }
        fields.push((
            "Position",
            format!("({:.0}, {:.0})", node.position.x, node.position.y),
        ));
        if view.marked == Some(node.id) {
            fields.push(("Marked", "source of next :connect".to_string()));
        }
    }
    DetailPanel {
        title: "Node",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, chunks[0]);

    let mut lines = vec![Line::from(format!(
        "Next frame at {:.1}s  •  g continue  •  space mark  •  d delete",
        view.capture_time
    ))];
    if let Some(line) = error_line(view.error.as_deref(), &app.theme) {
        lines.push(line);
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Chain").borders(Borders::ALL));
    f.render_widget(paragraph, chunks[1]);
}
