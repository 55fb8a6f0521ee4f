//! Form and detail panel: one `label  value` row per field.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const UNSET: &str = "unset";

pub struct DetailPanel<'a> {
    pub title: &'a str,
    pub fields: Vec<(&'a str, String)>,
    /// Label style. Blank values are drawn dimmed as `unset`.
    pub style: Style,
}

impl<'a> DetailPanel<'a> {
    fn lines(&self) -> Vec<Line<'_>> {
        let width = self
            .fields
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        self.fields
            .iter()
            .map(|(label, value)| {
                let value = if value.trim().is_empty() {
                    Span::styled(UNSET, Style::default().add_modifier(Modifier::DIM))
                } else {
                    Span::raw(value.as_str())
                };
                Line::from(vec![
                    Span::styled(format!("{:<width$}  ", label), self.style),
                    value,
                ])
            })
            .collect()
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let widget = Paragraph::new(self.lines())
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        f.render_widget(widget, area);
    }
}
