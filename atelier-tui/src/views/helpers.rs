//! Common view rendering helpers.

use crate::theme::AtelierTheme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Split `area` into a list column and a detail column.
pub fn two_column(area: Rect, left_percent: u16) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(left_percent),
            Constraint::Percentage(100 - left_percent),
        ])
        .split(area);
    (chunks[0], chunks[1])
}

/// A rectangle of the given percentage size centered in `area`.
pub fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn error_line<'a>(error: Option<&'a str>, theme: &AtelierTheme) -> Option<Line<'a>> {
    error.map(|e| Line::from(Span::styled(e, Style::default().fg(theme.error))))
}

/// Draw the model's rewrite of the prompt above a results list and return
/// the space left for the list.
pub fn revised_prompt_strip(
    f: &mut Frame<'_>,
    area: Rect,
    revised: Option<&str>,
    theme: &AtelierTheme,
) -> Rect {
    let Some(revised) = revised else {
        return area;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        revised,
        Style::default().fg(theme.text).add_modifier(Modifier::ITALIC),
    )))
    .wrap(Wrap { trim: true })
    .block(Block::default().title("Revised prompt").borders(Borders::ALL));
    f.render_widget(paragraph, chunks[0]);
    chunks[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_column_splits_full_width() {
        let area = Rect::new(0, 0, 100, 20);
        let (left, right) = two_column(area, 40);
        assert_eq!(left.width, 40);
        assert_eq!(right.width, 60);
        assert_eq!(right.x, 40);
    }

    #[test]
    fn centered_stays_inside() {
        let area = Rect::new(0, 0, 100, 50);
        let inner = centered(area, 60, 30);
        assert!(inner.x >= area.x && inner.right() <= area.right());
        assert!(inner.y >= area.y && inner.bottom() <= area.bottom());
    }
}
