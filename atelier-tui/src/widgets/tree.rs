//! Clip chain tree.
//!
//! One row per graph node, indented under its parent. Rows for clips that
//! are still generating use the pending style and a spinner glyph; the node
//! marked as the source of the next connection gets a bullet.

use atelier_core::NodeId;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub id: NodeId,
    pub label: String,
    pub depth: usize,
    pub expanded: bool,
    pub has_children: bool,
    pub generating: bool,
    pub marked: bool,
}

impl TreeItem {
    fn fold_glyph(&self) -> &'static str {
        match (self.has_children, self.expanded) {
            (false, _) => "  ",
            (true, true) => "▾ ",
            (true, false) => "▸ ",
        }
    }

    fn state_glyph(&self) -> &'static str {
        if self.generating {
            "◌ "
        } else if self.marked {
            "● "
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeStyle {
    pub normal: Style,
    pub pending: Style,
    pub marked: Style,
    pub selected: Style,
}

pub struct TreeWidget<'a> {
    pub title: &'a str,
    pub items: &'a [TreeItem],
    pub selected: Option<usize>,
    pub style: TreeStyle,
}

impl<'a> TreeWidget<'a> {
    fn row(&self, item: &'a TreeItem) -> Line<'a> {
        let style = if item.generating {
            self.style.pending
        } else if item.marked {
            self.style.marked
        } else {
            self.style.normal
        };
        Line::from(vec![
            Span::raw("  ".repeat(item.depth)),
            Span::raw(item.fold_glyph()),
            Span::styled(item.state_glyph(), style),
            Span::styled(item.label.as_str(), style),
        ])
    }

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let rows: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| ListItem::new(self.row(item)))
            .collect();
        let list = List::new(rows)
            .block(Block::default().title(self.title).borders(Borders::ALL))
            .highlight_style(self.style.selected);

        let mut state = ListState::default();
        state.select(self.selected);
        f.render_stateful_widget(list, area, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn item(depth: usize, generating: bool, marked: bool) -> TreeItem {
        TreeItem {
            id: NodeId::new(),
            label: "harbor at dawn".into(),
            depth,
            expanded: false,
            has_children: depth == 0,
            generating,
            marked,
        }
    }

    fn widget(items: &[TreeItem]) -> TreeWidget<'_> {
        TreeWidget {
            title: "Clips",
            items,
            selected: None,
            style: TreeStyle {
                normal: Style::default(),
                pending: Style::default().fg(Color::Yellow),
                marked: Style::default().fg(Color::Cyan),
                selected: Style::default(),
            },
        }
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn rows_show_fold_and_state() {
        let items = [item(0, false, true), item(1, true, false)];
        let tree = widget(&items);

        let root = tree.row(&items[0]);
        assert_eq!(text(&root), "▸ ● harbor at dawn");
        assert_eq!(root.spans[3].style.fg, Some(Color::Cyan));

        let pending = tree.row(&items[1]);
        assert_eq!(text(&pending), "    ◌ harbor at dawn");
        assert_eq!(pending.spans[3].style.fg, Some(Color::Yellow));
    }
}
