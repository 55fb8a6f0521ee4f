//! Single-line text input used by the command palette and search box.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn push(&mut self, c: char) {
        self.value.push(c);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.value)
    }
}

pub struct InputBox<'a> {
    pub title: &'a str,
    pub prefix: &'a str,
    pub input: &'a TextInput,
    pub style: Style,
}

impl<'a> InputBox<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled(self.prefix, self.style),
            Span::raw(self.input.value()),
            Span::styled("_", self.style),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().title(self.title).borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}
