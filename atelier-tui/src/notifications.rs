//! Notification system for the TUI.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "INFO",
            NotificationLevel::Warning => "WARN",
            NotificationLevel::Error => "ERROR",
            NotificationLevel::Success => "SUCCESS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Esc removes it before cancelling anything.
    pub dismissable: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            dismissable: false,
            created_at: Utc::now(),
        }
    }

    pub fn dismissable(mut self) -> Self {
        self.dismissable = true;
        self
    }

    /// Text shown in the footer.
    pub fn footer_text(&self) -> String {
        if self.dismissable {
            format!("{}: {} (Esc to dismiss)", self.level.label(), self.message)
        } else {
            format!("{}: {}", self.level.label(), self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_mentions_dismissal_only_when_possible() {
        let plain = Notification::new(NotificationLevel::Warning, "quota low");
        assert_eq!(plain.footer_text(), "WARN: quota low");

        let banner = Notification::new(NotificationLevel::Info, "Maintenance at noon").dismissable();
        assert_eq!(banner.footer_text(), "INFO: Maintenance at noon (Esc to dismiss)");
    }
}
