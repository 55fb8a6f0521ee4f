//! Atelier theme and color utilities.

use crate::notifications::NotificationLevel;
use atelier_core::TaskStatus;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct AtelierTheme {
    pub bg: Color,
    pub bg_secondary: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub secondary_dim: Color,
    pub tertiary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub text_muted: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl AtelierTheme {
    pub fn atelier() -> Self {
        Self {
            bg: Color::Rgb(18, 18, 20),
            bg_secondary: Color::Rgb(30, 30, 34),
            bg_highlight: Color::Rgb(48, 48, 56),
            primary: Color::Rgb(138, 180, 248),
            primary_dim: Color::Rgb(66, 103, 178),
            secondary: Color::Rgb(242, 139, 130),
            secondary_dim: Color::Rgb(150, 80, 74),
            tertiary: Color::Rgb(253, 214, 99),
            success: Color::Rgb(129, 201, 149),
            warning: Color::Rgb(253, 214, 99),
            error: Color::Rgb(242, 139, 130),
            info: Color::Rgb(138, 180, 248),
            text: Color::Rgb(232, 234, 237),
            text_dim: Color::Rgb(154, 160, 166),
            text_muted: Color::Rgb(95, 99, 104),
            border: Color::Rgb(95, 99, 104),
            border_focus: Color::Rgb(138, 180, 248),
        }
    }
}

pub fn task_status_color(status: TaskStatus, theme: &AtelierTheme) -> Color {
    match status {
        TaskStatus::Pending => theme.text_dim,
        TaskStatus::Running => theme.primary,
        TaskStatus::Succeeded => theme.success,
        TaskStatus::Failed => theme.error,
    }
}

/// Color for the free-form status column of history rows.
pub fn history_status_color(status: Option<&str>, theme: &AtelierTheme) -> Color {
    match status
        .map(|s| s.trim().to_ascii_uppercase())
        .as_deref()
    {
        Some("SUCCESS") | Some("COMPLETED") => theme.success,
        Some("FAILURE") | Some("FAILED") | Some("ERROR") => theme.error,
        Some("RUNNING") | Some("PROCESSING") | Some("PENDING") => theme.primary,
        _ => theme.text_dim,
    }
}

pub fn notification_color(level: NotificationLevel, theme: &AtelierTheme) -> Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
        NotificationLevel::Success => theme.success,
    }
}

/// Share of the peak daily cost, for the analytics bars.
pub fn cost_color(cost: f64, peak: f64, theme: &AtelierTheme) -> Color {
    if peak <= 0.0 {
        return theme.text_dim;
    }
    let percent = cost / peak * 100.0;
    if percent < 50.0 {
        theme.success
    } else if percent < 85.0 {
        theme.warning
    } else {
        theme.error
    }
}
