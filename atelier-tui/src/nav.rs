//! Navigation and view switching utilities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    Generate,
    Images,
    History,
    InfiniteGraph,
    Projects,
    Groups,
    Analytics,
    Configurations,
    Prompts,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Generate => "Generate",
            View::Images => "Images",
            View::History => "History",
            View::InfiniteGraph => "Infinite",
            View::Projects => "Projects",
            View::Groups => "Groups",
            View::Analytics => "Analytics",
            View::Configurations => "Configurations",
            View::Prompts => "Prompts",
        }
    }

    pub fn all() -> &'static [View] {
        &[
            View::Generate,
            View::Images,
            View::History,
            View::InfiniteGraph,
            View::Projects,
            View::Groups,
            View::Analytics,
            View::Configurations,
            View::Prompts,
        ]
    }

    /// Views only an app admin can open.
    pub fn requires_admin(&self) -> bool {
        matches!(self, View::Analytics | View::Configurations)
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<View> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> View {
        let idx = self.index();
        let all = Self::all();
        let next = (idx + 1) % all.len();
        all[next]
    }

    pub fn previous(&self) -> View {
        let idx = self.index();
        let all = Self::all();
        let prev = if idx == 0 { all.len() - 1 } else { idx - 1 };
        all[prev]
    }
}
