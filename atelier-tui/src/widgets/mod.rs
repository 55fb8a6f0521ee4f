//! Reusable widget components.

pub mod detail;
pub mod filter;
pub mod input;
pub mod progress;
pub mod status;
pub mod tree;

pub use detail::DetailPanel;
pub use filter::{FilterBar, FilterOption};
pub use input::{InputBox, TextInput};
pub use progress::ProgressBar;
pub use status::StatusIndicator;
pub use tree::{TreeItem, TreeStyle, TreeWidget};
