//! Atelier Core - Data Types
//!
//! Client-side view models for the generative-media studio. The backend owns
//! persistence; everything here is transient state mirrored from REST
//! responses, plus the small amount of behavior that belongs with the data
//! (status normalization, media extraction, query building).

pub mod analytics;
pub mod data_url;
pub mod entities;
pub mod error;
pub mod generation;
pub mod graph;
pub mod history;
pub mod identity;
pub mod media;
pub mod task;

pub use analytics::*;
pub use data_url::{decode_data_url, encode_data_url, mime_from_file_name, DataUrl};
pub use entities::*;
pub use error::*;
pub use generation::*;
pub use graph::*;
pub use history::*;
pub use identity::*;
pub use media::*;
pub use task::*;
