pub mod corpus;
pub mod embeddings;
pub mod feedback;
pub mod handlers;
pub mod search;
pub mod semantic;

pub mod error;
pub mod types;
pub mod config;

pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
