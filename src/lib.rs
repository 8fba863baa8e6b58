pub mod api;
pub mod cache;
pub mod config;
pub mod delivery;
pub mod enrichment;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod models;
pub mod registry;

pub use error::{AppError, Result};
