//! Data models

pub mod health;
pub mod product;

pub use health::{ConnectionCounts, HealthResponse};
pub use product::Product;
