//! HTTP request handlers.

pub mod generate;
pub mod health;

pub use generate::{GenerateRequest, generate};
pub use health::{health_check, test_endpoint};
