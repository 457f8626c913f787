//! Configuration module
//!
//! Environment-driven settings for the broker and its local tool server

pub mod settings;

pub use settings::{Settings, DEFAULT_BUDGET_MICRODOLLARS};
