//! Middleware module
//!
//! Request logging for the local tool server

pub mod logging;
