//! Configuration and error types shared by the tzcron crates.

pub mod config;
pub mod error;
