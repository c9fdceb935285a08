// Public API for integration tests and library usage

pub mod app;
pub mod config;
pub mod error;
pub mod prompts;
pub mod protocol;
pub mod scheduler;
pub mod shuffle;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;
