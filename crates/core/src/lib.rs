// Lineup Core - Queue state, recurrence math and notification scheduling
// NO infrastructure dependencies: the spreadsheet and the chat are ports

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
