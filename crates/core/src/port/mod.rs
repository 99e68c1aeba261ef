// Port Layer - Interfaces for external dependencies

pub mod chat_transport;
pub mod intent_handler;
pub mod mocks;
pub mod sheet_store;
pub mod time_provider;

// Re-exports
pub use chat_transport::ChatTransport;
pub use intent_handler::IntentHandler;
pub use sheet_store::SheetStore;
pub use time_provider::{parse_utc_offset, SystemTimeProvider, TimeProvider};
