// Lineup Infrastructure - Telegram Adapter
// Implements: ChatTransport (outbound) and the callback poller (inbound)

pub mod api;
pub mod callback;
pub mod poller;
pub mod render;
pub mod transport;

pub use api::BotApi;
pub use poller::TelegramPoller;
pub use transport::TelegramTransport;
