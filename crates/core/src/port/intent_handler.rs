// Intent Handler Port (inbound side of the chat transport)

use crate::domain::{Intent, IntentReply};
use async_trait::async_trait;

/// Implemented by the core; the transport calls it once per user action,
/// each call on its own task.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, intent: Intent) -> IntentReply;
}
