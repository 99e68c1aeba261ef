// Chat Transport Port (outbound side)

use crate::domain::OutboundEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Delivers core events to the notification channel
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one event. Fails with `AppError::Transport`.
    async fn emit(&self, event: &OutboundEvent) -> Result<()>;
}
