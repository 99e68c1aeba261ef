// Telegram ChatTransport Implementation

use crate::api::BotApi;
use crate::render;
use async_trait::async_trait;
use lineup_core::domain::{OutboundEvent, QueueSnapshot};
use lineup_core::error::{AppError, Result};
use lineup_core::port::ChatTransport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Posts events to the single group chat.
///
/// Queue snapshots are kept as one message per subject that is edited in
/// place; a new "queue open" announcement starts a fresh snapshot message.
pub struct TelegramTransport {
    api: Arc<BotApi>,
    chat_id: i64,
    snapshots: Mutex<HashMap<String, i64>>,
}

impl TelegramTransport {
    pub fn new(api: Arc<BotApi>, chat_id: i64) -> Self {
        Self {
            api,
            chat_id,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    async fn publish_snapshot(&self, snapshot: &QueueSnapshot) -> Result<()> {
        let text = render::snapshot(snapshot);
        let mut snapshots = self.snapshots.lock().await;

        if let Some(&message_id) = snapshots.get(&snapshot.subject) {
            match self
                .api
                .edit_message_text(self.chat_id, message_id, &text)
                .await
            {
                Ok(()) => return Ok(()),
                Err(AppError::Transport(msg)) if msg.contains("message is not modified") => {
                    return Ok(());
                }
                Err(e) => {
                    warn!(subject = %snapshot.subject, message_id, error = %e, "Snapshot edit failed, posting a new one");
                }
            }
        }

        let keyboard = render::queue_keyboard(&snapshot.action_token);
        let message_id = self
            .api
            .send_message(self.chat_id, &text, Some(&keyboard))
            .await?;
        snapshots.insert(snapshot.subject.clone(), message_id);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn emit(&self, event: &OutboundEvent) -> Result<()> {
        match event {
            OutboundEvent::QueueOpened(opened) => {
                let keyboard = render::queue_keyboard(&opened.action_token);
                self.api
                    .send_message(self.chat_id, &render::opened(opened), Some(&keyboard))
                    .await?;
                self.snapshots.lock().await.remove(&opened.subject);
            }
            OutboundEvent::Snapshot(snapshot) => self.publish_snapshot(snapshot).await?,
            OutboundEvent::Joined { .. } | OutboundEvent::Left { .. } => {
                self.api
                    .send_message(self.chat_id, &render::event(event), None)
                    .await?;
            }
        }
        debug!(subject = %event.subject(), "Chat event delivered");
        Ok(())
    }
}
