// Telegram Poller - long polling for button presses
//
// Each callback is handled on its own task so a slow sheet call for one user
// never holds up the others.

use crate::api::{BotApi, CallbackQuery};
use crate::callback::intent_from;
use crate::render;
use lineup_core::application::ShutdownToken;
use lineup_core::port::IntentHandler;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause after a failed getUpdates before trying again
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct TelegramPoller {
    api: Arc<BotApi>,
    poll_timeout_secs: u64,
}

impl TelegramPoller {
    pub fn new(api: Arc<BotApi>, poll_timeout: Duration) -> Self {
        Self {
            api,
            poll_timeout_secs: poll_timeout.as_secs(),
        }
    }

    /// Poll until shutdown, dispatching every callback to `handler`
    pub async fn run(&self, handler: Arc<dyn IntentHandler>, mut shutdown: ShutdownToken) {
        info!(poll_timeout_secs = self.poll_timeout_secs, "Telegram polling loop started");
        let mut offset = 0i64;

        loop {
            let updates = tokio::select! {
                _ = shutdown.wait() => break,
                result = self.api.get_updates(offset, self.poll_timeout_secs) => result,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(query) = update.callback_query {
                            self.dispatch(query, Arc::clone(&handler));
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Telegram polling error");
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Telegram polling loop stopped");
    }

    fn dispatch(&self, query: CallbackQuery, handler: Arc<dyn IntentHandler>) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let text = match intent_from(&query) {
                Some(intent) => {
                    debug!(kind = %intent.kind, token = %intent.token, user_id = query.from.id, "Button pressed");
                    render::reply(&handler.handle(intent).await)
                }
                None => {
                    warn!(data = ?query.data, "Ignoring callback with unknown data");
                    "Unknown action".to_string()
                }
            };

            if let Err(e) = api.answer_callback_query(&query.id, &text).await {
                warn!(callback_id = %query.id, error = %e, "Failed to answer callback query");
            }
        });
    }
}
