//! Minimal Telegram Bot API client: the handful of methods the bot uses.

use lineup_core::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP request gives up
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

pub struct BotApi {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl BotApi {
    /// `poll_timeout` bounds how long `get_updates` may hold a connection
    pub fn new(token: impl Into<String>, poll_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + HTTP_TIMEOUT_SLACK)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token: token.into(),
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Telegram {method} failed: {e}")))?;

        let body: TelegramApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Invalid Telegram {method} response: {e}")))?;

        if !body.ok {
            return Err(AppError::Transport(format!(
                "Telegram API error in {method}: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| AppError::Transport(format!("Telegram {method} returned no result")))
    }

    /// Long-poll for callback queries after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["callback_query"],
            }),
        )
        .await
    }

    /// Post a message, returning its id
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        let message: Message = self.call("sendMessage", body).await?;
        Ok(message.message_id)
    }

    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    /// Toast shown to the user who pressed a button
    pub async fn answer_callback_query(&self, callback_query_id: &str, text: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_query_id, "text": text }),
            )
            .await?;
        Ok(())
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api(server: &MockServer) -> BotApi {
        BotApi::new("123:abc", Duration::from_secs(1))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_get_updates_requests_callbacks_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .and(body_partial_json(json!({
                "offset": 5,
                "allowed_updates": ["callback_query"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "update_id": 5,
                    "callback_query": {
                        "id": "cb1",
                        "from": {"id": 7, "is_bot": false, "first_name": "Ivan", "username": "ivan"},
                        "data": "join_ALG"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let updates = assert_ok!(api(&server).await.get_updates(5, 0).await);
        assert_eq!(updates.len(), 1);
        let query = updates[0].callback_query.as_ref().unwrap();
        assert_eq!(query.data.as_deref(), Some("join_ALG"));
        assert_eq!(query.from.username.as_deref(), Some("ivan"));
    }

    #[tokio::test]
    async fn test_api_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = assert_err!(api(&server).await.send_message(1, "hi", None).await);
        assert!(matches!(err, AppError::Transport(msg) if msg.contains("chat not found")));
    }

    #[tokio::test]
    async fn test_send_message_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({"chat_id": -100, "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 42, "date": 0, "chat": {"id": -100, "type": "group"}}
            })))
            .mount(&server)
            .await;

        let id = assert_ok!(api(&server).await.send_message(-100, "hello", None).await);
        assert_eq!(id, 42);
    }
}
