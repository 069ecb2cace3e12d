// src/telegram.rs
//
// Минимальный клиент Telegram Bot API: ровно те вызовы, что нужны
// для выдачи доступа (approveChatJoinRequest, createChatInviteLink,
// banChatMember, sendMessage). Авторизация — токен в пути.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug)]
pub enum TelegramError {
    Http(reqwest::Error),
    Api { description: String },
    InvalidResponse(String),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Http(e) => write!(f, "http error: {e}"),
            TelegramError::Api { description } => {
                write!(f, "telegram api error: {description}")
            }
            TelegramError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Одобряет заявку пользователя на вступление. false — по любой
    /// причине: нет заявки, не хватает прав, сетевая ошибка. Дальше
    /// сервис выдачи уходит в запасной путь с инвайт-ссылкой.
    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> bool;

    /// Создаёт одноразовую инвайт-ссылку с абсолютным сроком действия.
    async fn create_invite_link(
        &self,
        chat_id: i64,
        expire_unixtime: i64,
    ) -> Result<String, TelegramError>;

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        until_unixtime: i64,
    ) -> Result<(), TelegramError>;

    /// Отправка сообщения best effort: неудача логируется и не мешает
    /// основному потоку.
    async fn send_message(&self, chat_id: i64, text: &str);
}

#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    api_base: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        TelegramClient {
            token: token.to_string(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, TelegramError> {
        let url = format!("{}/bot{}/{method}", self.api_base, self.token);
        let resp = reqwest::Client::new()
            .post(&url)
            .timeout(Duration::from_secs(15))
            .json(&body)
            .send()
            .await?;

        let body = resp.text().await?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| TelegramError::InvalidResponse(format!("{e}; body={body}")))?;

        if data.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(TelegramError::Api { description });
        }

        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BotTransport for TelegramClient {
    async fn approve_join_request(&self, chat_id: i64, user_id: i64) -> bool {
        let body = json!({ "chat_id": chat_id, "user_id": user_id });
        match self.call("approveChatJoinRequest", body).await {
            Ok(_) => {
                log::info!("пользователь {user_id} добавлен в канал {chat_id}");
                true
            }
            Err(e) => {
                log::error!("не удалось добавить {user_id} в канал {chat_id}: {e}");
                false
            }
        }
    }

    async fn create_invite_link(
        &self,
        chat_id: i64,
        expire_unixtime: i64,
    ) -> Result<String, TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "member_limit": 1,
            "expire_date": expire_unixtime,
        });
        let result = self.call("createChatInviteLink", body).await?;

        result
            .get("invite_link")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| TelegramError::InvalidResponse("нет invite_link в ответе".to_string()))
    }

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        until_unixtime: i64,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "until_date": until_unixtime,
        });
        self.call("banChatMember", body).await?;
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) {
        let body = json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" });
        if let Err(e) = self.call("sendMessage", body).await {
            log::error!("не удалось отправить сообщение {chat_id}: {e}");
        }
    }
}
