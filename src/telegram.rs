//! Minimal Telegram Bot API client: long polling for text messages and plain-text replies.

use std::time::Duration;

use eyre::{Result, bail};
use log::debug;
use serde::Deserialize;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many characters
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// A text message worth handing to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
}

impl Update {
    /// Text messages only; falls back to the chat id when the sender is hidden
    pub fn incoming(&self) -> Option<Incoming> {
        let message = self.message.as_ref()?;
        let text = message.text.clone()?;
        let user_id = message.from.as_ref().map(|u| u.id).unwrap_or(message.chat.id);
        Some(Incoming {
            chat_id: message.chat.id,
            user_id,
            text,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BotApi {
    client: reqwest::Client,
    base: String,
}

impl BotApi {
    pub fn new(client: reqwest::Client, token: &str) -> Self {
        Self {
            client,
            base: format!("{API_BASE}/bot{token}"),
        }
    }

    /// The bot's own account; also proves the token works
    pub async fn get_me(&self) -> Result<User> {
        let resp = self
            .client
            .post(format!("{}/getMe", self.base))
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let api: ApiResponse<User> = resp.json().await?;
        unwrap_api("getMe", api)
    }

    /// Long-poll for updates newer than `offset`
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message"]
        });

        let resp = self
            .client
            .post(format!("{}/getUpdates", self.base))
            // leave headroom over the server-side long-poll wait
            .timeout(poll_timeout + Duration::from_secs(10))
            .json(&body)
            .send()
            .await?;

        let api: ApiResponse<Vec<Update>> = resp.json().await?;
        unwrap_api("getUpdates", api)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            debug!("sendMessage to chat {chat_id}: {} chars", chunk.chars().count());
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk
            });

            let resp = self
                .client
                .post(format!("{}/sendMessage", self.base))
                .timeout(Duration::from_secs(30))
                .json(&body)
                .send()
                .await?;

            let api: ApiResponse<serde_json::Value> = resp.json().await?;
            unwrap_api("sendMessage", api)?;
        }
        Ok(())
    }
}

fn unwrap_api<T>(method: &str, api: ApiResponse<T>) -> Result<T> {
    if !api.ok {
        bail!(
            "{method} failed: {}",
            api.description.unwrap_or_else(|| "no description".to_string())
        );
    }
    match api.result {
        Some(result) => Ok(result),
        None => bail!("{method} returned ok without a result"),
    }
}

/// Whether `text` is a bot command at all, whichever bot it addresses
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// The command name if `text` is a bot command meant for `bot_username`:
/// "/start@my_bot payload" -> "start". Commands addressed to another bot yield `None`.
pub fn command<'a>(text: &'a str, bot_username: &str) -> Option<&'a str> {
    let first = text.trim_start().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    match name.split_once('@') {
        Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => Some(name),
        Some(_) => None,
        None => Some(name),
    }
}

/// Split `text` into pieces of at most `limit` characters, never inside a char
pub fn split_message(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![text];
    }
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest.char_indices().nth(limit).map(|(idx, _)| idx).unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
