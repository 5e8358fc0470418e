use std::{path::Path, time::Duration};

use reqwest::{
    Body, Client, Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::telegram::{
    error::TelegramError,
    types::{ApiResponse, BotCommand, File, Message, Update, User},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimal Telegram Bot API client.
pub struct TelegramApi {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramApi {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn parse<T: DeserializeOwned>(
        method: &'static str,
        response: Response,
    ) -> Result<T, TelegramError> {
        // Error replies carry a JSON body too, so the status is not checked first.
        let envelope: ApiResponse<T> = response.json().await?;
        envelope.into_result(method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        debug!(method, "bot api call");
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", json!({}), REQUEST_TIMEOUT).await
    }

    /// Polling and webhooks are exclusive; make sure no webhook is set.
    pub async fn delete_webhook(&self) -> Result<bool, TelegramError> {
        self.call("deleteWebhook", json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-polls for updates after `offset`, waiting up to `timeout_secs`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "edited_message"],
            }),
            Duration::from_secs(timeout_secs) + REQUEST_TIMEOUT,
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<Message, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = reply_parameters(message_id);
        }
        self.call("sendMessage", body, REQUEST_TIMEOUT).await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<bool, TelegramError> {
        self.call(
            "setMyCommands",
            json!({ "commands": commands }),
            REQUEST_TIMEOUT,
        )
        .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    /// Streams a file to `destination`, giving up once more than `max_size` bytes arrive.
    pub async fn download(
        &self,
        file_path: &str,
        destination: &Path,
        max_size: u64,
    ) -> Result<u64, TelegramError> {
        let mut response = self
            .client
            .get(self.file_url(file_path))
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        if let Some(size) = response.content_length()
            && size > max_size
        {
            return Err(TelegramError::TooLarge {
                size,
                max: max_size,
            });
        }

        let mut file = fs::File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > max_size {
                return Err(TelegramError::TooLarge {
                    size: written,
                    max: max_size,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(bytes = written, "file downloaded");
        Ok(written)
    }

    pub async fn send_video(
        &self,
        chat_id: i64,
        video: &Path,
        reply_to: Option<i64>,
        caption: Option<&str>,
    ) -> Result<Message, TelegramError> {
        // Streamed from disk; a reel can be tens of megabytes.
        let file = fs::File::open(video).await?;
        let length = file.metadata().await?.len();
        let part = Part::stream_with_length(Body::from(file), length)
            .file_name("reel.mp4")
            .mime_str("video/mp4")?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("supports_streaming", "true")
            .part("video", part);
        if let Some(message_id) = reply_to {
            form = form.text("reply_parameters", reply_parameters(message_id).to_string());
        }
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendVideo"))
            .timeout(TRANSFER_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        Self::parse("sendVideo", response).await
    }
}

fn reply_parameters(message_id: i64) -> serde_json::Value {
    json!({
        "message_id": message_id,
        "allow_sending_without_reply": true,
    })
}
