//! The subset of Bot API objects the bot reads or writes.

use serde::{Deserialize, Serialize};

use crate::telegram::error::TelegramError;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, method: &'static str) -> Result<T, TelegramError> {
        if !self.ok {
            return Err(TelegramError::Api {
                method,
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
                retry_after: self.parameters.and_then(|p| p.retry_after),
            });
        }
        self.result.ok_or(TelegramError::EmptyResult { method })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub video: Option<MediaFile>,
    pub animation: Option<MediaFile>,
    pub document: Option<MediaFile>,
    pub photo: Option<Vec<MediaFile>>,
    pub sticker: Option<MediaFile>,
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
pub struct Chat {
    pub id: i64,
}

/// Shared shape of Video, Animation, Document, PhotoSize and Sticker.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFile {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_retry_after() {
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#,
        )
        .unwrap();

        let err = response.into_result("getUpdates").unwrap_err();
        assert_eq!(err.retry_after(), Some(5));
        assert!(err.to_string().contains("Too Many Requests"));
    }

    #[test]
    fn ok_envelope_without_result_is_an_error() {
        let response: ApiResponse<File> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(matches!(
            response.into_result("getFile"),
            Err(TelegramError::EmptyResult { method: "getFile" })
        ));
    }

    #[test]
    fn parses_file() {
        let response: ApiResponse<File> = serde_json::from_str(
            r#"{"ok":true,"result":{"file_id":"abc","file_unique_id":"u","file_size":2048,"file_path":"videos/file_1.mp4"}}"#,
        )
        .unwrap();
        let file = response.into_result("getFile").unwrap();
        assert_eq!(file.file_path.as_deref(), Some("videos/file_1.mp4"));
        assert_eq!(file.file_size, Some(2048));
    }
}
