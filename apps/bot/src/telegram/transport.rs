use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use clipreel_core::{Attachment, ChatId, ChatTransport, Command, MessageId, TransferError};
use tracing::debug;

use crate::telegram::{api::TelegramApi, types::BotCommand};

/// [`ChatTransport`] over the Telegram Bot API.
pub struct TelegramTransport {
    api: Arc<TelegramApi>,
}

impl TelegramTransport {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn register_commands(&self, commands: &[Command]) -> Result<(), TransferError> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|c| BotCommand {
                command: c.name().to_string(),
                description: c.description().to_string(),
            })
            .collect();
        self.api.set_my_commands(&commands).await?;
        Ok(())
    }

    async fn send_text(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        text: &str,
    ) -> Result<(), TransferError> {
        self.api
            .send_message(chat.0, text, reply_to.map(|m| m.0))
            .await?;
        Ok(())
    }

    async fn fetch_attachment(
        &self,
        attachment: &Attachment,
        destination: &Path,
        max_size: u64,
    ) -> Result<u64, TransferError> {
        if let Some(size) = attachment.file_size
            && size > max_size
        {
            return Err(TransferError::TooLarge {
                size,
                max: max_size,
            });
        }

        let file = self.api.get_file(&attachment.file_id).await?;
        if let Some(size) = file.file_size
            && size > max_size
        {
            return Err(TransferError::TooLarge {
                size,
                max: max_size,
            });
        }
        let file_path = file.file_path.ok_or(TransferError::Missing)?;

        debug!(kind = ?attachment.kind, %file_path, "downloading attachment");
        Ok(self.api.download(&file_path, destination, max_size).await?)
    }

    async fn send_video(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        video: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransferError> {
        self.api
            .send_video(chat.0, video, reply_to.map(|m| m.0), caption)
            .await?;
        Ok(())
    }
}
