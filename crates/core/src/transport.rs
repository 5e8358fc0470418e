use std::path::Path;

use async_trait::async_trait;

use crate::{
    error::TransferError,
    inbound::Command,
    types::{ChatId, MessageId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Video,
    Animation,
    Document,
}

/// A file sent to the bot, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// Platform handle used to fetch the file.
    pub file_id: String,
    /// Size declared by the platform, if known.
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
}

/// What the dispatcher needs from the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Publishes the command menu shown by the client.
    async fn register_commands(&self, commands: &[Command]) -> Result<(), TransferError>;

    async fn send_text(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        text: &str,
    ) -> Result<(), TransferError>;

    /// Downloads `attachment` into `destination`, refusing files over `max_size` bytes.
    async fn fetch_attachment(
        &self,
        attachment: &Attachment,
        destination: &Path,
        max_size: u64,
    ) -> Result<u64, TransferError>;

    async fn send_video(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
        video: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransferError>;
}
