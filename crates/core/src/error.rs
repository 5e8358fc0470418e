use std::path::PathBuf;

use thiserror::Error;

use crate::types::MessageId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Too many clips: a reel holds at most {max}")]
    Capacity { max: usize },

    #[error("No clip registered for message {message_id}")]
    NotFound { message_id: MessageId },

    #[error("Message {message_id} is already part of this reel")]
    DuplicateMessage { message_id: MessageId },
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("The message has no downloadable file")]
    Missing,

    #[error("File is too big: {size} > {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("File is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to render")]
    NoSegments,

    #[error("Too many clips to render: {count} > {max}")]
    TooManyClips { count: usize, max: usize },

    #[error("Could not read duration of {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("ffmpeg failed while {stage}: {reason}")]
    Ffmpeg { stage: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing bot token: {env_var} environment variable is not set")]
    MissingToken { env_var: &'static str },

    #[error("Invalid value for {name}: {reason}")]
    InvalidLimit { name: &'static str, reason: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("A reel is already in progress")]
    AlreadyCollecting,

    #[error("No reel is in progress")]
    NotCollecting,
}

#[derive(Error, Debug)]
pub enum ClipreelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClipreelError>;
