use clipreel_core::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("{method} failed: {description}")]
    Api {
        method: &'static str,
        code: Option<i64>,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("{method} returned no result")]
    EmptyResult { method: &'static str },

    #[error("File is too big: {size} > {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// Seconds the Bot API asked us to wait before retrying.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            TelegramError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

// Request URLs embed the bot token; never let them reach a log line.
impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Http(e.without_url())
    }
}

impl From<TelegramError> for TransferError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::TooLarge { size, max } => TransferError::TooLarge { size, max },
            TelegramError::Io(io) => TransferError::Io(io),
            other => TransferError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}
