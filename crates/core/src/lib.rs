//! Clipreel Core Library
//!
//! Collects short clips sent to a chat bot, keeps them in order with their
//! captions, and stitches them into a single video with ffmpeg.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod inbound;
pub mod render;
pub mod session;
pub mod staging;
pub mod store;
pub mod transport;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{BotConfig, RenderSettings, SessionLimits};
pub use dispatcher::Dispatcher;
pub use error::{
    ClipreelError, ConfigError, RenderError, Result, SessionError, StoreError, TransferError,
};
pub use format::{format_bytes, format_timestamp, wrap_caption};
pub use inbound::{Command, Inbound, Origin};
pub use render::{FfmpegRenderer, RenderPlan, RenderSummary, Renderer};
pub use session::{Session, SessionRegistry, SessionState};
pub use staging::StagingArea;
pub use store::SegmentStore;
pub use transport::{Attachment, AttachmentKind, ChatTransport};
pub use types::{ChatId, MessageId, Segment, SegmentId, SessionKey, UserId};
