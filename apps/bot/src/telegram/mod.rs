pub mod api;
pub mod convert;
pub mod error;
pub mod transport;
pub mod types;

pub use api::TelegramApi;
pub use convert::to_inbound;
pub use error::TelegramError;
pub use transport::TelegramTransport;
