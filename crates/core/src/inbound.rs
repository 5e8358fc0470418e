use std::str::FromStr;

use thiserror::Error;

use crate::{
    transport::Attachment,
    types::{ChatId, MessageId, SessionKey, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    New,
    End,
    Undo,
    Cancel,
}

impl Command {
    /// Commands advertised in the client's command menu.
    pub const MENU: [Command; 5] = [
        Command::New,
        Command::End,
        Command::Undo,
        Command::Cancel,
        Command::Help,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::New => "new",
            Command::End => "end",
            Command::Undo => "undo",
            Command::Cancel => "cancel",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Start => "Say hello",
            Command::Help => "How to make a reel",
            Command::New => "Start creating a new reel",
            Command::End => "Finish and render the reel",
            Command::Undo => "Drop the last clip",
            Command::Cancel => "Throw the current reel away",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Parses `/name`, `/name@botname` and `/name args`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCommand(text.to_string());
        let word = text
            .split_whitespace()
            .next()
            .and_then(|w| w.strip_prefix('/'))
            .ok_or_else(unknown)?;
        let name = word.split('@').next().unwrap_or(word);

        match name.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "new" => Ok(Command::New),
            "end" => Ok(Command::End),
            "undo" => Ok(Command::Undo),
            "cancel" => Ok(Command::Cancel),
            _ => Err(unknown()),
        }
    }
}

/// Who sent a message, where, and which message it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub chat: ChatId,
    pub user: UserId,
    pub message: MessageId,
    pub sender_name: String,
}

impl Origin {
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            chat: self.chat,
            user: self.user,
        }
    }
}

/// A chat event after the transport has decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command {
        origin: Origin,
        command: Command,
    },
    /// A media message. `attachment` is `None` when the file is not a video.
    Media {
        origin: Origin,
        attachment: Option<Attachment>,
        caption: Option<String>,
    },
    CaptionEdit {
        origin: Origin,
        caption: Option<String>,
    },
    Text {
        origin: Origin,
        text: String,
    },
}

impl Inbound {
    pub fn origin(&self) -> &Origin {
        match self {
            Inbound::Command { origin, .. }
            | Inbound::Media { origin, .. }
            | Inbound::CaptionEdit { origin, .. }
            | Inbound::Text { origin, .. } => origin,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Command { .. } => "command",
            Inbound::Media { .. } => "media",
            Inbound::CaptionEdit { .. } => "caption_edit",
            Inbound::Text { .. } => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("/new".parse::<Command>(), Ok(Command::New));
        assert_eq!("/end@ClipReelBot".parse::<Command>(), Ok(Command::End));
        assert_eq!("/Help me please".parse::<Command>(), Ok(Command::Help));
        assert_eq!("  /undo".parse::<Command>(), Ok(Command::Undo));
    }

    #[test]
    fn rejects_unknown_or_plain_text() {
        assert!("/frobnicate".parse::<Command>().is_err());
        assert!("new".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn unknown_command_names_the_input() {
        let err = "/dance now".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "unknown command: /dance now");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn menu_round_trips_through_names() {
        for command in Command::MENU {
            assert_eq!(format!("/{}", command.name()).parse::<Command>(), Ok(command));
        }
    }
}
