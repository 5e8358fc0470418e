use clipreel_core::{
    Attachment, AttachmentKind, ChatId, Command, Inbound, MessageId, Origin, UserId,
};

use crate::telegram::types::{MediaFile, Message, Update};

const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "webm", "mkv", "gif", "m4v"];

/// Decodes an update into a dispatcher event. Updates the bot does not act
/// on (unknown commands, other bots, service messages) yield `None`.
pub fn to_inbound(update: Update) -> Option<Inbound> {
    if let Some(edited) = update.edited_message {
        let origin = origin(&edited)?;
        return Some(Inbound::CaptionEdit {
            origin,
            caption: edited.caption,
        });
    }

    let message = update.message?;
    let origin = origin(&message)?;

    if let Some(attachment) = video_attachment(&message) {
        return Some(Inbound::Media {
            origin,
            attachment: Some(attachment),
            caption: message.caption,
        });
    }
    if message.document.is_some() || message.photo.is_some() || message.sticker.is_some() {
        return Some(Inbound::Media {
            origin,
            attachment: None,
            caption: message.caption,
        });
    }

    let text = message.text?;
    if text.starts_with('/') {
        let command = text.parse::<Command>().ok()?;
        return Some(Inbound::Command { origin, command });
    }
    Some(Inbound::Text { origin, text })
}

fn origin(message: &Message) -> Option<Origin> {
    let from = message.from.as_ref().filter(|u| !u.is_bot)?;
    Some(Origin {
        chat: ChatId(message.chat.id),
        user: UserId(from.id),
        message: MessageId(message.message_id),
        sender_name: from.first_name.clone(),
    })
}

fn video_attachment(message: &Message) -> Option<Attachment> {
    // Animations also carry a `document`; check them first.
    if let Some(video) = &message.video {
        return Some(attachment(AttachmentKind::Video, video));
    }
    if let Some(animation) = &message.animation {
        return Some(attachment(AttachmentKind::Animation, animation));
    }
    message
        .document
        .as_ref()
        .filter(|doc| is_video_document(doc))
        .map(|doc| attachment(AttachmentKind::Document, doc))
}

fn attachment(kind: AttachmentKind, file: &MediaFile) -> Attachment {
    Attachment {
        kind,
        file_id: file.file_id.clone(),
        file_size: file.file_size,
        mime_type: file.mime_type.clone(),
    }
}

fn is_video_document(doc: &MediaFile) -> bool {
    if let Some(mime) = &doc.mime_type {
        return mime.starts_with("video/") || mime == "image/gif";
    }
    doc.file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    const FROM: &str = r#""from":{"id":7,"is_bot":false,"first_name":"Sam"},"chat":{"id":100,"type":"private"}"#;

    #[test]
    fn video_message_with_caption() {
        let inbound = to_inbound(update(&format!(
            r#"{{"update_id":1,"message":{{"message_id":10,{FROM},"caption":"hi","video":{{"file_id":"v1","file_unique_id":"u","width":1,"height":1,"duration":2,"file_size":1000,"mime_type":"video/mp4"}}}}}}"#
        )))
        .unwrap();

        let Inbound::Media {
            origin,
            attachment: Some(attachment),
            caption,
        } = inbound
        else {
            panic!("expected a video message");
        };
        assert_eq!(origin.chat, ChatId(100));
        assert_eq!(origin.user, UserId(7));
        assert_eq!(origin.message, MessageId(10));
        assert_eq!(origin.sender_name, "Sam");
        assert_eq!(attachment.kind, AttachmentKind::Video);
        assert_eq!(attachment.file_id, "v1");
        assert_eq!(attachment.file_size, Some(1000));
        assert_eq!(caption.as_deref(), Some("hi"));
    }

    #[test]
    fn animation_wins_over_its_document() {
        let inbound = to_inbound(update(&format!(
            r#"{{"update_id":2,"message":{{"message_id":11,{FROM},"animation":{{"file_id":"a1"}},"document":{{"file_id":"a1","mime_type":"video/mp4"}}}}}}"#
        )))
        .unwrap();

        assert!(matches!(
            inbound,
            Inbound::Media { attachment: Some(Attachment { kind: AttachmentKind::Animation, .. }), .. }
        ));
    }

    #[test]
    fn documents_are_classified_by_type() {
        let video_doc = to_inbound(update(&format!(
            r#"{{"update_id":3,"message":{{"message_id":12,{FROM},"document":{{"file_id":"d1","file_name":"clip.MOV"}}}}}}"#
        )))
        .unwrap();
        assert!(matches!(
            video_doc,
            Inbound::Media { attachment: Some(Attachment { kind: AttachmentKind::Document, .. }), .. }
        ));

        let pdf = to_inbound(update(&format!(
            r#"{{"update_id":4,"message":{{"message_id":13,{FROM},"document":{{"file_id":"d2","mime_type":"application/pdf"}}}}}}"#
        )))
        .unwrap();
        assert!(matches!(pdf, Inbound::Media { attachment: None, .. }));
    }

    #[test]
    fn edited_message_is_a_caption_edit() {
        let inbound = to_inbound(update(&format!(
            r#"{{"update_id":5,"edited_message":{{"message_id":10,{FROM},"caption":"fixed","video":{{"file_id":"v1"}}}}}}"#
        )))
        .unwrap();

        assert_eq!(
            inbound,
            Inbound::CaptionEdit {
                origin: Origin {
                    chat: ChatId(100),
                    user: UserId(7),
                    message: MessageId(10),
                    sender_name: "Sam".to_string(),
                },
                caption: Some("fixed".to_string()),
            }
        );
    }

    #[test]
    fn commands_and_text() {
        let command = to_inbound(update(&format!(
            r#"{{"update_id":6,"message":{{"message_id":14,{FROM},"text":"/end@ClipReelBot"}}}}"#
        )))
        .unwrap();
        assert!(matches!(command, Inbound::Command { command: Command::End, .. }));

        let unknown = to_inbound(update(&format!(
            r#"{{"update_id":7,"message":{{"message_id":15,{FROM},"text":"/dance"}}}}"#
        )));
        assert!(unknown.is_none());

        let text = to_inbound(update(&format!(
            r#"{{"update_id":8,"message":{{"message_id":16,{FROM},"text":"lol"}}}}"#
        )))
        .unwrap();
        assert!(matches!(text, Inbound::Text { text: ref body, .. } if body == "lol"));
    }

    #[test]
    fn ignores_bots_and_anonymous_posts() {
        let from_bot = to_inbound(update(
            r#"{"update_id":9,"message":{"message_id":17,"from":{"id":8,"is_bot":true,"first_name":"Other"},"chat":{"id":100},"text":"hi"}}"#,
        ));
        assert!(from_bot.is_none());

        let channel = to_inbound(update(
            r#"{"update_id":10,"message":{"message_id":18,"chat":{"id":-100},"text":"hi"}}"#,
        ));
        assert!(channel.is_none());
    }
}
