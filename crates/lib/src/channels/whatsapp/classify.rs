//! Inbound classifier: maps one webhook message to exactly one [`MessageKind`].
//!
//! Predicates are evaluated in a fixed priority order and the first match wins. The
//! order is significant: a text body is checked before anything interactive, and the
//! fallback is always [`MessageKind::Unsupported`], so classification is total.

use super::payload::{InboundMessage, LocationContent, MediaContent};
use serde_json::Value;

/// Classified message, borrowing the fields each kind needs for normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind<'a> {
    UserText(&'a str),
    Image(&'a MediaContent),
    Sticker(&'a MediaContent),
    Video(&'a MediaContent),
    Document(&'a MediaContent),
    Audio(&'a MediaContent),
    /// First contact card of a non-empty contacts list.
    Contact(&'a Value),
    Location(&'a LocationContent),
    /// `id` of the tapped reply button.
    QuickReplyButton(&'a str),
    /// `id` of the selected list row.
    ListReply(&'a str),
    Unsupported,
}

impl MessageKind<'_> {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::UserText(_) => "text",
            MessageKind::Image(_) => "image",
            MessageKind::Sticker(_) => "sticker",
            MessageKind::Video(_) => "video",
            MessageKind::Document(_) => "document",
            MessageKind::Audio(_) => "audio",
            MessageKind::Contact(_) => "contact",
            MessageKind::Location(_) => "location",
            MessageKind::QuickReplyButton(_) => "button_reply",
            MessageKind::ListReply(_) => "list_reply",
            MessageKind::Unsupported => "unsupported",
        }
    }
}

/// Classify a message. Pure; never fails.
pub fn classify(message: &InboundMessage) -> MessageKind<'_> {
    if let Some(body) = user_text(message) {
        return MessageKind::UserText(body);
    }
    if let Some(media) = media(message, "image", message.image.as_ref()) {
        return MessageKind::Image(media);
    }
    if let Some(media) = media(message, "sticker", message.sticker.as_ref()) {
        return MessageKind::Sticker(media);
    }
    if let Some(media) = media(message, "video", message.video.as_ref()) {
        return MessageKind::Video(media);
    }
    if let Some(media) = media(message, "document", message.document.as_ref()) {
        return MessageKind::Document(media);
    }
    if let Some(media) = media(message, "audio", message.audio.as_ref()) {
        return MessageKind::Audio(media);
    }
    if let Some(contact) = message.contacts.as_ref().and_then(|c| c.first()) {
        return MessageKind::Contact(contact);
    }
    if let Some(location) = message
        .location
        .as_ref()
        .filter(|l| l.latitude.is_some() && l.longitude.is_some())
    {
        return MessageKind::Location(location);
    }
    if let Some(id) = interactive_reply(message, "button_reply") {
        return MessageKind::QuickReplyButton(id);
    }
    if let Some(id) = interactive_reply(message, "list_reply") {
        return MessageKind::ListReply(id);
    }
    MessageKind::Unsupported
}

/// Text body of a message that is not an echo of our own send.
fn user_text(message: &InboundMessage) -> Option<&str> {
    if message.is_echo.unwrap_or(false) {
        return None;
    }
    message.text.as_ref()?.body.as_deref()
}

fn media<'a>(
    message: &InboundMessage,
    kind: &str,
    content: Option<&'a MediaContent>,
) -> Option<&'a MediaContent> {
    if message.kind.as_deref() == Some(kind) {
        content
    } else {
        None
    }
}

fn interactive_reply<'a>(message: &'a InboundMessage, kind: &str) -> Option<&'a str> {
    if message.kind.as_deref() != Some("interactive") {
        return None;
    }
    let interactive = message.interactive.as_ref()?;
    if interactive.kind.as_deref() != Some(kind) {
        return None;
    }
    let reply = match kind {
        "button_reply" => interactive.button_reply.as_ref(),
        _ => interactive.list_reply.as_ref(),
    }?;
    reply.id.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> InboundMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_body_is_user_text() {
        let msg = parse(r#"{"type":"text","text":{"body":"hello there"}}"#);
        assert_eq!(classify(&msg), MessageKind::UserText("hello there"));
    }

    #[test]
    fn echoed_text_is_not_user_text() {
        let msg = parse(r#"{"type":"text","is_echo":true,"text":{"body":"sent by us"}}"#);
        assert_eq!(classify(&msg), MessageKind::Unsupported);
    }

    #[test]
    fn text_wins_over_interactive_fields() {
        let msg = parse(
            r#"{"type":"interactive","text":{"body":"typed"},
                "interactive":{"type":"button_reply","button_reply":{"id":"yes"}}}"#,
        );
        assert_eq!(classify(&msg), MessageKind::UserText("typed"));
    }

    #[test]
    fn media_kinds_need_matching_type() {
        let image = parse(r#"{"type":"image","image":{"id":"m1","caption":"look"}}"#);
        assert!(matches!(classify(&image), MessageKind::Image(m) if m.id.as_deref() == Some("m1")));

        let sticker = parse(r#"{"type":"sticker","sticker":{"id":"s1"}}"#);
        assert_eq!(classify(&sticker).name(), "sticker");

        let video = parse(r#"{"type":"video","video":{"id":"v1"}}"#);
        assert_eq!(classify(&video).name(), "video");

        let document = parse(r#"{"type":"document","document":{"id":"d1"}}"#);
        assert_eq!(classify(&document).name(), "document");

        let audio = parse(r#"{"type":"audio","audio":{"id":"a1"}}"#);
        assert_eq!(classify(&audio).name(), "audio");

        let mismatched = parse(r#"{"type":"video","image":{"id":"m1"}}"#);
        assert_eq!(classify(&mismatched), MessageKind::Unsupported);
    }

    #[test]
    fn contact_requires_non_empty_list() {
        let msg = parse(r#"{"type":"contacts","contacts":[{"name":{"formatted_name":"Bo"}}]}"#);
        assert_eq!(classify(&msg).name(), "contact");

        let empty = parse(r#"{"type":"contacts","contacts":[]}"#);
        assert_eq!(classify(&empty), MessageKind::Unsupported);
    }

    #[test]
    fn location_requires_both_coordinates() {
        let msg = parse(r#"{"type":"location","location":{"latitude":12.5,"longitude":77.25}}"#);
        assert_eq!(classify(&msg).name(), "location");

        let partial = parse(r#"{"type":"location","location":{"latitude":12.5}}"#);
        assert_eq!(classify(&partial), MessageKind::Unsupported);
    }

    #[test]
    fn interactive_replies() {
        let button = parse(
            r#"{"type":"interactive","interactive":{"type":"button_reply","button_reply":{"id":"/affirm","title":"Yes"}}}"#,
        );
        assert_eq!(classify(&button), MessageKind::QuickReplyButton("/affirm"));

        let list = parse(
            r#"{"type":"interactive","interactive":{"type":"list_reply","list_reply":{"id":"opt_3"}}}"#,
        );
        assert_eq!(classify(&list), MessageKind::ListReply("opt_3"));

        let unknown = parse(r#"{"type":"interactive","interactive":{"type":"nfm_reply"}}"#);
        assert_eq!(classify(&unknown), MessageKind::Unsupported);

        let no_id = parse(
            r#"{"type":"interactive","interactive":{"type":"list_reply","list_reply":{"id":null,"title":"Tea"}}}"#,
        );
        assert_eq!(classify(&no_id), MessageKind::Unsupported);
    }

    #[test]
    fn empty_message_is_unsupported() {
        assert_eq!(classify(&InboundMessage::default()), MessageKind::Unsupported);
    }
}
