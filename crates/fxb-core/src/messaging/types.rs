use crate::domain::{ChatId, MessageId};

/// Cross-messenger incoming text message.
///
/// Telegram-specific fields should live in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub username: Option<String>,
    pub text: String,
}

/// Limits of a messenger implementation. Replies are always Telegram-style HTML.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
