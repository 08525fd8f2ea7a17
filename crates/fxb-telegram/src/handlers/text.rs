use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use fxb_core::{
    domain::{ChatId, MessageId},
    messaging::types::TextMessage,
};

use crate::router::AppState;

pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(|s| s.to_string()) else {
        return Ok(());
    };

    let incoming = TextMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        username: msg.from().and_then(|u| u.username.clone()),
        text,
    };

    // Reply failures are logged and dropped.
    if let Err(e) = state
        .bot
        .handle_text(state.messenger.as_ref(), &incoming)
        .await
    {
        warn!("reply to chat {} failed: {e}", incoming.chat_id.0);
    }

    Ok(())
}
