//! Per-message bot logic: commands, conversion pipeline, reply selection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    catalog::Catalog,
    convert::Converter,
    formatting::{
        clip_lines, convert_error_html, currencies_html, help_html, parse_error_html,
        result_html,
    },
    messaging::{port::MessagingPort, types::TextMessage},
    parser::parse_request,
    Result,
};

/// Split `/cmd@botname args` into a lower-cased command name and the rest.
fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Stateless between messages; share one instance across all chats.
pub struct RateBot {
    catalog: Arc<Catalog>,
    converter: Converter,
    diagnostic: bool,
}

impl RateBot {
    pub fn new(catalog: Arc<Catalog>, converter: Converter, diagnostic: bool) -> Self {
        Self {
            catalog,
            converter,
            diagnostic,
        }
    }

    /// Compute the reply for an inbound text. `None` means no reply is sent.
    pub async fn reply_to(&self, text: &str) -> Option<String> {
        if text.trim_start().starts_with('/') {
            let (cmd, _args) = parse_command(text);
            return Some(match cmd.as_str() {
                "values" => currencies_html(&self.catalog),
                _ => help_html(),
            });
        }

        let req = match parse_request(text, &self.catalog) {
            Ok(req) => req,
            Err(e) => {
                debug!("rejected input: {e}");
                return Some(parse_error_html(&e));
            }
        };

        match self.converter.convert(&req).await {
            Ok(result) => {
                info!(
                    "converted {} {} -> {} {} ({:?})",
                    result.amount, result.from, result.converted, result.to, result.origin
                );
                Some(result_html(&result))
            }
            Err(e) => {
                warn!("conversion {} -> {} failed: {e}", req.from, req.to);
                convert_error_html(&e, self.diagnostic)
            }
        }
    }

    /// Handle one inbound message end to end, replying through `messenger`.
    pub async fn handle_text(&self, messenger: &dyn MessagingPort, msg: &TextMessage) -> Result<()> {
        debug!(
            "message {} in chat {} from {}",
            msg.message_id.0,
            msg.chat_id.0,
            msg.username.as_deref().unwrap_or("unknown")
        );

        let Some(reply) = self.reply_to(&msg.text).await else {
            return Ok(());
        };

        let limit = messenger.capabilities().max_message_len;
        let reply = if reply.chars().count() > limit {
            clip_lines(&reply, limit)
        } else {
            reply
        };
        if reply.is_empty() {
            warn!("reply for chat {} does not fit one message, dropped", msg.chat_id.0);
            return Ok(());
        }

        messenger.send_html(msg.chat_id, &reply).await?;
        Ok(())
    }
}
