//! services/bot/src/adapters/telegram.rs
//!
//! The Telegram implementation of the `ChatTransport` port.
//! Platform rejections are folded into `TransportError` so the delivery manager can
//! decide between success, retry and fallback without knowing about Telegram.

use async_trait::async_trait;
use career_assistant_core::ports::{ChatTransport, TransportError};
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::{ApiError, RequestError};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    parse_mode: Option<ParseMode>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, parse_mode: Option<ParseMode>) -> Self {
        Self { bot, parse_mode }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32, TransportError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(mode) = self.parse_mode {
            request = request.parse_mode(mode);
        }
        let message = request.await.map_err(classify)?;
        Ok(message.id.0)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(mode) = self.parse_mode {
            request = request.parse_mode(mode);
        }
        request.await.map_err(classify)?;
        Ok(())
    }
}

fn classify(error: RequestError) -> TransportError {
    match error {
        RequestError::Api(ApiError::MessageNotModified) => TransportError::NotModified,
        RequestError::Api(ApiError::MessageToEditNotFound | ApiError::MessageIdInvalid) => {
            TransportError::NotFound
        }
        RequestError::Api(ApiError::MessageCantBeEdited) => TransportError::CannotEdit,
        RequestError::Api(ApiError::MessageIsTooLong) => TransportError::TooLong,
        RequestError::Network(e) if e.is_timeout() => TransportError::Timeout(e.to_string()),
        RequestError::Network(e) => TransportError::Network(e.to_string()),
        other => TransportError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rejections_map_to_transport_errors() {
        assert_eq!(
            classify(RequestError::Api(ApiError::MessageNotModified)),
            TransportError::NotModified
        );
        assert_eq!(
            classify(RequestError::Api(ApiError::MessageToEditNotFound)),
            TransportError::NotFound
        );
        assert_eq!(
            classify(RequestError::Api(ApiError::MessageCantBeEdited)),
            TransportError::CannotEdit
        );
        assert_eq!(
            classify(RequestError::Api(ApiError::MessageIsTooLong)),
            TransportError::TooLong
        );
        assert!(matches!(
            classify(RequestError::Api(ApiError::BotBlocked)),
            TransportError::Other(_)
        ));
    }
}
