//! services/bot/src/bot/handlers.rs
//!
//! Telegram update routing. Commands are answered with static text; every other
//! message goes through the pipeline.

use crate::bot::replies;
use crate::bot::state::AppState;
use career_assistant_core::domain::InboundMessage;
use std::sync::Arc;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Perintah yang tersedia:")]
pub enum Command {
    #[command(description = "memulai bot")]
    Start,
    #[command(description = "menampilkan bantuan")]
    Help,
    #[command(description = "informasi teknis bot")]
    Info,
}

/// Build the teloxide update handler tree.
pub fn build_handler() -> UpdateHandler<HandlerError> {
    let command_handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message().endpoint(handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(message_handler)
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<AppState>) -> HandlerResult {
    info!(chat_id = msg.chat.id.0, command = ?cmd, "Command received.");
    let text = command_reply(&cmd, &state.config.completion.model);
    state.delivery.send(msg.chat.id.0, &text).await?;
    Ok(())
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> HandlerResult {
    let outcome = state.pipeline.handle(inbound_from(&msg)).await;
    debug!(chat_id = msg.chat.id.0, ?outcome, "Update processed.");
    Ok(())
}

fn command_reply(cmd: &Command, model: &str) -> String {
    match cmd {
        Command::Start => replies::START.to_string(),
        Command::Help => replies::HELP.to_string(),
        Command::Info => replies::info(model),
    }
}

/// Senders are missing for channel posts; the chat id stands in for the user there.
fn inbound_from(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: msg.chat.id.0,
        user_id: msg
            .from
            .as_ref()
            .map(|user| user.id.0 as i64)
            .unwrap_or(msg.chat.id.0),
        message_id: msg.id.0,
        text: msg.text().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_in_lowercase() {
        assert_eq!(Command::parse("/start", "career_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/help", "career_bot").unwrap(), Command::Help);
        assert_eq!(Command::parse("/info", "career_bot").unwrap(), Command::Info);
        assert!(Command::parse("/cari", "career_bot").is_err());
    }

    #[test]
    fn info_mentions_the_model() {
        assert!(command_reply(&Command::Info, "SeaLLMs/SeaLLMs-v3-7B-Chat")
            .contains("SeaLLMs/SeaLLMs-v3-7B-Chat"));
        assert_eq!(command_reply(&Command::Help, "m"), replies::HELP);
    }
}
