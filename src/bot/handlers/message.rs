use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::Command;
use crate::bot::handlers::HandlerResult;
use crate::engine::intent::Intent;
use crate::engine::{ClaimPolicyEngine, Claimant};
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    engine: Arc<ClaimPolicyEngine>,
) -> HandlerResult {
    match cmd.intent() {
        Some(intent) => respond(bot, msg, intent, &engine).await?,
        None => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
    }
    Ok(())
}

/// Runs `intent` through the engine and sends every reply, in order.
pub async fn respond(
    bot: Bot,
    msg: Message,
    intent: Intent,
    engine: &ClaimPolicyEngine,
) -> ResponseResult<()> {
    let Some(claimant) = claimant_from(&msg) else {
        return Ok(());
    };
    let command = format!("{intent:?}");
    let user = claimant.handle.as_deref().unwrap_or(&claimant.display_name);
    let chat_id = msg.chat.id.0;

    log_command_start(&command, user, claimant.user_id, chat_id);

    let replies = engine.handle(&claimant, intent).await;
    for reply in &replies {
        if let Err(e) = bot.send_message(msg.chat.id, reply).await {
            log_command_error(&command, user, claimant.user_id, chat_id, &e.to_string());
            return Err(e);
        }
    }

    log_command_success(&command, user, claimant.user_id, chat_id, replies.len());
    Ok(())
}

pub fn claimant_from(msg: &Message) -> Option<Claimant> {
    let user = msg.from()?;
    Some(Claimant {
        user_id: user.id.0 as i64,
        display_name: user.first_name.clone(),
        handle: user.username.clone(),
    })
}
