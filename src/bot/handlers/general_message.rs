use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::handlers::message::respond;
use crate::bot::handlers::HandlerResult;
use crate::engine::intent::IntentClassifier;
use crate::engine::ClaimPolicyEngine;

pub async fn handle_general_message(
    bot: Bot,
    msg: Message,
    engine: Arc<ClaimPolicyEngine>,
    intents: Arc<IntentClassifier>,
) -> HandlerResult {
    // Stickers, photos and the like get no reply
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let intent = intents.classify(text);
    respond(bot, msg, intent, &engine).await?;
    Ok(())
}
