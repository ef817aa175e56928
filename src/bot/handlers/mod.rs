pub mod general_message;
pub mod message;

use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::bot::commands::Command;
use crate::engine::intent::IntentClassifier;
use crate::engine::ClaimPolicyEngine;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

pub struct BotHandler {
    pub engine: Arc<ClaimPolicyEngine>,
    pub intents: Arc<IntentClassifier>,
}

impl BotHandler {
    pub fn new(engine: Arc<ClaimPolicyEngine>, intents: IntentClassifier) -> Self {
        Self {
            engine,
            intents: Arc::new(intents),
        }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        use teloxide::dispatching::UpdateFilterExt;

        let engine = self.engine.clone();
        let engine_text = self.engine.clone();
        let intents = self.intents.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let engine = engine.clone();
                        async move { message::command_handler(bot, msg, cmd, engine).await }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let engine = engine_text.clone();
                let intents = intents.clone();
                async move {
                    general_message::handle_general_message(bot, msg, engine, intents).await
                }
            }))
    }
}
