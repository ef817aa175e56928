use teloxide::utils::command::BotCommands;

use crate::engine::intent::Intent;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Promo code bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Get today's discount code")]
    Discount,
    #[command(description = "Get today's drink code")]
    Drink,
}

impl Command {
    /// The claim intent behind a command, if it has one
    pub fn intent(&self) -> Option<Intent> {
        match self {
            Command::Help => None,
            Command::Start => Some(Intent::Start),
            Command::Discount => Some(Intent::ClaimDiscount),
            Command::Drink => Some(Intent::ClaimDrink),
        }
    }
}
