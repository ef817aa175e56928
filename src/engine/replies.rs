//! User-facing reply texts.

use super::policy::TimeWindow;

pub const WELCOME: &str = "Welcome! You scanned the QR code and activated your discount.";
pub const OUT_OF_DISCOUNT_CODES: &str =
    "Sorry, we are out of pizza codes. Bring a friend and try their phone! 🍕";
pub const DISCOUNT_EXHAUSTED: &str =
    "You already claimed your discount today. Come back tomorrow for a new one! 🍕";
pub const NOT_YET_ELIGIBLE: &str = "Please get your pizza discount first. Just say 'pizza'. 🍕";
pub const DRINK_EXHAUSTED: &str =
    "That's all for today! Come back tomorrow for another drink code. 🥤";
pub const OUT_OF_DRINK_CODES: &str = "Sorry, drink codes are finished. 🥤";
pub const TRY_AGAIN_LATER: &str =
    "Something went wrong on our side. Please try again in a moment. 🙏";

pub fn discount_code(code: &str) -> String {
    format!("Here is your discount code: {code}")
}

pub fn extra_discount_code(code: &str) -> String {
    format!(
        "You already claimed your discount today.\nBut alright… I’m giving you one more. Don’t tell the boss. 😅\n🍕 Extra discount code: {code}"
    )
}

pub fn drink_code(code: &str) -> String {
    format!("Here is your drink code: {code}")
}

pub fn outside_window(window: &TimeWindow) -> String {
    format!("We're not handing out codes right now. Come back {window}! 🕒")
}
