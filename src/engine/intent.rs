//! Transport-independent classification of incoming text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    ClaimDiscount,
    ClaimDrink,
    Other,
}

/// Maps whole messages to intents by trigger word, ignoring case and
/// trailing punctuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentClassifier {
    discount_triggers: Vec<String>,
    drink_triggers: Vec<String>,
}

pub const DEFAULT_DISCOUNT_TRIGGERS: &[&str] = &["hi", "pizza", "discount"];
pub const DEFAULT_DRINK_TRIGGERS: &[&str] = &["yes", "drink"];

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_DISCOUNT_TRIGGERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_DRINK_TRIGGERS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl IntentClassifier {
    pub fn new(discount_triggers: Vec<String>, drink_triggers: Vec<String>) -> Self {
        Self {
            discount_triggers: normalize_all(discount_triggers),
            drink_triggers: normalize_all(drink_triggers),
        }
    }

    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize(text);

        if normalized == "/start" || normalized.starts_with("/start ") || normalized.starts_with("/start@") {
            return Intent::Start;
        }
        if self.discount_triggers.iter().any(|t| *t == normalized) {
            return Intent::ClaimDiscount;
        }
        if self.drink_triggers.iter().any(|t| *t == normalized) {
            return Intent::ClaimDrink;
        }
        Intent::Other
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['!', '.', '?'])
        .trim()
        .to_lowercase()
}

fn normalize_all(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| normalize(&w))
        .filter(|w| !w.is_empty())
        .collect()
}
