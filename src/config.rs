use anyhow::{anyhow, Result};
use std::env;

use crate::engine::intent::{IntentClassifier, DEFAULT_DISCOUNT_TRIGGERS, DEFAULT_DRINK_TRIGGERS};
use crate::engine::policy::{ClaimPolicy, RotationScope, TimeWindow};
use crate::utils::datetime::parse_utc_offset;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/promo.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub policy: ClaimPolicy,
    pub intents: IntentClassifier,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let port_str = non_empty_var("HTTP_PORT")
            .or_else(|| non_empty_var("PORT"))
            .unwrap_or_else(|| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        Ok(Config {
            telegram_bot_token: token,
            database_url: Self::database_url_from_env(),
            http_port,
            policy: policy_from_env()?,
            intents: intents_from_env(),
        })
    }

    /// Only the database location, for tools that never talk to Telegram
    pub fn database_url_from_env() -> String {
        non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| anyhow!("Invalid {}", name)),
        None => Ok(default),
    }
}

fn policy_from_env() -> Result<ClaimPolicy> {
    let defaults = ClaimPolicy::default();

    let daily_discount_cap = parse_var("DAILY_DISCOUNT_CAP", defaults.daily_discount_cap)?;
    if daily_discount_cap == 0 {
        return Err(anyhow!("DAILY_DISCOUNT_CAP must be at least 1"));
    }

    let rotation_scope = match non_empty_var("ROTATION_SCOPE") {
        Some(raw) => raw.parse::<RotationScope>()?,
        None => defaults.rotation_scope,
    };

    let reference_offset = match non_empty_var("REFERENCE_UTC_OFFSET") {
        Some(raw) => parse_utc_offset(&raw)
            .map_err(|_| anyhow!("Invalid REFERENCE_UTC_OFFSET '{}'", raw))?,
        None => defaults.reference_offset,
    };

    let claim_window = non_empty_var("CLAIM_WINDOW")
        .map(|raw| raw.parse::<TimeWindow>())
        .transpose()?;

    Ok(ClaimPolicy {
        daily_discount_cap,
        filler_fixed_count: parse_var("FILLER_FIXED_COUNT", defaults.filler_fixed_count)?,
        drink_prompt_fixed_count: parse_var(
            "DRINK_PROMPT_FIXED_COUNT",
            defaults.drink_prompt_fixed_count,
        )?,
        rotation_scope,
        reference_offset,
        claim_window,
        gate_drink_claims: parse_var("GATE_DRINK_CLAIMS", defaults.gate_drink_claims)?,
    })
}

fn intents_from_env() -> IntentClassifier {
    let words = |name: &str, defaults: &[&str]| -> Vec<String> {
        match non_empty_var(name) {
            Some(raw) => raw.split(',').map(|w| w.trim().to_string()).collect(),
            None => defaults.iter().map(|w| w.to_string()).collect(),
        }
    };

    IntentClassifier::new(
        words("DISCOUNT_TRIGGERS", DEFAULT_DISCOUNT_TRIGGERS),
        words("DRINK_TRIGGERS", DEFAULT_DRINK_TRIGGERS),
    )
}
