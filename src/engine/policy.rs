use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Whether message rotation counters are kept per user or shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationScope {
    PerUser,
    Global,
}

impl FromStr for RotationScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" | "per-user" | "per_user" => Ok(RotationScope::PerUser),
            "global" => Ok(RotationScope::Global),
            other => Err(anyhow!("Invalid ROTATION_SCOPE '{}' (expected 'user' or 'global')", other)),
        }
    }
}

/// Hours of the reference day during which claims are accepted.
///
/// `open_hour` is inclusive and `close_hour` exclusive. A window whose close
/// hour is lower than its open hour wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl TimeWindow {
    pub fn new(open_hour: u32, close_hour: u32) -> Result<Self> {
        if open_hour > 23 || close_hour > 24 {
            return Err(anyhow!("Invalid CLAIM_WINDOW hours {}-{}", open_hour, close_hour));
        }
        if open_hour == close_hour {
            return Err(anyhow!("CLAIM_WINDOW must not be empty"));
        }
        Ok(Self { open_hour, close_hour })
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.open_hour < self.close_hour {
            hour >= self.open_hour && hour < self.close_hour
        } else {
            hour >= self.open_hour || hour < self.close_hour
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "between {:02}:00 and {:02}:00", self.open_hour, self.close_hour)
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (open, close) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow!("Invalid CLAIM_WINDOW '{}' (expected e.g. '10-22')", s))?;
        let open = open
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid CLAIM_WINDOW '{}' (expected e.g. '10-22')", s))?;
        let close = close
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid CLAIM_WINDOW '{}' (expected e.g. '10-22')", s))?;
        TimeWindow::new(open, close)
    }
}

/// Tunables of the claim engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// Discount codes a user may receive per reference day
    pub daily_discount_cap: u32,
    /// Filler messages served in order before random selection starts
    pub filler_fixed_count: usize,
    /// Drink prompts served in order before random selection starts
    pub drink_prompt_fixed_count: usize,
    pub rotation_scope: RotationScope,
    pub reference_offset: FixedOffset,
    pub claim_window: Option<TimeWindow>,
    /// Whether `claim_window` also applies to drink claims
    pub gate_drink_claims: bool,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            daily_discount_cap: 2,
            filler_fixed_count: 3,
            drink_prompt_fixed_count: 1,
            rotation_scope: RotationScope::PerUser,
            reference_offset: Utc.fix(),
            claim_window: None,
            gate_drink_claims: true,
        }
    }
}
