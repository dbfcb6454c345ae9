use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCategory {
    Sports,
    Politics,
    Economics,
    Technology,
    Entertainment,
    Weather,
    Crypto,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Active,
    PendingResolution,
    Resolved,
    Disputed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyTier {
    Public,
    SemiPrivate,
    Private,
}

/// Market snapshot as delivered by the feed. Read-only for the game core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub category: MarketCategory,
    pub status: MarketStatus,
    /// YES price in [0, 1]
    pub yes_price: f64,
    pub volume: f64,
    pub participants: u32,
    pub created_at: DateTime<Utc>,
    pub resolves_at: Option<DateTime<Utc>>,
    pub privacy: PrivacyTier,
}

impl Market {
    /// Implied YES probability as a percentage.
    pub fn yes_odds(&self) -> f64 {
        self.yes_price.clamp(0.0, 1.0) * 100.0
    }

    pub fn no_odds(&self) -> f64 {
        100.0 - self.yes_odds()
    }

    pub fn is_encrypted(&self) -> bool {
        self.privacy != PrivacyTier::Public
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> String {
        time_remaining(self.resolves_at, now)
    }
}

/// Human readable countdown, e.g. "1 day, 1 hour".
///
/// Truncates toward zero. Returns "Past date" once the target is reached and
/// an empty string when there is no target.
pub fn time_remaining(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(target) = target else {
        return String::new();
    };

    if target <= now {
        return "Past date".to_string();
    }

    let diff = target - now;
    let days = diff.num_days();
    let hours = diff.num_hours() % 24;

    if days == 0 {
        return plural(hours, "hour");
    }

    format!("{}, {}", plural(days, "day"), plural(hours, "hour"))
}

fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
