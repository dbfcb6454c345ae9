use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use crate::game::stats::UserStats;

/// Metric snapshot the evaluator runs against. Absent fields deserialize to zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metrics {
    pub total_predictions: u32,
    pub accuracy: f64,
    pub current_streak: u32,
    pub total_volume: f64,
    pub encrypted_votes: u32,
}

impl From<&UserStats> for Metrics {
    fn from(stats: &UserStats) -> Self {
        Self {
            total_predictions: stats.total_predictions,
            accuracy: stats.accuracy(),
            current_streak: stats.current_streak,
            total_volume: stats.total_volume,
            encrypted_votes: stats.encrypted_votes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnlockRule {
    TotalPredictions(u32),
    CurrentStreak(u32),
    TotalVolume(f64),
    EncryptedVotes(u32),
    Accuracy { min_accuracy: f64, min_predictions: u32 },
}

impl UnlockRule {
    pub fn is_satisfied(&self, metrics: &Metrics) -> bool {
        match *self {
            UnlockRule::TotalPredictions(n) => metrics.total_predictions >= n,
            UnlockRule::CurrentStreak(n) => metrics.current_streak >= n,
            UnlockRule::TotalVolume(v) => metrics.total_volume >= v,
            UnlockRule::EncryptedVotes(n) => metrics.encrypted_votes >= n,
            UnlockRule::Accuracy { min_accuracy, min_predictions } => {
                metrics.total_predictions >= min_predictions && metrics.accuracy >= min_accuracy
            }
        }
    }

    pub fn max_progress(&self) -> u32 {
        match *self {
            UnlockRule::TotalPredictions(n)
            | UnlockRule::CurrentStreak(n)
            | UnlockRule::EncryptedVotes(n) => n,
            UnlockRule::TotalVolume(v) => v as u32,
            UnlockRule::Accuracy { min_accuracy, .. } => min_accuracy as u32,
        }
    }

    /// Current value of the metric this rule watches, capped at `max_progress`.
    pub fn progress(&self, metrics: &Metrics) -> u32 {
        let raw = match *self {
            UnlockRule::TotalPredictions(_) => metrics.total_predictions,
            UnlockRule::CurrentStreak(_) => metrics.current_streak,
            UnlockRule::EncryptedVotes(_) => metrics.encrypted_votes,
            // `as` saturates and maps NaN to 0
            UnlockRule::TotalVolume(_) => metrics.total_volume as u32,
            UnlockRule::Accuracy { .. } => metrics.accuracy as u32,
        };
        raw.min(self.max_progress())
    }
}

#[derive(Debug, Clone)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rule: UnlockRule,
}

/// Fixed catalog. Order here is notification order.
pub const CATALOG: &[AchievementDef] = &[
    AchievementDef {
        id: "first_prediction",
        title: "First Steps",
        description: "Make your first prediction",
        icon: "target",
        rule: UnlockRule::TotalPredictions(1),
    },
    AchievementDef {
        id: "getting_started",
        title: "Getting Started",
        description: "Make 10 predictions",
        icon: "trending-up",
        rule: UnlockRule::TotalPredictions(10),
    },
    AchievementDef {
        id: "hot_streak",
        title: "Hot Streak",
        description: "Predict 5 markets in a row",
        icon: "flame",
        rule: UnlockRule::CurrentStreak(5),
    },
    AchievementDef {
        id: "high_roller",
        title: "High Roller",
        description: "Stake a total of 1,000",
        icon: "coins",
        rule: UnlockRule::TotalVolume(1000.0),
    },
    AchievementDef {
        id: "privacy_advocate",
        title: "Privacy Advocate",
        description: "Cast 10 encrypted votes",
        icon: "shield",
        rule: UnlockRule::EncryptedVotes(10),
    },
    AchievementDef {
        id: "sharpshooter",
        title: "Sharpshooter",
        description: "Reach 80% accuracy over at least 20 predictions",
        icon: "crosshair",
        rule: UnlockRule::Accuracy { min_accuracy: 80.0, min_predictions: 20 },
    },
    AchievementDef {
        id: "veteran",
        title: "Veteran",
        description: "Make 100 predictions",
        icon: "award",
        rule: UnlockRule::TotalPredictions(100),
    },
    AchievementDef {
        id: "unstoppable",
        title: "Unstoppable",
        description: "Predict 25 markets in a row",
        icon: "zap",
        rule: UnlockRule::CurrentStreak(25),
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub progress: Option<u32>,
    pub max_progress: Option<u32>,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

impl From<&AchievementDef> for Achievement {
    fn from(def: &AchievementDef) -> Self {
        Self {
            id: def.id.to_string(),
            title: def.title.to_string(),
            description: def.description.to_string(),
            icon: def.icon.to_string(),
            progress: Some(0),
            max_progress: Some(def.rule.max_progress()),
            unlocked_at: None,
        }
    }
}

/// Catalog indices whose rule holds and which are not in `unlocked`, in catalog order.
pub fn newly_satisfied(
    catalog: &[AchievementDef],
    metrics: &Metrics,
    unlocked: &HashSet<&str>,
) -> Vec<usize> {
    catalog
        .iter()
        .enumerate()
        .filter(|(_, def)| !unlocked.contains(def.id) && def.rule.is_satisfied(metrics))
        .map(|(idx, _)| idx)
        .collect()
}

/// Per-user achievement state, one entry per catalog item.
#[derive(Debug, Clone)]
pub struct AchievementBook {
    catalog: &'static [AchievementDef],
    achievements: Vec<Achievement>,
}

impl AchievementBook {
    pub fn new() -> Self {
        Self::with_catalog(CATALOG)
    }

    pub fn with_catalog(catalog: &'static [AchievementDef]) -> Self {
        Self {
            catalog,
            achievements: catalog.iter().map(Achievement::from).collect(),
        }
    }

    /// Stamp every achievement whose rule newly holds and refresh progress on
    /// the rest. Returns the new unlocks in catalog order.
    pub fn check_achievements(&mut self, metrics: &Metrics, now: DateTime<Utc>) -> Vec<Achievement> {
        let catalog = self.catalog;
        let unlocked: HashSet<&str> = catalog
            .iter()
            .zip(&self.achievements)
            .filter(|(_, a)| a.is_unlocked())
            .map(|(def, _)| def.id)
            .collect();
        let fresh = newly_satisfied(catalog, metrics, &unlocked);

        let mut newly_unlocked = Vec::with_capacity(fresh.len());
        for (idx, def) in catalog.iter().enumerate() {
            let achievement = &mut self.achievements[idx];
            if achievement.is_unlocked() {
                continue;
            }

            if fresh.contains(&idx) {
                achievement.unlocked_at = Some(now);
                achievement.progress = achievement.max_progress;
                info!("🏆 Achievement unlocked: {} ({})", def.title, def.id);
                newly_unlocked.push(achievement.clone());
            } else {
                achievement.progress = Some(def.rule.progress(metrics));
            }
        }

        newly_unlocked
    }

    /// Reapply persisted state. Unknown ids are ignored.
    pub fn restore(&mut self, id: &str, unlocked_at: Option<DateTime<Utc>>, progress: Option<u32>) {
        if let Some(achievement) = self.achievements.iter_mut().find(|a| a.id == id) {
            achievement.unlocked_at = unlocked_at;
            achievement.progress = match (progress, achievement.max_progress) {
                (Some(p), Some(max)) => Some(p.min(max)),
                (p, _) => p,
            };
        }
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter()
    }

    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.is_unlocked()).count()
    }
}

impl Default for AchievementBook {
    fn default() -> Self {
        Self::new()
    }
}
