/// Aggregate prediction statistics for the current user.
///
/// Only [`crate::game::session::Session`] mutates this, so the invariants
/// `correct_predictions <= total_predictions` and
/// `current_streak <= longest_streak` hold between calls, and every swipe
/// is resolved at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub total_predictions: u32,
    pub correct_predictions: u32,
    pub total_volume: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub rank: u32,
    pub reputation: u32,
    pub encrypted_votes: u32,
    /// Swipes still waiting on a market outcome
    pub pending_resolutions: u32,
}

impl UserStats {
    pub fn new(starting_reputation: u32) -> Self {
        Self {
            total_predictions: 0,
            correct_predictions: 0,
            total_volume: 0.0,
            current_streak: 0,
            longest_streak: 0,
            rank: 1,
            reputation: starting_reputation,
            encrypted_votes: 0,
            pending_resolutions: 0,
        }
    }

    /// Percentage of correct predictions, 0 when nothing was predicted yet.
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            return 0.0;
        }
        (self.correct_predictions as f64 / self.total_predictions as f64 * 100.0).min(100.0)
    }

    /// Count one accepted swipe. `stake` is zero for a pass.
    pub fn record_swipe(&mut self, stake: f64, encrypted: bool) {
        self.total_predictions += 1;
        self.pending_resolutions += 1;
        self.total_volume += stake;
        if encrypted {
            self.encrypted_votes += 1;
        }
        self.set_streak(self.current_streak + 1);
    }

    /// Apply a resolved outcome. Returns false when no swipe is waiting on
    /// an outcome; nothing changes in that case.
    pub fn record_outcome(&mut self, correct: bool) -> bool {
        if self.pending_resolutions == 0 {
            return false;
        }
        self.pending_resolutions -= 1;

        if correct {
            self.correct_predictions += 1;
        } else {
            self.set_streak(0);
        }
        self.reputation = self.computed_reputation();
        true
    }

    fn set_streak(&mut self, streak: u32) {
        self.current_streak = streak;
        self.longest_streak = self.longest_streak.max(streak);
    }

    fn computed_reputation(&self) -> u32 {
        let accuracy_pct = if self.total_predictions > 0 {
            self.correct_predictions * 100 / self.total_predictions
        } else {
            50
        };
        accuracy_pct * 10 + self.current_streak * 5
    }
}

impl Default for UserStats {
    fn default() -> Self {
        Self::new(0)
    }
}
