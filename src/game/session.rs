use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use crate::config::SessionConfig;
use crate::data::feed::MarketFeed;
use crate::data::types::Market;
use crate::game::achievements::{Achievement, AchievementBook, Metrics};
use crate::game::stats::UserStats;
use crate::game::toast::ToastController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Payload attached to a YES swipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// 0..=100
    pub confidence: u8,
    pub stake_amount: f64,
}

impl Prediction {
    fn validate(&self) -> Result<(), SwipeError> {
        if self.confidence > 100 {
            return Err(SwipeError::InvalidConfidence(self.confidence));
        }
        if !(self.stake_amount.is_finite() && self.stake_amount > 0.0) {
            return Err(SwipeError::InvalidStake(self.stake_amount));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Action {
    SwipeLeft,
    SwipeRight(Option<Prediction>),
    PredictionResolved { correct: bool },
    LoadMoreRequested,
    LoadMoreCompleted(Vec<Market>),
    LoadMoreFailed(String),
    AchievementDismissed,
    WalletConnectionChanged(bool),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SwipeError {
    #[error("Right swipe requires a prediction")]
    MissingPrediction,

    #[error("Confidence out of range: {0}")]
    InvalidConfidence(u8),

    #[error("Stake must be positive: {0}")]
    InvalidStake(f64),

    #[error("Wallet not connected")]
    WalletDisconnected,

    #[error("No prediction is waiting on an outcome")]
    NothingToResolve,
}

/// One accepted swipe, as handed to the log and the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeRecord {
    pub market_id: Option<String>,
    pub direction: Direction,
    pub confidence: Option<u8>,
    pub stake: f64,
    pub encrypted: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum Outcome {
    Swiped { record: SwipeRecord, unlocked: Vec<Achievement> },
    Resolved { unlocked: Vec<Achievement> },
    /// Caller should fetch this many markets and report back.
    FetchRequested(usize),
    MarketsAppended(usize),
    Dismissed(Option<Achievement>),
    Ignored,
    Rejected(SwipeError),
}

/// Owns all mutable game state. Every change goes through [`Session::dispatch`].
pub struct Session {
    stats: UserStats,
    achievements: AchievementBook,
    toast: ToastController,
    queue: VecDeque<Market>,
    loading: bool,
    connected: bool,
    page_size: usize,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self::restore(
            config,
            UserStats::new(config.starting_reputation),
            AchievementBook::new(),
        )
    }

    pub fn restore(config: &SessionConfig, stats: UserStats, achievements: AchievementBook) -> Self {
        Self {
            stats,
            achievements,
            toast: ToastController::new(),
            queue: VecDeque::new(),
            loading: false,
            connected: true,
            page_size: config.page_size,
        }
    }

    pub fn dispatch(&mut self, action: Action, now: DateTime<Utc>) -> Outcome {
        debug!("Dispatch: {:?}", action);

        match action {
            Action::SwipeLeft => self.swipe(Direction::Left, None, now),
            Action::SwipeRight(prediction) => self.swipe(Direction::Right, prediction, now),
            Action::PredictionResolved { correct } => self.resolve(correct, now),
            Action::LoadMoreRequested => {
                if self.loading {
                    debug!("Load already in flight, suppressing duplicate request");
                    return Outcome::Ignored;
                }
                self.loading = true;
                Outcome::FetchRequested(self.page_size)
            }
            Action::LoadMoreCompleted(markets) => {
                self.loading = false;
                let count = markets.len();
                self.queue.extend(markets);
                info!("Loaded {} markets ({} queued)", count, self.queue.len());
                Outcome::MarketsAppended(count)
            }
            Action::LoadMoreFailed(reason) => {
                self.loading = false;
                warn!("Failed to load markets: {}", reason);
                Outcome::Ignored
            }
            Action::AchievementDismissed => Outcome::Dismissed(self.toast.dismiss()),
            Action::WalletConnectionChanged(connected) => {
                if self.connected != connected {
                    info!("Wallet {}", if connected { "connected" } else { "disconnected" });
                }
                self.connected = connected;
                Outcome::Ignored
            }
        }
    }

    /// Request, fetch and append one page of markets. Returns how many were added.
    pub async fn load_more(&mut self, feed: &dyn MarketFeed) -> usize {
        let count = match self.dispatch(Action::LoadMoreRequested, Utc::now()) {
            Outcome::FetchRequested(count) => count,
            _ => return 0,
        };

        let action = match feed.fetch_more_markets(count).await {
            Ok(markets) => Action::LoadMoreCompleted(markets),
            Err(e) => Action::LoadMoreFailed(format!("{:#}", e)),
        };

        match self.dispatch(action, Utc::now()) {
            Outcome::MarketsAppended(added) => added,
            _ => 0,
        }
    }

    fn swipe(&mut self, direction: Direction, prediction: Option<Prediction>, now: DateTime<Utc>) -> Outcome {
        if !self.connected {
            return reject(SwipeError::WalletDisconnected);
        }

        let (confidence, stake) = match (direction, prediction) {
            (Direction::Right, None) => return reject(SwipeError::MissingPrediction),
            (Direction::Right, Some(p)) => {
                if let Err(e) = p.validate() {
                    return reject(e);
                }
                (Some(p.confidence), p.stake_amount)
            }
            (Direction::Left, _) => (None, 0.0),
        };

        let market = self.queue.pop_front();
        let encrypted = market.as_ref().map_or(false, Market::is_encrypted);
        self.stats.record_swipe(stake, encrypted);

        let record = SwipeRecord {
            market_id: market.map(|m| m.id),
            direction,
            confidence,
            stake,
            encrypted,
            at: now,
        };
        info!(
            "Swipe {} on {} (stake {:.2}), streak {}",
            direction,
            record.market_id.as_deref().unwrap_or("<none>"),
            stake,
            self.stats.current_streak
        );

        // Evaluate against the post-swipe stats
        let unlocked = self.evaluate(now);
        Outcome::Swiped { record, unlocked }
    }

    fn resolve(&mut self, correct: bool, now: DateTime<Utc>) -> Outcome {
        if !self.connected {
            return reject(SwipeError::WalletDisconnected);
        }
        if !self.stats.record_outcome(correct) {
            return reject(SwipeError::NothingToResolve);
        }

        info!(
            "Prediction resolved {}: accuracy {:.1}%, reputation {}",
            if correct { "correct" } else { "wrong" },
            self.stats.accuracy(),
            self.stats.reputation
        );

        let unlocked = self.evaluate(now);
        Outcome::Resolved { unlocked }
    }

    fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<Achievement> {
        let metrics = Metrics::from(&self.stats);
        let unlocked = self.achievements.check_achievements(&metrics, now);
        for achievement in &unlocked {
            self.toast.enqueue(achievement.clone());
        }
        unlocked
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn achievements(&self) -> &AchievementBook {
        &self.achievements
    }

    pub fn toast(&self) -> &ToastController {
        &self.toast
    }

    pub fn current_market(&self) -> Option<&Market> {
        self.queue.front()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

fn reject(err: SwipeError) -> Outcome {
    warn!("Rejected: {}", err);
    Outcome::Rejected(err)
}
