mod config;
mod data;
mod game;
mod monitoring;
mod store;

use anyhow::Result;
use chrono::Utc;
use config::{Config, EnvConfig, FeedKind};
use data::feed::{GammaFeed, MarketFeed, SimulatedFeed};
use game::achievements::AchievementBook;
use game::session::{Action, Outcome, Prediction, Session};
use monitoring::logger::CsvLogger;
use store::persistence::StatsDatabase;
use tokio::io::{AsyncBufReadExt, BufReader};

enum Command {
    Act(Action),
    LoadMore,
    Stats,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;

    let command = match cmd {
        "l" => Command::Act(Action::SwipeLeft),
        "r" => {
            let confidence = parts.next().and_then(|c| c.parse().ok());
            let stake = parts.next().and_then(|s| s.parse().ok());
            let prediction = match (confidence, stake) {
                (Some(confidence), Some(stake_amount)) => Some(Prediction { confidence, stake_amount }),
                _ => None,
            };
            Command::Act(Action::SwipeRight(prediction))
        }
        "w" => Command::Act(Action::PredictionResolved { correct: true }),
        "x" => Command::Act(Action::PredictionResolved { correct: false }),
        "d" => Command::Act(Action::AchievementDismissed),
        "m" => Command::LoadMore,
        "s" => Command::Stats,
        "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn print_card(session: &Session) {
    match session.current_market() {
        Some(m) => println!(
            "[{:?}] {}  YES {:.0}% / NO {:.0}%  ({})",
            m.category,
            m.question,
            m.yes_odds(),
            m.no_odds(),
            m.time_remaining(Utc::now())
        ),
        None => println!("No markets queued, 'm' to load more"),
    }
}

fn print_toast(session: &Session) {
    if let (Some(achievement), true) = session.toast().view() {
        println!("🏆 {} - {} ('d' to dismiss)", achievement.title, achievement.description);
    }
}

/// Write the audit rows and the stats snapshot for one accepted outcome.
/// Failures are logged and the session carries on.
fn persist(
    session: &Session,
    outcome: &Outcome,
    db: Option<&StatsDatabase>,
    logger: Option<&CsvLogger>,
) {
    let (record, unlocked) = match outcome {
        Outcome::Swiped { record, unlocked } => (Some(record), unlocked.as_slice()),
        Outcome::Resolved { unlocked } => (None, unlocked.as_slice()),
        _ => return,
    };

    if let Some(logger) = logger {
        if let Some(record) = record {
            if let Err(e) = logger.log_swipe(record) {
                tracing::warn!("Failed to write swipe to CSV log: {:#}", e);
            }
        }
        for achievement in unlocked {
            if let Err(e) = logger.log_unlock(achievement) {
                tracing::warn!("Failed to write unlock to CSV log: {:#}", e);
            }
        }
    }

    if let Some(db) = db {
        if let Some(record) = record {
            if let Err(e) = db.insert_swipe(record) {
                tracing::warn!("Failed to store swipe: {:#}", e);
            }
        }
        save_snapshot(db, session);
    }
}

fn save_snapshot(db: &StatsDatabase, session: &Session) {
    let saved = db
        .save_stats(session.stats())
        .and_then(|_| db.save_achievements(session.achievements()));
    if let Err(e) = saved {
        tracing::warn!("Failed to save session snapshot: {:#}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Swipe predict starting...");

    // Load configuration
    let env_config = EnvConfig::load()?;
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{:#}, using defaults", e);
            Config::parse("")?
        }
    };
    config.apply_env(&env_config);

    tracing::info!("Feed: {:?} ({})", config.feed.kind, config.feed.base_url);
    tracing::info!("Storage enabled: {}", config.storage.enabled);

    let feed: Box<dyn MarketFeed> = match config.feed.kind {
        FeedKind::Simulated => Box::new(SimulatedFeed::new()),
        FeedKind::Gamma => Box::new(GammaFeed::new(
            config.feed.base_url.clone(),
            config.feed.request_timeout_secs,
        )?),
    };

    let db = if config.storage.enabled {
        tracing::info!("Opening database: {}", config.storage.database_path);
        Some(StatsDatabase::new(&config.storage.database_path)?)
    } else {
        None
    };

    let mut session = match &db {
        Some(db) => {
            let mut book = AchievementBook::new();
            db.load_achievements(&mut book)?;
            match db.load_stats()? {
                Some(stats) => {
                    tracing::info!(
                        "Restored stats: {} predictions, {} achievements, {} swipes today",
                        stats.total_predictions,
                        book.unlocked_count(),
                        db.count_swipes_today()?
                    );
                    Session::restore(&config.session, stats, book)
                }
                None => Session::new(&config.session),
            }
        }
        None => Session::new(&config.session),
    };

    let logger = if config.monitoring.csv_logging {
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    session.dispatch(Action::WalletConnectionChanged(env_config.wallet_connected), Utc::now());
    if !session.is_connected() {
        println!("Wallet not connected, swipes are disabled");
    }

    while session.queued() < config.session.initial_batch {
        if session.load_more(feed.as_ref()).await == 0 {
            break;
        }
    }

    println!("Commands: r <confidence> <stake> | l | w | x | d | m | s | q");
    print_card(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        let Some(command) = parse_command(&line) else {
            println!("Unknown command");
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Stats => {
                let stats = session.stats();
                println!(
                    "predictions {} | accuracy {:.1}% | volume {:.2} | streak {} (best {}) | reputation {}",
                    stats.total_predictions,
                    stats.accuracy(),
                    stats.total_volume,
                    stats.current_streak,
                    stats.longest_streak,
                    stats.reputation
                );
                for a in session.achievements().iter() {
                    let mark = if a.is_unlocked() { "x" } else { " " };
                    println!(
                        "  [{}] {} {}/{}",
                        mark,
                        a.title,
                        a.progress.unwrap_or(0),
                        a.max_progress.unwrap_or(0)
                    );
                }
            }
            Command::LoadMore => {
                let added = session.load_more(feed.as_ref()).await;
                println!("Loaded {} markets", added);
            }
            Command::Act(action) => {
                let outcome = session.dispatch(action, Utc::now());
                persist(&session, &outcome, db.as_ref(), logger.as_ref());

                match outcome {
                    Outcome::Swiped { .. } if session.queued() <= 1 => {
                        session.load_more(feed.as_ref()).await;
                    }
                    Outcome::Rejected(e) => println!("Rejected: {}", e),
                    _ => {}
                }
            }
        }

        print_toast(&session);
        print_card(&session);
    }

    if let Some(db) = &db {
        save_snapshot(db, &session);
        tracing::info!("Session saved");
    }

    tracing::info!("Shutting down...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SessionConfig;

    #[test]
    fn test_parse_right_swipe() {
        match parse_command("r 70 50") {
            Some(Command::Act(Action::SwipeRight(Some(p)))) => {
                assert_eq!(p.confidence, 70);
                assert_eq!(p.stake_amount, 50.0);
            }
            _ => panic!("expected right swipe with prediction"),
        }
    }

    #[test]
    fn test_parse_right_swipe_missing_payload() {
        assert!(matches!(
            parse_command("r"),
            Some(Command::Act(Action::SwipeRight(None)))
        ));
    }

    #[test]
    fn test_parse_other_commands() {
        assert!(matches!(parse_command("l"), Some(Command::Act(Action::SwipeLeft))));
        assert!(matches!(parse_command("m"), Some(Command::LoadMore)));
        assert!(matches!(parse_command("q"), Some(Command::Quit)));
        assert!(parse_command("").is_none());
        assert!(parse_command("zz").is_none());
    }

    #[test]
    fn test_persist_keeps_saving_when_csv_log_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swipes.csv");
        let logger = CsvLogger::new(path.to_string_lossy().to_string()).unwrap();
        // appends now fail, the logger never recreates the file
        std::fs::remove_file(&path).unwrap();

        let db = StatsDatabase::in_memory().unwrap();
        let mut session = Session::new(&SessionConfig::default());
        let outcome = session.dispatch(Action::SwipeLeft, Utc::now());
        persist(&session, &outcome, Some(&db), Some(&logger));

        let saved = db.load_stats().unwrap().unwrap();
        assert_eq!(saved.total_predictions, 1);
        assert_eq!(saved.pending_resolutions, 1);
        assert_eq!(db.count_swipes_today().unwrap(), 1);

        let mut book = AchievementBook::new();
        db.load_achievements(&mut book).unwrap();
        assert!(book.get("first_prediction").unwrap().is_unlocked());
    }

    #[test]
    fn test_persist_skips_rejected_outcomes() {
        let db = StatsDatabase::in_memory().unwrap();
        let mut session = Session::new(&SessionConfig::default());
        let outcome = session.dispatch(Action::SwipeRight(None), Utc::now());
        persist(&session, &outcome, Some(&db), None);

        assert!(db.load_stats().unwrap().is_none());
        assert_eq!(db.count_swipes_today().unwrap(), 0);
    }
}
