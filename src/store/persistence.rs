use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use crate::game::achievements::AchievementBook;
use crate::game::session::SwipeRecord;
use crate::game::stats::UserStats;

/// Durable snapshot of one player's stats, achievement stamps and swipe history.
pub struct StatsDatabase {
    conn: Connection,
}

impl StatsDatabase {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::init(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_predictions INTEGER NOT NULL,
                correct_predictions INTEGER NOT NULL,
                total_volume REAL NOT NULL,
                current_streak INTEGER NOT NULL,
                longest_streak INTEGER NOT NULL,
                rank INTEGER NOT NULL,
                reputation INTEGER NOT NULL,
                encrypted_votes INTEGER NOT NULL,
                pending_resolutions INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id TEXT PRIMARY KEY,
                progress INTEGER,
                unlocked_at TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS swipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT,
                direction TEXT NOT NULL,
                confidence INTEGER,
                stake REAL NOT NULL,
                encrypted INTEGER NOT NULL,
                swiped_at TIMESTAMP NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_swipes_swiped_at ON swipes(swiped_at);
            "#
        )?;

        Ok(Self { conn })
    }

    /// Upsert the single stats row
    pub fn save_stats(&self, stats: &UserStats) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO user_stats
             (id, total_predictions, correct_predictions, total_volume, current_streak,
              longest_streak, rank, reputation, encrypted_votes, pending_resolutions, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                stats.total_predictions,
                stats.correct_predictions,
                stats.total_volume,
                stats.current_streak,
                stats.longest_streak,
                stats.rank,
                stats.reputation,
                stats.encrypted_votes,
                stats.pending_resolutions,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load saved stats, if any
    pub fn load_stats(&self) -> Result<Option<UserStats>> {
        let stats = self.conn.query_row(
            "SELECT total_predictions, correct_predictions, total_volume, current_streak,
                    longest_streak, rank, reputation, encrypted_votes, pending_resolutions
             FROM user_stats WHERE id = 1",
            [],
            |row| {
                Ok(UserStats {
                    total_predictions: row.get(0)?,
                    correct_predictions: row.get(1)?,
                    total_volume: row.get(2)?,
                    current_streak: row.get(3)?,
                    longest_streak: row.get(4)?,
                    rank: row.get(5)?,
                    reputation: row.get(6)?,
                    encrypted_votes: row.get(7)?,
                    pending_resolutions: row.get(8)?,
                })
            },
        ).optional()?;
        Ok(stats)
    }

    pub fn save_achievements(&self, book: &AchievementBook) -> Result<()> {
        for achievement in book.iter() {
            self.conn.execute(
                "INSERT OR REPLACE INTO achievements (id, progress, unlocked_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    achievement.id,
                    achievement.progress,
                    achievement.unlocked_at.map(|t| t.to_rfc3339()),
                ],
            )?;
        }
        Ok(())
    }

    /// Apply stored stamps and progress onto a fresh book
    pub fn load_achievements(&self, book: &mut AchievementBook) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT id, progress, unlocked_at FROM achievements"
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let progress: Option<u32> = row.get(1)?;
            let unlocked_at: Option<String> = row.get(2)?;
            Ok((id, progress, unlocked_at))
        })?;

        for row in rows {
            let (id, progress, unlocked_at) = row?;
            let unlocked_at = unlocked_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            book.restore(&id, unlocked_at, progress);
        }
        Ok(())
    }

    pub fn insert_swipe(&self, record: &SwipeRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO swipes (market_id, direction, confidence, stake, encrypted, swiped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.market_id,
                record.direction.to_string(),
                record.confidence,
                record.stake,
                record.encrypted,
                record.at.to_rfc3339(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Count swipes logged today
    pub fn count_swipes_today(&self) -> Result<usize> {
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM swipes WHERE DATE(swiped_at) = ?1",
            params![today],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::achievements::Metrics;
    use crate::game::session::Direction;

    #[test]
    fn test_stats_roundtrip() {
        let db = StatsDatabase::in_memory().unwrap();
        assert!(db.load_stats().unwrap().is_none());

        let mut stats = UserStats::new(1000);
        stats.record_swipe(42.5, true);
        stats.record_swipe(0.0, false);
        db.save_stats(&stats).unwrap();
        // second save overwrites the single row
        stats.record_outcome(true);
        db.save_stats(&stats).unwrap();

        let loaded = db.load_stats().unwrap().unwrap();
        assert_eq!(loaded.pending_resolutions, 1);
        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_achievements_restore() {
        let db = StatsDatabase::in_memory().unwrap();
        let mut book = AchievementBook::new();
        let metrics = Metrics { total_predictions: 3, current_streak: 3, ..Default::default() };
        book.check_achievements(&metrics, Utc::now());
        db.save_achievements(&book).unwrap();

        let mut restored = AchievementBook::new();
        db.load_achievements(&mut restored).unwrap();

        assert_eq!(restored.unlocked_count(), 1);
        assert!(restored.get("first_prediction").unwrap().is_unlocked());
        assert_eq!(restored.get("hot_streak").unwrap().progress, Some(3));
    }

    #[test]
    fn test_swipe_log() {
        let db = StatsDatabase::in_memory().unwrap();
        let record = SwipeRecord {
            market_id: Some("m1".to_string()),
            direction: Direction::Right,
            confidence: Some(70),
            stake: 50.0,
            encrypted: false,
            at: Utc::now(),
        };

        let id = db.insert_swipe(&record).unwrap();
        assert_eq!(id, 1);
        assert_eq!(db.count_swipes_today().unwrap(), 1);
    }
}
