use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use crate::game::achievements::Achievement;
use crate::game::session::SwipeRecord;

pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(
                file,
                "timestamp,kind,market_id,direction,confidence,stake,encrypted,detail"
            )?;
        }

        Ok(Self { log_path })
    }

    /// Log an accepted swipe
    pub fn log_swipe(&self, record: &SwipeRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        let confidence_str = match record.confidence {
            Some(c) => c.to_string(),
            None => "".to_string(),
        };

        writeln!(
            file,
            "{},SWIPE,{},{},{},{:.2},{},",
            record.at.to_rfc3339(),
            record.market_id.as_deref().unwrap_or(""),
            record.direction,
            confidence_str,
            record.stake,
            record.encrypted
        )?;

        Ok(())
    }

    /// Log an achievement unlock
    pub fn log_unlock(&self, achievement: &Achievement) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        let at: DateTime<Utc> = achievement.unlocked_at.unwrap_or_else(Utc::now);
        writeln!(
            file,
            "{},UNLOCK,,,,,,{}",
            at.to_rfc3339(),
            achievement.id
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::achievements::CATALOG;
    use crate::game::session::Direction;

    #[test]
    fn test_log_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swipes.csv").to_string_lossy().to_string();
        let logger = CsvLogger::new(path.clone()).unwrap();

        logger.log_swipe(&SwipeRecord {
            market_id: Some("m1".to_string()),
            direction: Direction::Left,
            confidence: None,
            stake: 0.0,
            encrypted: true,
            at: Utc::now(),
        }).unwrap();
        logger.log_unlock(&Achievement::from(&CATALOG[0])).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,kind"));
        assert!(lines[1].contains(",SWIPE,m1,left,,0.00,true,"));
        assert!(lines[2].ends_with(",UNLOCK,,,,,,first_prediction"));

        // reopening keeps existing rows
        CsvLogger::new(path.clone()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);
    }
}
