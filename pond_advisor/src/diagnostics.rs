//! Recommendation log and reward-history export.
//!
//! Both are CSV files meant for people and the dashboard; the learning core
//! never reads them back.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::action::Action;
use crate::environment::ContinuousState;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One accepted recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Temperature (°C)")]
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "DO (mg/L)")]
    pub dissolved_oxygen: f64,
    #[serde(rename = "Recommended Action")]
    pub recommended_action: String,
}

impl LogEntry {
    /// Entry stamped with the current local time.
    pub fn now(readings: &ContinuousState, action: Action) -> Self {
        Self {
            date: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            temperature: readings.temperature,
            ph: readings.ph,
            dissolved_oxygen: readings.dissolved_oxygen,
            recommended_action: action.label().to_string(),
        }
    }
}

/// Append-only CSV log of accepted recommendations.
///
/// Writers sharing one `RecommendationLog` are serialized, so the header is
/// written once and rows never interleave.
#[derive(Debug)]
pub struct RecommendationLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RecommendationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, writing the header row if the file is new or empty.
    #[instrument(skip(self))]
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("Recommendation log lock poisoned"))?;

        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open recommendation log: {:?}", self.path))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(entry)
            .context("Failed to write recommendation log entry")?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush recommendation log: {:?}", self.path))?;

        debug!("Recommendation logged to {:?}", self.path);
        Ok(())
    }

    /// All entries in the order they were written. A missing log is empty.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("Recommendation log lock poisoned"))?;

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open recommendation log: {:?}", self.path))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<LogEntry>, _>>()
            .with_context(|| format!("Failed to parse recommendation log: {:?}", self.path))
    }
}

#[derive(Debug, Serialize)]
struct RewardRow {
    episode: usize,
    total_reward: f64,
}

/// Write the per-episode reward curve as `episode,total_reward`.
#[instrument(skip(history))]
pub fn write_reward_history(path: &Path, history: &[f64]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create reward history: {:?}", path))?;
    for (episode, total_reward) in history.iter().enumerate() {
        writer
            .serialize(RewardRow {
                episode,
                total_reward: *total_reward,
            })
            .context("Failed to write reward history row")?;
    }
    writer.flush().context("Failed to flush reward history")?;

    info!(episodes = history.len(), "Reward history saved to: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_appends_with_single_header() {
        let dir = tempdir().unwrap();
        let log = RecommendationLog::new(dir.path().join("pond_logs.csv"));
        assert!(log.read_all().unwrap().is_empty());

        let first = LogEntry::now(&ContinuousState::new(28.0, 7.2, 6.0), Action::NoOp);
        let second = LogEntry::now(&ContinuousState::new(27.5, 6.9, 3.1), Action::Aerate);
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries, vec![first, second]);

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.matches("Recommended Action").count(), 1);
        assert!(raw.starts_with("Date,Temperature (°C),pH,DO (mg/L),Recommended Action"));
    }

    #[test]
    fn test_concurrent_appends_write_one_header() {
        let dir = tempdir().unwrap();
        let log = RecommendationLog::new(dir.path().join("pond_logs.csv"));
        let actions = Action::ALL;

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let log = &log;
                scope.spawn(move || {
                    for i in 0..25 {
                        let readings = ContinuousState::new(25.0 + worker as f64, 7.0, i as f64);
                        log.append(&LogEntry::now(&readings, actions[i % actions.len()]))
                            .unwrap();
                    }
                });
            }
        });

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.matches("Recommended Action").count(), 1);
        assert_eq!(log.read_all().unwrap().len(), 200);
    }

    #[test]
    fn test_timestamp_format() {
        let entry = LogEntry::now(&ContinuousState::new(28.0, 7.2, 6.0), Action::BufferPh);
        assert!(chrono::NaiveDateTime::parse_from_str(&entry.date, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(entry.recommended_action, Action::BufferPh.label());
    }

    #[test]
    fn test_reward_history_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("reward_history.csv");
        write_reward_history(&path, &[1.5, -2.0, 3.0]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines, vec!["episode,total_reward", "0,1.5", "1,-2.0", "2,3.0"]);
    }
}
