//! Alert log
//!
//! Newest-first, capacity-bounded record of discrete engine events.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// Periodic heartbeat
    Status,
    Info,
    Warning,
    Critical,
    /// Space weather
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Status => "STATUS",
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
            AlertLevel::Danger => "DANGER",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    pub level: AlertLevel,
    pub message: String,
    /// Simulation clock at emission
    pub timestamp: f64,
}

impl AlertRecord {
    pub fn new(level: AlertLevel, message: impl Into<String>, timestamp: f64) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
        }
    }
}

/// `[0012s] CRITICAL   Thermal overload detected (SAT-104)`
impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.timestamp.max(0.0).floor() as u64;
        write!(f, "[{:04}s] {:<10} {}", secs, self.level, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<AlertRecord>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a record at the front, evicting the oldest when full.
    pub fn push(&mut self, record: AlertRecord) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(record);
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &AlertRecord> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AlertRecord> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = AlertLog::new(50);
        log.push(AlertRecord::new(AlertLevel::Info, "first", 1.0));
        log.push(AlertRecord::new(AlertLevel::Warning, "second", 2.0));

        let messages: Vec<_> = log.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert_eq!(log.latest().unwrap().level, AlertLevel::Warning);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = AlertLog::new(50);
        for i in 0..120 {
            log.push(AlertRecord::new(AlertLevel::Status, format!("beat {i}"), i as f64));
            assert!(log.len() <= 50);
        }

        assert_eq!(log.len(), log.capacity());
        assert_eq!(log.latest().unwrap().message, "beat 119");
        assert_eq!(log.iter().last().unwrap().message, "beat 70");
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut log = AlertLog::new(0);
        assert_eq!(log.capacity(), 1);

        log.push(AlertRecord::new(AlertLevel::Info, "a", 0.0));
        log.push(AlertRecord::new(AlertLevel::Info, "b", 1.0));
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().message, "b");
    }

    #[test]
    fn test_log_line_format() {
        let alert = AlertRecord::new(AlertLevel::Critical, "Thermal overload detected", 12.7);
        assert_eq!(alert.to_string(), "[0012s] CRITICAL   Thermal overload detected");
    }

    #[test]
    fn test_level_serializes_upper_case() {
        let json = serde_json::to_string(&AlertLevel::Danger).unwrap();
        assert_eq!(json, "\"DANGER\"");
    }
}
