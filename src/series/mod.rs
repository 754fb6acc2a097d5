//! Bounded per-farm reading history.
//!
//! Readings arrive in timestamp order from a single tick source, so retention
//! is enforced by popping from the front after each append.

use crate::sensor::Reading;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default retention window (simulated hours)
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Time-ordered reading buffer with a fixed retention window
#[derive(Clone, Debug)]
pub struct TimeSeries {
    readings: VecDeque<Reading>,
    retention: Duration,
}

impl TimeSeries {
    pub fn new(retention: Duration) -> Self {
        Self {
            readings: VecDeque::new(),
            retention,
        }
    }

    /// Append a reading, then evict everything older than
    /// `reading.timestamp - retention`.
    pub fn append(&mut self, reading: Reading) {
        let cutoff = reading.timestamp - self.retention;
        self.readings.push_back(reading);

        while let Some(oldest) = self.readings.front() {
            if oldest.timestamp < cutoff {
                self.readings.pop_front();
            } else {
                break;
            }
        }
    }

    /// Retained window, oldest first
    pub fn range(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    /// Most recently appended reading
    pub fn current(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

/// Point-in-time copy of a farm's feed, handed to the presentation layer
#[derive(Clone, Debug, Serialize)]
pub struct SeriesSnapshot {
    pub readings: Vec<Reading>,
    pub current: Option<Reading>,
    /// False when the farm is not registered (no sensor behind it)
    pub is_connected: bool,
    /// Timestamp of the last live tick; seeded history does not count
    pub last_update: Option<DateTime<Utc>>,
}

impl SeriesSnapshot {
    pub fn capture(series: &TimeSeries, last_update: Option<DateTime<Utc>>) -> Self {
        Self {
            readings: series.range(),
            current: series.current().cloned(),
            is_connected: true,
            last_update,
        }
    }

    /// Feed for a farm id that has no sensor
    pub fn disconnected() -> Self {
        Self {
            readings: Vec::new(),
            current: None,
            is_connected: false,
            last_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_at(ts: DateTime<Utc>, temperature: i32) -> Reading {
        Reading {
            timestamp: ts,
            temperature,
            humidity: 65,
            target: 30,
        }
    }

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_append_and_current() {
        let mut series = TimeSeries::default();
        assert!(series.current().is_none());

        series.append(reading_at(base(), 29));
        series.append(reading_at(base() + Duration::minutes(10), 31));

        assert_eq!(series.len(), 2);
        assert_eq!(series.current().unwrap().temperature, 31);
    }

    #[test]
    fn test_retention_evicts_older_than_window() {
        let mut series = TimeSeries::default();

        // 30 hourly readings, i.e. more than a day
        for h in 0..30 {
            series.append(reading_at(base() + Duration::hours(h), 30));
        }

        let latest = series.current().unwrap().timestamp;
        let range = series.range();
        assert!(range
            .iter()
            .all(|r| r.timestamp >= latest - Duration::hours(24)));
        // hours 5..=29 survive: the reading exactly 24h old is kept
        assert_eq!(range.len(), 25);
        assert_eq!(range[0].timestamp, base() + Duration::hours(5));
    }

    #[test]
    fn test_range_is_ascending() {
        let mut series = TimeSeries::new(Duration::hours(2));
        for m in 0..10 {
            series.append(reading_at(base() + Duration::minutes(m * 5), 30));
        }
        let range = series.range();
        assert!(range.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_clear() {
        let mut series = TimeSeries::default();
        series.append(reading_at(base(), 30));
        series.clear();
        assert!(series.is_empty());
        assert!(series.current().is_none());
    }

    #[test]
    fn test_snapshot_capture_and_disconnected() {
        let mut series = TimeSeries::default();
        series.append(reading_at(base(), 28));

        let snap = SeriesSnapshot::capture(&series, Some(base()));
        assert!(snap.is_connected);
        assert_eq!(snap.readings.len(), 1);
        assert_eq!(snap.current.unwrap().temperature, 28);

        let empty = SeriesSnapshot::disconnected();
        assert!(!empty.is_connected);
        assert!(empty.readings.is_empty());
        assert!(empty.current.is_none());
    }
}
