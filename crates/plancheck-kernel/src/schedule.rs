//! Schedule types: the items a generator proposes and the engine judges.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One proposed block of time.
///
/// Read-only to the engine. On repair the whole schedule is replaced, never
/// patched item by item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// Task label
    pub task: String,
    /// Start, with UTC offset
    pub start_time: DateTime<FixedOffset>,
    /// End, with UTC offset
    pub end_time: DateTime<FixedOffset>,
    /// Declared duration in minutes
    pub timebox_minutes: u32,
    /// Rationale for placing the task here
    #[serde(default)]
    pub why: String,
}

impl ScheduleItem {
    pub fn new(
        task: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        timebox_minutes: u32,
        why: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            start_time,
            end_time,
            timebox_minutes,
            why: why.into(),
        }
    }

    /// Whole minutes between start and end (negative for inverted intervals).
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Exact length in seconds (negative for inverted intervals).
    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    /// Reject zero-length and inverted intervals.
    pub fn ensure_valid_interval(&self) -> Result<(), ValidationError> {
        if self.end_time <= self.start_time {
            return Err(ValidationError::InvalidInterval {
                task: self.task.clone(),
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }
}

/// Check every item's interval, stopping at the first bad one.
pub fn ensure_valid_intervals(items: &[ScheduleItem]) -> Result<(), ValidationError> {
    items.iter().try_for_each(ScheduleItem::ensure_valid_interval)
}

/// Everything one generator call returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub plan: Vec<ScheduleItem>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl GeneratedPlan {
    /// Parse a generator's JSON payload.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_duration_minutes() {
        let item = ScheduleItem::new(
            "Write report",
            ts("2025-01-18T09:00:00-05:00"),
            ts("2025-01-18T10:30:00-05:00"),
            90,
            "",
        );
        assert_eq!(item.duration_minutes(), 90);
        assert_eq!(item.duration_seconds(), 5400);
        assert!(item.ensure_valid_interval().is_ok());
    }

    #[test]
    fn test_zero_length_interval_rejected() {
        let item = ScheduleItem::new(
            "Standup",
            ts("2025-01-18T09:00:00-05:00"),
            ts("2025-01-18T09:00:00-05:00"),
            0,
            "",
        );
        assert!(matches!(
            item.ensure_valid_interval(),
            Err(ValidationError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_parse_generator_payload() {
        let json = r#"{
            "plan": [
                {
                    "task": "Gym",
                    "start_time": "2025-01-18T07:00:00Z",
                    "end_time": "2025-01-18T08:00:00Z",
                    "timebox_minutes": 60,
                    "why": "Morning energy"
                }
            ],
            "assumptions": ["gym opens at 7"]
        }"#;
        let parsed = GeneratedPlan::from_json(json).unwrap();
        assert_eq!(parsed.plan.len(), 1);
        assert_eq!(parsed.plan[0].duration_minutes(), 60);
        assert_eq!(parsed.assumptions, vec!["gym opens at 7"]);
        assert!(parsed.questions.is_empty());
    }

    #[test]
    fn test_parse_rejects_negative_timebox() {
        let json = r#"{"plan": [{"task": "Gym", "start_time": "2025-01-18T07:00:00Z",
            "end_time": "2025-01-18T08:00:00Z", "timebox_minutes": -5, "why": ""}]}"#;
        assert!(GeneratedPlan::from_json(json).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_offset() {
        let json = r#"{"plan": [{"task": "Gym", "start_time": "2025-01-18T07:00:00",
            "end_time": "2025-01-18T08:00:00", "timebox_minutes": 60, "why": ""}]}"#;
        assert!(GeneratedPlan::from_json(json).is_err());
    }
}
