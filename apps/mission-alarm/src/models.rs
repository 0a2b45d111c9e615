//! Data models for the mission alarm.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key format used for date buckets in the data file.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Short weekday labels, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Unique alarm identifier.
pub type AlarmId = String;

/// Convert a date to its bucket key.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// A task registered on a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// What has to be done.
    #[serde(rename = "task")]
    pub text: String,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// When the task was registered (local time).
    pub created_at: NaiveDateTime,
}

impl Task {
    /// Create a new incomplete task.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            created_at: Local::now().naive_local(),
        }
    }
}

/// A recurring alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    /// Display name.
    pub name: String,
    /// Time of day.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Weekdays the alarm repeats on (0 = Monday). Empty means every day.
    #[serde(default)]
    pub days: Vec<u8>,
    /// Whether the quiz must be solved to dismiss the alarm.
    #[serde(default = "default_true")]
    pub mission_enabled: bool,
    /// Whether the alarm is armed.
    #[serde(default = "default_true")]
    pub active: bool,
    /// When the alarm was created (local time).
    pub created_at: NaiveDateTime,
}

impl Alarm {
    pub fn new(
        name: impl Into<String>,
        time: NaiveTime,
        days: Vec<u8>,
        mission_enabled: bool,
    ) -> Self {
        let mut days: Vec<u8> = days.into_iter().filter(|d| *d < 7).collect();
        days.sort_unstable();
        days.dedup();
        Self {
            name: name.into(),
            time,
            days,
            mission_enabled,
            active: true,
            created_at: Local::now().naive_local(),
        }
    }

    /// Check whether the alarm rings on a given date.
    pub fn rings_on(&self, date: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        self.days.is_empty() || self.days.contains(&(date.weekday().num_days_from_monday() as u8))
    }

    /// Next moment strictly after `now` at which the alarm rings.
    pub fn next_ring(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.active {
            return None;
        }
        (0..=7)
            .map(|offset| now.date() + Duration::days(offset))
            .filter(|date| self.rings_on(*date))
            .map(|date| date.and_time(self.time))
            .find(|at| *at > now)
    }

    /// Human readable repeat days.
    pub fn days_label(&self) -> String {
        if self.days.is_empty() {
            return "Every day".to_string();
        }
        self.days
            .iter()
            .filter_map(|d| WEEKDAY_LABELS.get(*d as usize).copied())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse a day list such as `mon,wed,fri` into weekday indices.
///
/// Blank input and `daily` mean every day (an empty list).
pub fn parse_days(input: &str) -> Option<Vec<u8>> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("daily") {
        return Some(Vec::new());
    }

    let mut days = Vec::new();
    for part in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
    {
        let weekday: Weekday = part.parse().ok()?;
        days.push(weekday.num_days_from_monday() as u8);
    }
    days.sort_unstable();
    days.dedup();
    Some(days)
}

/// Parse an `HH:MM` time of day.
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), hhmm::FORMAT).ok()
}

/// Notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// New alarms require the mission quiz by default.
    #[serde(default = "default_true")]
    pub mission_alarm_enabled: bool,
    /// Alarm sound.
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    /// Vibration.
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mission_alarm_enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything persisted in the data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionData {
    /// Tasks keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub schedules: BTreeMap<String, Vec<Task>>,
    /// Alarms keyed by id.
    #[serde(default)]
    pub alarms: BTreeMap<AlarmId, Alarm>,
    #[serde(default)]
    pub settings: Settings,
}

/// A backup document: the full data set plus when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    #[serde(flatten)]
    pub data: MissionData,
    #[serde(default)]
    pub backup_date: Option<NaiveDateTime>,
}

impl Backup {
    pub fn new(data: MissionData) -> Self {
        Self {
            data,
            backup_date: Some(Local::now().naive_local()),
        }
    }

    /// File name for a backup taken at `at`.
    pub fn file_name(at: NaiveDateTime) -> String {
        format!("mission_alarm_backup_{}.json", at.format("%Y%m%d_%H%M%S"))
    }
}

/// Serde helpers for `HH:MM` times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
