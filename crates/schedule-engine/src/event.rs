//! Event model and its JSON wire shape.
//!
//! [`Event`] and [`RecurrenceRule`] (de)serialize through the persisted record
//! shape (`camelCase`, ISO 8601 timestamps) and validate on the way in, so a
//! deserialized event always has `start < end` and a well-formed rule.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Lifecycle state of an event. Events are soft-removed by cancelling them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Active,
    Cancelled,
}

/// Recurrence unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// How a recurring series terminates. Exactly one form is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndCondition {
    /// Open-ended; expansion is capped by the query window only.
    #[default]
    Never,
    /// Last calendar date (inclusive) an occurrence may fall on.
    Until(NaiveDate),
    /// Total number of non-excepted occurrences in the series.
    Count(u32),
}

/// A recurrence rule attached to an anchor event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecurrenceRecord", into = "RecurrenceRecord")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// "Every N units". Must be at least 1.
    pub interval: u32,
    /// Selected weekdays. Only meaningful for [`Frequency::Weekly`].
    pub days_of_week: Vec<Weekday>,
    pub end: EndCondition,
    /// Dates excluded from the series, compared at calendar-date granularity.
    pub exceptions: BTreeSet<NaiveDate>,
}

impl RecurrenceRule {
    /// An open-ended rule repeating every single `frequency` unit.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            days_of_week: Vec::new(),
            end: EndCondition::Never,
            exceptions: BTreeSet::new(),
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.end = EndCondition::Until(date);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.end = EndCondition::Count(count);
        self
    }

    pub fn except(mut self, date: NaiveDate) -> Self {
        self.exceptions.insert(date);
        self
    }

    /// Returns a copy of this rule with `date` added to the exception set.
    pub fn with_exception(&self, date: NaiveDate) -> Self {
        self.clone().except(date)
    }

    pub fn is_exception(&self, date: NaiveDate) -> bool {
        self.exceptions.contains(&date)
    }

    /// Selected weekdays as offsets from Sunday, ascending and deduplicated.
    pub fn weekday_offsets(&self) -> Vec<u32> {
        let offsets: BTreeSet<u32> = self
            .days_of_week
            .iter()
            .map(|d| d.num_days_from_sunday())
            .collect();
        offsets.into_iter().collect()
    }

    /// Reject rules the expander cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(EngineError::InvalidRecurrenceRule(
                "interval must be at least 1".to_string(),
            ));
        }
        if self.end == EndCondition::Count(0) {
            return Err(EngineError::InvalidRecurrenceRule(
                "count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A scheduled event for one resource (teacher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub resource_id: String,
    pub schedule_id: String,
    pub status: EventStatus,
    /// Present iff the event is the anchor of a recurring series.
    pub recurrence: Option<RecurrenceRule>,
    /// Present iff this event was materialized or detached from a recurring parent.
    pub parent_event_id: Option<String>,
}

impl Event {
    /// Build an active, non-recurring event.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidRange`] unless `start < end`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        resource_id: impl Into<String>,
        schedule_id: impl Into<String>,
    ) -> Result<Self> {
        check_range(start, end)?;
        Ok(Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            resource_id: resource_id.into(),
            schedule_id: schedule_id.into(),
            status: EventStatus::Active,
            recurrence: None,
            parent_event_id: None,
        })
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.status = EventStatus::Cancelled;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test: `[self.start, self.end)` against `[start, end)`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && self.end > start
    }

    pub fn validate(&self) -> Result<()> {
        check_range(self.start, self.end)?;
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        Ok(())
    }
}

/// Fails with [`EngineError::InvalidRange`] unless `start < end`.
pub fn check_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
    if start >= end {
        return Err(EngineError::InvalidRange { start, end });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// Persisted JSON shape of an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Empty for candidates that have not been persisted yet.
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    pub resource_id: String,
    pub schedule_id: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
}

impl TryFrom<EventRecord> for Event {
    type Error = EngineError;

    fn try_from(record: EventRecord) -> Result<Self> {
        check_range(record.start_time, record.end_time)?;
        if record.is_recurring != record.recurrence.is_some() {
            return Err(EngineError::InvalidRecurrenceRule(format!(
                "isRecurring is {} but recurrence is {}",
                record.is_recurring,
                if record.recurrence.is_some() {
                    "present"
                } else {
                    "missing"
                }
            )));
        }
        let event = Event {
            id: record.id,
            title: record.title,
            start: record.start_time,
            end: record.end_time,
            resource_id: record.resource_id,
            schedule_id: record.schedule_id,
            status: record.status,
            recurrence: record.recurrence,
            parent_event_id: record.parent_event_id,
        };
        event.validate()?;
        Ok(event)
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            start_time: event.start,
            end_time: event.end,
            resource_id: event.resource_id,
            schedule_id: event.schedule_id,
            status: event.status,
            is_recurring: event.recurrence.is_some(),
            recurrence: event.recurrence,
            parent_event_id: event.parent_event_id,
        }
    }
}

/// Persisted JSON shape of a [`RecurrenceRule`].
///
/// Numeric fields are signed so that negative values surface as a rule error
/// rather than a generic type mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRecord {
    pub frequency: Frequency,
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<NaiveDate>,
}

impl TryFrom<RecurrenceRecord> for RecurrenceRule {
    type Error = EngineError;

    fn try_from(record: RecurrenceRecord) -> Result<Self> {
        let interval = u32::try_from(record.interval)
            .ok()
            .filter(|&i| i >= 1)
            .ok_or_else(|| {
                EngineError::InvalidRecurrenceRule(format!(
                    "interval must be a positive integer, got {}",
                    record.interval
                ))
            })?;

        let days_of_week = record
            .days_of_week
            .iter()
            .map(|&d| {
                weekday_from_index(d).ok_or_else(|| {
                    EngineError::InvalidRecurrenceRule(format!(
                        "day of week must be in 0..=6, got {}",
                        d
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let end = match (record.ends_on, record.count) {
            (Some(_), Some(_)) => {
                return Err(EngineError::InvalidRecurrenceRule(
                    "endsOn and count are mutually exclusive".to_string(),
                ))
            }
            (Some(date), None) => EndCondition::Until(date),
            (None, Some(count)) => {
                let count = u32::try_from(count).ok().filter(|&c| c >= 1).ok_or_else(|| {
                    EngineError::InvalidRecurrenceRule(format!(
                        "count must be a positive integer, got {}",
                        count
                    ))
                })?;
                EndCondition::Count(count)
            }
            (None, None) => EndCondition::Never,
        };

        let rule = RecurrenceRule {
            frequency: record.frequency,
            interval,
            days_of_week,
            end,
            exceptions: record.exceptions.into_iter().collect(),
        };
        rule.validate()?;
        Ok(rule)
    }
}

impl From<RecurrenceRule> for RecurrenceRecord {
    fn from(rule: RecurrenceRule) -> Self {
        let days_of_week = rule
            .weekday_offsets()
            .into_iter()
            .map(i64::from)
            .collect();
        let (ends_on, count) = match rule.end {
            EndCondition::Never => (None, None),
            EndCondition::Until(date) => (Some(date), None),
            EndCondition::Count(count) => (None, Some(i64::from(count))),
        };
        Self {
            frequency: rule.frequency,
            interval: i64::from(rule.interval),
            days_of_week,
            ends_on,
            count,
            exceptions: rule.exceptions.into_iter().collect(),
        }
    }
}

/// Map a 0 = Sunday … 6 = Saturday index to a [`Weekday`].
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// ISO 8601 timestamp (de)serialization for wall-clock times.
///
/// Accepts RFC 3339 (the offset is dropped and the wall-clock reading kept) or
/// a naive `YYYY-MM-DDTHH:MM[:SS[.fff]]`. Always writes `YYYY-MM-DDTHH:MM:SS`.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::error::EngineError;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(raw: &str) -> crate::error::Result<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.naive_local());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map_err(|e| EngineError::InvalidTimestamp(format!("'{}': {}", raw, e)))
    }

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
