//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use schedule_engine::Event;

/// Parse `"2024-01-01"`.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Parse `"2024-01-01", "09:30"` into a wall-clock timestamp.
pub fn at(day: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{}T{}", day, time), "%Y-%m-%dT%H:%M").unwrap()
}

/// An active event for `resource` on 2024-01-01 between two `HH:MM` times.
pub fn lesson(id: &str, resource: &str, start: &str, end: &str) -> Event {
    lesson_on(id, resource, "2024-01-01", start, end)
}

pub fn lesson_on(id: &str, resource: &str, day: &str, start: &str, end: &str) -> Event {
    Event::new(id, format!("Lesson {}", id), at(day, start), at(day, end), resource, "sched-1")
        .unwrap()
}
