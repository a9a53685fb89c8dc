//! Free time slots for one resource.
//!
//! Sorts the resource's active events by start time, merges overlapping busy
//! periods, then reports the gaps between merged periods within a window.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::conflict::EventLookup;
use crate::error::Result;
use crate::event::{check_range, Event};

/// A free time slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
}

impl FreeSlot {
    fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Merge overlapping or adjacent busy periods, clipped to the window.
///
/// Returns a sorted, non-overlapping list of (start, end) intervals.
pub fn merge_busy_periods(
    events: &[Event],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut intervals: Vec<(NaiveDateTime, NaiveDateTime)> = events
        .iter()
        .filter(|e| e.is_active() && e.overlaps(window_start, window_end))
        .map(|e| (e.start.max(window_start), e.end.min(window_end)))
        .collect();

    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

/// Gaps between `events` inside `[window_start, window_end)`, sorted by start.
pub fn gaps(
    events: &[Event],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<FreeSlot> {
    let mut slots = Vec::new();
    let mut cursor = window_start;

    for (busy_start, busy_end) in merge_busy_periods(events, window_start, window_end) {
        if cursor < busy_start {
            slots.push(FreeSlot::new(cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }

    if cursor < window_end {
        slots.push(FreeSlot::new(cursor, window_end));
    }

    slots
}

/// Free slots of `resource_id` within `[window_start, window_end)`.
///
/// # Errors
/// Returns `EngineError::InvalidRange` for an empty or inverted window, or the lookup's error.
pub fn free_slots<L: EventLookup + ?Sized>(
    lookup: &L,
    resource_id: &str,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Result<Vec<FreeSlot>> {
    check_range(window_start, window_end)?;
    let mut events = lookup.events_for_resource(resource_id)?;
    events.retain(|e| e.resource_id == resource_id);
    Ok(gaps(&events, window_start, window_end))
}

/// First free slot of `resource_id` lasting at least `min_duration_minutes`.
pub fn first_free_slot<L: EventLookup + ?Sized>(
    lookup: &L,
    resource_id: &str,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    min_duration_minutes: i64,
) -> Result<Option<FreeSlot>> {
    Ok(free_slots(lookup, resource_id, window_start, window_end)?
        .into_iter()
        .find(|slot| slot.duration_minutes >= min_duration_minutes))
}
