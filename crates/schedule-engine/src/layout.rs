//! Column packing -- lay overlapping events of one day out side by side.
//!
//! Events are scanned in ascending `(start, end)` order and each one goes into
//! the lowest column whose previous occupant has already ended (half-open
//! intervals, so back-to-back events may share a column). A new column opens
//! only when every existing one is busy.
//!
//! The result is greedy, not minimal: an event's `column_count` is the number
//! of columns opened so far in the scan, and events placed earlier are not
//! re-widened when a later event opens another column. Renderers depend on
//! this exact output, so the policy must stay stable for a given event set.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::event::Event;
use crate::grid::{time_to_pixel, TimeGridConfig};

/// Column assignment for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSlot {
    /// Position of the event in the input slice.
    pub index: usize,
    pub column: usize,
    pub column_count: usize,
    pub left_percent: f64,
    pub width_percent: f64,
}

/// An event projected onto the day grid. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub column: usize,
    pub column_count: usize,
    pub top_pixels: f64,
    pub height_pixels: f64,
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Assign columns to `events`, returned in processing order.
pub fn pack_columns(events: &[Event]) -> Vec<ColumnSlot> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    // Stable, so identical ranges keep their input order.
    order.sort_by_key(|&i| (events[i].start, events[i].end));

    let mut column_ends: Vec<NaiveDateTime> = Vec::new();
    let mut slots = Vec::with_capacity(events.len());

    for index in order {
        let event = &events[index];
        let column = match column_ends.iter().position(|&end| end <= event.start) {
            Some(free) => {
                column_ends[free] = event.end;
                free
            }
            None => {
                column_ends.push(event.end);
                column_ends.len() - 1
            }
        };

        let column_count = column_ends.len();
        let width_percent = 100.0 / column_count as f64;
        slots.push(ColumnSlot {
            index,
            column,
            column_count,
            left_percent: column as f64 * width_percent,
            width_percent,
        });
    }

    slots
}

/// Pack `events` for `day` and project them onto the grid described by `config`.
///
/// Portions of an event outside `day` are cut at the grid edges. Output is in
/// processing order (ascending start, then end).
pub fn layout_day(events: &[Event], day: NaiveDate, config: &TimeGridConfig) -> Vec<PositionedEvent> {
    pack_columns(events)
        .into_iter()
        .map(|slot| {
            let event = &events[slot.index];
            let (top_pixels, height_pixels) = vertical_extent(event, day, config);
            PositionedEvent {
                event: event.clone(),
                column: slot.column,
                column_count: slot.column_count,
                top_pixels,
                height_pixels,
                left_percent: slot.left_percent,
                width_percent: slot.width_percent,
            }
        })
        .collect()
}

fn vertical_extent(event: &Event, day: NaiveDate, config: &TimeGridConfig) -> (f64, f64) {
    let top = if event.start.date() < day {
        0.0
    } else {
        time_to_pixel(config, event.start.time())
    };
    let bottom = if event.end.date() > day {
        config.height_pixels()
    } else {
        time_to_pixel(config, event.end.time())
    };
    (top, (bottom - top).max(0.0))
}
