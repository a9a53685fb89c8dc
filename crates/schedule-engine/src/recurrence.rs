//! Recurrence expansion -- turns a rule and its anchor event into concrete occurrences.
//!
//! Expansion starts at the anchor event's date and steps forward by the rule's
//! interval:
//!
//! - daily: every `interval` days
//! - weekly: every `interval` weeks (weeks start on Sunday), one occurrence per
//!   selected weekday in ascending order; days before the anchor are skipped
//! - monthly: every `interval` months on the anchor's day of month, clamped to
//!   the last day of shorter months (Jan 31 → Feb 28/29 → Mar 31)
//!
//! Exception dates are skipped and do not count towards a `count` end condition.
//! Expansion stops at the first of: the `until` date, the `count`-th occurrence,
//! or the end of the query window. Occurrences are yielded lazily, so an
//! open-ended series is safe to expand as long as the window is finite.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::event::{check_range, EndCondition, Event, EventStatus, Frequency, RecurrenceRule};

/// One concrete instance of a recurring event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// Id of the event owning the rule.
    pub parent_event_id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub resource_id: String,
}

impl Occurrence {
    /// Materialize this occurrence as a standalone, non-recurring event.
    pub fn to_event(&self, anchor: &Event, id: impl Into<String>) -> Event {
        Event {
            id: id.into(),
            title: anchor.title.clone(),
            start: self.start,
            end: self.end,
            resource_id: self.resource_id.clone(),
            schedule_id: anchor.schedule_id.clone(),
            status: EventStatus::Active,
            recurrence: None,
            parent_event_id: Some(self.parent_event_id.clone()),
        }
    }
}

/// Dates a rule would generate from its anchor, before exceptions and end conditions.
#[derive(Debug, Clone)]
struct CandidateDates {
    frequency: Frequency,
    anchor: NaiveDate,
    interval: u64,
    /// Selected weekdays as offsets from Sunday, ascending.
    weekdays: Vec<u32>,
    period: u64,
    day_slot: usize,
}

impl CandidateDates {
    fn new(rule: &RecurrenceRule, anchor: NaiveDate) -> Self {
        Self {
            frequency: rule.frequency,
            anchor,
            interval: u64::from(rule.interval),
            weekdays: rule.weekday_offsets(),
            period: 0,
            day_slot: 0,
        }
    }

    fn next_weekly(&mut self) -> Option<NaiveDate> {
        // An empty weekday set yields nothing rather than falling back to the anchor's weekday.
        if self.weekdays.is_empty() {
            return None;
        }
        let week_start = self
            .anchor
            .checked_sub_days(Days::new(u64::from(self.anchor.weekday().num_days_from_sunday())))?;
        loop {
            if self.day_slot == self.weekdays.len() {
                self.day_slot = 0;
                self.period += 1;
            }
            let offset = self.period.checked_mul(self.interval)?.checked_mul(7)?
                + u64::from(self.weekdays[self.day_slot]);
            self.day_slot += 1;
            let date = week_start.checked_add_days(Days::new(offset))?;
            if date >= self.anchor {
                return Some(date);
            }
        }
    }
}

impl Iterator for CandidateDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        match self.frequency {
            Frequency::Daily => {
                let offset = self.period.checked_mul(self.interval)?;
                self.period += 1;
                self.anchor.checked_add_days(Days::new(offset))
            }
            Frequency::Weekly => self.next_weekly(),
            Frequency::Monthly => {
                // Always offset from the anchor so a clamped February does not
                // drag later months down to the 28th.
                let months = u32::try_from(self.period.checked_mul(self.interval)?).ok()?;
                self.period += 1;
                self.anchor.checked_add_months(Months::new(months))
            }
        }
    }
}

/// Lazy occurrence sequence returned by [`expand`].
///
/// Cloning the iterator (or calling [`expand`] again) restarts the sequence;
/// the output is fully determined by the rule, anchor and window.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    anchor: &'a Event,
    window_start: NaiveDate,
    window_end: NaiveDate,
    candidates: CandidateDates,
    counted: u32,
    finished: bool,
}

fn occurrence_on(anchor: &Event, date: NaiveDate) -> Occurrence {
    let start = date.and_time(anchor.start.time());
    Occurrence {
        parent_event_id: anchor.id.clone(),
        date,
        start,
        end: start + anchor.duration(),
        resource_id: anchor.resource_id.clone(),
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.finished {
            return None;
        }

        for date in self.candidates.by_ref() {
            if date > self.window_end {
                break;
            }
            if let EndCondition::Until(until) = self.rule.end {
                if date > until {
                    break;
                }
            }
            if self.rule.is_exception(date) {
                continue;
            }
            if let EndCondition::Count(limit) = self.rule.end {
                if self.counted >= limit {
                    break;
                }
            }
            self.counted += 1;
            if date < self.window_start {
                continue;
            }
            return Some(occurrence_on(self.anchor, date));
        }

        debug!(
            "expansion of event {} finished after {} occurrence(s)",
            self.anchor.id, self.counted
        );
        self.finished = true;
        None
    }
}

/// Expand `rule`, anchored at `anchor`, into the occurrences dated within
/// `[window_start, window_end]`.
///
/// Each occurrence inherits the anchor's time of day, duration and resource.
///
/// # Errors
/// Returns `EngineError::InvalidRecurrenceRule` for a non-positive interval or
/// zero count, and `EngineError::InvalidRange` if the anchor's end is not after its start.
pub fn expand<'a>(
    rule: &'a RecurrenceRule,
    anchor: &'a Event,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Occurrences<'a>> {
    rule.validate()?;
    check_range(anchor.start, anchor.end)?;

    Ok(Occurrences {
        rule,
        anchor,
        window_start,
        window_end,
        candidates: CandidateDates::new(rule, anchor.start.date()),
        counted: 0,
        finished: false,
    })
}

/// Expand a recurring event's own rule.
///
/// # Errors
/// Returns `EngineError::InvalidRecurrenceRule` if `event` carries no rule.
pub fn expand_event(
    event: &Event,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Occurrences<'_>> {
    let rule = event.recurrence.as_ref().ok_or_else(|| {
        EngineError::InvalidRecurrenceRule(format!("event {} is not recurring", event.id))
    })?;
    expand(rule, event, window_start, window_end)
}

/// The concrete events visible between `from` and `to` (both inclusive dates).
///
/// Cancelled events are dropped. One-off events and occurrences alike are kept
/// when they intersect the window, so an occurrence starting the night before
/// `from` and running past midnight is included. Recurring events are replaced
/// by their occurrences, each materialized with id `"<parent>@<date>"`. Output is
/// sorted by start, then end.
pub fn expand_visible(events: &[Event], from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
    let window_start = from.and_time(NaiveTime::default());
    let window_end = to
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::default()))
        .unwrap_or(NaiveDateTime::MAX);

    let mut visible = Vec::new();
    for event in events.iter().filter(|e| e.is_active()) {
        match &event.recurrence {
            Some(rule) => {
                // Occurrences dated up to one duration before `from` can still reach into it.
                let lead_days = u64::try_from(event.duration().num_days()).unwrap_or(0) + 1;
                let expand_from = from.checked_sub_days(Days::new(lead_days)).unwrap_or(from);
                for occurrence in expand(rule, event, expand_from, to)? {
                    if occurrence.start < window_end && occurrence.end > window_start {
                        let id = format!("{}@{}", event.id, occurrence.date);
                        visible.push(occurrence.to_event(event, id));
                    }
                }
            }
            None => {
                if event.overlaps(window_start, window_end) {
                    visible.push(event.clone());
                }
            }
        }
    }

    visible.sort_by_key(|e| (e.start, e.end));
    Ok(visible)
}

/// The concrete active events overlapping `[start, end)`, recurring series materialized.
///
/// Stored events carry recurring series as a single anchor; run them through
/// this before a conflict or free-slot query so every occurrence is checked.
///
/// # Errors
/// Returns `EngineError::InvalidRange` if `start >= end`, or any rule error from expansion.
pub fn expand_range(
    events: &[Event],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Event>> {
    check_range(start, end)?;
    let mut concrete = expand_visible(events, start.date(), end.date())?;
    concrete.retain(|e| e.overlaps(start, end));
    Ok(concrete)
}

/// Detach one occurrence from its series so it can be edited independently.
///
/// Returns the parent with the occurrence's date added to its exception dates,
/// and the occurrence as a new standalone event with id `new_id`. Neither input
/// is modified; the caller persists both results.
///
/// # Errors
/// Returns `EngineError::InvalidRecurrenceRule` if `parent` is not recurring or
/// does not own `occurrence`.
pub fn detach_occurrence(
    parent: &Event,
    occurrence: &Occurrence,
    new_id: impl Into<String>,
) -> Result<(Event, Event)> {
    let rule = parent.recurrence.as_ref().ok_or_else(|| {
        EngineError::InvalidRecurrenceRule(format!("event {} is not recurring", parent.id))
    })?;
    if occurrence.parent_event_id != parent.id {
        return Err(EngineError::InvalidRecurrenceRule(format!(
            "occurrence on {} belongs to {}, not {}",
            occurrence.date, occurrence.parent_event_id, parent.id
        )));
    }

    let updated_parent = Event {
        recurrence: Some(rule.with_exception(occurrence.date)),
        ..parent.clone()
    };
    let detached = occurrence.to_event(parent, new_id);
    Ok((updated_parent, detached))
}
