//! Detect double-booking of a resource (teacher) over a proposed time range.
//!
//! Existing events are read through the narrow [`EventLookup`] collaborator.
//! Two ranges conflict when `existing.start < candidate.end && existing.end > candidate.start`,
//! so back-to-back bookings are NOT conflicts. Cancelled events never conflict.
//!
//! The check is advisory. Nothing here locks the resource between the check and
//! the caller's write, so two concurrent bookings can both pass; callers that
//! need a hard guarantee must serialize check-and-write per resource themselves.

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::event::{check_range, Event};

/// Read-only access to stored events, keyed by resource.
pub trait EventLookup {
    /// Every stored event assigned to `resource_id`, in any status.
    fn events_for_resource(&self, resource_id: &str) -> Result<Vec<Event>>;
}

impl EventLookup for [Event] {
    fn events_for_resource(&self, resource_id: &str) -> Result<Vec<Event>> {
        Ok(self
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .cloned()
            .collect())
    }
}

impl EventLookup for Vec<Event> {
    fn events_for_resource(&self, resource_id: &str) -> Result<Vec<Event>> {
        self.as_slice().events_for_resource(resource_id)
    }
}

impl<T: EventLookup + ?Sized> EventLookup for &T {
    fn events_for_resource(&self, resource_id: &str) -> Result<Vec<Event>> {
        (**self).events_for_resource(resource_id)
    }
}

/// An existing event that overlaps the candidate range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub event: Event,
    pub overlap_minutes: i64,
}

/// Find every active event of `resource_id` overlapping `[start, end)`.
///
/// `exclude_event_id` skips the event being edited in place, so moving an event
/// within its own slot is not reported against itself. Occurrences materialized
/// from an excluded series are skipped with it.
///
/// # Errors
/// Returns `EngineError::InvalidRange` if `start >= end`, or whatever the lookup fails with.
pub fn find_conflicts<L: EventLookup + ?Sized>(
    lookup: &L,
    resource_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_event_id: Option<&str>,
) -> Result<Vec<Conflict>> {
    check_range(start, end)?;

    let conflicts: Vec<Conflict> = lookup
        .events_for_resource(resource_id)?
        .into_iter()
        .filter(|e| e.is_active() && e.resource_id == resource_id)
        .filter(|e| !is_excluded(e, exclude_event_id))
        .filter(|e| e.overlaps(start, end))
        .map(|event| {
            let overlap_minutes = (event.end.min(end) - event.start.max(start)).num_minutes();
            Conflict {
                event,
                overlap_minutes,
            }
        })
        .collect();

    if !conflicts.is_empty() {
        debug!(
            "resource {} has {} conflicting event(s) in {} .. {}",
            resource_id,
            conflicts.len(),
            start,
            end
        );
    }

    Ok(conflicts)
}

fn is_excluded(event: &Event, exclude_event_id: Option<&str>) -> bool {
    exclude_event_id.is_some_and(|id| {
        event.id == id || event.parent_event_id.as_deref() == Some(id)
    })
}

/// Whether any active event of `resource_id` (other than `exclude_event_id`) overlaps `[start, end)`.
pub fn has_conflict<L: EventLookup + ?Sized>(
    lookup: &L,
    resource_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_event_id: Option<&str>,
) -> Result<bool> {
    Ok(!find_conflicts(lookup, resource_id, start, end, exclude_event_id)?.is_empty())
}

/// Conflicts for the main teacher and, when one is assigned, the substitute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCheck {
    pub main: Vec<Conflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitute: Option<Vec<Conflict>>,
}

impl AssignmentCheck {
    pub fn is_clear(&self) -> bool {
        self.main.is_empty() && self.substitute.as_ref().is_none_or(|s| s.is_empty())
    }
}

/// Check the main resource and an optional substitute independently.
///
/// Assigning a substitute never exempts the main resource from its own check.
pub fn check_assignment<L: EventLookup + ?Sized>(
    lookup: &L,
    main_resource_id: &str,
    substitute_resource_id: Option<&str>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_event_id: Option<&str>,
) -> Result<AssignmentCheck> {
    let main = find_conflicts(lookup, main_resource_id, start, end, exclude_event_id)?;
    let substitute = substitute_resource_id
        .map(|id| find_conflicts(lookup, id, start, end, exclude_event_id))
        .transpose()?;
    Ok(AssignmentCheck { main, substitute })
}
