//! # schedule-engine
//!
//! Calendar scheduling engine for school timetables.
//!
//! The engine is pure computation over already-resolved wall-clock times. It
//! turns pointer input into grid slots, lays overlapping events out side by
//! side, checks a teacher's bookings for double-booking, and expands
//! recurrence rules into concrete occurrences.
//!
//! ## Modules
//!
//! - [`grid`] — pixel ⇄ time conversion under a zoom-derived snapping scale
//! - [`layout`] — greedy column packing of overlapping events for one day
//! - [`conflict`] — advisory double-booking checks against an event lookup
//! - [`freebusy`] — free time slots for one resource inside a window
//! - [`recurrence`] — lazy expansion of recurrence rules into occurrences
//! - [`event`] — the event model and its JSON wire shape
//! - [`error`] — Error types

pub mod conflict;
pub mod error;
pub mod event;
pub mod freebusy;
pub mod grid;
pub mod layout;
pub mod recurrence;

pub use conflict::{check_assignment, find_conflicts, has_conflict, EventLookup};
pub use error::EngineError;
pub use event::{EndCondition, Event, EventStatus, Frequency, RecurrenceRule};
pub use freebusy::{first_free_slot, free_slots};
pub use grid::{GridPosition, Scale, TimeGridConfig};
pub use layout::{layout_day, pack_columns, PositionedEvent};
pub use recurrence::{
    detach_occurrence, expand, expand_event, expand_range, expand_visible, Occurrence,
};
