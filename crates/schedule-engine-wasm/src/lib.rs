//! WASM bindings for schedule-engine.
//!
//! Exposes grid geometry, column layout, conflict checks and recurrence
//! expansion to the browser via `wasm-bindgen`. Events and grid configs cross
//! the boundary as JSON strings in the persisted camelCase shape.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p schedule-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/schedule-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/schedule_engine_wasm.wasm
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use schedule_engine::event::timestamp;
use schedule_engine::grid::{self, GridSettings, Scale, TimeGridConfig};
use schedule_engine::{conflict, freebusy, layout, recurrence, Event};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

/// A grid config as seen by JavaScript, with its derived scale spelled out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GridConfigDto {
    #[serde(flatten)]
    settings: GridSettings,
    scale: Scale,
    increment_minutes: u32,
    pixels_per_minute: f64,
}

impl From<&TimeGridConfig> for GridConfigDto {
    fn from(config: &TimeGridConfig) -> Self {
        Self {
            settings: GridSettings::from(*config),
            scale: config.scale(),
            increment_minutes: config.increment_minutes(),
            pixels_per_minute: config.pixels_per_minute(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parse a grid config. An empty string selects the defaults.
fn parse_config(json: &str) -> Result<TimeGridConfig, JsValue> {
    if json.trim().is_empty() {
        return Ok(TimeGridConfig::default());
    }
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid grid config: {}", e)))
}

fn parse_events_json(json: &str) -> Result<Vec<Event>, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid events JSON: {}", e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| JsValue::from_str(&format!("Invalid date '{}': {}", s, e)))
}

fn parse_time(s: &str) -> Result<NaiveTime, JsValue> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| JsValue::from_str(&format!("Invalid time '{}': {}", s, e)))
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Scale name (`"hour"`, `"thirtyMinutes"`, …) for a zoom level.
#[wasm_bindgen(js_name = "getCurrentScale")]
pub fn get_current_scale(zoom_level: f64) -> Result<String, JsValue> {
    to_json(&grid::current_scale(zoom_level))
}

/// JSON array of `"HH:MM:SS"` slot boundaries for the grid.
#[wasm_bindgen(js_name = "getTimeSlots")]
pub fn get_time_slots(config_json: &str) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    to_json(&grid::time_slots(&config))
}

/// Snap a `"HH:MM[:SS]"` time to the scale of `zoom_level`.
#[wasm_bindgen(js_name = "snapTimeToGrid")]
pub fn snap_time_to_grid(time: &str, zoom_level: f64) -> Result<String, JsValue> {
    let time = parse_time(time)?;
    let snapped = grid::snap_time_to_grid(time, grid::current_scale(zoom_level));
    Ok(snapped.format("%H:%M:%S").to_string())
}

/// Grid position under a pointer, as JSON.
#[wasm_bindgen(js_name = "getGridPosition")]
pub fn get_grid_position(
    pixel_y: f64,
    container_height: f64,
    pixel_x: f64,
    container_width: f64,
    config_json: &str,
) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    to_json(&grid::grid_position(
        pixel_y,
        container_height,
        pixel_x,
        container_width,
        &config,
    ))
}

/// The config at a new zoom level, with its re-derived scale.
#[wasm_bindgen(js_name = "adjustZoom")]
pub fn adjust_zoom(config_json: &str, new_level: f64) -> Result<String, JsValue> {
    let config = grid::adjust_zoom(&parse_config(config_json)?, new_level);
    to_json(&GridConfigDto::from(&config))
}

#[wasm_bindgen(js_name = "getColumnWidth")]
pub fn get_column_width(config_json: &str, container_width: f64) -> Result<f64, JsValue> {
    Ok(grid::column_width(&parse_config(config_json)?, container_width))
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Positioned events for one day (`YYYY-MM-DD`), as JSON. Recurring series are
/// expanded for the day first.
#[wasm_bindgen(js_name = "layoutDay")]
pub fn layout_day(events_json: &str, day: &str, config_json: &str) -> Result<String, JsValue> {
    let day = parse_date(day)?;
    let config = parse_config(config_json)?;
    let visible = recurrence::expand_visible(&parse_events_json(events_json)?, day, day)
        .map_err(to_js_err)?;
    to_json(&layout::layout_day(&visible, day, &config))
}

// ---------------------------------------------------------------------------
// Conflicts and availability
// ---------------------------------------------------------------------------

/// Whether `resource_id` is already booked in `[start, end)`.
///
/// `events_json` is the resource's stored events; recurring series are expanded
/// over the range before checking. `exclude_event_id` skips the event (or
/// series) being edited.
#[wasm_bindgen(js_name = "hasConflict")]
pub fn has_conflict(
    events_json: &str,
    resource_id: &str,
    start: &str,
    end: &str,
    exclude_event_id: Option<String>,
) -> Result<bool, JsValue> {
    let start = timestamp::parse(start).map_err(to_js_err)?;
    let end = timestamp::parse(end).map_err(to_js_err)?;
    let events = recurrence::expand_range(&parse_events_json(events_json)?, start, end)
        .map_err(to_js_err)?;
    conflict::has_conflict(&events, resource_id, start, end, exclude_event_id.as_deref())
        .map_err(to_js_err)
}

/// Conflicts for a main teacher and optional substitute, as JSON.
///
/// Recurring series in `events_json` are expanded over the range first.
#[wasm_bindgen(js_name = "checkAssignment")]
pub fn check_assignment(
    events_json: &str,
    main_resource_id: &str,
    substitute_resource_id: Option<String>,
    start: &str,
    end: &str,
    exclude_event_id: Option<String>,
) -> Result<String, JsValue> {
    let start = timestamp::parse(start).map_err(to_js_err)?;
    let end = timestamp::parse(end).map_err(to_js_err)?;
    let events = recurrence::expand_range(&parse_events_json(events_json)?, start, end)
        .map_err(to_js_err)?;
    let check = conflict::check_assignment(
        &events,
        main_resource_id,
        substitute_resource_id.as_deref(),
        start,
        end,
        exclude_event_id.as_deref(),
    )
    .map_err(to_js_err)?;
    to_json(&check)
}

/// Free slots of `resource_id` within the window, as JSON. Recurring series occupy
/// every occurrence.
#[wasm_bindgen(js_name = "findFreeSlots")]
pub fn find_free_slots(
    events_json: &str,
    resource_id: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, JsValue> {
    let ws = timestamp::parse(window_start).map_err(to_js_err)?;
    let we = timestamp::parse(window_end).map_err(to_js_err)?;
    let events =
        recurrence::expand_range(&parse_events_json(events_json)?, ws, we).map_err(to_js_err)?;
    let slots = freebusy::free_slots(&events, resource_id, ws, we).map_err(to_js_err)?;
    to_json(&slots)
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// Occurrences of one recurring event dated within `[from, to]`, as JSON.
#[wasm_bindgen(js_name = "expandRecurrence")]
pub fn expand_recurrence(event_json: &str, from: &str, to: &str) -> Result<String, JsValue> {
    let event: Event = serde_json::from_str(event_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid event JSON: {}", e)))?;
    let occurrences: Vec<_> = recurrence::expand_event(&event, parse_date(from)?, parse_date(to)?)
        .map_err(to_js_err)?
        .collect();
    to_json(&occurrences)
}

/// Concrete events visible within `[from, to]`, recurring series materialized, as JSON.
#[wasm_bindgen(js_name = "expandVisible")]
pub fn expand_visible(events_json: &str, from: &str, to: &str) -> Result<String, JsValue> {
    let events = parse_events_json(events_json)?;
    let visible = recurrence::expand_visible(&events, parse_date(from)?, parse_date(to)?)
        .map_err(to_js_err)?;
    to_json(&visible)
}
