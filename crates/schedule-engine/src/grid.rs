//! Grid geometry -- converts between pixel offsets and wall-clock times for one day.
//!
//! A [`TimeGridConfig`] describes the visible hours, the number of day columns and
//! a zoom level. The zoom level determines a [`Scale`], which in turn fixes both
//! the snapping increment and the vertical pixel density of the grid.
//!
//! Every function here is total over a validated config: pointer coordinates
//! outside the grid clamp to its edges instead of failing, so dragging above the
//! grid top behaves like pointing at `start_hour`.

use chrono::{NaiveTime, Timelike};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Lowest accepted zoom level.
pub const MIN_ZOOM: f64 = 0.25;
/// Highest accepted zoom level.
pub const MAX_ZOOM: f64 = 3.0;
/// Exact and snapped positions closer than this are reported as snapped.
pub const SNAP_TOLERANCE_PX: f64 = 2.0;

const SECONDS_PER_DAY: u32 = 86_400;

/// Snapping granularity of the grid, ordered from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scale {
    Hour,
    ThirtyMinutes,
    FifteenMinutes,
    FiveMinutes,
    Minute,
}

impl Scale {
    pub fn increment_minutes(self) -> u32 {
        match self {
            Scale::Hour => 60,
            Scale::ThirtyMinutes => 30,
            Scale::FifteenMinutes => 15,
            Scale::FiveMinutes => 5,
            Scale::Minute => 1,
        }
    }

    /// Vertical density of one hour at zoom 1.0.
    pub fn pixels_per_hour(self) -> f64 {
        match self {
            Scale::Hour => 60.0,
            Scale::ThirtyMinutes => 80.0,
            Scale::FifteenMinutes => 120.0,
            Scale::FiveMinutes => 240.0,
            Scale::Minute => 360.0,
        }
    }
}

/// Scale for a zoom level. Higher zoom never yields a coarser scale.
pub fn current_scale(zoom_level: f64) -> Scale {
    if zoom_level >= 2.0 {
        Scale::Minute
    } else if zoom_level >= 1.5 {
        Scale::FiveMinutes
    } else if zoom_level >= 1.0 {
        Scale::FifteenMinutes
    } else if zoom_level >= 0.5 {
        Scale::ThirtyMinutes
    } else {
        Scale::Hour
    }
}

fn clamp_zoom(level: f64) -> f64 {
    if level.is_nan() {
        1.0
    } else {
        level.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

/// Unvalidated grid settings, as read from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridSettings {
    pub min_increment_minutes: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    pub zoom_level: f64,
    pub column_count: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            min_increment_minutes: 1,
            start_hour: 0,
            end_hour: 24,
            zoom_level: 1.0,
            column_count: 1,
        }
    }
}

/// A validated time grid for a single calendar day.
///
/// The scale is never stored; it is always derived from the zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSettings", into = "GridSettings")]
pub struct TimeGridConfig {
    min_increment_minutes: u32,
    start_hour: u32,
    end_hour: u32,
    zoom_level: f64,
    column_count: u32,
}

impl TryFrom<GridSettings> for TimeGridConfig {
    type Error = EngineError;

    fn try_from(settings: GridSettings) -> Result<Self> {
        if settings.start_hour >= settings.end_hour {
            return Err(rejected(format!(
                "startHour {} must be before endHour {}",
                settings.start_hour, settings.end_hour
            )));
        }
        if settings.end_hour > 24 {
            return Err(rejected(format!(
                "endHour {} is past the end of the day",
                settings.end_hour
            )));
        }
        if settings.column_count == 0 {
            return Err(rejected("columnCount must be at least 1".to_string()));
        }
        let inc = settings.min_increment_minutes;
        if inc == 0 || 60 % inc != 0 {
            return Err(rejected(format!(
                "minIncrementMinutes {} must divide an hour evenly",
                inc
            )));
        }
        Ok(Self {
            min_increment_minutes: inc,
            start_hour: settings.start_hour,
            end_hour: settings.end_hour,
            zoom_level: clamp_zoom(settings.zoom_level),
            column_count: settings.column_count,
        })
    }
}

fn rejected(reason: String) -> EngineError {
    warn!("rejected grid config: {}", reason);
    EngineError::InvalidGridConfig(reason)
}

impl From<TimeGridConfig> for GridSettings {
    fn from(config: TimeGridConfig) -> Self {
        Self {
            min_increment_minutes: config.min_increment_minutes,
            start_hour: config.start_hour,
            end_hour: config.end_hour,
            zoom_level: config.zoom_level,
            column_count: config.column_count,
        }
    }
}

impl Default for TimeGridConfig {
    fn default() -> Self {
        let settings = GridSettings::default();
        Self {
            min_increment_minutes: settings.min_increment_minutes,
            start_hour: settings.start_hour,
            end_hour: settings.end_hour,
            zoom_level: settings.zoom_level,
            column_count: settings.column_count,
        }
    }
}

impl TimeGridConfig {
    /// Validate `settings` into a config. The zoom level is clamped, not rejected.
    pub fn new(settings: GridSettings) -> Result<Self> {
        Self::try_from(settings)
    }

    pub fn min_increment_minutes(&self) -> u32 {
        self.min_increment_minutes
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn column_count(&self) -> u32 {
        self.column_count
    }

    pub fn scale(&self) -> Scale {
        current_scale(self.zoom_level)
    }

    /// Snapping step: the scale's increment, but never finer than the configured minimum.
    pub fn increment_minutes(&self) -> u32 {
        self.scale().increment_minutes().max(self.min_increment_minutes)
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.scale().pixels_per_hour() * self.zoom_level / 60.0
    }

    /// Total grid height in pixels.
    pub fn height_pixels(&self) -> f64 {
        f64::from(self.span_minutes()) * self.pixels_per_minute()
    }

    /// Copy of this config at a new zoom level (clamped to `[MIN_ZOOM, MAX_ZOOM]`).
    pub fn with_zoom(&self, level: f64) -> Self {
        Self {
            zoom_level: clamp_zoom(level),
            ..*self
        }
    }

    pub(crate) fn start_minutes(&self) -> u32 {
        self.start_hour * 60
    }

    pub(crate) fn span_minutes(&self) -> u32 {
        (self.end_hour - self.start_hour) * 60
    }

    /// Last representable slot boundary, in minutes from midnight. A grid ending
    /// at 24:00 stops one increment earlier since midnight belongs to the next day.
    fn last_boundary_minutes(&self) -> u32 {
        let end = self.end_hour * 60;
        if end >= 24 * 60 {
            24 * 60 - self.increment_minutes()
        } else {
            end
        }
    }
}

/// Where a pointer landed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPosition {
    /// Snapped wall-clock time.
    pub time: NaiveTime,
    /// Unsnapped wall-clock time under the pointer (after clamping).
    pub exact_time: NaiveTime,
    pub column: u32,
    pub exact_pixel_y: f64,
    pub snapped_pixel_y: f64,
    pub is_snapped: bool,
}

/// Every slot boundary from `start_hour` to `end_hour` inclusive, ascending.
pub fn time_slots(config: &TimeGridConfig) -> Vec<NaiveTime> {
    let step = config.increment_minutes() as usize;
    (config.start_minutes()..=config.last_boundary_minutes())
        .step_by(step)
        .filter_map(time_from_minute_of_day)
        .collect()
}

/// Round `time` to the nearest multiple of the scale's increment (ties round up).
///
/// This ignores a grid's `min_increment_minutes`. [`grid_position`] snaps to the
/// effective increment instead, so when the configured minimum is coarser than
/// the scale a scale-aligned time such as 09:15 lands on 09:30, not on itself.
pub fn snap_time_to_grid(time: NaiveTime, scale: Scale) -> NaiveTime {
    snap_to_increment(time, scale.increment_minutes())
}

/// Round `time` to the nearest multiple of `increment_minutes` (ties round up).
///
/// Only the position within the hour is rounded; reaching 60 carries into the
/// next hour. A carry past 23:xx would leave the day, so it rounds down instead.
pub fn snap_to_increment(time: NaiveTime, increment_minutes: u32) -> NaiveTime {
    let step = increment_minutes.clamp(1, 60) * 60;
    let within_hour = time.minute() * 60 + time.second();
    let rounded = (within_hour + step / 2) / step * step;
    let mut total = time.hour() * 3600 + rounded;
    if total >= SECONDS_PER_DAY {
        total -= step;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(total, 0).unwrap_or(time)
}

/// Convert a pointer offset inside the grid container into a [`GridPosition`].
///
/// `pixel_y` is measured from the top of the grid (`start_hour`), `pixel_x` from
/// the left edge of the first day column. Out-of-range coordinates clamp.
///
/// The snapped time round-trips through [`time_to_pixel`] for any time aligned
/// to the grid's effective increment, which is coarser than the scale's own
/// whenever `min_increment_minutes` is.
pub fn grid_position(
    pixel_y: f64,
    container_height_px: f64,
    pixel_x: f64,
    container_width_px: f64,
    config: &TimeGridConfig,
) -> GridPosition {
    let ppm = config.pixels_per_minute();

    let mut max_y = config.height_pixels();
    if container_height_px.is_finite() && container_height_px > 0.0 {
        max_y = max_y.min(container_height_px);
    }
    let y = if pixel_y.is_nan() {
        0.0
    } else {
        pixel_y.clamp(0.0, max_y)
    };

    let exact_minutes = f64::from(config.start_minutes()) + y / ppm;
    let exact_time = time_from_fractional_minutes(exact_minutes);

    let lower = time_from_minute_of_day(config.start_minutes()).unwrap_or(exact_time);
    let upper = time_from_minute_of_day(config.last_boundary_minutes()).unwrap_or(exact_time);
    let time = snap_to_increment(exact_time, config.increment_minutes()).clamp(lower, upper);
    let snapped_pixel_y = time_to_pixel(config, time);

    GridPosition {
        time,
        exact_time,
        column: column_at(pixel_x, container_width_px, config),
        exact_pixel_y: y,
        snapped_pixel_y,
        is_snapped: (y - snapped_pixel_y).abs() < SNAP_TOLERANCE_PX,
    }
}

/// Vertical offset of `time` from the grid top, clamped to the grid.
pub fn time_to_pixel(config: &TimeGridConfig, time: NaiveTime) -> f64 {
    let minutes = f64::from(time.num_seconds_from_midnight()) / 60.0
        - f64::from(config.start_minutes());
    minutes.clamp(0.0, f64::from(config.span_minutes())) * config.pixels_per_minute()
}

/// Width of one day column.
pub fn column_width(config: &TimeGridConfig, container_width_px: f64) -> f64 {
    container_width_px / f64::from(config.column_count)
}

/// Copy of `config` at `new_level`, clamped to `[MIN_ZOOM, MAX_ZOOM]` with the scale re-derived.
pub fn adjust_zoom(config: &TimeGridConfig, new_level: f64) -> TimeGridConfig {
    config.with_zoom(new_level)
}

fn column_at(pixel_x: f64, container_width_px: f64, config: &TimeGridConfig) -> u32 {
    let width = column_width(config, container_width_px);
    if width.is_nan() || width <= 0.0 || pixel_x.is_nan() {
        return 0;
    }
    let raw = (pixel_x / width).floor();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, f64::from(config.column_count - 1)) as u32
}

fn time_from_minute_of_day(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
}

/// Millisecond-precision time for a fractional minute-of-day, saturating within the day.
fn time_from_fractional_minutes(minutes: f64) -> NaiveTime {
    let millis = (minutes * 60_000.0)
        .round()
        .clamp(0.0, f64::from(SECONDS_PER_DAY) * 1000.0 - 1.0) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(millis / 1000, (millis % 1000) * 1_000_000)
        .unwrap_or_default()
}
