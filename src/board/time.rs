//! Time grid utilities: "HH:MM" strings, minute offsets and the operating window

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::error::{BoardError, BoardResult};

/// Grid resolution in minutes
pub const SLOT_MINUTES: u32 = 15;

/// Grid origin (06:00) in minutes since midnight
pub const DAY_START_MINUTES: u32 = 6 * 60;

/// Latest start a job may have (17:45)
pub const LAST_START_MINUTES: u32 = 17 * 60 + 45;

/// Grid end (18:00)
pub const DAY_END_MINUTES: u32 = 18 * 60;

/// Parse a strict "HH:MM" string into minutes since midnight.
///
/// Only the zero-padded 24-hour form is accepted ("09:00", not "9:00" or "9am").
/// A malformed value here means an upstream bug, so it is an error rather than a fallback.
pub fn time_to_minutes(hhmm: &str) -> BoardResult<u32> {
    let bytes = hhmm.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(BoardError::InvalidTimeFormat(hhmm.to_string()));
    }

    let time = NaiveTime::parse_from_str(hhmm, "%H:%M")
        .map_err(|_| BoardError::InvalidTimeFormat(hhmm.to_string()))?;
    Ok(time.hour() * 60 + time.minute())
}

/// Format minutes since midnight as zero-padded "HH:MM"
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Round to the nearest 15-minute slot
pub fn snap_to_slot(minutes: i64) -> i64 {
    let slot = SLOT_MINUTES as i64;
    (minutes + slot / 2).div_euclid(slot) * slot
}

/// Round a duration down to whole slots
pub fn floor_to_slot(minutes: u32) -> u32 {
    (minutes / SLOT_MINUTES) * SLOT_MINUTES
}

/// Render a duration for block labels, e.g. "1h 30m", "45m", "2h"
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// The part of the day the board covers.
///
/// `start` is the grid origin, `last_start` the latest slot a job or split may
/// begin in, `end` the bottom edge of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u32,
    pub last_start: u32,
    pub end: u32,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            start: DAY_START_MINUTES,
            last_start: LAST_START_MINUTES,
            end: DAY_END_MINUTES,
        }
    }
}

impl TimeWindow {
    /// Build a window from configured "HH:MM" bounds
    pub fn from_strings(start: &str, last_start: &str, end: &str) -> BoardResult<Self> {
        let window = Self {
            start: time_to_minutes(start)?,
            last_start: time_to_minutes(last_start)?,
            end: time_to_minutes(end)?,
        };

        if window.start % SLOT_MINUTES != 0
            || window.last_start % SLOT_MINUTES != 0
            || window.end % SLOT_MINUTES != 0
        {
            return Err(BoardError::InvalidWindow(format!(
                "{start}-{end} is not aligned to {SLOT_MINUTES}-minute slots"
            )));
        }
        if !(window.start <= window.last_start && window.last_start < window.end) {
            return Err(BoardError::InvalidWindow(format!(
                "expected {start} <= {last_start} < {end}"
            )));
        }
        Ok(window)
    }

    /// Clamp a candidate start into [start, last_start]
    pub fn clamp_start(&self, minutes: i64) -> u32 {
        minutes.clamp(self.start as i64, self.last_start as i64) as u32
    }

    pub fn contains_start(&self, minutes: u32) -> bool {
        minutes >= self.start && minutes <= self.last_start
    }

    /// Total grid length in minutes
    pub fn span(&self) -> u32 {
        self.end - self.start
    }

    /// Every slot start from the origin up to (excluding) the grid end
    pub fn slots(&self) -> impl Iterator<Item = u32> {
        (self.start..self.end).step_by(SLOT_MINUTES as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_zero_padded_times() {
        assert_eq!(time_to_minutes("06:00"), Ok(360));
        assert_eq!(time_to_minutes("17:45"), Ok(1065));
        assert_eq!(time_to_minutes("00:00"), Ok(0));
        assert_eq!(time_to_minutes("23:59"), Ok(1439));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["9:00", "09:0", "0900", "24:00", "12:60", "ab:cd", "", " 09:00", "09:00 "] {
            assert_eq!(
                time_to_minutes(bad),
                Err(BoardError::InvalidTimeFormat(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn round_trips_every_slot_in_the_window() {
        for minutes in TimeWindow::default().slots() {
            let text = minutes_to_time(minutes);
            assert_eq!(time_to_minutes(&text), Ok(minutes));
            assert_eq!(minutes_to_time(time_to_minutes(&text).unwrap()), text);
        }
    }

    #[test]
    fn snaps_to_nearest_slot() {
        assert_eq!(snap_to_slot(0), 0);
        assert_eq!(snap_to_slot(7), 0);
        assert_eq!(snap_to_slot(8), 15);
        assert_eq!(snap_to_slot(-8), -15);
        assert_eq!(snap_to_slot(-7), 0);
        assert_eq!(floor_to_slot(44), 30);
    }

    #[test]
    fn clamps_starts_to_the_operating_window() {
        let window = TimeWindow::default();
        assert_eq!(window.clamp_start(300), 360);
        assert_eq!(window.clamp_start(1080), 1065);
        assert_eq!(window.clamp_start(600), 600);
        assert!(window.contains_start(1065));
        assert!(!window.contains_start(1080));
        assert_eq!(window.slots().count(), 48);
    }

    #[test]
    fn window_from_strings_validates_bounds() {
        assert_eq!(
            TimeWindow::from_strings("06:00", "17:45", "18:00"),
            Ok(TimeWindow::default())
        );
        assert!(matches!(
            TimeWindow::from_strings("06:10", "17:45", "18:00"),
            Err(BoardError::InvalidWindow(_))
        ));
        assert!(matches!(
            TimeWindow::from_strings("18:00", "17:45", "18:00"),
            Err(BoardError::InvalidWindow(_))
        ));
        assert!(matches!(
            TimeWindow::from_strings("6", "17:45", "18:00"),
            Err(BoardError::InvalidTimeFormat(_))
        ));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(45), "45m");
        assert_eq!(format_duration(120), "2h");
        assert_eq!(format_duration(90), "1h 30m");
    }

    proptest! {
        #[test]
        fn aligned_times_round_trip(slot in 0u32..48) {
            let minutes = DAY_START_MINUTES + slot * SLOT_MINUTES;
            let text = minutes_to_time(minutes);
            prop_assert_eq!(time_to_minutes(&text), Ok(minutes));
        }

        #[test]
        fn snapped_values_are_slot_aligned(minutes in -2000i64..2000) {
            let snapped = snap_to_slot(minutes);
            prop_assert_eq!(snapped.rem_euclid(SLOT_MINUTES as i64), 0);
            prop_assert!((snapped - minutes).abs() <= 7);
        }
    }
}
