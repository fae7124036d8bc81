// Maximum climb rate over fixed look-ahead intervals.
//
// For every moving fix, the first fix (in file order) that is at least
// `interval` seconds later by time of day is taken as the end point. Only
// that first candidate is considered, even when a later one would show a
// bigger gain. Pressure altitude is used so GNSS noise does not inflate
// short-interval rates.

use serde::{Deserialize, Serialize};

use crate::parser::Fix;
use crate::FEET_PER_METER;

/// Which fixes are eligible as the end point of a climb measurement.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanMode {
    /// Scan the whole file from the first fix, start fix included.
    LegacyFullScan,
    ForwardOnly,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::LegacyFullScan
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClimbRate {
    pub interval_s: u32,
    /// Best climb rate in feet per minute, 0 when no climb was found.
    pub rate_fpm: i32,
}

pub fn max_climb_rate(fixes: &[Fix], interval_s: u32, mode: ScanMode) -> i32 {
    let interval = i64::from(interval_s);
    let mut best = 0;

    for (idx, start) in fixes.iter().enumerate() {
        if !start.is_moving() {
            continue;
        }
        let candidates = match mode {
            ScanMode::LegacyFullScan => fixes,
            ScanMode::ForwardOnly => &fixes[idx + 1..],
        };
        let start_s = start.seconds_of_day();
        let Some(end) = candidates
            .iter()
            .find(|c| c.seconds_of_day() - start_s >= interval)
        else {
            continue;
        };
        if let Some(rate) = climb_rate_fpm(start, end) {
            best = best.max(rate);
        }
    }

    best
}

pub fn climb_rates(fixes: &[Fix], intervals_s: &[u32], mode: ScanMode) -> Vec<ClimbRate> {
    intervals_s
        .iter()
        .map(|&interval_s| ClimbRate {
            interval_s,
            rate_fpm: max_climb_rate(fixes, interval_s, mode),
        })
        .collect()
}

fn climb_rate_fpm(start: &Fix, end: &Fix) -> Option<i32> {
    let elapsed = end.seconds_of_day() - start.seconds_of_day();
    if elapsed <= 0 || end.pressure_altitude_m <= start.pressure_altitude_m {
        return None;
    }
    let gain_m = f64::from(end.pressure_altitude_m - start.pressure_altitude_m);
    let rate = gain_m / elapsed as f64 * 60.0 * FEET_PER_METER;
    Some(rate.round() as i32)
}
