//! Flight segmentation: one pass over the fix sequence detecting launch and
//! landing from the speed proxy, tracking altitude extremes and assembling
//! the [`FlightSummary`].

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::climb::{climb_rates, ClimbRate};
use crate::parser::{FlightDate, Fix, IgcTrack};
use crate::AnalysisParams;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlightPhase {
    NotStarted,
    Flying,
    Landed,
}

/// A position in both source (`DDMMmmmN`) and decimal-degree form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlightPoint {
    pub raw_latitude: String,
    pub raw_longitude: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl FlightPoint {
    fn of(fix: &Fix) -> Self {
        Self {
            raw_latitude: fix.raw_latitude.clone(),
            raw_longitude: fix.raw_longitude.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
        }
    }

    pub fn decimal(&self) -> String {
        format!("{} {}", self.latitude, self.longitude)
    }
}

impl fmt::Display for FlightPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.raw_latitude, self.raw_longitude)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlightEvent {
    /// Index into [`IgcTrack::fixes`].
    pub fix_index: usize,
    pub time_of_day: NaiveTime,
    pub timestamp: Option<NaiveDateTime>,
    pub altitude_ft: i32,
    pub point: FlightPoint,
}

impl FlightEvent {
    fn at(fix_index: usize, fix: &Fix) -> Self {
        Self {
            fix_index,
            time_of_day: fix.time_of_day,
            timestamp: fix.timestamp,
            altitude_ft: fix.altitude_ft,
            point: FlightPoint::of(fix),
        }
    }
}

/// Flight time as logged: whole hours plus (possibly rounded-up) minutes.
/// Seconds are never reported.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlightDuration {
    pub hours: i64,
    pub minutes: i64,
}

impl FlightDuration {
    // The round-up is not carried into hours, so `0:60:00` is possible.
    pub fn between(launch: NaiveDateTime, landing: NaiveDateTime, round_up_minutes: i64) -> Self {
        let total = (landing - launch).num_minutes();
        Self {
            hours: total / 60,
            minutes: (total % 60).saturating_add(round_up_minutes),
        }
    }
}

impl fmt::Display for FlightDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:00", self.hours, self.minutes)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlightSummary {
    pub date: FlightDate,
    pub phase: FlightPhase,
    pub launch: Option<FlightEvent>,
    pub landing: Option<FlightEvent>,
    /// Requires both events and a valid flight date.
    pub duration: Option<FlightDuration>,
    pub max_altitude_ft: i32,
    pub climb_rates: Vec<ClimbRate>,
    pub max_speed: u32,
    /// Fixes examined by segmentation (the pass stops at landing).
    pub fixes_analyzed: usize,
}

impl FlightSummary {
    pub fn is_complete(&self) -> bool {
        self.phase == FlightPhase::Landed
    }

    pub fn launch_timestamp(&self) -> Option<NaiveDateTime> {
        self.launch.as_ref().and_then(|e| e.timestamp)
    }

    pub fn landing_timestamp(&self) -> Option<NaiveDateTime> {
        self.landing.as_ref().and_then(|e| e.timestamp)
    }

    pub fn launch_altitude_ft(&self) -> Option<i32> {
        self.launch.as_ref().map(|e| e.altitude_ft)
    }

    pub fn landing_altitude_ft(&self) -> Option<i32> {
        self.landing.as_ref().map(|e| e.altitude_ft)
    }

    pub fn launch_point(&self) -> Option<&FlightPoint> {
        self.launch.as_ref().map(|e| &e.point)
    }

    pub fn landing_point(&self) -> Option<&FlightPoint> {
        self.landing.as_ref().map(|e| &e.point)
    }

    pub fn climb_rate(&self, interval_s: u32) -> Option<i32> {
        self.climb_rates
            .iter()
            .find(|c| c.interval_s == interval_s)
            .map(|c| c.rate_fpm)
    }
}

// Launch is the first moving fix. Landing is the first fix after launch that
// is stationary while its predecessor was stationary too; nothing after it is
// examined.
pub fn analyze_flight(track: &IgcTrack, params: &AnalysisParams) -> FlightSummary {
    let mut phase = FlightPhase::NotStarted;
    let mut launch: Option<FlightEvent> = None;
    let mut landing: Option<FlightEvent> = None;
    let mut max_altitude_ft = 0;
    let mut max_speed = 0;
    let mut previous_speed = 0;
    let mut fixes_analyzed = 0;

    for (idx, fix) in track.fixes.iter().enumerate() {
        fixes_analyzed += 1;
        max_speed = max_speed.max(fix.speed);

        if phase == FlightPhase::NotStarted && fix.is_moving() {
            debug!(time = %fix.time_of_day, altitude_ft = fix.altitude_ft, "launch detected");
            phase = FlightPhase::Flying;
            launch = Some(FlightEvent::at(idx, fix));
            max_altitude_ft = fix.altitude_ft;
        }

        max_altitude_ft = max_altitude_ft.max(fix.altitude_ft);

        if phase == FlightPhase::Flying && fix.speed == 0 && previous_speed == 0 {
            debug!(time = %fix.time_of_day, altitude_ft = fix.altitude_ft, "landing detected");
            phase = FlightPhase::Landed;
            landing = Some(FlightEvent::at(idx, fix));
            break;
        }
        previous_speed = fix.speed;
    }

    let duration = match (&launch, &landing) {
        (Some(l), Some(d)) => match (l.timestamp, d.timestamp) {
            (Some(start), Some(end)) => Some(FlightDuration::between(
                start,
                end,
                params.duration_round_up_minutes,
            )),
            _ => None,
        },
        _ => None,
    };

    debug!(max_speed, fixes_analyzed, ?phase, "segmentation finished");

    FlightSummary {
        date: track.date.clone(),
        phase,
        launch,
        landing,
        duration,
        max_altitude_ft,
        climb_rates: climb_rates(
            &track.fixes,
            &params.climb_intervals_s,
            params.scan_mode(),
        ),
        max_speed,
        fixes_analyzed,
    }
}
