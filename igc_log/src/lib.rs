//! Core IGC flight-log analysis library.
//!
//! Parses IGC flight-recorder text into an ordered fix sequence and runs a
//! single pass over it to produce a [`FlightSummary`]: launch and landing
//! detection, altitude extremes, duration and maximum climb rates. The crate
//! performs no I/O; formatters consume [`FlightReport`] values.

pub mod climb;
pub mod coords;
pub mod flight;
pub mod parser;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use climb::{climb_rates, max_climb_rate, ClimbRate, ScanMode};
pub use coords::{format_latitude, format_longitude, to_decimal_degrees};
pub use flight::{
    analyze_flight, FlightDuration, FlightEvent, FlightPhase, FlightPoint, FlightSummary,
};
pub use parser::{parse_igc, parse_igc_bytes, FlightDate, Fix, IgcTrack, RawFix};

pub const FEET_PER_METER: f64 = 3.28084;

/// Minutes added to every computed flight duration. Flight logs have always
/// rounded the remainder up by one whole minute, even when it is exact.
pub const DURATION_ROUND_UP_MINUTES: i64 = 1;
pub const MAX_DURATION_ROUND_UP_MINUTES: i64 = 59;

/// Look-ahead intervals (seconds) reported in the flight log's
/// "Max Avg 2s-15s-30s" column.
pub const DEFAULT_CLIMB_INTERVALS_S: [u32; 3] = [2, 15, 30];

#[derive(Error, Debug)]
pub enum IgcError {
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("invalid coordinate: {0:?}")]
    InvalidCoordinate(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    pub climb_intervals_s: Vec<u32>,
    pub legacy_full_scan: bool,
    pub duration_round_up_minutes: i64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            climb_intervals_s: DEFAULT_CLIMB_INTERVALS_S.to_vec(),
            legacy_full_scan: true,
            duration_round_up_minutes: DURATION_ROUND_UP_MINUTES,
        }
    }
}

impl AnalysisParams {
    pub fn scan_mode(&self) -> ScanMode {
        if self.legacy_full_scan {
            ScanMode::LegacyFullScan
        } else {
            ScanMode::ForwardOnly
        }
    }

    pub fn validate(&self) -> Result<(), IgcError> {
        if self.climb_intervals_s.is_empty() {
            return Err(IgcError::InvalidParameter(
                "at least one climb interval is required".into(),
            ));
        }
        if self.climb_intervals_s.contains(&0) {
            return Err(IgcError::InvalidParameter(
                "climb intervals must be > 0 seconds".into(),
            ));
        }
        if !(0..=MAX_DURATION_ROUND_UP_MINUTES).contains(&self.duration_round_up_minutes) {
            return Err(IgcError::InvalidParameter(format!(
                "duration round-up must be between 0 and {} minutes",
                MAX_DURATION_ROUND_UP_MINUTES
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, IgcError> {
        let params: AnalysisParams =
            serde_json::from_str(text).map_err(|e| IgcError::InvalidParameter(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FlightReport {
    pub track: IgcTrack,
    pub summary: FlightSummary,
}

pub fn analyze_igc(input: &[u8], params: &AnalysisParams) -> Result<FlightReport, IgcError> {
    params.validate()?;
    let track = parse_igc_bytes(input)?;
    let summary = analyze_flight(&track, params);
    Ok(FlightReport { track, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = AnalysisParams::default();
        assert_eq!(params.climb_intervals_s, vec![2, 15, 30]);
        assert_eq!(params.scan_mode(), ScanMode::LegacyFullScan);
        assert_eq!(params.duration_round_up_minutes, 1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_from_partial_json() {
        let params = AnalysisParams::from_json(r#"{"legacy_full_scan": false}"#).unwrap();
        assert_eq!(params.scan_mode(), ScanMode::ForwardOnly);
        assert_eq!(params.climb_intervals_s, vec![2, 15, 30]);
    }

    #[test]
    fn test_params_reject_zero_interval() {
        let err = AnalysisParams::from_json(r#"{"climb_intervals_s": [2, 0]}"#).unwrap_err();
        assert!(matches!(err, IgcError::InvalidParameter(_)));
        assert!(AnalysisParams::from_json("not json").is_err());
    }

    #[test]
    fn test_params_reject_out_of_range_round_up() {
        for value in ["-1", "60", "9223372036854775807"] {
            let json = format!(r#"{{"duration_round_up_minutes": {}}}"#, value);
            let err = AnalysisParams::from_json(&json).unwrap_err();
            assert!(matches!(err, IgcError::InvalidParameter(_)), "{value}");
        }
        let params = AnalysisParams::from_json(r#"{"duration_round_up_minutes": 59}"#).unwrap();
        assert_eq!(params.duration_round_up_minutes, 59);
    }

    #[test]
    fn test_analyze_igc_end_to_end() {
        let igc = "AXXX001\r\n\
                   HFDTE150723\r\n\
                   B1000004700000N00800000EA0010000100005\r\n\
                   B1000054700000N00800000EA0015000150005\r\n\
                   B1000104700000N00800000EA0015000150000\r\n\
                   B1000154700000N00800000EA0015000150000\r\n";
        let report = analyze_igc(igc.as_bytes(), &AnalysisParams::default()).unwrap();
        assert_eq!(report.track.fixes.len(), 4);
        assert!(report.summary.is_complete());
        assert_eq!(report.summary.launch_altitude_ft(), Some(328));
        assert_eq!(report.summary.max_altitude_ft, 492);
    }

    #[test]
    fn test_analyze_igc_rejects_bad_params_before_parsing() {
        let params = AnalysisParams {
            climb_intervals_s: Vec::new(),
            ..AnalysisParams::default()
        };
        let err = analyze_igc(b"", &params).unwrap_err();
        assert!(matches!(err, IgcError::InvalidParameter(_)));
    }
}
