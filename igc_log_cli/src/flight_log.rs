// CSV flight log: one line per flight, columns laid out for import into a
// pilot logbook spreadsheet.

use std::io::Write;

use anyhow::Result;
use igc_log::{AnalysisParams, FlightSummary};
use tracing::warn;

use crate::AnalyzedFile;

const LAUNCH_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Column titles. The climb-rate title lists the configured intervals, so
/// the default set produces `Max Avg 2s-15s-30s`.
pub fn header(intervals_s: &[u32]) -> Vec<String> {
    let climb = intervals_s
        .iter()
        .map(|s| format!("{}s", s))
        .collect::<Vec<_>>()
        .join("-");
    let climb_title = format!("Max Avg {}", climb);
    [
        "Flight No.",
        "Launch Time (UTC)",
        "Flight Duration",
        "Launch Altitude",
        "Max Altitude",
        "Land Altitude",
        climb_title.as_str(),
        "Launch Point",
        "Landing Point",
        "Site Name",
        "Notes",
        "Landing",
        "IGC File Name",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Returns the number of flight rows written.
pub fn write_flight_log<W: Write>(
    files: &[AnalyzedFile],
    params: &AnalysisParams,
    writer: W,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(&params.climb_intervals_s))?;

    let mut written = 0;
    for file in files {
        let name = file.file_name();
        match log_row(&name, &file.report.summary) {
            Some(row) => {
                wtr.write_record(&row)?;
                written += 1;
            }
            None => warn!("{}: no launch time found, left out of the flight log", name),
        }
    }
    wtr.flush()?;
    Ok(written)
}

fn log_row(file_name: &str, summary: &FlightSummary) -> Option<Vec<String>> {
    let launch_time = summary.launch_timestamp()?;
    let climb = summary
        .climb_rates
        .iter()
        .map(|c| c.rate_fpm.to_string())
        .collect::<Vec<_>>()
        .join("-");
    let optional = |value: Option<String>| value.unwrap_or_default();

    Some(vec![
        String::new(),
        launch_time.format(LAUNCH_TIME_FORMAT).to_string(),
        optional(summary.duration.map(|d| d.to_string())),
        optional(summary.launch_altitude_ft().map(|a| a.to_string())),
        summary.max_altitude_ft.to_string(),
        optional(summary.landing_altitude_ft().map(|a| a.to_string())),
        climb,
        optional(summary.launch_point().map(|p| p.to_string())),
        optional(summary.landing_point().map(|p| p.to_string())),
        String::new(),
        String::new(),
        String::new(),
        file_name.to_string(),
    ])
}
