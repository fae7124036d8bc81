//! KML track export for Google Earth: one `<Document>` per flight with a
//! placemark per fix between launch and landing and the full flight path.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use igc_log::{Fix, FlightReport};

use crate::AnalyzedFile;

/// Speed conversion applied by default (recorded kph to displayed mph).
pub const KPH_TO_MPH: f64 = 0.621371;

const FOLDER_TIME_FORMAT: &str = "%m/%d/%Y %H:%M UTC";
const GREEN_DOT_ICON: &str = "http://maps.google.com/mapfiles/kml/paddle/grn-circle-lv.png";

#[derive(Debug, Clone)]
pub struct KmlOptions {
    pub speed_factor: f64,
    pub speed_unit: String,
}

impl Default for KmlOptions {
    fn default() -> Self {
        Self {
            speed_factor: KPH_TO_MPH,
            speed_unit: "mph".to_string(),
        }
    }
}

/// `<first input>.kml` next to the input, as an absolute path.
pub fn default_output_path(first_input: &Path) -> Result<PathBuf> {
    let absolute = if first_input.is_absolute() {
        first_input.to_path_buf()
    } else {
        env::current_dir()
            .context("failed to resolve current directory")?
            .join(first_input)
    };
    let mut name = absolute.into_os_string();
    name.push(".kml");
    Ok(PathBuf::from(name))
}

pub fn kml_document(files: &[AnalyzedFile], opts: &KmlOptions) -> String {
    let mut kml = String::new();
    kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    kml.push_str("<Folder>\n");
    for file in files {
        push_flight(&mut kml, &file.file_name(), &file.report, opts);
    }
    kml.push_str("</Folder>\n");
    kml.push_str("</kml>\n");
    kml
}

fn push_flight(kml: &mut String, name: &str, report: &FlightReport, opts: &KmlOptions) {
    let summary = &report.summary;
    let fixes = &report.track.fixes;

    kml.push_str("<Document>\n");
    kml.push_str(&format!("  <name>{}</name>\n", escape_xml(name)));
    kml.push_str("  <Style id=\"greenDot\">\n");
    kml.push_str("    <IconStyle>\n");
    kml.push_str(&format!("      <Icon><href>{}</href></Icon>\n", GREEN_DOT_ICON));
    kml.push_str("    </IconStyle>\n");
    kml.push_str("  </Style>\n");

    if let Some(launch) = &summary.launch {
        let last = summary
            .landing
            .as_ref()
            .map(|l| l.fix_index)
            .unwrap_or(fixes.len() - 1);
        kml.push_str("  <Folder>\n");
        kml.push_str(&format!("    <name>{}</name>\n", folder_title("Fixes", launch.timestamp)));
        for fix in &fixes[launch.fix_index..=last] {
            push_fix_placemark(kml, fix, opts);
        }
        kml.push_str("  </Folder>\n");
    }

    let launch_time = summary.launch_timestamp();
    kml.push_str("  <Folder>\n");
    kml.push_str(&format!("    <name>{}</name>\n", folder_title("Flightpath", launch_time)));
    kml.push_str("    <Placemark>\n");
    kml.push_str("      <name>Flightpath</name>\n");
    kml.push_str("      <LineString>\n");
    kml.push_str("        <altitudeMode>absolute</altitudeMode>\n");
    kml.push_str("        <coordinates>");
    let path: Vec<String> = fixes.iter().map(coordinates).collect();
    kml.push_str(&path.join(" "));
    kml.push_str("</coordinates>\n");
    kml.push_str("      </LineString>\n");
    kml.push_str("    </Placemark>\n");
    kml.push_str("  </Folder>\n");
    kml.push_str("</Document>\n");
}

fn push_fix_placemark(kml: &mut String, fix: &Fix, opts: &KmlOptions) {
    let speed = (f64::from(fix.speed) * opts.speed_factor).round() as i64;
    kml.push_str("    <Placemark>\n");
    kml.push_str(&format!("      <name>{}</name>\n", fix.time_of_day.format("%H:%M:%S")));
    kml.push_str("      <styleUrl>#greenDot</styleUrl>\n");
    kml.push_str("      <ExtendedData>\n");
    kml.push_str(&format!(
        "        <Data name=\"tas\"><displayName>True Air Speed</displayName><value>{} {}</value></Data>\n",
        speed,
        escape_xml(&opts.speed_unit)
    ));
    kml.push_str(&format!(
        "        <Data name=\"alt\"><displayName>Altitude</displayName><value>{} ft</value></Data>\n",
        fix.altitude_ft
    ));
    kml.push_str("      </ExtendedData>\n");
    kml.push_str(&format!(
        "      <Point><altitudeMode>absolute</altitudeMode><coordinates>{}</coordinates></Point>\n",
        coordinates(fix)
    ));
    kml.push_str("    </Placemark>\n");
}

fn folder_title(label: &str, launch_time: Option<NaiveDateTime>) -> String {
    match launch_time {
        Some(ts) => format!("{} - {}", label, ts.format(FOLDER_TIME_FORMAT)),
        None => label.to_string(),
    }
}

/// `lon,lat,gnss_m`
fn coordinates(fix: &Fix) -> String {
    format!("{},{},{}", fix.longitude, fix.latitude, fix.gnss_altitude_m)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
