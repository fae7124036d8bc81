// IGC text -> ordered fix sequence.
//
// Only two record kinds matter here: the HFDTE date header and B (fix)
// records. B records are decoded by fixed byte offsets:
//
//   B HHMMSS DDMMmmmN DDDMMmmmE V PPPPP GGGGG SSS
//   0 1      7        15        24 25   30    35  38

use std::borrow::Cow;
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::coords::{to_decimal_degrees, Hemisphere};
use crate::{IgcError, FEET_PER_METER};

pub const DATE_MARKER: &str = "HFDTE";
const DATE_LABEL: &str = "DATE:";
const DATE_LEN: usize = 6;
const B_RECORD_MIN_LEN: usize = 38;

/// Flight date from the HFDTE header as `DDMMYY`. Empty when the file has no
/// date header, in which case no absolute timestamps can be derived.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightDate(String);

impl FlightDate {
    pub fn new(ddmmyy: &str) -> Option<Self> {
        if ddmmyy.len() == DATE_LEN && ddmmyy.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(ddmmyy.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` for an empty or impossible date.
    pub fn timestamp(&self, time: NaiveTime) -> Option<NaiveDateTime> {
        if self.is_empty() {
            return None;
        }
        let combined = format!("{}{}", self.0, time.format("%H%M%S"));
        NaiveDateTime::parse_from_str(&combined, "%d%m%y%H%M%S").ok()
    }
}

impl fmt::Display for FlightDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Undecoded fields of one B record, borrowed from the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFix<'a> {
    pub time: &'a str,
    pub latitude: &'a str,
    pub longitude: &'a str,
    pub validity: &'a str,
    pub pressure_altitude: &'a str,
    pub gnss_altitude: &'a str,
    pub speed: &'a str,
}

impl<'a> RawFix<'a> {
    pub fn from_line(line: &'a str) -> Result<Self, String> {
        if line.len() < B_RECORD_MIN_LEN {
            return Err(format!(
                "B record is {} bytes, expected at least {}",
                line.len(),
                B_RECORD_MIN_LEN
            ));
        }
        let field = |start: usize, end: usize| {
            line.get(start..end)
                .ok_or_else(|| format!("bytes {start}..{end} are not valid text"))
        };
        Ok(Self {
            time: field(1, 7)?,
            latitude: field(7, 15)?,
            longitude: field(15, 24)?,
            validity: field(24, 25)?,
            pressure_altitude: field(25, 30)?,
            gnss_altitude: field(30, 35)?,
            speed: field(35, 38)?,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.validity == "A"
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub time_of_day: NaiveTime,
    pub timestamp: Option<NaiveDateTime>,
    pub raw_latitude: String,
    pub raw_longitude: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: i32,
    pub gnss_altitude_m: i32,
    pub pressure_altitude_m: i32,
    /// Speed proxy as recorded; the unit is left to formatters.
    pub speed: u32,
}

impl Fix {
    pub fn from_raw(raw: &RawFix<'_>, date: &FlightDate, line: usize) -> Result<Self, IgcError> {
        let malformed = |reason: String| IgcError::MalformedRecord { line, reason };

        let time_of_day = parse_time_of_day(raw.time)
            .ok_or_else(|| malformed(format!("invalid time {:?}", raw.time)))?;
        let pressure_altitude_m: i32 = raw
            .pressure_altitude
            .parse()
            .map_err(|_| malformed(format!("invalid pressure altitude {:?}", raw.pressure_altitude)))?;
        let gnss_altitude_m: i32 = raw
            .gnss_altitude
            .parse()
            .map_err(|_| malformed(format!("invalid GNSS altitude {:?}", raw.gnss_altitude)))?;
        let speed: u32 = raw
            .speed
            .parse()
            .map_err(|_| malformed(format!("invalid speed {:?}", raw.speed)))?;
        // A bad hemisphere letter is a coordinate error; bad digits are a malformed record.
        let coordinate = |field: &str| {
            to_decimal_degrees(field).map_err(|err| {
                match field.chars().last().and_then(Hemisphere::from_char) {
                    Some(_) => malformed(format!("invalid coordinate digits {:?}", field)),
                    None => err,
                }
            })
        };

        Ok(Self {
            time_of_day,
            timestamp: date.timestamp(time_of_day),
            raw_latitude: raw.latitude.to_string(),
            raw_longitude: raw.longitude.to_string(),
            latitude: coordinate(raw.latitude)?,
            longitude: coordinate(raw.longitude)?,
            altitude_ft: meters_to_feet(gnss_altitude_m),
            gnss_altitude_m,
            pressure_altitude_m,
            speed,
        })
    }

    pub fn seconds_of_day(&self) -> i64 {
        i64::from(self.time_of_day.num_seconds_from_midnight())
    }

    pub fn is_moving(&self) -> bool {
        self.speed > 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IgcTrack {
    pub date: FlightDate,
    pub fixes: Vec<Fix>,
}

/// Parse raw IGC bytes. Header records are not guaranteed to be UTF-8, so the
/// input is decoded lossily; B and HFDTE records are plain ASCII.
pub fn parse_igc_bytes(input: &[u8]) -> Result<IgcTrack, IgcError> {
    let text: Cow<'_, str> = String::from_utf8_lossy(input);
    parse_igc(&text)
}

/// Parse IGC text. Any malformed B record or date header fails the whole
/// file; fixes whose validity flag is not `A` are dropped.
pub fn parse_igc(input: &str) -> Result<IgcTrack, IgcError> {
    let mut date = FlightDate::default();
    let mut raw_fixes = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(pos) = line.find(DATE_MARKER) {
            date = parse_date_header(&line[pos + DATE_MARKER.len()..], line_no)?;
        } else if line.starts_with('B') {
            let raw = RawFix::from_line(line).map_err(|reason| IgcError::MalformedRecord {
                line: line_no,
                reason,
            })?;
            if raw.is_valid() {
                raw_fixes.push((line_no, raw));
            }
        }
    }

    // The date applies to every fix regardless of where the header sits.
    let fixes = raw_fixes
        .iter()
        .map(|(line_no, raw)| Fix::from_raw(raw, &date, *line_no))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IgcTrack { date, fixes })
}

fn parse_date_header(rest: &str, line: usize) -> Result<FlightDate, IgcError> {
    let rest = rest.strip_prefix(DATE_LABEL).unwrap_or(rest);
    rest.get(..DATE_LEN)
        .and_then(FlightDate::new)
        .ok_or_else(|| IgcError::MalformedRecord {
            line,
            reason: format!("invalid HFDTE date {:?}", rest),
        })
}

fn parse_time_of_day(hhmmss: &str) -> Option<NaiveTime> {
    if hhmmss.len() != 6 || !hhmmss.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::parse_from_str(hhmmss, "%H%M%S").ok()
}

pub(crate) fn meters_to_feet(meters: i32) -> i32 {
    (f64::from(meters) * FEET_PER_METER).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "AXCTabc123\r\n\
                          HFDTE010220\r\n\
                          HFPLTPILOT:Someone\r\n\
                          B1230453453787N08526761WA0031200345012\r\n\
                          B1230473453790N08526770WV0031500348012\r\n\
                          B1230493453795N08526780WA0031800351000\r\n\
                          G0123456789ABCDEF\r\n";

    #[test]
    fn test_parse_sample() {
        let track = parse_igc(SAMPLE).unwrap();
        assert_eq!(track.date.as_str(), "010220");
        assert_eq!(track.fixes.len(), 2);

        let first = &track.fixes[0];
        assert_eq!(first.time_of_day, NaiveTime::from_hms_opt(12, 30, 45).unwrap());
        assert_eq!(
            first.timestamp,
            NaiveDate::from_ymd_opt(2020, 2, 1)
                .unwrap()
                .and_hms_opt(12, 30, 45)
        );
        assert_eq!(first.raw_latitude, "3453787N");
        assert_eq!(first.raw_longitude, "08526761W");
        assert!((first.latitude - 34.89645).abs() < 1e-6);
        assert!((first.longitude + 85.446016).abs() < 1e-6);
        assert_eq!(first.pressure_altitude_m, 312);
        assert_eq!(first.gnss_altitude_m, 345);
        assert_eq!(first.altitude_ft, 1132);
        assert_eq!(first.speed, 12);

        assert_eq!(track.fixes[1].speed, 0);
        assert_eq!(track.fixes[1].seconds_of_day(), 12 * 3600 + 30 * 60 + 49);
    }

    #[test]
    fn test_invalid_fix_is_dropped() {
        let track = parse_igc(SAMPLE).unwrap();
        assert!(track.fixes.iter().all(|f| f.time_of_day.second() != 47));
    }

    #[test]
    fn test_short_b_record_fails_file() {
        let input = "HFDTE010220\nB1230453453787N08526761WA00312003450\n";
        let err = parse_igc(input).unwrap_err();
        match err {
            IgcError::MalformedRecord { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_short_invalid_b_record_still_fails() {
        let input = "B1230453453787N08526761V\n";
        assert!(matches!(
            parse_igc(input),
            Err(IgcError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_non_numeric_altitude_fails_file() {
        let input = "B1230453453787N08526761WA003x200345012\n";
        assert!(matches!(
            parse_igc(input),
            Err(IgcError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_bad_time_fails_file() {
        let input = "B2561003453787N08526761WA0031200345012\n";
        assert!(matches!(
            parse_igc(input),
            Err(IgcError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_bad_hemisphere_is_invalid_coordinate() {
        let input = "B1230453453787X08526761WA0031200345012\n";
        assert!(matches!(
            parse_igc(input),
            Err(IgcError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_non_numeric_coordinate_digits_fail_file() {
        let input = "HFDTE010220\nB1230453453x87N08526761WA0031200345012\n";
        assert!(matches!(
            parse_igc(input),
            Err(IgcError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_negative_altitudes() {
        let input = "B1230453453787N08526761WA-0012-0005012\n";
        let track = parse_igc(input).unwrap();
        assert_eq!(track.fixes[0].pressure_altitude_m, -12);
        assert_eq!(track.fixes[0].gnss_altitude_m, -5);
        assert_eq!(track.fixes[0].altitude_ft, -16);
    }

    #[test]
    fn test_missing_date_leaves_timestamps_unset() {
        let input = "B1230453453787N08526761WA0031200345012\n";
        let track = parse_igc(input).unwrap();
        assert!(track.date.is_empty());
        assert!(track.fixes[0].timestamp.is_none());
    }

    #[test]
    fn test_date_header_after_fixes_still_applies() {
        let input = "B1230453453787N08526761WA0031200345012\nHFDTE311299\n";
        let track = parse_igc(input).unwrap();
        assert_eq!(
            track.fixes[0].timestamp,
            NaiveDate::from_ymd_opt(1999, 12, 31)
                .unwrap()
                .and_hms_opt(12, 30, 45)
        );
    }

    #[test]
    fn test_labelled_date_header() {
        let track = parse_igc("HFDTEDATE:150723,01\n").unwrap();
        assert_eq!(track.date.as_str(), "150723");
    }

    #[test]
    fn test_truncated_date_header_fails() {
        assert!(matches!(
            parse_igc("HFDTE0102\n"),
            Err(IgcError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_impossible_date_gives_no_timestamp() {
        let date = FlightDate::new("310223").unwrap();
        assert!(date.timestamp(NaiveTime::from_hms_opt(10, 0, 0).unwrap()).is_none());
    }

    #[test]
    fn test_non_utf8_header_bytes_are_tolerated() {
        let mut bytes = b"HFPLTPILOT:J\xf6rg\r\nHFDTE010220\r\n".to_vec();
        bytes.extend_from_slice(b"B1230453453787N08526761WA0031200345012\r\n");
        let track = parse_igc_bytes(&bytes).unwrap();
        assert_eq!(track.fixes.len(), 1);
    }
}
