// WGS84 degrees/minutes <-> decimal degree conversion for IGC B-record positions.
// IGC encodes latitude as DDMMmmmN/S and longitude as DDDMMmmmE/W where the
// minutes carry three implied decimals.

use crate::IgcError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    fn degree_digits(self) -> usize {
        match self {
            Hemisphere::East | Hemisphere::West => 3,
            Hemisphere::North | Hemisphere::South => 2,
        }
    }

    fn is_negative(self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

/// `"3453787N"` -> 34 deg 53.787 min north. The hemisphere letter alone
/// decides how many digits are degrees.
pub fn to_decimal_degrees(coord: &str) -> Result<f64, IgcError> {
    let invalid = || IgcError::InvalidCoordinate(coord.to_string());

    let hemi_char = coord.chars().last().ok_or_else(invalid)?;
    let hemisphere = Hemisphere::from_char(hemi_char).ok_or_else(invalid)?;
    let digits = &coord[..coord.len() - hemi_char.len_utf8()];

    let split = hemisphere.degree_digits();
    if digits.len() <= split || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let degrees: f64 = digits[..split].parse().map_err(|_| invalid())?;
    let milli_minutes: f64 = digits[split..].parse().map_err(|_| invalid())?;
    let value = degrees + milli_minutes / 1000.0 / 60.0;

    Ok(if hemisphere.is_negative() { -value } else { value })
}

pub fn format_latitude(lat: f64) -> String {
    let hemisphere = if lat >= 0.0 { 'N' } else { 'S' };
    let (degrees, minutes, thousandths) = split_degrees(lat);
    format!("{:02}{:02}{:03}{}", degrees, minutes, thousandths, hemisphere)
}

pub fn format_longitude(lon: f64) -> String {
    let hemisphere = if lon >= 0.0 { 'E' } else { 'W' };
    let (degrees, minutes, thousandths) = split_degrees(lon);
    format!("{:03}{:02}{:03}{}", degrees, minutes, thousandths, hemisphere)
}

fn split_degrees(value: f64) -> (u32, u32, u32) {
    // Work in thousandths of a minute so rounding never yields 60.000 minutes.
    let total = (value.abs() * 60_000.0).round() as u64;
    let degrees = total / 60_000;
    let rem = total % 60_000;
    (degrees as u32, (rem / 1000) as u32, (rem % 1000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_latitude_north() {
        let value = to_decimal_degrees("3453787N").unwrap();
        assert_close(value, 34.0 + 53.787 / 60.0);
    }

    #[test]
    fn test_longitude_west_is_negative() {
        let value = to_decimal_degrees("08526761W").unwrap();
        assert_close(value, -(85.0 + 26.761 / 60.0));
    }

    #[test]
    fn test_south_and_east() {
        assert_close(to_decimal_degrees("3330000S").unwrap(), -33.5);
        assert_close(to_decimal_degrees("15130000E").unwrap(), 151.5);
    }

    #[test]
    fn test_unknown_hemisphere_is_rejected() {
        let err = to_decimal_degrees("3453787X").unwrap_err();
        assert!(matches!(err, IgcError::InvalidCoordinate(ref s) if s == "3453787X"));
    }

    #[test]
    fn test_empty_and_non_digit_are_rejected() {
        assert!(to_decimal_degrees("").is_err());
        assert!(to_decimal_degrees("N").is_err());
        assert!(to_decimal_degrees("34a3787N").is_err());
    }

    #[test]
    fn test_format_matches_igc_layout() {
        assert_eq!(format_latitude(54.11868), "5407121N");
        assert_eq!(format_latitude(-33.5), "3330000S");
        assert_eq!(format_longitude(-2.82237), "00249342W");
        assert_eq!(format_longitude(151.5), "15130000E");
    }

    #[test]
    fn test_decode_then_encode_recovers_source() {
        for src in ["3453787N", "0000001S", "8959999N", "4712345S"] {
            let decoded = to_decimal_degrees(src).unwrap();
            assert_eq!(format_latitude(decoded), src);
        }
        for src in ["08526761W", "00000001E", "17959999E", "01234567W"] {
            let decoded = to_decimal_degrees(src).unwrap();
            assert_eq!(format_longitude(decoded), src);
        }
    }
}
