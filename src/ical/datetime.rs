//! Date-time decode/encode for the three RFC 5545 forms this crate accepts.

use jiff::Timestamp;
use jiff::civil::DateTime;

/// Decodes a `DTSTART`/`DTEND` value into a UTC instant and whether it is an
/// all-day (date-only) value.
///
/// Accepts, in order:
/// 1. `YYYYMMDDTHHMMSSZ` — a UTC instant.
/// 2. `YYYYMMDD` (or any value when `value_param` is `DATE`) — midnight UTC,
///    `is_all_day = true`.
/// 3. `YYYYMMDDTHHMMSS` with an optional `TZID` — the civil time is coerced to
///    UTC without applying zone rules (a known lossy path).
#[must_use]
pub fn decode_date_time(
    value: &str,
    value_param: Option<&str>,
    _tzid: Option<&str>,
) -> Option<(Timestamp, bool)> {
    let is_date_value = value_param.is_some_and(|v| v.eq_ignore_ascii_case("DATE"));

    if let Some(stripped) = value.strip_suffix('Z') {
        let dt = parse_basic_datetime(stripped)?;
        return Some((dt.to_zoned(jiff::tz::TimeZone::UTC).ok()?.timestamp(), false));
    }

    if is_date_value || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())) {
        let date = parse_basic_date(value)?;
        let dt = date.at(0, 0, 0, 0);
        return Some((dt.to_zoned(jiff::tz::TimeZone::UTC).ok()?.timestamp(), true));
    }

    let dt = parse_basic_datetime(value)?;
    Some((dt.to_zoned(jiff::tz::TimeZone::UTC).ok()?.timestamp(), false))
}

/// Encodes a UTC instant back into its wire form: `YYYYMMDD` for all-day
/// values, `YYYYMMDDTHHMMSSZ` otherwise.
#[must_use]
pub fn encode_date_time(ts: Timestamp, all_day: bool) -> String {
    let zoned = ts.to_zoned(jiff::tz::TimeZone::UTC);
    let dt = zoned.datetime();
    if all_day {
        format!("{:04}{:02}{:02}", dt.year(), dt.month(), dt.day())
    } else {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )
    }
}

fn parse_basic_date(value: &str) -> Option<jiff::civil::Date> {
    if value.len() != 8 {
        return None;
    }
    let year: i16 = value.get(0..4)?.parse().ok()?;
    let month: i8 = value.get(4..6)?.parse().ok()?;
    let day: i8 = value.get(6..8)?.parse().ok()?;
    jiff::civil::Date::new(year, month, day).ok()
}

fn parse_basic_datetime(value: &str) -> Option<DateTime> {
    let (date_part, time_part) = value.split_once('T')?;
    let date = parse_basic_date(date_part)?;
    if time_part.len() != 6 {
        return None;
    }
    let hour: i8 = time_part.get(0..2)?.parse().ok()?;
    let minute: i8 = time_part.get(2..4)?.parse().ok()?;
    let second: i8 = time_part.get(4..6)?.parse().ok()?;
    Some(date.at(hour, minute, second, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utc_instant() {
        let (ts, all_day) = decode_date_time("20260115T090000Z", None, None).unwrap();
        assert!(!all_day);
        assert_eq!(encode_date_time(ts, false), "20260115T090000Z");
    }

    #[test]
    fn decodes_date_only_value() {
        let (ts, all_day) = decode_date_time("20260301", Some("DATE"), None).unwrap();
        assert!(all_day);
        assert_eq!(encode_date_time(ts, true), "20260301");
    }

    #[test]
    fn decodes_bare_8_digit_as_date() {
        let (_, all_day) = decode_date_time("20260301", None, None).unwrap();
        assert!(all_day);
    }

    #[test]
    fn decodes_naive_civil_time_without_tzid() {
        let (ts, all_day) = decode_date_time("20260115T090000", None, None).unwrap();
        assert!(!all_day);
        assert_eq!(encode_date_time(ts, false), "20260115T090000Z");
    }

    #[test]
    fn rejects_malformed_value() {
        assert!(decode_date_time("not-a-date", None, None).is_none());
    }
}
