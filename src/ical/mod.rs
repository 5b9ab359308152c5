//! iCalendar (RFC 5545) codec: just enough of VCALENDAR/VEVENT to round-trip
//! the fields this crate's data model cares about.

mod datetime;
mod text;
mod tokens;

use jiff::Timestamp;

use crate::types::CalendarEvent;

pub use datetime::{decode_date_time, encode_date_time};
pub use text::{escape_text, unescape_text, xml_escape};

const PRODID: &str = "-//caldav-client-rs//EN";

/// Parses a VCALENDAR document, returning the first VEVENT found.
///
/// Per the required-field policy, a VEVENT missing `UID` or `DTSTART` is
/// silently skipped rather than surfaced as an error, so a batch containing
/// one malformed resource doesn't fail the whole multiget.
#[must_use]
pub fn parse_event(raw: &str, calendar_id: &str) -> Option<CalendarEvent> {
    let unfolded = tokens::unfold(raw);
    for block in tokens::split_components(&unfolded, "VEVENT") {
        if let Some(event) = parse_vevent(&block, calendar_id, raw) {
            return Some(event);
        }
    }
    None
}

fn parse_vevent(lines: &[String], calendar_id: &str, raw: &str) -> Option<CalendarEvent> {
    let props = tokens::tokenize(lines);

    let uid = props.get_value("UID")?.to_string();
    let (start, is_all_day) = decode_date_time(
        props.get_value("DTSTART")?,
        props.param("DTSTART", "VALUE"),
        props.param("DTSTART", "TZID"),
    )?;

    let end = props.get_value("DTEND").and_then(|v| {
        decode_date_time(v, props.param("DTEND", "VALUE"), props.param("DTEND", "TZID"))
            .map(|(ts, _)| ts)
    });

    let summary = props
        .get_value("SUMMARY")
        .map(|s| unescape_text(s))
        .unwrap_or_else(|| "Untitled".to_string());
    let description = props.get_value("DESCRIPTION").map(unescape_text);
    let location = props.get_value("LOCATION").map(unescape_text);
    let rrule = props.get_value("RRULE").map(ToString::to_string);
    let recurrence_id = props.get_value("RECURRENCE-ID").map(ToString::to_string);
    let exdate = tokens::collect_exdate(lines);

    Some(CalendarEvent {
        uid,
        calendar_id: calendar_id.to_string(),
        href: None,
        etag: None,
        start,
        end,
        summary,
        description,
        location,
        is_all_day,
        raw_icalendar: Some(raw.to_string()),
        is_read_only: false,
        rrule,
        recurrence_id,
        exdate,
    })
}

/// Serializes a `CalendarEvent` into a complete VCALENDAR document containing
/// one VEVENT.
#[must_use]
pub fn serialize_event(event: &CalendarEvent, now: Timestamp) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VCALENDAR\r\n");
    out.push_str("VERSION:2.0\r\n");
    out.push_str(&format!("PRODID:{PRODID}\r\n"));
    out.push_str("BEGIN:VEVENT\r\n");
    out.push_str(&format!("UID:{}\r\n", event.uid));
    out.push_str(&format!("DTSTAMP:{}\r\n", encode_date_time(now, false)));
    out.push_str(&format!(
        "DTSTART{}\r\n",
        encode_date_time_line(event.start, event.is_all_day)
    ));
    if let Some(end) = event.end {
        out.push_str(&format!(
            "DTEND{}\r\n",
            encode_date_time_line(end, event.is_all_day)
        ));
    }
    out.push_str(&format!("SUMMARY:{}\r\n", escape_text(&event.summary)));
    if let Some(description) = &event.description {
        out.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(description)));
    }
    if let Some(location) = &event.location {
        out.push_str(&format!("LOCATION:{}\r\n", escape_text(location)));
    }
    if let Some(rrule) = &event.rrule {
        out.push_str(&format!("RRULE:{rrule}\r\n"));
    }
    if let Some(recurrence_id) = &event.recurrence_id {
        out.push_str(&format!("RECURRENCE-ID:{recurrence_id}\r\n"));
    }
    if !event.exdate.is_empty() {
        out.push_str(&format!("EXDATE:{}\r\n", event.exdate.join(",")));
    }
    out.push_str("END:VEVENT\r\n");
    out.push_str("END:VCALENDAR\r\n");
    out
}

fn encode_date_time_line(ts: Timestamp, all_day: bool) -> String {
    if all_day {
        format!(";VALUE=DATE:{}", encode_date_time(ts, true))
    } else {
        format!(":{}", encode_date_time(ts, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ics() -> String {
        concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "PRODID:-//example//EN\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:event-1\r\n",
            "DTSTAMP:20260101T000000Z\r\n",
            "DTSTART:20260115T090000Z\r\n",
            "DTEND:20260115T100000Z\r\n",
            "SUMMARY:Team sync\\, weekly\r\n",
            "DESCRIPTION:Discuss Q1 goals\\nand blockers\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n"
        )
        .to_string()
    }

    #[test]
    fn parses_basic_vevent() {
        let event = parse_event(&sample_ics(), "cal-1").expect("parses");
        assert_eq!(event.uid, "event-1");
        assert_eq!(event.summary, "Team sync, weekly");
        assert_eq!(event.description.as_deref(), Some("Discuss Q1 goals\nand blockers"));
        assert!(!event.is_all_day);
        assert!(event.end.is_some());
    }

    #[test]
    fn missing_uid_is_skipped_not_errored() {
        let ics = sample_ics().replace("UID:event-1\r\n", "");
        assert!(parse_event(&ics, "cal-1").is_none());
    }

    #[test]
    fn all_day_round_trips() {
        let ics = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:all-day-1\r\n",
            "DTSTART;VALUE=DATE:20260301\r\n",
            "SUMMARY:Conference\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n"
        );
        let event = parse_event(ics, "cal-1").expect("parses");
        assert!(event.is_all_day);

        let now = Timestamp::from_second(1_767_225_600).unwrap();
        let serialized = serialize_event(&event, now);
        assert!(serialized.contains("DTSTART;VALUE=DATE:20260301"));
    }

    #[test]
    fn serializes_escapes_text_fields() {
        let mut event = CalendarEvent::new(
            "u1".to_string(),
            "cal-1".to_string(),
            Timestamp::from_second(1_700_000_000).unwrap(),
            "Comma, semicolon; backslash\\".to_string(),
        );
        event.description = Some("line one\nline two".to_string());
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let out = serialize_event(&event, now);
        assert!(out.contains("SUMMARY:Comma\\, semicolon\\; backslash\\\\"));
        assert!(out.contains("DESCRIPTION:line one\\nline two"));
    }
}
