//! Core data model: calendars, events, and their identifiers.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;

use jiff::Timestamp;

/// Absolute or path-only URL of a WebDAV resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Opaque entity tag used for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// A remote calendar collection.
#[derive(Debug, Clone)]
pub struct Calendar {
    /// Stable identifier; falls back to `href` when the server publishes none.
    pub uid: String,
    /// Absolute URL of the collection. Always ends with `/`.
    pub href: Href,
    /// Display name, defaulting to "Untitled".
    pub display_name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// `#RRGGBB` or `#RRGGBBAA` color.
    pub color: Option<String>,
    /// IANA timezone name, when published.
    pub timezone: Option<String>,
    /// Opaque sync cookie that changes whenever a child resource changes.
    pub ctag: Option<String>,
    /// Component names the collection accepts (defaults to `{VEVENT}`).
    pub supported_components: BTreeSet<String>,
    /// Whether the current user lacks write privileges on this collection.
    pub is_read_only: bool,
}

impl Calendar {
    /// Creates a calendar with spec-mandated defaults (`display_name` =
    /// "Untitled", `supported_components` = `{VEVENT}`).
    #[must_use]
    pub fn new(uid: String, href: Href) -> Self {
        Self {
            uid,
            href,
            display_name: "Untitled".to_string(),
            description: None,
            color: None,
            timezone: None,
            ctag: None,
            supported_components: BTreeSet::from(["VEVENT".to_string()]),
            is_read_only: false,
        }
    }
}

/// A VEVENT resource on a calendar collection.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    /// The iCalendar UID; also the basis of the resource path `<uid>.ics`.
    pub uid: String,
    /// `uid` of the parent `Calendar`.
    pub calendar_id: String,
    /// URL of the `.ics` resource, absent before the event is created.
    pub href: Option<Href>,
    /// Entity tag, absent until the server returns one.
    pub etag: Option<ETag>,
    /// Start instant (UTC).
    pub start: Timestamp,
    /// End instant (UTC); must be `>= start` when present.
    pub end: Option<Timestamp>,
    /// Defaults to "Untitled" when absent on parse.
    pub summary: String,
    /// Escape-decoded description text.
    pub description: Option<String>,
    /// Escape-decoded location text.
    pub location: Option<String>,
    /// True when `DTSTART` carried `VALUE=DATE` or an 8-digit date-only value.
    pub is_all_day: bool,
    /// Original server payload, preserved verbatim for round-trip fidelity.
    pub raw_icalendar: Option<String>,
    /// Inherited from the parent calendar at parse time.
    pub is_read_only: bool,
    /// Opaque RRULE pass-through.
    pub rrule: Option<String>,
    /// Opaque RECURRENCE-ID pass-through.
    pub recurrence_id: Option<String>,
    /// Ordered opaque EXDATE date-time strings.
    pub exdate: Vec<String>,
}

impl CalendarEvent {
    /// Creates a minimal event ready for `create`, with no server-assigned
    /// fields set yet.
    #[must_use]
    pub fn new(uid: String, calendar_id: String, start: Timestamp, summary: String) -> Self {
        Self {
            uid,
            calendar_id,
            href: None,
            etag: None,
            start,
            end: None,
            summary,
            description: None,
            location: None,
            is_all_day: false,
            raw_icalendar: None,
            is_read_only: false,
            rrule: None,
            recurrence_id: None,
            exdate: Vec::new(),
        }
    }
}

impl PartialEq for CalendarEvent {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for CalendarEvent {}
