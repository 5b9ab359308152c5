//! Request body builders: PROPFIND, PROPPATCH, MKCALENDAR, calendar-query,
//! calendar-multiget.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::CalDavError;
use crate::xml::ns;

/// A property to request in a PROPFIND body, with its namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prop {
    name: &'static str,
    namespace: Namespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Dav,
    CalDav,
}

impl Namespace {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Dav => "D",
            Self::CalDav => "C",
        }
    }

    const fn uri(self) -> &'static str {
        match self {
            Self::Dav => ns::DAV,
            Self::CalDav => ns::CALDAV,
        }
    }
}

impl Prop {
    /// `DAV:displayname`.
    pub const DISPLAY_NAME: Self = Self::dav("displayname");
    /// `DAV:resourcetype`.
    pub const RESOURCE_TYPE: Self = Self::dav("resourcetype");
    /// `DAV:getetag`.
    pub const GET_ETAG: Self = Self::dav("getetag");
    /// `DAV:current-user-principal`.
    pub const CURRENT_USER_PRINCIPAL: Self = Self::dav("current-user-principal");
    /// `DAV:current-user-privilege-set`.
    pub const CURRENT_USER_PRIVILEGE_SET: Self = Self::dav("current-user-privilege-set");
    /// `urn:ietf:params:xml:ns:caldav:calendar-data`.
    pub const CALENDAR_DATA: Self = Self::caldav("calendar-data");
    /// `urn:ietf:params:xml:ns:caldav:calendar-home-set`.
    pub const CALENDAR_HOME_SET: Self = Self::caldav("calendar-home-set");
    /// `urn:ietf:params:xml:ns:caldav:supported-calendar-component-set`.
    pub const SUPPORTED_CALENDAR_COMPONENTS: Self =
        Self::caldav("supported-calendar-component-set");
    /// `urn:ietf:params:xml:ns:caldav:calendar-description`.
    pub const CALENDAR_DESCRIPTION: Self = Self::caldav("calendar-description");
    /// `urn:ietf:params:xml:ns:caldav:calendar-timezone`.
    pub const CALENDAR_TIMEZONE: Self = Self::caldav("calendar-timezone");
    /// `urn:ietf:params:xml:ns:caldav:calendar-color` (Apple/CalendarServer
    /// extension, requested under the CalDAV prefix for simplicity).
    pub const CALENDAR_COLOR: Self = Self::caldav("calendar-color");
    /// `urn:ietf:params:xml:ns:caldav:getctag`.
    pub const GET_CTAG: Self = Self::caldav("getctag");

    const fn dav(name: &'static str) -> Self {
        Self {
            name,
            namespace: Namespace::Dav,
        }
    }

    const fn caldav(name: &'static str) -> Self {
        Self {
            name,
            namespace: Namespace::CalDav,
        }
    }
}

/// Fluent PROPFIND body builder.
#[derive(Debug, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

impl PropFindRequest {
    /// Creates an empty PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Preset: request just `current-user-principal`.
    #[must_use]
    pub fn current_user_principal() -> Self {
        let mut req = Self::new();
        req.add_property(Prop::CURRENT_USER_PRINCIPAL);
        req
    }

    /// Preset: request `calendar-home-set` plus `displayname`.
    #[must_use]
    pub fn calendar_home_set() -> Self {
        let mut req = Self::new();
        req.add_property(Prop::CALENDAR_HOME_SET);
        req.add_property(Prop::DISPLAY_NAME);
        req
    }

    /// Preset: the full calendar property set used when listing/getting
    /// calendar collections.
    #[must_use]
    pub fn calendar_properties() -> Self {
        let mut req = Self::new();
        req.add_property(Prop::RESOURCE_TYPE)
            .add_property(Prop::DISPLAY_NAME)
            .add_property(Prop::CALENDAR_DESCRIPTION)
            .add_property(Prop::CALENDAR_TIMEZONE)
            .add_property(Prop::SUPPORTED_CALENDAR_COMPONENTS)
            .add_property(Prop::CALENDAR_COLOR)
            .add_property(Prop::GET_CTAG)
            .add_property(Prop::CURRENT_USER_PRIVILEGE_SET);
        req
    }

    /// Builds the XML body, deduplicating namespace declarations (DAV is
    /// always declared; CalDAV only when a requested property needs it).
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut propfind = BytesStart::new("D:propfind");
        propfind.push_attribute(("xmlns:D", ns::DAV));
        if self.props.iter().any(|p| p.namespace == Namespace::CalDav) {
            propfind.push_attribute(("xmlns:C", ns::CALDAV));
        }
        writer.write_event(Event::Start(propfind))?;
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;

        for prop in &self.props {
            let tag = format!("{}:{}", prop.namespace.prefix(), prop.name);
            writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        }

        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        into_string(writer)
    }
}

/// PROPPATCH body builder: a single `<D:set><D:prop>` block with only the
/// supplied fields.
#[derive(Debug, Default)]
pub struct PropPatchRequest {
    display_name: Option<String>,
    description: Option<String>,
    color: Option<String>,
    timezone: Option<String>,
}

impl PropPatchRequest {
    /// Creates an empty PROPPATCH request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `DAV:displayname`.
    #[must_use]
    pub fn display_name(mut self, value: String) -> Self {
        self.display_name = Some(value);
        self
    }

    /// Sets `CALDAV:calendar-description`.
    #[must_use]
    pub fn description(mut self, value: String) -> Self {
        self.description = Some(value);
        self
    }

    /// Sets `CALDAV:calendar-color`.
    #[must_use]
    pub fn color(mut self, value: String) -> Self {
        self.color = Some(value);
        self
    }

    /// Sets `CALDAV:calendar-timezone`.
    #[must_use]
    pub fn timezone(mut self, value: String) -> Self {
        self.timezone = Some(value);
        self
    }

    /// Whether any field was set; an empty PROPPATCH is never sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.timezone.is_none()
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut root = BytesStart::new("D:propertyupdate");
        root.push_attribute(("xmlns:D", ns::DAV));
        root.push_attribute(("xmlns:C", ns::CALDAV));
        writer.write_event(Event::Start(root))?;
        writer.write_event(Event::Start(BytesStart::new("D:set")))?;
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;

        write_text_element(&mut writer, "D:displayname", self.display_name.as_deref())?;
        write_text_element(
            &mut writer,
            "C:calendar-description",
            self.description.as_deref(),
        )?;
        write_text_element(&mut writer, "C:calendar-color", self.color.as_deref())?;
        write_text_element(&mut writer, "C:calendar-timezone", self.timezone.as_deref())?;

        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
        writer.write_event(Event::End(BytesEnd::new("D:set")))?;
        writer.write_event(Event::End(BytesEnd::new("D:propertyupdate")))?;

        into_string(writer)
    }
}

/// MKCALENDAR body builder.
#[derive(Debug, Default)]
pub struct MkCalendarRequest {
    display_name: String,
    description: Option<String>,
    color: Option<String>,
    timezone: Option<String>,
    supported_components: Vec<String>,
}

impl MkCalendarRequest {
    /// Creates a request for a calendar named `display_name`.
    #[must_use]
    pub fn new(display_name: String) -> Self {
        Self {
            display_name,
            ..Default::default()
        }
    }

    /// Sets `CALDAV:calendar-description`.
    #[must_use]
    pub fn description(mut self, value: Option<String>) -> Self {
        self.description = value;
        self
    }

    /// Sets `CALDAV:calendar-color`.
    #[must_use]
    pub fn color(mut self, value: Option<String>) -> Self {
        self.color = value;
        self
    }

    /// Sets `CALDAV:calendar-timezone`.
    #[must_use]
    pub fn timezone(mut self, value: Option<String>) -> Self {
        self.timezone = value;
        self
    }

    /// Sets `CALDAV:supported-calendar-component-set`.
    #[must_use]
    pub fn supported_components(mut self, components: Vec<String>) -> Self {
        self.supported_components = components;
        self
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut root = BytesStart::new("C:mkcalendar");
        root.push_attribute(("xmlns:D", ns::DAV));
        root.push_attribute(("xmlns:C", ns::CALDAV));
        writer.write_event(Event::Start(root))?;
        writer.write_event(Event::Start(BytesStart::new("D:set")))?;
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;

        write_text_element(&mut writer, "D:displayname", Some(&self.display_name))?;
        write_text_element(
            &mut writer,
            "C:calendar-description",
            self.description.as_deref(),
        )?;
        write_text_element(&mut writer, "C:calendar-color", self.color.as_deref())?;
        write_text_element(&mut writer, "C:calendar-timezone", self.timezone.as_deref())?;

        if !self.supported_components.is_empty() {
            writer.write_event(Event::Start(BytesStart::new(
                "C:supported-calendar-component-set",
            )))?;
            for component in &self.supported_components {
                let mut comp = BytesStart::new("C:comp");
                comp.push_attribute(("name", component.as_str()));
                writer.write_event(Event::Empty(comp))?;
            }
            writer.write_event(Event::End(BytesEnd::new(
                "C:supported-calendar-component-set",
            )))?;
        }

        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
        writer.write_event(Event::End(BytesEnd::new("D:set")))?;
        writer.write_event(Event::End(BytesEnd::new("C:mkcalendar")))?;

        into_string(writer)
    }
}

/// A UTC time-range filter (`YYYYMMDDTHHMMSSZ` basic format).
#[derive(Debug, Clone)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: String,
    /// Exclusive end.
    pub end: Option<String>,
}

/// A `prop-filter` text-match filter, e.g. for UID lookups.
#[derive(Debug, Clone)]
pub struct TextMatch {
    /// Property local name to match against (e.g. `UID`).
    pub property: String,
    /// Text to search for (XML-escaped automatically on build).
    pub text: String,
    /// Collation, defaults to `i;octet` when `None`.
    pub collation: Option<String>,
}

/// `calendar-query` REPORT body builder.
#[derive(Debug, Default)]
pub struct CalendarQueryRequest {
    component: Option<String>,
    time_range: Option<TimeRange>,
    text_match: Option<TextMatch>,
}

impl CalendarQueryRequest {
    /// Creates an empty calendar-query request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a component (e.g. `VEVENT`).
    #[must_use]
    pub fn component(mut self, component: String) -> Self {
        self.component = Some(component);
        self
    }

    /// Adds a `time-range` filter.
    #[must_use]
    pub fn time_range(mut self, start: String, end: Option<String>) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }

    /// Adds a `prop-filter`/`text-match` filter.
    #[must_use]
    pub fn text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = Some(text_match);
        self
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut root = BytesStart::new("C:calendar-query");
        root.push_attribute(("xmlns:D", ns::DAV));
        root.push_attribute(("xmlns:C", ns::CALDAV));
        writer.write_event(Event::Start(root))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        writer.write_event(Event::Empty(BytesStart::new("D:getetag")))?;
        writer.write_event(Event::Empty(BytesStart::new("C:calendar-data")))?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::Start(BytesStart::new("C:filter")))?;
        let mut vcalendar_filter = BytesStart::new("C:comp-filter");
        vcalendar_filter.push_attribute(("name", "VCALENDAR"));
        writer.write_event(Event::Start(vcalendar_filter))?;

        if let Some(component) = &self.component {
            let mut comp_filter = BytesStart::new("C:comp-filter");
            comp_filter.push_attribute(("name", component.as_str()));
            writer.write_event(Event::Start(comp_filter))?;

            if let Some(tr) = &self.time_range {
                let mut time_range = BytesStart::new("C:time-range");
                time_range.push_attribute(("start", tr.start.as_str()));
                if let Some(end) = &tr.end {
                    time_range.push_attribute(("end", end.as_str()));
                }
                writer.write_event(Event::Empty(time_range))?;
            }

            if let Some(tm) = &self.text_match {
                let mut prop_filter = BytesStart::new("C:prop-filter");
                prop_filter.push_attribute(("name", tm.property.as_str()));
                writer.write_event(Event::Start(prop_filter))?;

                let mut text_match = BytesStart::new("C:text-match");
                text_match.push_attribute((
                    "collation",
                    tm.collation.as_deref().unwrap_or("i;octet"),
                ));
                writer.write_event(Event::Start(text_match))?;
                writer.write_event(Event::Text(BytesText::new(&tm.text)))?;
                writer.write_event(Event::End(BytesEnd::new("C:text-match")))?;

                writer.write_event(Event::End(BytesEnd::new("C:prop-filter")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("C:comp-filter")))?;
        writer.write_event(Event::End(BytesEnd::new("C:filter")))?;
        writer.write_event(Event::End(BytesEnd::new("C:calendar-query")))?;

        into_string(writer)
    }
}

/// `calendar-multiget` REPORT body builder.
#[derive(Debug, Default)]
pub struct CalendarMultiGetRequest {
    hrefs: Vec<String>,
}

impl CalendarMultiGetRequest {
    /// Creates an empty multiget request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target href.
    pub fn add_href(&mut self, href: String) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML writing fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut root = BytesStart::new("C:calendar-multiget");
        root.push_attribute(("xmlns:D", ns::DAV));
        root.push_attribute(("xmlns:C", ns::CALDAV));
        writer.write_event(Event::Start(root))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        writer.write_event(Event::Empty(BytesStart::new("D:getetag")))?;
        writer.write_event(Event::Empty(BytesStart::new("C:calendar-data")))?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("D:href")))?;
            writer.write_event(Event::Text(BytesText::new(href)))?;
            writer.write_event(Event::End(BytesEnd::new("D:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("C:calendar-multiget")))?;

        into_string(writer)
    }
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&str>,
) -> Result<(), CalDavError> {
    let Some(value) = value else {
        return Ok(());
    };
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, CalDavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| CalDavError::Parse(format!("non-UTF-8 XML body: {e}")))
}
