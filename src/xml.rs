//! WebDAV/CalDAV XML primitives: namespaces and the `multistatus` parse tree.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::name::QName;

use crate::error::CalDavError;

/// XML namespaces used across WebDAV and its CalDAV extension.
pub mod ns {
    /// `WebDAV` namespace (RFC 4918).
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace (RFC 4791).
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// Apple `iCal` extensions namespace.
    pub const APPLE_ICAL: &str = "http://apple.com/ns/ical/";

    /// CalendarServer extensions namespace.
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
}

/// A property value as captured from a `propstat` block: either plain text
/// or, for structured properties (`resourcetype`, `calendar-home-set`,
/// `current-user-privilege-set`, ...), the raw child element subtree.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// The element's unescaped text content.
    Text(String),
    /// The element's children, serialized back to XML, for structured
    /// properties that carry more than text (e.g. nested `<href>`s).
    Element(String),
}

impl PropertyValue {
    /// Returns the text form if this value is `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Element(_) => None,
        }
    }

    /// Returns the raw subtree if this value is `Element`.
    #[must_use]
    pub fn as_element(&self) -> Option<&str> {
        match self {
            Self::Element(s) => Some(s),
            Self::Text(_) => None,
        }
    }
}

/// Key identifying a property by its local name and namespace URI.
pub type PropKey = (String, String);

/// One `propstat` block: a status and the properties it reports on.
#[derive(Debug, Clone, Default)]
pub struct PropStat {
    /// HTTP status code parsed from the `<status>` text (0 if unparseable).
    pub status: u16,
    /// Properties reported under this status, keyed by `(local-name, namespace)`.
    pub props: HashMap<PropKey, PropertyValue>,
}

impl PropStat {
    /// A propstat is successful iff its status is in `[200, 300)`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One `response` item within a `multistatus` document.
#[derive(Debug, Clone, Default)]
pub struct DavResponse {
    /// The response's href, as returned verbatim (may be path-only).
    pub href: String,
    /// All `propstat` blocks under this response.
    pub prop_stats: Vec<PropStat>,
}

impl DavResponse {
    /// Returns the first text property value from any successful propstat.
    #[must_use]
    pub fn get_property(&self, local_name: &str, namespace: &str) -> Option<&str> {
        let key = (local_name.to_string(), namespace.to_string());
        self.prop_stats
            .iter()
            .filter(|ps| ps.is_success())
            .find_map(|ps| ps.props.get(&key))
            .and_then(PropertyValue::as_text)
    }

    /// Returns the first structured (subtree) property value from any
    /// successful propstat.
    #[must_use]
    pub fn get_property_element(&self, local_name: &str, namespace: &str) -> Option<&str> {
        let key = (local_name.to_string(), namespace.to_string());
        self.prop_stats
            .iter()
            .filter(|ps| ps.is_success())
            .find_map(|ps| ps.props.get(&key))
            .and_then(PropertyValue::as_element)
    }

    /// Scans `<resourcetype>` for a child matching `(name, namespace)`.
    #[must_use]
    pub fn has_resource_type(&self, name: &str, namespace: &str) -> bool {
        self.get_property_element("resourcetype", ns::DAV)
            .is_some_and(|xml| element_contains_child(xml, name, namespace))
    }

    /// Whether this response describes a CalDAV calendar collection.
    #[must_use]
    pub fn is_calendar(&self) -> bool {
        self.has_resource_type("calendar", ns::CALDAV)
    }

    /// Whether this response describes a WebDAV collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.has_resource_type("collection", ns::DAV)
    }
}

/// A parsed `multistatus` document.
#[derive(Debug, Clone, Default)]
pub struct MultiStatus {
    /// Ordered `response` items.
    pub responses: Vec<DavResponse>,
}

impl MultiStatus {
    /// Parses a `multistatus` XML document.
    ///
    /// Malformed XML never panics; it is reported as [`CalDavError::Parse`]
    /// carrying the offending fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not well-formed XML.
    pub fn parse(xml: &str) -> Result<Self, CalDavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut responses = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| parse_error(xml, &e))?;
            match event {
                Event::Start(ref e) if local_name(e.name()) == b"response" => {
                    let response = parse_response(&mut reader, xml)?;
                    responses.push(response);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { responses })
    }
}

fn parse_error(xml: &str, e: &quick_xml::Error) -> CalDavError {
    let fragment: String = xml.chars().take(200).collect();
    CalDavError::Parse(format!("malformed multistatus XML ({e}): {fragment}"))
}

fn local_name(name: QName<'_>) -> &[u8] {
    name.local_name().into_inner()
}

fn parse_response<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    xml: &str,
) -> Result<DavResponse, CalDavError> {
    let mut response = DavResponse::default();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(xml, &e))?;
        match event {
            Event::Start(ref e) if local_name(e.name()) == b"href" && response.href.is_empty() => {
                response.href = read_text(reader, &mut buf, xml)?;
            }
            Event::Start(ref e) if local_name(e.name()) == b"propstat" => {
                response.prop_stats.push(parse_propstat(reader, xml)?);
            }
            Event::End(ref e) if local_name(e.name()) == b"response" => break,
            Event::Eof => return Err(CalDavError::Parse("unexpected EOF in <response>".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(response)
}

fn parse_propstat<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    xml: &str,
) -> Result<PropStat, CalDavError> {
    let mut propstat = PropStat::default();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(xml, &e))?;
        match event {
            Event::Start(ref e) if local_name(e.name()) == b"prop" => {
                propstat.props = parse_prop(reader, xml)?;
            }
            Event::Start(ref e) if local_name(e.name()) == b"status" => {
                let text = read_text(reader, &mut buf, xml)?;
                propstat.status = parse_status_code(&text);
            }
            Event::End(ref e) if local_name(e.name()) == b"propstat" => break,
            Event::Eof => return Err(CalDavError::Parse("unexpected EOF in <propstat>".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(propstat)
}

fn parse_prop<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    xml: &str,
) -> Result<HashMap<PropKey, PropertyValue>, CalDavError> {
    let mut props = HashMap::new();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(xml, &e))?;
        match event {
            Event::Start(ref e) => {
                let name = local_name(e.name()).to_vec();
                let namespace = resolve_namespace(e.name());
                let (text, element_xml) = read_property_body(reader, xml)?;
                let key = (String::from_utf8_lossy(&name).to_string(), namespace);
                let value = if element_xml.is_some() {
                    PropertyValue::Element(element_xml.unwrap_or_default())
                } else {
                    PropertyValue::Text(text.unwrap_or_default())
                };
                props.insert(key, value);
            }
            Event::Empty(ref e) => {
                let name = local_name(e.name()).to_vec();
                let namespace = resolve_namespace(e.name());
                let key = (String::from_utf8_lossy(&name).to_string(), namespace);
                props.insert(key, PropertyValue::Text(String::new()));
            }
            Event::End(ref e) if local_name(e.name()) == b"prop" => break,
            Event::Eof => return Err(CalDavError::Parse("unexpected EOF in <prop>".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(props)
}

/// Reads the body of a just-opened property element. Returns `(text, None)`
/// for leaf text content, or `(None, Some(xml))` when the element contains
/// nested elements (a structured property).
fn read_property_body<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    xml: &str,
) -> Result<(Option<String>, Option<String>), CalDavError> {
    let mut depth = 0u32;
    let mut text = String::new();
    let mut element_xml = String::new();
    let mut saw_child = false;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(xml, &e))?;
        match event {
            Event::Start(ref e) => {
                saw_child = true;
                depth += 1;
                element_xml.push('<');
                element_xml.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                element_xml.push('>');
            }
            Event::Empty(ref e) => {
                saw_child = true;
                element_xml.push('<');
                element_xml.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                element_xml.push_str("/>");
            }
            Event::End(ref e) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                element_xml.push_str("</");
                element_xml.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                element_xml.push('>');
            }
            Event::Text(ref t) => {
                let unescaped = t.unescape().map_err(|e| parse_error(xml, &e))?;
                text.push_str(&unescaped);
                element_xml.push_str(&unescaped);
            }
            Event::Eof => {
                return Err(CalDavError::Parse(
                    "unexpected EOF inside property element".into(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if saw_child {
        Ok((None, Some(element_xml)))
    } else {
        Ok((Some(text), None))
    }
}

fn read_text<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    xml: &str,
) -> Result<String, CalDavError> {
    match reader
        .read_event_into(buf)
        .map_err(|e| parse_error(xml, &e))?
    {
        Event::Text(t) => Ok(t.unescape().map_err(|e| parse_error(xml, &e))?.to_string()),
        Event::End(_) => Ok(String::new()),
        other => {
            // Put back nothing (quick_xml has no pushback); an element with
            // no text before its end tag is simply empty.
            if matches!(other, Event::Eof) {
                return Err(CalDavError::Parse("unexpected EOF reading text".into()));
            }
            Ok(String::new())
        }
    }
}

/// Extracts the status code from strings shaped like `HTTP/1.1 200 OK`.
/// Missing or malformed input yields `0`, which is always treated as a
/// failure by [`PropStat::is_success`].
#[must_use]
pub fn parse_status_code(status_line: &str) -> u16 {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

/// Namespace resolution for a qualified name, based on its prefix.
///
/// Servers vary widely in which prefixes they bind to the CalDAV/DAV
/// namespaces, but overwhelmingly follow the `D:`/`C:`/`CS:`/`A:` (or
/// unprefixed-DAV) convention this crate's own request bodies use, so
/// prefix matching is used instead of threading full namespace-binding
/// state through the event loop.
fn resolve_namespace(name: QName<'_>) -> String {
    match name.prefix().map(|p| p.into_inner()) {
        Some(b"C") | Some(b"CAL") | Some(b"caldav") => ns::CALDAV.to_string(),
        Some(b"CS") | Some(b"cs") => ns::CALENDARSERVER.to_string(),
        Some(b"A") | Some(b"apple") => ns::APPLE_ICAL.to_string(),
        _ => ns::DAV.to_string(),
    }
}

/// Scans a flat `<tag>...<child/></tag>` style fragment (as produced by
/// [`read_property_body`]) for a child element with the given local name.
/// Namespace matching is prefix-based, consistent with [`resolve_namespace`].
fn element_contains_child(fragment: &str, local_name: &str, namespace: &str) -> bool {
    let expected_prefix = match namespace {
        ns::CALDAV => "C:",
        ns::CALENDARSERVER => "CS:",
        ns::APPLE_ICAL => "A:",
        _ => "D:",
    };
    let needle_prefixed = format!("<{expected_prefix}{local_name}");
    let needle_bare = format!("<{local_name}");
    fragment.contains(&needle_prefixed) || fragment.contains(&needle_bare)
}
