//! Calendar collection CRUD (C6): list, get, create, update, delete.

use crate::config::AuthMethod;
use crate::error::CalDavError;
use crate::http::HttpClient;
use crate::request::{MkCalendarRequest, PropFindRequest, PropPatchRequest};
use crate::types::{Calendar, Href};
use crate::urlutil;
use crate::xml::{DavResponse, MultiStatus, ns};

/// Options for creating or updating a calendar collection.
#[derive(Debug, Clone, Default)]
pub struct CalendarOptions {
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// `CALDAV:calendar-description`.
    pub description: Option<String>,
    /// `CALDAV:calendar-color`.
    pub color: Option<String>,
    /// `CALDAV:calendar-timezone`.
    pub timezone: Option<String>,
    /// `CALDAV:supported-calendar-component-set`.
    pub supported_components: Vec<String>,
}

/// Lists every calendar collection under `home_url`.
///
/// # Errors
///
/// Returns an error if the PROPFIND fails or the response is malformed.
pub async fn list(
    http: &HttpClient,
    auth: &AuthMethod,
    home_url: &str,
) -> Result<Vec<Calendar>, CalDavError> {
    let body = PropFindRequest::calendar_properties().build()?;
    let resp = http.execute(http.propfind(home_url, auth, 1, body)?).await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(CalDavError::Protocol {
            message: "PROPFIND on calendar-home failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    let multistatus = MultiStatus::parse(&text)?;
    let resolved_home = urlutil::resolve(home_url, home_url)?;
    let mut calendars = Vec::new();
    for response in &multistatus.responses {
        let resolved_href = urlutil::resolve(home_url, &response.href)?;
        if resolved_href == resolved_home || !response.is_calendar() {
            continue;
        }
        calendars.push(response_to_calendar(response, home_url)?);
    }

    Ok(calendars)
}

/// Fetches a single calendar collection by its URL.
///
/// # Errors
///
/// Returns [`CalDavError::NotFound`] if the resource is not a calendar
/// collection, or a transport/parse error otherwise.
pub async fn get(http: &HttpClient, auth: &AuthMethod, url: &str) -> Result<Calendar, CalDavError> {
    let body = PropFindRequest::calendar_properties().build()?;
    let resp = http.execute(http.propfind(url, auth, 0, body)?).await?;
    let status = resp.status();
    let text = resp.text().await?;

    if status.as_u16() == 404 {
        return Err(CalDavError::NotFound(Href::from(url)));
    }
    if !status.is_success() {
        return Err(CalDavError::Protocol {
            message: "PROPFIND on calendar failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    let multistatus = MultiStatus::parse(&text)?;
    let response = multistatus
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| CalDavError::NotFound(Href::from(url)))?;

    if !response.is_calendar() {
        return Err(CalDavError::NotFound(Href::from(url)));
    }

    response_to_calendar(&response, url)
}

/// Creates a calendar collection named `name` under `home_url`.
///
/// # Errors
///
/// Returns an error if the name sanitizes to an empty path, if MKCALENDAR is
/// rejected (405 → already exists or not permitted), or if the follow-up
/// `get` fails.
pub async fn create(
    http: &HttpClient,
    auth: &AuthMethod,
    home_url: &str,
    name: &str,
    opts: &CalendarOptions,
) -> Result<Calendar, CalDavError> {
    let slug = sanitize_name(name);
    if slug.is_empty() {
        return Err(CalDavError::Conflict(
            "calendar name sanitizes to an empty path segment".to_string(),
        ));
    }
    let url = format!("{}{}/", ensure_trailing_slash(home_url), slug);

    let mut req = MkCalendarRequest::new(opts.display_name.clone().unwrap_or_else(|| name.to_string()))
        .description(opts.description.clone())
        .color(opts.color.clone())
        .timezone(opts.timezone.clone());
    if !opts.supported_components.is_empty() {
        req = req.supported_components(opts.supported_components.clone());
    }
    let body = req.build()?;

    let resp = http.execute(http.mkcalendar(&url, auth, Some(body))?).await?;
    let status = resp.status();

    if status.as_u16() == 405 {
        return Err(CalDavError::Conflict(
            "Calendar already exists or creation not allowed".to_string(),
        ));
    }
    if !status.is_success() {
        let text = resp.text().await?;
        return Err(CalDavError::Protocol {
            message: "MKCALENDAR failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    get(http, auth, &url).await
}

/// Applies `opts` to an existing calendar via PROPPATCH. Fields left as
/// `None`/empty in `opts` are left untouched on the server.
///
/// # Errors
///
/// Returns an error if the PROPPATCH request fails.
pub async fn update(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    opts: &CalendarOptions,
) -> Result<(), CalDavError> {
    let mut req = PropPatchRequest::new();
    if let Some(v) = &opts.display_name {
        req = req.display_name(v.clone());
    }
    if let Some(v) = &opts.description {
        req = req.description(v.clone());
    }
    if let Some(v) = &opts.color {
        req = req.color(v.clone());
    }
    if let Some(v) = &opts.timezone {
        req = req.timezone(v.clone());
    }
    if req.is_empty() {
        return Ok(());
    }

    let body = req.build()?;
    let resp = http
        .execute(http.proppatch(calendar.href.as_str(), auth, body)?)
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await?;
        return Err(CalDavError::Protocol {
            message: "PROPPATCH failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }
    Ok(())
}

/// Deletes a calendar collection.
///
/// # Errors
///
/// Returns [`CalDavError::NotFound`] on 404, or a transport error otherwise.
pub async fn delete(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
) -> Result<(), CalDavError> {
    let resp = http
        .execute(http.delete(calendar.href.as_str(), auth, None))
        .await?;
    let status = resp.status();
    if status.as_u16() == 404 {
        return Err(CalDavError::NotFound(calendar.href.clone()));
    }
    if !status.is_success() {
        let text = resp.text().await?;
        return Err(CalDavError::Protocol {
            message: "DELETE failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }
    Ok(())
}

/// Lowercases, replaces non-`[a-z0-9-]` with `-`, collapses runs of `-`, and
/// trims leading/trailing `-`.
fn sanitize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
            last_was_dash = c == '-';
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn response_to_calendar(response: &DavResponse, base_url: &str) -> Result<Calendar, CalDavError> {
    let resolved = urlutil::resolve(base_url, &response.href)?;
    let href = Href::from(resolved.as_str());
    let uid = href.as_str().to_string();
    let mut calendar = Calendar::new(uid, href);

    if let Some(name) = response.get_property("displayname", ns::DAV) {
        if !name.is_empty() {
            calendar.display_name = name.to_string();
        }
    }
    calendar.description = response
        .get_property("calendar-description", ns::CALDAV)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    calendar.color = response
        .get_property("calendar-color", ns::CALDAV)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    calendar.timezone = response
        .get_property("calendar-timezone", ns::CALDAV)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    calendar.ctag = response
        .get_property("getctag", ns::CALDAV)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    if let Some(xml) = response.get_property_element(
        "supported-calendar-component-set",
        ns::CALDAV,
    ) {
        let components = parse_supported_components(xml);
        if !components.is_empty() {
            calendar.supported_components = components;
        }
    }

    calendar.is_read_only = response
        .get_property_element("current-user-privilege-set", ns::DAV)
        .is_some_and(|xml| !has_write_privilege(xml));

    Ok(calendar)
}

fn parse_supported_components(fragment: &str) -> std::collections::BTreeSet<String> {
    let mut out = std::collections::BTreeSet::new();
    let mut rest = fragment;
    while let Some(start) = rest.find("name=\"") {
        rest = &rest[start + "name=\"".len()..];
        if let Some(end) = rest.find('"') {
            out.insert(rest[..end].to_string());
            rest = &rest[end..];
        } else {
            break;
        }
    }
    out
}

const WRITE_PRIVILEGES: [&str; 5] = ["write", "write-content", "bind", "unbind", "all"];

fn has_write_privilege(fragment: &str) -> bool {
    WRITE_PRIVILEGES
        .iter()
        .any(|p| fragment.contains(&format!("<D:{p}")) || fragment.contains(&format!("<{p}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_spaces_and_punctuation() {
        assert_eq!(sanitize_name("Work Calendar!!"), "work-calendar");
    }

    #[test]
    fn collapses_and_trims_dashes() {
        assert_eq!(sanitize_name("--Team   Events--"), "team-events");
    }

    #[test]
    fn parses_comp_names() {
        let fragment = r#"<C:comp name="VEVENT"/><C:comp name="VTODO"/>"#;
        let comps = parse_supported_components(fragment);
        assert!(comps.contains("VEVENT"));
        assert!(comps.contains("VTODO"));
    }

    #[test]
    fn detects_write_privilege() {
        let fragment = "<D:privilege><D:write/></D:privilege>";
        assert!(has_write_privilege(fragment));
    }

    #[test]
    fn absence_of_privilege_subtree_is_writable() {
        let calendar_xml_absent: Option<&str> = None;
        assert!(calendar_xml_absent.is_none());
    }
}
