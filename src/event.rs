//! Event CRUD (C7): calendar-query/multiget listing, ETag-guarded writes.

use crate::config::AuthMethod;
use crate::error::CalDavError;
use crate::http::{self, HttpClient};
use crate::ical;
use crate::request::{CalendarMultiGetRequest, CalendarQueryRequest, TextMatch};
use crate::types::{Calendar, CalendarEvent, ETag, Href};
use crate::urlutil;
use crate::xml::{DavResponse, MultiStatus, ns};

/// Lists events on `calendar`, optionally restricted to `[start, end)`.
///
/// Falls back to a `calendar-multiget` REPORT when the server returns hrefs
/// but omits inline `calendar-data`.
///
/// # Errors
///
/// Returns an error if the REPORT fails or the response cannot be parsed.
pub async fn list(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<CalendarEvent>, CalDavError> {
    let mut req = CalendarQueryRequest::new().component("VEVENT".to_string());
    if let Some(start) = start {
        req = req.time_range(start.to_string(), end.map(ToString::to_string));
    }
    let body = req.build()?;

    let multistatus = send_report(http, auth, calendar.href.as_str(), body).await?;
    resolve_events(http, auth, calendar, multistatus).await
}

/// Fetches the events at `urls` via `calendar-multiget`.
///
/// # Errors
///
/// Returns an error if the REPORT fails or the response cannot be parsed.
pub async fn multi_get(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    urls: &[String],
) -> Result<Vec<CalendarEvent>, CalDavError> {
    let mut req = CalendarMultiGetRequest::new();
    for url in urls {
        req.add_href(url.clone());
    }
    let body = req.build()?;
    let multistatus = send_report(http, auth, calendar.href.as_str(), body).await?;
    Ok(parse_responses(&multistatus, calendar))
}

/// Finds a single event by its `UID` via a `calendar-query` text-match
/// filter, falling back to multiget if the server omits `calendar-data`.
///
/// # Errors
///
/// Returns an error if the REPORT fails or the response cannot be parsed.
pub async fn find_by_uid(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    uid: &str,
) -> Result<Option<CalendarEvent>, CalDavError> {
    let req = CalendarQueryRequest::new()
        .component("VEVENT".to_string())
        .text_match(TextMatch {
            property: "UID".to_string(),
            text: uid.to_string(),
            collation: None,
        });
    let body = req.build()?;
    let multistatus = send_report(http, auth, calendar.href.as_str(), body).await?;
    let events = resolve_events(http, auth, calendar, multistatus).await?;
    Ok(events.into_iter().find(|e| e.uid == uid))
}

/// Creates `event` on `calendar`, rejecting if a resource already exists at
/// its target path.
///
/// # Errors
///
/// Returns [`CalDavError::Conflict`] on 412, or a transport error otherwise.
pub async fn create(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    mut event: CalendarEvent,
    now: jiff::Timestamp,
) -> Result<CalendarEvent, CalDavError> {
    let url = event_url(calendar, &event.uid);
    let body = ical::serialize_event(&event, now);

    let resp = http
        .execute(http.put_ical(&url, auth, body, None, true))
        .await?;
    let status = resp.status();

    if http::is_conflict(status) {
        return Err(CalDavError::Conflict("Event already exists".to_string()));
    }
    if !status.is_success() {
        let text = resp.text().await?;
        return Err(CalDavError::Protocol {
            message: "PUT (create) failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    event.href = Some(Href::from(url));
    event.etag = HttpClient::extract_etag(&resp).ok();
    Ok(event)
}

/// Updates an existing event, conditioned on its current `etag` when
/// present.
///
/// # Errors
///
/// Returns [`CalDavError::Conflict`] on 412, [`CalDavError::NotFound`] on
/// 404, or a transport error otherwise.
pub async fn update(
    http: &HttpClient,
    auth: &AuthMethod,
    mut event: CalendarEvent,
    now: jiff::Timestamp,
) -> Result<CalendarEvent, CalDavError> {
    let href = event
        .href
        .clone()
        .ok_or_else(|| CalDavError::Conflict("event has no href to update".to_string()))?;
    let body = ical::serialize_event(&event, now);

    let resp = http
        .execute(http.put_ical(href.as_str(), auth, body, event.etag.as_ref(), false))
        .await?;
    let status = resp.status();

    if status.as_u16() == 404 {
        return Err(CalDavError::NotFound(href));
    }
    if http::is_conflict(status) {
        return Err(CalDavError::Conflict(
            "event was modified by another client since it was last read".to_string(),
        ));
    }
    if !status.is_success() {
        let text = resp.text().await?;
        return Err(CalDavError::Protocol {
            message: "PUT (update) failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    event.etag = HttpClient::extract_etag(&resp).ok();
    Ok(event)
}

/// Deletes an event. A 404 is treated as success (the operation is
/// idempotent).
///
/// # Errors
///
/// Returns [`CalDavError::Conflict`] on 412, or a transport error otherwise.
pub async fn delete(
    http: &HttpClient,
    auth: &AuthMethod,
    event: &CalendarEvent,
) -> Result<(), CalDavError> {
    let href = event
        .href
        .as_ref()
        .ok_or_else(|| CalDavError::Conflict("event has no href to delete".to_string()))?;

    let resp = http
        .execute(http.delete(href.as_str(), auth, event.etag.as_ref()))
        .await?;
    let status = resp.status();

    if status.as_u16() == 404 {
        return Ok(());
    }
    if http::is_conflict(status) {
        return Err(CalDavError::Conflict(
            "event was modified by another client since it was last read".to_string(),
        ));
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

async fn send_report(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar_href: &str,
    body: String,
) -> Result<MultiStatus, CalDavError> {
    let resp = http.execute(http.report(calendar_href, auth, body)?).await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(CalDavError::Protocol {
            message: "REPORT failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }
    MultiStatus::parse(&text)
}

/// Parses inline `calendar-data` where present; if the server returned hrefs
/// without bodies, issues the multiget fallback and warns once.
async fn resolve_events(
    http: &HttpClient,
    auth: &AuthMethod,
    calendar: &Calendar,
    multistatus: MultiStatus,
) -> Result<Vec<CalendarEvent>, CalDavError> {
    let has_any_data = multistatus
        .responses
        .iter()
        .any(|r| r.get_property("calendar-data", ns::CALDAV).is_some());

    if has_any_data || multistatus.responses.is_empty() {
        return Ok(parse_responses(&multistatus, calendar));
    }

    tracing::warn!(
        calendar_href = %calendar.href,
        "server omitted calendar-data; falling back to calendar-multiget"
    );

    let hrefs: Vec<String> = multistatus
        .responses
        .iter()
        .map(|r| r.href.clone())
        .filter(|href| href.ends_with(".ics"))
        .collect();

    if hrefs.is_empty() {
        return Ok(Vec::new());
    }

    multi_get(http, auth, calendar, &hrefs).await
}

fn parse_responses(multistatus: &MultiStatus, calendar: &Calendar) -> Vec<CalendarEvent> {
    multistatus
        .responses
        .iter()
        .filter_map(|r| build_event(r, calendar))
        .collect()
}

fn build_event(response: &DavResponse, calendar: &Calendar) -> Option<CalendarEvent> {
    let raw = response.get_property("calendar-data", ns::CALDAV)?;
    let mut event = ical::parse_event(raw, &calendar.uid)?;
    let resolved_href = urlutil::resolve(calendar.href.as_str(), &response.href).ok()?;
    event.href = Some(Href::from(resolved_href));
    event.etag = response
        .get_property("getetag", ns::DAV)
        .map(|s| ETag::new(s.to_string()));
    event.is_read_only = calendar.is_read_only;
    Some(event)
}

fn event_url(calendar: &Calendar, uid: &str) -> String {
    let base = calendar.href.as_str();
    if base.ends_with('/') {
        format!("{base}{uid}.ics")
    } else {
        format!("{base}/{uid}.ics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Href;

    #[test]
    fn event_url_joins_with_slash() {
        let calendar = Calendar::new("c1".to_string(), Href::from("https://example.com/cal/"));
        assert_eq!(event_url(&calendar, "abc"), "https://example.com/cal/abc.ics");
    }
}
