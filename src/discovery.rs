//! RFC 6764 auto-discovery: well-known URL, principal, and calendar-home-set.

use crate::config::AuthMethod;
use crate::error::CalDavError;
use crate::http::HttpClient;
use crate::request::{Prop, PropFindRequest};
use crate::urlutil::resolve;
use crate::xml::{MultiStatus, ns};

/// Result of running discovery against a base URL.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    /// The principal URL resolved in stage P.
    pub principal_url: String,
    /// The calendar-home-set URL resolved in stage H.
    pub calendar_home_url: String,
    /// `displayname` captured opportunistically in stage H.
    pub display_name: Option<String>,
}

/// Runs the three-stage discovery state machine starting from `base_url`.
///
/// # Errors
///
/// Returns [`CalDavError::Discovery`] if any stage fails to locate the
/// property it needs, or a transport/parse error if a request fails.
pub async fn discover(
    http: &HttpClient,
    auth: &AuthMethod,
    base_url: &str,
) -> Result<DiscoveryResult, CalDavError> {
    let endpoint = stage_well_known(http, auth, base_url).await?;
    let principal_url = stage_principal(http, auth, &endpoint).await?;
    let (calendar_home_url, display_name) = stage_home(http, auth, &principal_url).await?;

    Ok(DiscoveryResult {
        principal_url,
        calendar_home_url,
        display_name,
    })
}

/// Verifies that `auth` is accepted by the server at `base_url`: a
/// `current-user-principal` PROPFIND that succeeds (207) means authenticated,
/// a 401 means not authenticated; any other transport failure propagates.
///
/// # Errors
///
/// Returns a transport error if the request itself fails to send.
pub async fn verify_auth(
    http: &HttpClient,
    auth: &AuthMethod,
    base_url: &str,
) -> Result<bool, CalDavError> {
    let body = PropFindRequest::current_user_principal().build()?;
    let resp = http
        .execute(http.propfind(base_url, auth, 0, body)?)
        .await?;
    match resp.status().as_u16() {
        207 => Ok(true),
        401 => Ok(false),
        status => Err(CalDavError::Protocol {
            message: "unexpected status verifying authentication".to_string(),
            status: Some(status),
            body: None,
        }),
    }
}

async fn stage_well_known(
    http: &HttpClient,
    auth: &AuthMethod,
    base_url: &str,
) -> Result<String, CalDavError> {
    let well_known = resolve(base_url, ".well-known/caldav")?;
    tracing::debug!(stage = "well-known", url = %well_known, "discovery");

    let resp = http.execute(http.get(&well_known, auth)).await?;
    let status = resp.status();

    if status.is_redirection() {
        let location = resp
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                CalDavError::Discovery("redirect from .well-known missing Location".to_string())
            })?;
        return resolve(&well_known, location);
    }

    if status.as_u16() == 200 {
        return Ok(well_known);
    }

    if status.as_u16() == 404 || status.as_u16() == 401 {
        return Ok(base_url.to_string());
    }

    Err(CalDavError::Protocol {
        message: "unexpected status probing .well-known/caldav".to_string(),
        status: Some(status.as_u16()),
        body: None,
    })
}

async fn stage_principal(
    http: &HttpClient,
    auth: &AuthMethod,
    endpoint: &str,
) -> Result<String, CalDavError> {
    tracing::debug!(stage = "principal", url = %endpoint, "discovery");

    let body = PropFindRequest::current_user_principal().build()?;
    let resp = http.execute(http.propfind(endpoint, auth, 0, body)?).await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(CalDavError::Protocol {
            message: "PROPFIND for current-user-principal failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    let multistatus = MultiStatus::parse(&text)?;
    let href = multistatus
        .responses
        .iter()
        .find_map(|r| r.get_property_element("current-user-principal", ns::DAV))
        .and_then(extract_href)
        .ok_or_else(|| CalDavError::Discovery("current-user-principal not found".to_string()))?;

    resolve(endpoint, &href)
}

async fn stage_home(
    http: &HttpClient,
    auth: &AuthMethod,
    principal_url: &str,
) -> Result<(String, Option<String>), CalDavError> {
    tracing::debug!(stage = "home", url = %principal_url, "discovery");

    let mut req = PropFindRequest::new();
    req.add_property(Prop::CALENDAR_HOME_SET)
        .add_property(Prop::DISPLAY_NAME);
    let body = req.build()?;
    let resp = http
        .execute(http.propfind(principal_url, auth, 0, body)?)
        .await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(CalDavError::Protocol {
            message: "PROPFIND for calendar-home-set failed".to_string(),
            status: Some(status.as_u16()),
            body: Some(text),
        });
    }

    let multistatus = MultiStatus::parse(&text)?;
    let response = multistatus.responses.first();

    let href = response
        .and_then(|r| r.get_property_element("calendar-home-set", ns::CALDAV))
        .and_then(extract_href)
        .ok_or_else(|| CalDavError::Discovery("calendar-home-set not found".to_string()))?;

    let display_name = response
        .and_then(|r| r.get_property("displayname", ns::DAV))
        .map(ToString::to_string);

    let home_url = resolve(principal_url, &href)?;
    Ok((home_url, display_name))
}

/// Pulls the first `<...href>...</...href>` text out of a structured
/// property's serialized subtree, tolerating whatever namespace prefix the
/// server used.
fn extract_href(fragment: &str) -> Option<String> {
    let start_tag_end = fragment
        .match_indices('<')
        .find(|(i, _)| {
            fragment[*i..]
                .split(['>', ' '])
                .next()
                .is_some_and(|tag| tag.trim_start_matches('<').ends_with("href"))
        })
        .map(|(i, _)| i)?;
    let after_open = &fragment[start_tag_end..];
    let content_start = after_open.find('>')? + 1;
    let content = &after_open[content_start..];
    let close_start = content.find("</")?;
    Some(content[..close_start].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_href_with_prefix() {
        let fragment = "<D:href>/principals/user/</D:href>";
        assert_eq!(extract_href(fragment), Some("/principals/user/".to_string()));
    }

    #[test]
    fn extracts_href_without_prefix() {
        let fragment = "<href>/cal/</href>";
        assert_eq!(extract_href(fragment), Some("/cal/".to_string()));
    }

    #[test]
    fn resolves_relative_path_against_base() {
        let resolved = resolve("https://example.com/dav/", "/principals/me/").unwrap();
        assert_eq!(resolved, "https://example.com/principals/me/");
    }
}
