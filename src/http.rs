//! WebDAV transport adapter: typed request construction over `reqwest`.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::config::{AuthMethod, CalDavConfig};
use crate::error::CalDavError;
use crate::types::ETag;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICAL_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Thin, typed wrapper over an HTTP client for WebDAV/CalDAV methods.
///
/// The adapter does not interpret status codes beyond what every caller
/// needs (network failures surface as [`CalDavError::Protocol`]); 4xx/5xx
/// responses are handed back to the caller so each service can apply its
/// own precondition and not-found semantics.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client honoring `config.timeout_secs` and
    /// `config.user_agent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client fails to build.
    pub fn new(config: &CalDavConfig) -> Result<Self, CalDavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Builds a request with the configured authentication attached.
    pub fn authed_request(&self, method: Method, url: &str, auth: &AuthMethod) -> RequestBuilder {
        let req = self.client.request(method, url);
        match auth {
            AuthMethod::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthMethod::Bearer { token } => req.bearer_auth(token),
            AuthMethod::None => req,
        }
    }

    /// PROPFIND with the given `Depth` and XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the `PROPFIND` method token cannot be constructed.
    pub fn propfind(
        &self,
        url: &str,
        auth: &AuthMethod,
        depth: u8,
        body: String,
    ) -> Result<RequestBuilder, CalDavError> {
        tracing::debug!(method = "PROPFIND", %url, depth, "sending WebDAV request");
        Ok(self
            .authed_request(method_propfind()?, url, auth)
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", depth.to_string())
            .body(body))
    }

    /// REPORT (`calendar-query` / `calendar-multiget`) with `Depth: 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `REPORT` method token cannot be constructed.
    pub fn report(&self, url: &str, auth: &AuthMethod, body: String) -> Result<RequestBuilder, CalDavError> {
        tracing::debug!(method = "REPORT", %url, "sending WebDAV request");
        Ok(self
            .authed_request(method_report()?, url, auth)
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", "1")
            .body(body))
    }

    /// PROPPATCH with an XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the `PROPPATCH` method token cannot be constructed.
    pub fn proppatch(&self, url: &str, auth: &AuthMethod, body: String) -> Result<RequestBuilder, CalDavError> {
        tracing::debug!(method = "PROPPATCH", %url, "sending WebDAV request");
        Ok(self
            .authed_request(method_proppatch()?, url, auth)
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(body))
    }

    /// MKCALENDAR with an optional XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if the `MKCALENDAR` method token cannot be constructed.
    pub fn mkcalendar(
        &self,
        url: &str,
        auth: &AuthMethod,
        body: Option<String>,
    ) -> Result<RequestBuilder, CalDavError> {
        tracing::debug!(method = "MKCALENDAR", %url, "sending WebDAV request");
        let req = self.authed_request(method_mkcalendar()?, url, auth);
        Ok(match body {
            Some(body) => req.header("Content-Type", XML_CONTENT_TYPE).body(body),
            None => req,
        })
    }

    /// PUT of an iCalendar body, optionally conditioned on `If-Match` or
    /// `If-None-Match: *`.
    pub fn put_ical(
        &self,
        url: &str,
        auth: &AuthMethod,
        body: String,
        if_match: Option<&ETag>,
        if_none_match_any: bool,
    ) -> RequestBuilder {
        tracing::debug!(method = "PUT", %url, "sending WebDAV request");
        let mut req = self
            .authed_request(Method::PUT, url, auth)
            .header("Content-Type", ICAL_CONTENT_TYPE)
            .body(body);
        if let Some(etag) = if_match {
            req = req.header("If-Match", etag.as_str());
        }
        if if_none_match_any {
            req = req.header("If-None-Match", "*");
        }
        req
    }

    /// DELETE, optionally conditioned on `If-Match`.
    pub fn delete(&self, url: &str, auth: &AuthMethod, if_match: Option<&ETag>) -> RequestBuilder {
        tracing::debug!(method = "DELETE", %url, "sending WebDAV request");
        let mut req = self.authed_request(Method::DELETE, url, auth);
        if let Some(etag) = if_match {
            req = req.header("If-Match", etag.as_str());
        }
        req
    }

    /// GET with no extra headers.
    pub fn get(&self, url: &str, auth: &AuthMethod) -> RequestBuilder {
        tracing::debug!(method = "GET", %url, "sending WebDAV request");
        self.authed_request(Method::GET, url, auth)
    }

    /// OPTIONS with no extra headers, used to probe `DAV:` capabilities.
    pub fn options(&self, url: &str, auth: &AuthMethod) -> RequestBuilder {
        tracing::debug!(method = "OPTIONS", %url, "sending WebDAV request");
        self.authed_request(Method::OPTIONS, url, auth)
    }

    /// Sends a request, surfacing only network-layer failures as errors.
    /// The response (including 4xx/5xx statuses) is returned for the
    /// caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the response
    /// could not be read.
    pub async fn execute(&self, req: RequestBuilder) -> Result<Response, CalDavError> {
        let resp = req.send().await?;
        tracing::trace!(status = %resp.status(), "received WebDAV response");
        Ok(resp)
    }

    /// Extracts the `ETag` header from a response.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing or not valid UTF-8.
    pub fn extract_etag(resp: &Response) -> Result<ETag, CalDavError> {
        resp.headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(|s| ETag::new(s.to_string()))
            .ok_or_else(|| CalDavError::Protocol {
                message: "missing ETag header".to_string(),
                status: Some(resp.status().as_u16()),
                body: None,
            })
    }
}

/// Classifies a response status into the three precondition outcomes every
/// write operation needs: success, conflict (409/412), or "something else".
#[must_use]
pub fn is_conflict(status: StatusCode) -> bool {
    matches!(status, StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED)
}

fn method_propfind() -> Result<Method, CalDavError> {
    Method::from_bytes(b"PROPFIND").map_err(|e| CalDavError::Protocol {
        message: format!("invalid method: {e}"),
        status: None,
        body: None,
    })
}

fn method_proppatch() -> Result<Method, CalDavError> {
    Method::from_bytes(b"PROPPATCH").map_err(|e| CalDavError::Protocol {
        message: format!("invalid method: {e}"),
        status: None,
        body: None,
    })
}

fn method_mkcalendar() -> Result<Method, CalDavError> {
    Method::from_bytes(b"MKCALENDAR").map_err(|e| CalDavError::Protocol {
        message: format!("invalid method: {e}"),
        status: None,
        body: None,
    })
}

fn method_report() -> Result<Method, CalDavError> {
    Method::from_bytes(b"REPORT").map_err(|e| CalDavError::Protocol {
        message: format!("invalid method: {e}"),
        status: None,
        body: None,
    })
}
