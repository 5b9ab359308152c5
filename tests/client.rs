//! Client integration tests with wiremock.

use caldav_client::{AuthMethod, CalDavClient, CalDavConfig};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(mock_server: &MockServer, calendar_home: &str) -> CalDavConfig {
    CalDavConfig {
        base_url: mock_server.uri(),
        calendar_home: Some(calendar_home.to_string()),
        auth: AuthMethod::None,
        ..Default::default()
    }
}

#[tokio::test]
async fn discover_resolves_principal_and_home() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/caldav"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/</D:href>
    <D:propstat>
      <D:prop>
        <D:current-user-principal><D:href>/principals/user/</D:href></D:current-user-principal>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#,
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("PROPFIND"))
        .and(path("/principals/user/"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/principals/user/</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-home-set><D:href>/dav/calendars/user/</D:href></C:calendar-home-set>
        <D:displayname>Test User</D:displayname>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#,
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    let client = CalDavClient::new(config(&mock_server, "/dav/calendars/user/"))
        .expect("client should build against an http mock");
    let result = client.discover().await.expect("discovery should succeed");

    assert_eq!(result.calendar_home_url, format!("{}/dav/calendars/user/", mock_server.uri()));
    assert_eq!(result.display_name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn list_calendars_skips_non_calendar_collections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PROPFIND"))
        .and(path("/dav/calendars/user/"))
        .and(header("Depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/calendars/user/personal/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Personal</D:displayname>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <C:supported-calendar-component-set><C:comp name="VEVENT"/></C:supported-calendar-component-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/calendars/user/inbox/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Inbox</D:displayname>
        <D:resourcetype><D:collection/></D:resourcetype>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#,
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    let client = CalDavClient::new(config(&mock_server, "/dav/calendars/user/")).unwrap();
    let calendars = client.get_calendars().await.expect("list should succeed");

    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].display_name, "Personal");
}

#[tokio::test]
async fn multiget_fallback_triggers_when_calendar_data_is_missing() {
    let mock_server = MockServer::start().await;
    let calendar_href = "/dav/calendars/user/personal/";

    // First REPORT (the calendar-query) returns hrefs with no calendar-data,
    // forcing the fallback; the second REPORT (the calendar-multiget it
    // triggers) returns the full body. Both requests share the same method
    // and path, so the sequencing relies on `up_to_n_times` exhausting the
    // first mock before the second is eligible to match.
    Mock::given(method("REPORT"))
        .and(path(calendar_href))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>{calendar_href}abc.ics</D:href>
    <D:propstat>
      <D:prop><D:getetag>"etag-1"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("REPORT"))
        .and(path(calendar_href))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            format!(
                r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>{calendar_href}abc.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"etag-1"</D:getetag>
        <C:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:abc
DTSTART:20260101T100000Z
SUMMARY:Fallback event
END:VEVENT
END:VCALENDAR
</C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
            ),
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    let client = CalDavClient::new(config(&mock_server, "/dav/calendars/user/")).unwrap();
    let calendar = caldav_client::Calendar::new(
        "personal".to_string(),
        caldav_client::Href::from(format!("{}{}", mock_server.uri(), calendar_href)),
    );

    let events = client
        .get_events(&calendar, None, None)
        .await
        .expect("list should fall back to multiget and succeed");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uid, "abc");
    assert_eq!(events[0].summary, "Fallback event");
}

#[tokio::test]
async fn create_event_rejects_on_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/dav/calendars/user/personal/conflict-uid.ics"))
        .and(header("If-None-Match", "*"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&mock_server)
        .await;

    let client = CalDavClient::new(config(&mock_server, "/dav/calendars/user/")).unwrap();
    let calendar = caldav_client::Calendar::new(
        "personal".to_string(),
        caldav_client::Href::from(format!("{}/dav/calendars/user/personal/", mock_server.uri())),
    );
    let event = caldav_client::CalendarEvent::new(
        "conflict-uid".to_string(),
        "personal".to_string(),
        jiff::Timestamp::from_second(1_700_000_000).unwrap(),
        "Double booked".to_string(),
    );

    let err = client
        .create_event(&calendar, event)
        .await
        .expect_err("creating over an existing resource should fail");

    assert!(matches!(err, caldav_client::CalDavError::Conflict(_)));
}

#[test]
fn insecure_base_url_is_refused_without_opt_in() {
    let config = CalDavConfig {
        base_url: "http://example.com".to_string(),
        ..Default::default()
    };
    let err = CalDavClient::new(config).expect_err("plaintext base_url must be refused");
    assert!(matches!(err, caldav_client::CalDavError::InsecureConnection));
}

#[test]
fn insecure_base_url_is_allowed_with_explicit_opt_in() {
    let config = CalDavConfig {
        base_url: "http://example.com".to_string(),
        allow_insecure: true,
        ..Default::default()
    };
    assert!(CalDavClient::new(config).is_ok());
}
