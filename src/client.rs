//! Client façade: construction, authentication, and lazy discovery caching.

use tokio::sync::OnceCell;

use crate::calendar::{self, CalendarOptions};
use crate::config::CalDavConfig;
use crate::discovery::{self, DiscoveryResult};
use crate::error::CalDavError;
use crate::event;
use crate::http::HttpClient;
use crate::types::{Calendar, CalendarEvent};
use crate::urlutil;

/// Entry point for CalDAV operations: discovery, calendars, and events.
#[derive(Debug)]
pub struct CalDavClient {
    http: HttpClient,
    config: CalDavConfig,
    discovery: OnceCell<DiscoveryResult>,
}

impl CalDavClient {
    /// Builds a client from `config`, validating the URL scheme but
    /// performing no network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InsecureConnection`] if `config.base_url` is
    /// not `https://` and `config.allow_insecure` is `false`.
    pub fn new(config: CalDavConfig) -> Result<Self, CalDavError> {
        if !config.allow_insecure && !config.base_url.starts_with("https://") {
            return Err(CalDavError::InsecureConnection);
        }
        let http = HttpClient::new(&config)?;
        Ok(Self {
            http,
            config,
            discovery: OnceCell::new(),
        })
    }

    /// Ergonomic constructor: builds the client, verifies authentication,
    /// and runs discovery eagerly. On any failure, the partially-built
    /// client is dropped and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error from construction, auth verification, or discovery.
    pub async fn connect(config: CalDavConfig) -> Result<Self, CalDavError> {
        let client = Self::new(config)?;
        let authenticated = client.verify_auth().await?;
        if !authenticated {
            return Err(CalDavError::Authentication(
                "credentials were rejected by the server".to_string(),
            ));
        }
        client.discover().await?;
        Ok(client)
    }

    /// Verifies that the configured credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the probe request cannot be sent.
    pub async fn verify_auth(&self) -> Result<bool, CalDavError> {
        discovery::verify_auth(&self.http, &self.config.auth, &self.config.base_url).await
    }

    /// Runs (or returns the cached result of) the three-stage discovery
    /// process.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Discovery`] if a stage fails to locate what it
    /// needs.
    pub async fn discover(&self) -> Result<&DiscoveryResult, CalDavError> {
        self.discovery
            .get_or_try_init(|| {
                discovery::discover(&self.http, &self.config.auth, &self.config.base_url)
            })
            .await
    }

    /// Invalidates the cached discovery result; the next call re-runs
    /// discovery from scratch.
    pub fn clear_discovery_cache(&mut self) {
        self.discovery = OnceCell::new();
    }

    async fn calendar_home_url(&self) -> Result<String, CalDavError> {
        if let Some(home) = &self.config.calendar_home {
            return urlutil::resolve(&self.config.base_url, home);
        }
        Ok(self.discover().await?.calendar_home_url.clone())
    }

    /// Lists every calendar collection in the account's calendar home.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or the PROPFIND fails.
    pub async fn get_calendars(&self) -> Result<Vec<Calendar>, CalDavError> {
        let home = self.calendar_home_url().await?;
        calendar::list(&self.http, &self.config.auth, &home).await
    }

    /// Fetches a single calendar by URL.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] if the resource is not a calendar.
    pub async fn get_calendar(&self, url: &str) -> Result<Calendar, CalDavError> {
        calendar::get(&self.http, &self.config.auth, url).await
    }

    /// Creates a calendar collection named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if one already exists at that path.
    pub async fn create_calendar(
        &self,
        name: &str,
        opts: &CalendarOptions,
    ) -> Result<Calendar, CalDavError> {
        let home = self.calendar_home_url().await?;
        calendar::create(&self.http, &self.config.auth, &home, name, opts).await
    }

    /// Updates a calendar's properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPPATCH fails.
    pub async fn update_calendar(
        &self,
        calendar: &Calendar,
        opts: &CalendarOptions,
    ) -> Result<(), CalDavError> {
        calendar::update(&self.http, &self.config.auth, calendar, opts).await
    }

    /// Deletes a calendar collection.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::NotFound`] on 404.
    pub async fn delete_calendar(&self, calendar: &Calendar) -> Result<(), CalDavError> {
        calendar::delete(&self.http, &self.config.auth, calendar).await
    }

    /// Lists events on `calendar`, optionally restricted to a UTC time
    /// range.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails or the response can't be parsed.
    pub async fn get_events(
        &self,
        calendar: &Calendar,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<CalendarEvent>, CalDavError> {
        event::list(&self.http, &self.config.auth, calendar, start, end).await
    }

    /// Finds an event by its `UID`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails or the response can't be parsed.
    pub async fn get_event_by_uid(
        &self,
        calendar: &Calendar,
        uid: &str,
    ) -> Result<Option<CalendarEvent>, CalDavError> {
        event::find_by_uid(&self.http, &self.config.auth, calendar, uid).await
    }

    /// Fetches events at specific URLs via `calendar-multiget`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails or the response can't be parsed.
    pub async fn get_events_by_urls(
        &self,
        calendar: &Calendar,
        urls: &[String],
    ) -> Result<Vec<CalendarEvent>, CalDavError> {
        event::multi_get(&self.http, &self.config.auth, calendar, urls).await
    }

    /// Creates `event` on `calendar`.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if a resource already exists at the
    /// event's target path.
    pub async fn create_event(
        &self,
        calendar: &Calendar,
        ev: CalendarEvent,
    ) -> Result<CalendarEvent, CalDavError> {
        let now = jiff::Timestamp::now();
        event::create(&self.http, &self.config.auth, calendar, ev, now).await
    }

    /// Updates an existing event, conditioned on its `etag` when present.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if the server's copy has changed.
    pub async fn update_event(&self, ev: CalendarEvent) -> Result<CalendarEvent, CalDavError> {
        let now = jiff::Timestamp::now();
        event::update(&self.http, &self.config.auth, ev, now).await
    }

    /// Deletes an event. Deleting an already-absent event succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Conflict`] if the server's copy has changed.
    pub async fn delete_event(&self, ev: &CalendarEvent) -> Result<(), CalDavError> {
        event::delete(&self.http, &self.config.auth, ev).await
    }

    /// Releases the underlying transport. The client must not be used
    /// afterward.
    pub fn close(self) {
        drop(self);
    }
}
