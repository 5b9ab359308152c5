//! Client configuration and authentication methods.

/// CalDAV authentication method.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// CalDAV server configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CalDavConfig {
    /// Base URL of the CalDAV server, e.g. `https://caldav.example.com`.
    pub base_url: String,
    /// Calendar home path, e.g. `/dav/calendars/user/`. When absent,
    /// discovery fills it in.
    #[serde(default)]
    pub calendar_home: Option<String>,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allows a plaintext (`http://`) `base_url`. Defaults to `false`; a
    /// client built against `http://` without this set returns
    /// [`crate::CalDavError::InsecureConnection`].
    #[serde(default)]
    pub allow_insecure: bool,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("caldav-client/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for CalDavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            calendar_home: None,
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            allow_insecure: false,
        }
    }
}
