//! Repository credentials.
//!
//! Values come from `~/.depot/config.toml`; either may be written as
//! `env:NAME` to read it from the environment at load time:
//!
//! ```toml
//! [publish.nexus]
//! url = "https://nexus.example.com/repository/releases"
//! username = "env:NEXUS_USER"
//! password = "env:NEXUS_PASS"
//! ```

use depot_core::config::resolve_secret;
use reqwest::blocking::RequestBuilder;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolves `env:` references in both values.
    pub fn from_config(username: Option<&str>, password: Option<&str>) -> Self {
        Self {
            username: resolve_secret(username),
            password: resolve_secret(password),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Basic auth with a username, bearer auth with a lone password (token).
pub fn apply_auth(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match (&credentials.username, &credentials.password) {
        (Some(user), Some(pass)) => request.basic_auth(user, Some(pass)),
        (Some(user), None) => request.basic_auth(user, None::<&str>),
        (None, Some(token)) => request.bearer_auth(token),
        (None, None) => request,
    }
}
