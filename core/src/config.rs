//! Add-on settings and feed configuration.
//!
//! The CMS owns these values; the bridge only reads them. `Settings` can be
//! deserialized from the host's JSON or read from the environment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field_map::FieldMapping;
use crate::types::ResourceId;

/// Mautic instance the add-on talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://hello.forkpoint.com/api";

/// HTTP Basic credentials for the Mautic API.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when either half is empty.
    pub fn is_blank(&self) -> bool {
        self.username.is_empty() || self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Plugin-level settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, rename = "mautic_username")]
    pub username: String,
    #[serde(default, rename = "mautic_password")]
    pub password: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Settings {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Reads `MAUTIC_BASE_URL`, `MAUTIC_USERNAME` and `MAUTIC_PASSWORD`.
    /// Unset credentials come back blank; the processor reports them.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("MAUTIC_BASE_URL").unwrap_or_else(|_| default_base_url()),
            username: std::env::var("MAUTIC_USERNAME").unwrap_or_default(),
            password: std::env::var("MAUTIC_PASSWORD").unwrap_or_default(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }
}

/// One configured connection between a form and a Mautic segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "mautic_segment_list")]
    pub segment_id: ResourceId,
    #[serde(flatten)]
    pub mapping: FieldMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_forkpoint_instance() {
        let settings: Settings =
            serde_json::from_str(r#"{"mautic_username":"u","mautic_password":"p"}"#).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.credentials(), Credentials::new("u", "p"));
    }

    #[test]
    fn blank_half_makes_credentials_blank() {
        assert!(Credentials::new("", "p").is_blank());
        assert!(Credentials::new("u", "").is_blank());
        assert!(!Credentials::new("u", "p").is_blank());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn feed_reads_legacy_segment_key() {
        let feed: Feed = serde_json::from_str(
            r#"{"name":"Newsletter","mautic_segment_list":"42","mapped_fields":{"email":"1"}}"#,
        )
        .unwrap();
        assert_eq!(feed.segment_id, ResourceId::from("42"));
        assert_eq!(feed.mapping.standard.len(), 1);
    }
}
