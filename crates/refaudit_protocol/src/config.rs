//! Connection settings for a content repository.

use crate::defaults::{
    DEFAULT_DELIVERY_HOST, DEFAULT_ENVIRONMENT, DEFAULT_MANAGEMENT_HOST, DEFAULT_PAGE_SIZE,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WEB_APP_HOST,
};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidHost {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Page size must be between 1 and 1000, got {0}")]
    InvalidPageSize(u64),
}

/// Resolved settings used by the HTTP repository and the web-app links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub space_id: String,
    pub environment: String,
    /// Delivery API token used for entry pages, counts and locales.
    pub delivery_token: String,
    /// Management API token; when present the schema is read from the Management API.
    pub management_token: Option<String>,
    pub delivery_host: Url,
    pub management_host: Url,
    pub web_app_host: Url,
    pub page_size: u64,
    pub request_timeout: Duration,
}

impl RepositorySettings {
    /// Settings with default hosts for the given space and token.
    pub fn new(
        space_id: impl Into<String>,
        delivery_token: impl Into<String>,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            space_id: space_id.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            delivery_token: delivery_token.into(),
            management_token: None,
            delivery_host: parse_host("delivery_host", DEFAULT_DELIVERY_HOST)?,
            management_host: parse_host("management_host", DEFAULT_MANAGEMENT_HOST)?,
            web_app_host: parse_host("web_app_host", DEFAULT_WEB_APP_HOST)?,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.space_id.trim().is_empty() {
            return Err(SettingsError::Missing("space_id"));
        }
        if self.environment.trim().is_empty() {
            return Err(SettingsError::Missing("environment"));
        }
        if self.delivery_token.trim().is_empty() {
            return Err(SettingsError::Missing("delivery_token"));
        }
        // The delivery API caps `limit` at 1000.
        if self.page_size == 0 || self.page_size > DEFAULT_PAGE_SIZE {
            return Err(SettingsError::InvalidPageSize(self.page_size));
        }
        Ok(())
    }

    /// Path prefix shared by every space-scoped API call.
    pub fn environment_path(&self) -> String {
        format!(
            "spaces/{}/environments/{}/",
            self.space_id, self.environment
        )
    }
}

/// Parse a host setting, accepting values with or without a trailing slash.
pub fn parse_host(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    let trimmed = value.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&normalized).map_err(|e| SettingsError::InvalidHost {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SettingsError::InvalidHost {
            field,
            value: value.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(url)
}
