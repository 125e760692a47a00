//! Default connection values.

/// Entries requested per page during a scan.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Content types requested in one schema listing call.
pub const SCHEMA_PAGE_LIMIT: u64 = 1000;

pub const DEFAULT_ENVIRONMENT: &str = "master";

pub const DEFAULT_DELIVERY_HOST: &str = "https://cdn.contentful.com";

pub const DEFAULT_MANAGEMENT_HOST: &str = "https://api.contentful.com";

pub const DEFAULT_WEB_APP_HOST: &str = "https://app.contentful.com";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
