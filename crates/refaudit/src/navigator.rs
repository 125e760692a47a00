//! Links into the repository's web app
//!
//! The audit only reports where a broken entry lives. Opening it is left to
//! an [`EntryNavigator`], which for the CLI means printing the editor URL.

use refaudit_protocol::{ContentTypeId, EntryId, RepositorySettings};
use std::sync::Mutex;
use tracing::debug;
use url::Url;

/// Fire-and-forget navigation to an entry editor
pub trait EntryNavigator: Send + Sync {
    fn open_entry(&self, entry_id: &EntryId);
}

/// URL builder for one space environment of the web app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppLinks {
    base: Url,
}

impl WebAppLinks {
    pub fn from_settings(settings: &RepositorySettings) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: settings
                .web_app_host
                .join(&settings.environment_path())?,
        })
    }

    /// Editor page of one entry
    pub fn entry_url(&self, entry_id: &EntryId) -> String {
        format!("{}entries/{}", self.base, entry_id)
    }

    /// Field editor of a content type
    pub fn content_type_url(&self, content_type: &ContentTypeId) -> String {
        format!("{}content_types/{}/fields", self.base, content_type)
    }

    /// Entry list filtered to one content type
    pub fn entries_url(&self, content_type: &ContentTypeId) -> String {
        format!("{}entries?contentTypeId={}", self.base, content_type)
    }
}

impl EntryNavigator for WebAppLinks {
    fn open_entry(&self, entry_id: &EntryId) {
        let url = self.entry_url(entry_id);
        debug!(entry = %entry_id, url = %url, "Opening entry");
        println!("{}", url);
    }
}

/// Navigator that only remembers what it was asked to open
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    opened: Mutex<Vec<EntryId>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<EntryId> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl EntryNavigator for RecordingNavigator {
    fn open_entry(&self, entry_id: &EntryId) {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(entry_id.clone());
        }
    }
}
