//! Open command - print the editor URL of an entry

use crate::cli::config::{self, ConnectionArgs};
use crate::cli::error::HelpfulError;
use refaudit::{EntryNavigator, WebAppLinks};
use refaudit_protocol::EntryId;

/// Arguments for the open command
#[derive(Debug)]
pub struct OpenArgs {
    pub entry_id: String,
}

pub fn run(args: OpenArgs, connection: &ConnectionArgs) -> anyhow::Result<()> {
    let entry_id = EntryId::parse(&args.entry_id)
        .map_err(|e| HelpfulError::invalid_setting("entry id", &e.to_string()))?;

    // Links only need the space and environment, not a token.
    let settings = config::load_merged(connection)?.build_settings()?;
    let links = WebAppLinks::from_settings(&settings)
        .map_err(|e| HelpfulError::invalid_setting("web_app_host", &e.to_string()))?;

    navigate(&links, &entry_id);
    Ok(())
}

fn navigate(navigator: &dyn EntryNavigator, entry_id: &EntryId) {
    navigator.open_entry(entry_id);
}
