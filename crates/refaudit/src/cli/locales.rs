//! Locales command - list the locales configured in the space environment

use crate::cli::config::{self, ConnectionArgs};
use crate::cli::error::HelpfulError;
use crate::cli::output::print_table;
use refaudit::{ContentRepository, ContentfulRepository};
use refaudit_protocol::LocaleRecord;

/// Arguments for the locales command
#[derive(Debug)]
pub struct LocalesArgs {
    pub json: bool,
}

pub fn run(args: LocalesArgs, connection: &ConnectionArgs) -> anyhow::Result<()> {
    let settings = config::resolve_settings(connection, None)?;
    let repository = ContentfulRepository::new(settings)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let locales = rt
        .block_on(repository.list_locales())
        .map_err(|e| HelpfulError::repository_unreachable("list locales", &e.to_string()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&locales)?);
    } else {
        print_locales(&locales);
    }
    Ok(())
}

fn print_locales(locales: &[LocaleRecord]) {
    if locales.is_empty() {
        println!("No locales configured.");
        return;
    }
    let rows = locales
        .iter()
        .map(|locale| {
            vec![
                locale.code.to_string(),
                locale.name.clone(),
                if locale.default { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(&["Code", "Name", "Default"], rows);
}
