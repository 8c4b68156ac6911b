//! Inspect the durable template store.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::sync::Arc;

use crate::common::Common;
use crate::config::TplConfig;
use crate::storage::FileStore;
use crate::templating::StoredTemplate;

/// Template store commands.
#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// List stored template mappings
    List,
}

impl StoreCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store file cannot be opened.
    pub fn execute(self, config: TplConfig) -> Result<()> {
        match self {
            Self::List => {
                let path = config.store_path_or_default()?;
                let store = FileStore::open(&path, config.store_quota_bytes)
                    .with_context(|| format!("Failed to open template store {}", path.display()))?;
                let common = Common::builder(config).store(Arc::new(store)).build()?;

                let entries = common.templates().local().entries();
                println!("{}", format_entries(&entries));
                Ok(())
            }
        }
    }
}

fn format_entries(entries: &[StoredTemplate]) -> String {
    if entries.is_empty() {
        return "No stored templates".dimmed().to_string();
    }

    let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("{:<width$}  {:<16}  {:>8}  {}", "KEY", "CHECKSUM", "BYTES", "DATA"));

    for entry in entries {
        let checksum: String = entry.checksum.chars().take(16).collect();
        let bytes = match entry.content_bytes {
            Some(bytes) => bytes.to_string(),
            None => "missing".to_string(),
        };
        let data = if entry.has_data { "yes" } else { "-" };
        lines.push(format!("{:<width$}  {:<16}  {:>8}  {}", entry.key, checksum, bytes, data));
    }
    lines.join("\n")
}
