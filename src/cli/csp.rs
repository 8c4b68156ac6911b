//! Encode and decode CSP data.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::TplConfig;
use crate::core::TplError;
use crate::csp::{CspBuilder, CspStore};
use crate::dom::Document;

/// CSP data bridge commands.
#[derive(Subcommand, Debug)]
pub enum CspCommand {
    /// Print hidden CSP markup for a JSON object
    Encode {
        /// JSON object to embed
        json: String,

        /// Translation to embed, as `text=translation` (repeatable)
        #[arg(short, long = "translation", value_name = "TEXT=TRANSLATION")]
        translations: Vec<String>,
    },

    /// Print the merged CSP data found in a page
    Decode {
        /// Page HTML
        #[arg(long, value_name = "FILE")]
        page: PathBuf,
    },
}

impl CspCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid JSON or an unreadable page.
    pub async fn execute(self, config: &TplConfig) -> Result<()> {
        match self {
            Self::Encode {
                json,
                translations,
            } => {
                println!("{}", encode(&json, &translations)?);
                Ok(())
            }
            Self::Decode {
                page,
            } => {
                let html = tokio::fs::read_to_string(&page)
                    .await
                    .with_context(|| format!("Failed to read page {}", page.display()))?;
                println!("{}", serde_json::to_string_pretty(&decode(&html, &config.csp_selector))?);
                Ok(())
            }
        }
    }
}

fn encode(json: &str, translations: &[String]) -> Result<String, TplError> {
    let data: Value = serde_json::from_str(json).map_err(|e| TplError::CspDecodeError {
        reason: e.to_string(),
    })?;

    let mut builder = CspBuilder::new();
    builder.set_data(data);
    if !translations.is_empty() {
        builder.set_translation(translations.iter().map(|pair| match pair.split_once('=') {
            Some((text, translation)) => (text.to_string(), Some(translation.to_string())),
            None => (pair.clone(), None),
        }));
    }
    Ok(builder.hidden_markup())
}

fn decode(html: &str, selector: &str) -> Value {
    let document: Arc<Document> = Arc::new(Document::from_html(html));
    let store = CspStore::new(document, selector);
    Value::Object(store.data().as_map().clone())
}
