//! Render templates into a page skeleton.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::common::Common;
use crate::config::TplConfig;
use crate::core::TplError;
use crate::dom::{Document, Element};
use crate::templating::{TemplateData, TemplateKey, TplOptions, TplOutcome};

/// Render templates into a page skeleton.
///
/// Templates missing from the store are fetched from the configured endpoint
/// and persisted for the next run.
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template keys (CSS selectors) to render
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Page HTML providing the target nodes and CSP data; without it, one
    /// empty node is created per key
    #[arg(long, value_name = "FILE")]
    pub page: Option<PathBuf>,

    /// Template data as JSON
    #[arg(long, conflicts_with = "html")]
    pub data: Option<String>,

    /// Ready-made HTML to inject instead of rendering a template
    #[arg(long)]
    pub html: Option<String>,

    /// Append to target content instead of replacing it
    #[arg(long)]
    pub append: bool,

    /// Do not render with stored data when no data is given
    #[arg(long)]
    pub no_prefetch_render: bool,
}

impl RenderCommand {
    /// Build the pipeline from `config` and run the command.
    ///
    /// Unless the configuration names one, the default store file is used
    /// so templates survive between runs.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid keys or data, an unreadable page, or a
    /// pipeline that cannot be built.
    pub async fn execute(self, mut config: TplConfig) -> Result<()> {
        if config.store_path.is_none() {
            config.store_path = Some(config.store_path_or_default()?.display().to_string());
        }

        let document = Arc::new(self.document().await?);
        let common = Common::builder(config).dom(document.clone()).build()?;

        let outcome = self.run(&common).await?;
        self.report(&document, &outcome);
        Ok(())
    }

    /// Render into `common`'s page.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid keys or data.
    pub async fn run(&self, common: &Common) -> Result<TplOutcome> {
        let keys = self.template_keys()?;
        let data = self.template_data()?;
        let options = TplOptions::default().append(self.append).allow_prefetch_render(!self.no_prefetch_render);

        Ok(common.tpl(keys, data, options).await)
    }

    fn template_keys(&self) -> Result<Vec<TemplateKey>, TplError> {
        self.keys
            .iter()
            .map(|key| {
                TemplateKey::new(key).ok_or_else(|| TplError::InvalidTemplateKey {
                    key: key.clone(),
                })
            })
            .collect()
    }

    fn template_data(&self) -> Result<TemplateData, TplError> {
        if let Some(html) = &self.html {
            return Ok(TemplateData::Html(html.clone()));
        }
        match &self.data {
            Some(json) => serde_json::from_str(json).map(TemplateData::json).map_err(|e| {
                TplError::InvalidRenderData {
                    reason: e.to_string(),
                }
            }),
            None => Ok(TemplateData::None),
        }
    }

    async fn document(&self) -> Result<Document> {
        if let Some(page) = &self.page {
            let html = tokio::fs::read_to_string(page)
                .await
                .with_context(|| format!("Failed to read page {}", page.display()))?;
            return Ok(Document::from_html(&html));
        }

        let document = Document::new();
        for key in &self.keys {
            let key = key.trim();
            let element = match (key.strip_prefix('#'), key.strip_prefix('.')) {
                (Some(id), _) => Element::new(Some(id), &[]),
                (_, Some(class)) => Element::new(None, &[class]),
                _ => continue,
            };
            document.push(element);
        }
        Ok(document)
    }

    fn report(&self, document: &Document, outcome: &TplOutcome) {
        for key in &outcome.rendered {
            println!("{} {}", "✓".green(), key.as_str().bold());
            if let Some(html) = document.inner_html(key.as_str()) {
                println!("{html}");
            }
        }
        for key in &outcome.failed {
            println!("{} {} (template error)", "✗".red(), key.as_str().bold());
        }
        for key in &outcome.unresolved {
            println!("{} {} (not available)", "✗".red(), key.as_str().bold());
        }
        if let Some(e) = &outcome.fetch_error {
            eprintln!("{} {}", "warning:".yellow(), e);
        }

        let skipped = self.keys.len().saturating_sub(
            outcome.rendered.len() + outcome.failed.len() + outcome.unresolved.len(),
        );
        if skipped > 0 {
            println!("{} key(s) resolved but not rendered (no target or no data)", skipped.to_string().dimmed());
        }
    }
}
