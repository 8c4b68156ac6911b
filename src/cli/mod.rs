//! Command-line interface for common-tpl.
//!
//! # Commands
//!
//! - `render` - fetch, cache and render templates into a page skeleton
//! - `csp` - encode CSP data into hidden markup, or decode it from a page
//! - `store` - inspect the durable template store
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - configuration file (default `~/.common-tpl/config.toml`)
//!
//! `RUST_LOG` overrides both logging flags.

mod csp;
mod render;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::TplConfig;

pub use csp::CspCommand;
pub use render::RenderCommand;
pub use store::StoreCommand;

/// Main CLI structure for common-tpl.
#[derive(Parser, Debug)]
#[command(
    name = "common-tpl",
    about = "Checksum-validated template fetching and caching",
    version,
    long_about = "common-tpl fetches HTML micro-templates from a server endpoint, caches them by checksum and renders them into pages."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "COMMON_TPL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render templates into a page
    Render(RenderCommand),

    /// Encode or decode CSP data
    #[command(subcommand)]
    Csp(CspCommand),

    /// Inspect the template store
    #[command(subcommand)]
    Store(StoreCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command
    /// fails.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = TplConfig::load_with_optional(self.config.clone()).await?;

        match self.command {
            Commands::Render(cmd) => cmd.execute(config).await,
            Commands::Csp(cmd) => cmd.execute(&config).await,
            Commands::Store(cmd) => cmd.execute(config),
        }
    }

    /// Log filter implied by the flags.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "common_tpl=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_filter())
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "common-tpl",
            "-v",
            "render",
            "--data",
            "{\"title\":\"Sale\"}",
            "#promo-banner",
            ".sidebar",
        ])
        .unwrap();

        assert_eq!(cli.log_filter(), "common_tpl=debug");
        match cli.command {
            Commands::Render(cmd) => assert_eq!(cmd.keys, vec!["#promo-banner", ".sidebar"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_conflicts() {
        assert!(Cli::try_parse_from(["common-tpl", "-v", "-q", "store", "list"]).is_err());
        assert!(
            Cli::try_parse_from(["common-tpl", "render", "--data", "{}", "--html", "<p/>", "#a"]).is_err()
        );
        assert!(Cli::try_parse_from(["common-tpl", "render"]).is_err());
    }

    #[test]
    fn test_parse_csp_and_store() {
        let cli = Cli::try_parse_from(["common-tpl", "-q", "csp", "encode", "{}"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
        assert!(matches!(cli.command, Commands::Csp(CspCommand::Encode { .. })));

        let cli = Cli::try_parse_from(["common-tpl", "--config", "/tmp/c.toml", "store", "list"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Store(StoreCommand::List)));
    }
}
