//! common-tpl - checksum-validated template fetching and caching
//!
//! Command-line entry point. See [`common_tpl::cli`] for the commands.

use anyhow::Result;
use clap::Parser;
use common_tpl::cli;
use common_tpl::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
