//! Configuration management for common-tpl
//!
//! A single optional TOML file configures where templates come from, how they
//! are requested and where they are persisted between runs. Library users can
//! also build a [`TplConfig`] in code; every field has a default.
//!
//! # Examples
//!
//! ```rust,no_run
//! use common_tpl::config::TplConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TplConfig::load().await?;
//! println!("Store: {}", config.store_path_or_default()?.display());
//! # Ok(())
//! # }
//! ```

mod global;

pub use global::TplConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_default_locations_follow_home() -> anyhow::Result<()> {
        if cfg!(target_os = "windows") {
            return Ok(());
        }

        let temp = TempDir::new()?;
        let previous = std::env::var_os("HOME");
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var("HOME", temp.path()) };

        let config_path = TplConfig::default_path();
        let store_path = TplConfig::default().store_path_or_default();

        match previous {
            // SAFETY: as above.
            Some(home) => unsafe { std::env::set_var("HOME", home) },
            None => unsafe { std::env::remove_var("HOME") },
        }

        assert_eq!(config_path?, temp.path().join(".common-tpl").join("config.toml"));
        assert_eq!(store_path?, temp.path().join(".common-tpl").join("store.json"));
        Ok(())
    }
}
