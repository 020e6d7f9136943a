pub mod history;
pub mod init;
pub mod interview;
pub mod records;
pub mod user;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use mockview_providers::config::{load_config_from, MockviewConfig};
use mockview_store::{SqliteStore, User};

/// Load the config and open the database it names.
pub(crate) fn open_store(config_path: Option<&Path>) -> Result<(MockviewConfig, SqliteStore)> {
    let config = load_config_from(config_path)?;
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    Ok((config, store))
}

/// Find a user by name, including deactivated ones.
pub(crate) async fn require_user(store: &SqliteStore, username: &str) -> Result<User> {
    store
        .find_user(username)
        .await?
        .with_context(|| format!("no user named '{username}'"))
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let cut: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
