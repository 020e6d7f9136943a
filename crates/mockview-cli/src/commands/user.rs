//! The `mockview user` commands.

use std::path::PathBuf;

use anyhow::Result;

use super::open_store;

pub async fn add(username: String, config_path: Option<PathBuf>) -> Result<()> {
    let username = username.trim();
    anyhow::ensure!(!username.is_empty(), "username must not be empty");

    let (_, store) = open_store(config_path.as_deref())?;
    let user = store.create_user(username).await?;
    println!("Created user '{}' (id {})", user.username, user.id);
    Ok(())
}

pub async fn deactivate(username: String, config_path: Option<PathBuf>) -> Result<()> {
    let (_, store) = open_store(config_path.as_deref())?;
    if store.deactivate_user(&username).await? {
        println!("Deactivated user '{username}'. Their history is kept.");
        Ok(())
    } else {
        anyhow::bail!("no active user named '{username}'")
    }
}
