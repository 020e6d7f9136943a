//! The `mockview records` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_store, require_user, truncate};

pub async fn execute(
    username: String,
    filter: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, store) = open_store(config_path.as_deref())?;
    let user = require_user(&store, &username).await?;
    let records = store.list_records(user.id, filter.as_deref()).await?;

    if records.is_empty() {
        match &filter {
            Some(keyword) => println!("No records for '{username}' mention '{keyword}'."),
            None => println!("No records for '{username}' yet."),
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Session", "Question", "Answer", "Feedback", "Date"]);
    for record in &records {
        table.add_row(vec![
            Cell::new(record.session_id),
            Cell::new(truncate(&record.question, 50)),
            Cell::new(truncate(&record.answer, 40)),
            Cell::new(truncate(&record.feedback, 60)),
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    println!("{} record(s).", records.len());
    Ok(())
}
