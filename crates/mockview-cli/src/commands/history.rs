//! The `mockview history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mockview_core::export::TranscriptExport;
use mockview_core::model::Role;
use mockview_core::traits::Persistence;

use super::{open_store, require_user};

pub async fn execute(
    username: String,
    session: Option<i64>,
    export: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, store) = open_store(config_path.as_deref())?;
    let user = require_user(&store, &username).await?;

    let Some(session_id) = session else {
        let sessions = store.list_sessions(user.id).await?;
        if sessions.is_empty() {
            println!("No sessions for '{username}' yet.");
            return Ok(());
        }
        let mut table = Table::new();
        table.set_header(vec!["Session", "Started", "Messages"]);
        for s in &sessions {
            table.add_row(vec![
                Cell::new(s.id),
                Cell::new(s.created_at.format("%Y-%m-%d %H:%M:%S")),
                Cell::new(s.message_count),
            ]);
        }
        println!("{table}");
        println!("{} session(s).", sessions.len());
        return Ok(());
    };

    anyhow::ensure!(
        store.session_owner(session_id).await? == Some(user.id),
        "session {session_id} does not belong to '{username}'"
    );
    let turns = store.load_history(session_id).await?;

    for turn in &turns {
        let who = match turn.role {
            Role::Assistant => "Interviewer",
            Role::User => "You",
        };
        println!("[{}] {who}:", turn.timestamp.format("%H:%M:%S"));
        println!("{}\n", turn.content);
    }

    if let Some(path) = export {
        let transcript = TranscriptExport::new(&user.username, session_id, turns);
        transcript.save_json(&path)?;
        println!(
            "Transcript written to {} ({} messages)",
            path.display(),
            transcript.turns.len()
        );
    }

    Ok(())
}
