//! Question/answer/feedback records kept for later review.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use mockview_core::model::{Exchange, SessionId, UserId};

use super::{format_timestamp, parse_timestamp};
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewRecord {
    pub id: i64,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub question: String,
    pub context: String,
    pub answer: String,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

pub fn insert_record(
    conn: &Connection,
    user_id: UserId,
    session_id: SessionId,
    exchange: &Exchange,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO interview_records
            (user_id, session_id, question, context, answer, feedback, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            session_id,
            exchange.question,
            exchange.context,
            exchange.answer,
            exchange.feedback,
            format_timestamp(&Utc::now()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A user's records, oldest first. `keyword` keeps only records whose
/// question contains it, ignoring ASCII case.
pub fn list_records(
    conn: &Connection,
    user_id: UserId,
    keyword: Option<&str>,
) -> StoreResult<Vec<InterviewRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, question, context, answer, feedback, created_at
         FROM interview_records
         WHERE user_id = ?1 AND (?2 IS NULL OR instr(lower(question), lower(?2)) > 0)
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![user_id, keyword], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, session_id, question, context, answer, feedback, created_at) = row?;
        records.push(InterviewRecord {
            id,
            user_id,
            session_id,
            question,
            context,
            answer,
            feedback,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(records)
}
