//! Chat history repository.

use rusqlite::{params, Row};

use super::{format_ts, parse_ts, Database, DatabaseError};
use crate::content::{ChatMessage, ChatRole};

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn parse_role(value: &str) -> Result<ChatRole, DatabaseError> {
    match value {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        other => Err(DatabaseError::Corrupt {
            column: "chat_messages.role",
            value: other.to_string(),
        }),
    }
}

fn from_row(row: &Row<'_>) -> Result<(String, String, String, String), rusqlite::Error> {
    Ok((
        row.get("id")?,
        row.get("role")?,
        row.get("content")?,
        row.get("created_at")?,
    ))
}

/// Appends a message to a content item's history.
pub fn insert(db: &Database, content_id: &str, message: &ChatMessage) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO chat_messages (id, content_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                content_id,
                role_str(message.role),
                message.content,
                format_ts(message.created_at),
            ],
        )?;
        Ok(())
    })
}

/// Returns the history oldest first. Stored messages are never pending.
pub fn list_for_content(db: &Database, content_id: &str) -> Result<Vec<ChatMessage>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, role, content, created_at FROM chat_messages
             WHERE content_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![content_id], from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, role, content, created_at)| {
                Ok(ChatMessage {
                    id,
                    role: parse_role(&role)?,
                    content,
                    created_at: parse_ts("chat_messages.created_at", &created_at)?,
                    pending: false,
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Content, ContentStatus, ContentType, Metadata};
    use crate::db::content_repo;
    use chrono::{Duration, Utc};

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        content_repo::insert(
            &db,
            &Content {
                id: "c1".into(),
                workspace_id: "ws".into(),
                content_type: ContentType::Text,
                status: ContentStatus::Ready,
                title: "Notes".into(),
                raw_url: None,
                extracted_text: None,
                metadata: Metadata::new(),
                file_size: None,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        db
    }

    #[test]
    fn test_history_is_ordered_oldest_first() {
        let db = seeded();
        let t0 = Utc::now();
        for (i, (role, text)) in [(ChatRole::User, "q"), (ChatRole::Assistant, "a")]
            .into_iter()
            .enumerate()
        {
            let msg = ChatMessage {
                id: format!("m{}", i),
                role,
                content: text.to_string(),
                created_at: t0 + Duration::seconds(i as i64),
                pending: true,
            };
            insert(&db, "c1", &msg).unwrap();
        }

        let history = list_for_content(&db, "c1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].content, "a");
        assert!(history.iter().all(|m| !m.pending));
    }

    #[test]
    fn test_empty_history() {
        let db = seeded();
        assert!(list_for_content(&db, "c1").unwrap().is_empty());
    }
}
