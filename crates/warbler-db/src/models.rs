//! Database row types. These map directly to SQLite rows and stay distinct
//! from the warbler-types models so the password hash never leaves this crate
//! by accident.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use warbler_types::models::{Message, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub author_username: String,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_id(&row.id)?,
            created_at: parse_timestamp(&row.created_at)?,
            username: row.username,
            email: row.email,
            image_url: row.image_url,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: parse_id(&row.id)?,
            user_id: parse_id(&row.user_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            text: row.text,
            author_username: row.author_username,
        })
    }
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse::<Uuid>().with_context(|| format!("corrupt id '{}'", raw))
}

/// Rows written by this crate carry RFC 3339 timestamps; column defaults
/// produce SQLite's "YYYY-MM-DD HH:MM:SS" without timezone, read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_formats() {
        let sqlite = parse_timestamp("2024-03-01 12:30:00").unwrap();
        let rfc = parse_timestamp("2024-03-01T12:30:00.000000Z").unwrap();
        assert_eq!(sqlite, rfc);
    }

    #[test]
    fn rejects_corrupt_rows() {
        let row = MessageRow {
            id: "not-a-uuid".into(),
            text: "hi".into(),
            user_id: Uuid::new_v4().to_string(),
            author_username: "user1".into(),
            created_at: "2024-03-01 12:30:00".into(),
        };
        assert!(Message::try_from(row).is_err());
    }
}
