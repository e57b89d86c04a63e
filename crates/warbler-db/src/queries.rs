use crate::Database;
use crate::models::{MessageRow, UserRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password, u.image_url, u.created_at";

const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.user_id, u.username, m.created_at
     FROM messages m
     LEFT JOIN users u ON m.user_id = u.id";

pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub image_url: Option<&'a str>,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.image_url,
                    now(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.email = ?1", email))
    }

    /// Users whose username contains `needle`, or every user when `None`.
    pub fn search_users(&self, needle: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", escape_like(needle.unwrap_or_default()));
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 WHERE u.username LIKE ?1 ESCAPE '\\'
                 ORDER BY u.username"
            ))?;
            let rows = stmt
                .query_map([pattern], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, user_id: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, text, user_id, now()],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
                [id],
                message_from_row,
            )
            .optional()
        })
    }

    /// First message with exactly this text written by `user_id`.
    pub fn find_message(&self, text: &str, user_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{MESSAGE_SELECT} WHERE m.text = ?1 AND m.user_id = ?2 LIMIT 1"),
                [text, user_id],
                message_from_row,
            )
            .optional()
        })
    }

    pub fn count_messages_with_text(&self, text: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE text = ?1",
                [text],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn get_messages_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "m.user_id = ?1",
                rusqlite::params![user_id, limit],
            )
        })
    }

    /// Messages by `user_id` and everyone they follow, newest first.
    pub fn get_feed(&self, user_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "m.user_id = ?1
                 OR m.user_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)",
                rusqlite::params![user_id, limit],
            )
        })
    }

    /// Returns false when no such message existed.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Follows --

    /// Add the edge `follower -> followee`. Returns false if it already existed.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO follows (follower_id, followee_id) VALUES (?1, ?2)
                 ON CONFLICT (follower_id, followee_id) DO NOTHING",
                [follower_id, followee_id],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Remove the edge `follower -> followee`. Returns false if it was absent.
    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                [follower_id, followee_id],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    [follower_id, followee_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Users following `user_id`.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.follower_id = u.id WHERE f.followee_id = ?1",
                user_id,
            )
        })
    }

    /// Users that `user_id` follows.
    pub fn get_following(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.followee_id = u.id WHERE f.follower_id = ?1",
                user_id,
            )
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(4)?,
    })
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u WHERE {predicate}"))?;
    stmt.query_row([value], user_from_row).optional()
}

fn query_users(conn: &Connection, join: &str, user_id: &str) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users u {join} ORDER BY u.username"
    ))?;
    let rows = stmt
        .query_map([user_id], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_messages(
    conn: &Connection,
    predicate: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<MessageRow>> {
    // JOIN users to fetch the author's username in a single query
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT}
         WHERE {predicate}
         ORDER BY m.created_at DESC, m.rowid DESC
         LIMIT ?2"
    ))?;

    let rows = stmt
        .query_map(params, message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let email = format!("{username}@example.com");
        db.create_user(&NewUser {
            id: &id,
            username,
            email: &email,
            password_hash: "hash",
            image_url: None,
        })
        .unwrap();
        id
    }

    #[test]
    fn users_are_distinct_and_retrievable() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        let b = seed_user(&db, "user2");
        assert_ne!(a, b);

        assert_eq!(db.get_user_by_id(&a).unwrap().unwrap().username, "user1");
        assert_eq!(db.get_user_by_username("user2").unwrap().unwrap().id, b);
        assert_eq!(db.get_user_by_email("user1@example.com").unwrap().unwrap().id, a);
        assert!(db.get_user_by_id(&Uuid::new_v4().to_string()).unwrap().is_none());
    }

    #[test]
    fn user_row_columns_map_into_model() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4().to_string();
        db.create_user(&NewUser {
            id: &id,
            username: "pictured",
            email: "pictured@example.com",
            password_hash: "hash",
            image_url: Some("https://example.com/me.png"),
        })
        .unwrap();

        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.password, "hash");
        let user = warbler_types::models::User::try_from(row).unwrap();
        assert_eq!(user.id.to_string(), id);
        assert_eq!(user.email, "pictured@example.com");
        assert_eq!(user.image_url.as_deref(), Some("https://example.com/me.png"));
        assert!(user.created_at <= chrono::Utc::now());
    }

    #[test]
    fn duplicate_username_violates_constraint() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "user1");
        let id = Uuid::new_v4().to_string();
        let res = db.create_user(&NewUser {
            id: &id,
            username: "user1",
            email: "other@example.com",
            password_hash: "hash",
            image_url: None,
        });
        let err = res.unwrap_err();
        assert!(crate::is_constraint_violation(&err));
    }

    #[test]
    fn other_errors_are_not_constraint_violations() {
        let err = anyhow::anyhow!("DB lock poisoned");
        assert!(!crate::is_constraint_violation(&err));
    }

    #[test]
    fn search_matches_substring_literally() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "alice");
        seed_user(&db, "alfred");
        seed_user(&db, "bob");

        let names: Vec<_> = db
            .search_users(Some("al"))
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alfred", "alice"]);
        assert!(db.search_users(Some("%")).unwrap().is_empty());
        assert_eq!(db.search_users(None).unwrap().len(), 3);
    }

    #[test]
    fn follow_edges_are_directed_and_unique() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        let b = seed_user(&db, "user2");

        assert!(db.follow(&a, &b).unwrap());
        assert!(!db.follow(&a, &b).unwrap());
        assert!(db.is_following(&a, &b).unwrap());
        assert!(!db.is_following(&b, &a).unwrap());

        let followers = db.get_followers(&b).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, a);
        assert!(db.get_followers(&a).unwrap().is_empty());
        assert_eq!(db.get_following(&a).unwrap()[0].id, b);

        assert!(db.unfollow(&a, &b).unwrap());
        assert!(!db.unfollow(&a, &b).unwrap());
        assert!(db.get_followers(&b).unwrap().is_empty());
    }

    #[test]
    fn self_follow_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        assert!(db.follow(&a, &a).is_err());
    }

    #[test]
    fn feed_includes_own_and_followed_messages() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        let b = seed_user(&db, "user2");
        let c = seed_user(&db, "user3");
        db.follow(&a, &b).unwrap();

        db.insert_message(&Uuid::new_v4().to_string(), &a, "mine").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &b, "followed").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &c, "stranger").unwrap();

        let texts: Vec<_> = db.get_feed(&a, 100).unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["followed", "mine"]);
        assert_eq!(db.get_messages_for_user(&c, 100).unwrap().len(), 1);
    }

    #[test]
    fn messages_are_queryable_by_text_and_author() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        let b = seed_user(&db, "user2");
        let id = Uuid::new_v4().to_string();
        db.insert_message(&id, &a, "Test message").unwrap();

        let found = db.find_message("Test message", &a).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.author_username, "user1");
        assert!(db.find_message("Test message", &b).unwrap().is_none());
        assert_eq!(db.count_messages_with_text("Test message").unwrap(), 1);

        assert!(db.delete_message(&id).unwrap());
        assert!(!db.delete_message(&id).unwrap());
        assert!(db.get_message(&id).unwrap().is_none());
    }

    #[test]
    fn reset_clears_all_rows() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "user1");
        db.insert_message(&Uuid::new_v4().to_string(), &a, "hello").unwrap();

        db.reset().unwrap();
        assert!(db.search_users(None).unwrap().is_empty());
        assert_eq!(db.count_messages_with_text("hello").unwrap(), 0);
    }
}
