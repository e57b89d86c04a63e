use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn create_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            image_url   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            text        TEXT NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, created_at);

        CREATE TABLE IF NOT EXISTS follows (
            follower_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followee_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (follower_id, followee_id),
            CHECK (follower_id <> followee_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followee
            ON follows(followee_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

/// Remove all tables. Dependent tables go first so foreign keys never dangle.
pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS follows;
        DROP TABLE IF EXISTS messages;
        DROP TABLE IF EXISTS users;
        ",
    )?;

    info!("Database schema dropped");
    Ok(())
}
