pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Connection string selecting a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// True when `err` came from SQLite rejecting a write on a UNIQUE, CHECK,
/// or foreign key constraint.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(rusqlite::Error::sqlite_error_code)
        == Some(rusqlite::ErrorCode::ConstraintViolation)
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self::init(Connection::open_in_memory()?)?;
        info!("In-memory database opened");
        Ok(db)
    }

    /// Open the database named by a `DATABASE_URL`-style string: either
    /// [`IN_MEMORY`], a `sqlite://` URL, or a plain file path.
    pub fn connect(url: &str) -> Result<Self> {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if path == IN_MEMORY {
            Self::open_in_memory()
        } else {
            Self::open(Path::new(path))
        }
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::create_all(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Drop every table and recreate the schema, leaving an empty database.
    pub fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            migrations::drop_all(conn)?;
            migrations::create_all(conn)
        })
    }

    pub fn drop_all(&self) -> Result<()> {
        self.with_conn(migrations::drop_all)
    }
}
