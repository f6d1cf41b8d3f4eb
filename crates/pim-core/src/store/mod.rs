//! SQLite persistence for projects, blocks, and templates.
//!
//! [`Db`] owns the connection and schema; the per-entity stores borrow it and
//! enforce identity, ordering, and validation rules on top of plain SQL.

#![allow(clippy::missing_errors_doc)]

mod blocks;
mod projects;
mod templates;

pub use blocks::BlockStore;
pub use projects::ProjectStore;
pub use templates::TemplateStore;

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::core::CoreResult;
use crate::model::Element;

/// Read access shared by the entity stores.
pub trait Store<T> {
    /// Identity type of the stored records.
    type Id: Copy;

    /// All records, in store order.
    fn list(&self) -> CoreResult<Vec<T>>;

    /// One record by identity, or the store's not-found error.
    fn get(&self, id: Self::Id) -> CoreResult<T>;
}

/// Handle to the pim database.
///
/// The connection sits behind a mutex so one `Db` can be shared between
/// request threads; every store call holds the lock for its whole duration.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::configure(conn)
    }

    /// Create an in-memory database (tests and throwaway sessions).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        // Cascading block deletes depend on this.
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema.
    ///
    /// Creates all tables and indexes if they don't exist.
    pub fn init_schema(&self) -> Result<()> {
        self.lock()?
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Lock the connection for the duration of one store operation.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Project store over this database.
    #[must_use]
    pub const fn projects(&self) -> ProjectStore<'_> {
        ProjectStore::new(self)
    }

    /// Block store over this database.
    #[must_use]
    pub const fn blocks(&self) -> BlockStore<'_> {
        BlockStore::new(self)
    }

    /// Template store over this database.
    #[must_use]
    pub const fn templates(&self) -> TemplateStore<'_> {
        TemplateStore::new(self)
    }
}

// ============================================================================
// Row helpers
// ============================================================================

/// Read a text column and parse it through `FromStr`.
fn parsed_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
    })
}

/// Load the ordered elements for one owner row.
///
/// `sql` must select `key`, `value`, `value_type` for a single `?` owner id,
/// ordered by position.
fn read_elements(conn: &Connection, sql: &str, owner_id: i64) -> Result<Vec<Element>> {
    let mut stmt = conn.prepare_cached(sql).context("Failed to prepare element query")?;
    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok(Element {
                key: row.get("key")?,
                value: row.get("value")?,
                value_type: parsed_column(row, "value_type")?,
            })
        })
        .context("Failed to query elements")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read elements")
}

/// Insert `elements` for one owner, numbering positions from zero.
///
/// `sql` must take `(owner_id, position, key, value, value_type)`.
fn write_elements(conn: &Connection, sql: &str, owner_id: i64, elements: &[Element]) -> Result<()> {
    let mut stmt = conn.prepare_cached(sql).context("Failed to prepare element insert")?;
    for (position, element) in elements.iter().enumerate() {
        let position = i64::try_from(position).context("Element position out of range")?;
        stmt.execute(params![
            owner_id,
            position,
            element.key,
            element.value,
            element.value_type.as_str(),
        ])
        .context("Failed to insert element")?;
    }
    Ok(())
}

// ============================================================================
// Schema SQL
// ============================================================================

const SCHEMA_SQL: &str = r"
-- PROJECTS
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    meeting_name TEXT NOT NULL CHECK (length(trim(meeting_name)) > 0),
    client_name TEXT NOT NULL DEFAULT '',
    job_number TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    resources TEXT NOT NULL DEFAULT '',
    start_date TEXT,
    end_date TEXT,
    status TEXT CHECK (status IS NULL OR status IN ('pending', 'active', 'archived')),
    meeting_type TEXT NOT NULL DEFAULT '',
    attendees_expected INTEGER CHECK (attendees_expected IS NULL OR attendees_expected >= 0),
    attendees_actual INTEGER CHECK (attendees_actual IS NULL OR attendees_actual >= 0),
    est_budget TEXT NOT NULL DEFAULT '',
    cost_per_attendee TEXT NOT NULL DEFAULT '',
    precon_date TEXT,
    kickoff_date TEXT,
    custom_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);

-- TEMPLATES
CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS template_elements (
    template_id INTEGER NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    key TEXT NOT NULL,
    default_value TEXT NOT NULL DEFAULT '',
    value_type TEXT NOT NULL CHECK (value_type IN ('text', 'number', 'date', 'url')),
    PRIMARY KEY (template_id, position)
);

-- BLOCKS
CREATE TABLE IF NOT EXISTS blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    block_type TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blocks_project_id ON blocks(project_id);

CREATE TABLE IF NOT EXISTS block_elements (
    block_id INTEGER NOT NULL REFERENCES blocks(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL DEFAULT '',
    value_type TEXT NOT NULL CHECK (value_type IN ('text', 'number', 'date', 'url')),
    PRIMARY KEY (block_id, position)
);
";
