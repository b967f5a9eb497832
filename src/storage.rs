//! Storage layer for BEO: a single SQLite database.
//!
//! All durable state lives in one database file. Components borrow the
//! connection (or a transaction over it) rather than owning storage of
//! their own, so the loan flow can span the inventory and the ledger in
//! one atomic write.

use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, Transaction};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage directory name.
const BEO_DIR: &str = ".beo";

/// SQLite database file.
const DB_FILE: &str = "beo.db";

/// Storage handle owning the database connection.
pub struct Storage {
    root: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let beo_dir = root.join(BEO_DIR);
        fs::create_dir_all(&beo_dir).context("Failed to create .beo directory")?;

        let db_path = beo_dir.join(DB_FILE);
        let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self {
            root: root.to_path_buf(),
            conn,
        };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self> {
        let beo_dir = root.join(BEO_DIR);
        if !beo_dir.exists() {
            eyre::bail!("No .beo directory found. Run 'beo init' first.");
        }

        let db_path = beo_dir.join(DB_FILE);
        let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self {
            root: root.to_path_buf(),
            conn,
        };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize the SQLite schema.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS deposits (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    address TEXT,
                    manager TEXT,
                    phone TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS categories (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT
                );

                CREATE TABLE IF NOT EXISTS beneficiaries (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL CHECK (kind IN ('member', 'relative')),
                    name TEXT NOT NULL,
                    kinship TEXT,
                    responsible_member TEXT,
                    phone TEXT,
                    address TEXT,
                    notes TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS items (
                    id TEXT PRIMARY KEY,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    category_id TEXT NOT NULL REFERENCES categories(id),
                    deposit_id TEXT NOT NULL REFERENCES deposits(id),
                    state TEXT NOT NULL DEFAULT 'available'
                        CHECK (state IN ('available', 'loaned', 'maintenance', 'decommissioned')),
                    brand TEXT,
                    model TEXT,
                    serial_number TEXT,
                    description TEXT,
                    notes TEXT,
                    entered_on TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_items_state ON items(state);

                CREATE TABLE IF NOT EXISTS loans (
                    id TEXT PRIMARY KEY,
                    item_id TEXT NOT NULL REFERENCES items(id),
                    beneficiary_id TEXT NOT NULL REFERENCES beneficiaries(id),
                    requested_by TEXT NOT NULL,
                    authorized_by TEXT,
                    delivered_by TEXT,
                    loan_date TEXT NOT NULL,
                    duration_days INTEGER NOT NULL CHECK (duration_days > 0),
                    due_date TEXT NOT NULL,
                    returned_on TEXT,
                    status TEXT NOT NULL DEFAULT 'active'
                        CHECK (status IN ('active', 'returned', 'lost')),
                    loan_notes TEXT,
                    return_notes TEXT,
                    received_by TEXT,
                    return_deposit_id TEXT REFERENCES deposits(id),
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_loans_item ON loans(item_id);
                CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status);

                CREATE TABLE IF NOT EXISTS state_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    item_id TEXT NOT NULL REFERENCES items(id),
                    prior_state TEXT,
                    new_state TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    notes TEXT,
                    changed_by TEXT NOT NULL,
                    changed_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_history_item ON state_history(item_id);
            "#,
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// The directory this store lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Borrow the connection for reads.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction spanning any number of component writes.
    ///
    /// Dropping the transaction without committing rolls everything
    /// back, which is what gives the loan flow its all-or-nothing
    /// semantics.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        self.conn.transaction().context("Failed to start transaction")
    }
}

/// Parse a stored RFC3339 timestamp, tolerating malformed rows.
pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored calendar date, tolerating malformed rows.
pub(crate) fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}
