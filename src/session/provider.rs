use super::deadline::Deadline;
use super::result_sets::{ResultSetError, ResultSets};
use super::transaction::Tx;
use crate::sqlite_persistence::VersionedSchema;
use anyhow::{bail, Context, Result};
use rusqlite::{Batch, Connection, OpenFlags, OptionalExtension, Params, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite takes the busy timeout as an `int` of milliseconds.
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub db_path: PathBuf,
    /// Upper bound on how long a statement waits for another connection's lock.
    pub busy_timeout: Duration,
}

impl SessionConfig {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: usize,
    pub last_insert_id: i64,
}

/// Hands out sessions on a single SQLite database file.
///
/// Built once at startup and passed to whoever needs a session; there is no
/// process-wide connection.
#[derive(Debug, Clone)]
pub struct SessionProvider {
    config: SessionConfig,
}

impl SessionProvider {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates `schema` in a database that has no tables yet, otherwise
    /// checks that the existing layout matches it.
    pub fn initialize(&self, schema: &VersionedSchema) -> Result<()> {
        let conn = self.connect()?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )?;

        if table_count == 0 {
            info!(
                "Creating catalog db schema at version {} in {:?}",
                schema.version, self.config.db_path
            );
            let tx = conn.unchecked_transaction()?;
            schema.create(&tx)?;
            tx.commit()?;
        } else {
            schema.validate(&conn).with_context(|| {
                format!(
                    "Database {:?} does not match catalog schema version {}",
                    self.config.db_path, schema.version
                )
            })?;
            debug!("Validated catalog db schema version {}", schema.version);
        }
        Ok(())
    }

    /// Opens a new session with its own connection.
    pub fn open(&self) -> Result<Session> {
        let conn = self.connect()?;
        Ok(Session {
            conn: Mutex::new(conn),
            busy_timeout: self.config.busy_timeout,
        })
    }

    fn connect(&self) -> Result<Connection> {
        if self.config.busy_timeout > MAX_BUSY_TIMEOUT {
            bail!(
                "Busy timeout {:?} exceeds the maximum of {:?}",
                self.config.busy_timeout,
                MAX_BUSY_TIMEOUT
            );
        }
        let conn = Connection::open_with_flags(
            &self.config.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", self.config.db_path))?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get::<_, String>(0))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(self.config.busy_timeout)?;
        Ok(conn)
    }
}

/// A live connection to the catalog database.
///
/// Plain reads and writes run in autocommit mode. [`Session::begin_tx`] locks
/// the connection for the lifetime of the returned [`Tx`], so a session never
/// interleaves statements of a transaction with anything else.
pub struct Session {
    conn: Mutex<Connection>,
    busy_timeout: Duration,
}

impl Session {
    fn lock(&self) -> MutexGuard<'_, Connection> {
        // SQLite tracks the transaction state itself; poisoning carries no information.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn query<T, P, F>(&self, sql: &str, params: P, f: F) -> rusqlite::Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, f)?.collect();
        rows
    }

    pub fn query_row_opt<T, P, F>(&self, sql: &str, params: P, f: F) -> rusqlite::Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.query_row(params, f).optional()
    }

    pub fn exec<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<ExecOutcome> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows_affected = stmt.execute(params)?;
        Ok(ExecOutcome {
            rows_affected,
            last_insert_id: conn.last_insert_rowid(),
        })
    }

    /// Starts an immediate (write-locking) transaction bounded by `deadline`.
    pub fn begin_tx(&self, deadline: &Deadline) -> rusqlite::Result<Tx<'_>> {
        Tx::begin(self.lock(), deadline, self.busy_timeout)
    }

    /// Runs a multi-statement query and hands its result sets to `f`.
    pub fn query_multi<T, F>(&self, sql: &str, f: F) -> Result<T, ResultSetError>
    where
        F: FnOnce(&mut ResultSets<'_, '_>) -> Result<T, ResultSetError>,
    {
        let conn = self.lock();
        let mut sets = ResultSets::new(Batch::new(&conn, sql));
        f(&mut sets)
    }

    /// Direct access to the underlying connection, for statements the typed
    /// helpers do not cover.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.lock();
        f(&conn)
    }
}
