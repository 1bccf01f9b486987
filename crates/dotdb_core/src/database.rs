//! Database facade.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::persistence::{storage_error, BackupManager, Persistence};
use crate::query::{
    aggregate, distinct, group_by, join, project, union, union_all, Aggregate, Filter, GroupBy,
    JoinSide, JoinSpec, OrderBy, Query,
};
use crate::stats::{DatabaseStats, StatsSnapshot};
use crate::store::{Arithmetic, PathStore};
use crate::table::{AlterTable, TableInfo, TableMeta, TableSchema};
use crate::value::Row;
use crate::value_codec::ValueCodec;
use dotdb_codec::{Format, META_KEY};
use dotdb_storage::{DocumentBackend, FileBackend, InMemoryBackend};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// The main database handle.
///
/// A `Database` holds the whole dataset in memory as a path-addressed
/// tree and persists it to one file. It provides:
/// - Path-based key/value access (`get`, `set`, `push`, `increment`, ...)
/// - Tables with schemas, validation, and relations
/// - An in-memory query engine (filters, ordering, grouping, joins)
/// - Timestamped backups with retention, and restore
///
/// # Opening a Database
///
/// ```rust,ignore
/// use dotdb_core::{Config, Database};
/// use serde_json::json;
///
/// let db = Database::open("data/app.json", Config::new("my secret"))?;
/// db.set("settings.theme", json!("dark"))?;
/// assert_eq!(db.get("settings.theme")?, Some(json!("dark")));
/// db.close()?;
/// ```
///
/// # Concurrency
///
/// The tree sits behind a read-write lock. Mutations take the write lock,
/// then downgrade it to a read lock for the auto-save, so readers never
/// observe a half-applied change and saves never race a mutation.
pub struct Database {
    inner: Arc<Inner>,
    /// Whether the database is open.
    is_open: RwLock<bool>,
    /// Background backup task, if configured.
    auto_backup: Mutex<Option<AutoBackup>>,
}

/// State shared with the background backup task.
struct Inner {
    config: Config,
    store: RwLock<PathStore>,
    persistence: Persistence,
    backups: Option<BackupManager>,
    stats: DatabaseStats,
}

impl Inner {
    fn save(&self, store: &PathStore) -> CoreResult<()> {
        self.persistence.save(store.tree())?;
        self.stats.record_save();
        Ok(())
    }

    fn backup(&self) -> CoreResult<PathBuf> {
        let manager = self.backup_manager()?;
        let snapshot = self.store.read().plain_snapshot()?;
        let path = manager.create(&snapshot)?;
        self.stats.record_backup();
        Ok(path)
    }

    fn backup_manager(&self) -> CoreResult<&BackupManager> {
        self.backups
            .as_ref()
            .ok_or_else(|| CoreError::invalid_operation("backups need a file-backed database"))
    }
}

struct AutoBackup {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl AutoBackup {
    fn spawn(inner: Arc<Inner>, interval: Duration) -> CoreResult<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("dotdb-auto-backup".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = inner.backup() {
                            warn!(error = %e, "auto-backup failed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        info!(interval_secs = interval.as_secs_f64(), "auto-backup started");
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            warn!("auto-backup task panicked");
        }
    }
}

/// Summary returned by [`Database::info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// File name of the database, without directories.
    pub file: Option<String>,
    /// On-disk format.
    pub format: Format,
    /// Number of top-level keys, tables included.
    pub keys: usize,
    /// Tables and their row counts.
    pub tables: Vec<(String, usize)>,
    /// Number of backups on disk.
    pub backups: usize,
    /// Operation counters.
    pub stats: StatsSnapshot,
}

impl Database {
    /// Opens a database file, creating it on first save.
    ///
    /// The format is picked from the extension: `.json`, `.yaml`/`.yml`,
    /// or `.sql` (export-only: saving works, loading an existing file fails).
    /// Backups go to a `backups` directory next to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty, the extension is unknown,
    /// the file is locked by another handle, or the file cannot be loaded.
    pub fn open(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let codec = ValueCodec::from_secret(&config.secret, config.strict_crypto)?;
        let backend = if config.create_if_missing {
            FileBackend::open_with_create_dirs(path)
        } else {
            FileBackend::open(path)
        }
        .map_err(|e| storage_error(e, Some(path)))?;
        let backups =
            BackupManager::for_database(path, format, config.pretty, config.max_backups);
        Self::assemble(Box::new(backend), format, Some(backups), codec, config)
    }

    /// Opens a database that lives only in memory. Backups are unavailable.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the secret is empty.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        let codec = ValueCodec::from_secret(&config.secret, config.strict_crypto)?;
        Self::assemble(
            Box::new(InMemoryBackend::new()),
            Format::Json,
            None,
            codec,
            config,
        )
    }

    /// Opens a database over a custom backend.
    ///
    /// Backups are enabled when the backend reports a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty or the document cannot be loaded.
    pub fn open_with_backend(
        backend: Box<dyn DocumentBackend>,
        format: Format,
        config: Config,
    ) -> CoreResult<Self> {
        let codec = ValueCodec::from_secret(&config.secret, config.strict_crypto)?;
        let backups = backend
            .path()
            .map(|p| BackupManager::for_database(p, format, config.pretty, config.max_backups));
        Self::assemble(backend, format, backups, codec, config)
    }

    fn assemble(
        backend: Box<dyn DocumentBackend>,
        format: Format,
        backups: Option<BackupManager>,
        codec: ValueCodec,
        config: Config,
    ) -> CoreResult<Self> {
        let persistence = Persistence::new(backend, format, config.pretty);
        let tree = persistence.load()?;
        let keys = tree.len();

        let inner = Arc::new(Inner {
            config,
            store: RwLock::new(PathStore::new(tree, codec)),
            persistence,
            backups,
            stats: DatabaseStats::new(),
        });

        let auto_backup = match (inner.config.auto_backup_interval, &inner.backups) {
            (Some(interval), Some(_)) => Some(AutoBackup::spawn(Arc::clone(&inner), interval)?),
            _ => None,
        };

        info!(
            file = ?inner.persistence.path().and_then(Path::file_name),
            format = %format,
            keys,
            "opened database"
        );

        Ok(Self {
            inner,
            is_open: RwLock::new(true),
            auto_backup: Mutex::new(auto_backup),
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stops the background backup and saves (when auto-save is on).
    ///
    /// Every later operation returns [`CoreError::Closed`].
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        if let Some(task) = self.auto_backup.lock().take() {
            task.stop();
        }

        if self.inner.config.auto_save {
            let store = self.inner.store.read();
            self.inner.save(&store)?;
        }

        *is_open = false;
        info!("closed database");
        Ok(())
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Ensures the database is open.
    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::Closed)
        }
    }

    /// Returns database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the operation counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Writes the current tree to storage.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self) -> CoreResult<()> {
        self.ensure_open()?;
        let store = self.inner.store.read();
        let result = self.inner.save(&store);
        self.track(result)
    }

    /// Summarizes the database.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or an I/O error if the backups
    /// directory cannot be read.
    pub fn info(&self) -> CoreResult<DatabaseInfo> {
        self.ensure_open()?;
        let (keys, tables) = {
            let store = self.inner.store.read();
            let tables: Vec<(String, usize)> = store
                .list_tables()
                .into_iter()
                .filter_map(|name| {
                    let rows = store.table_meta(&name).ok()?.row_count;
                    Some((name, rows))
                })
                .collect();
            (store.tree().len(), tables)
        };
        let backups = match &self.inner.backups {
            Some(manager) => manager.list()?.len(),
            None => 0,
        };
        Ok(DatabaseInfo {
            file: self
                .inner
                .persistence
                .path()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned()),
            format: self.inner.persistence.format(),
            keys,
            tables,
            backups,
            stats: self.stats(),
        })
    }

    /// Renders the stored tree (values still sealed) in any format.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn export(&self, format: Format) -> CoreResult<String> {
        self.ensure_open()?;
        let store = self.inner.store.read();
        let result = Persistence::export(store.tree(), format, self.inner.config.pretty);
        self.track(result)
    }

    /// Removes every key and table.
    ///
    /// # Errors
    ///
    /// Returns an error if the auto-save fails.
    pub fn clear(&self) -> CoreResult<()> {
        self.mutate(|store| {
            store.clear();
            Ok(())
        })
    }

    // ========================================================================
    // Backup and Restore
    // ========================================================================

    /// Writes a decoded copy of the tree to a new backup file.
    ///
    /// Returns the backup's path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for in-memory databases, or an I/O error.
    pub fn backup(&self) -> CoreResult<PathBuf> {
        self.ensure_open()?;
        let result = self.inner.backup();
        self.track(result)
    }

    /// Backup files, newest first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for in-memory databases, or an I/O error.
    pub fn list_backups(&self) -> CoreResult<Vec<PathBuf>> {
        self.ensure_open()?;
        let result = self.inner.backup_manager().and_then(BackupManager::list);
        self.track(result)
    }

    /// Replays a backup into the tree, re-sealing every value with the
    /// current key.
    ///
    /// Each top-level key in the backup replaces the current value under
    /// that key; keys absent from the backup are kept. Call [`clear`]
    /// first for a full replacement. `backup` may be a path or a bare
    /// file name from [`list_backups`].
    ///
    /// Returns the number of top-level keys restored.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the backup was written in another
    /// format, or `NotFound` if it does not exist.
    ///
    /// [`clear`]: Database::clear
    /// [`list_backups`]: Database::list_backups
    pub fn restore_from_backup(&self, backup: impl AsRef<Path>) -> CoreResult<usize> {
        self.ensure_open()?;
        let document = match self.inner.backup_manager() {
            Ok(manager) => manager.read(backup.as_ref()),
            Err(e) => Err(e),
        };
        let document = self.track(document)?;
        let restored = self.mutate(|store| store.restore_document(&document))?;
        self.inner.stats.record_restore();
        info!(keys = restored, "restored backup");
        Ok(restored)
    }

    // ========================================================================
    // Path access
    // ========================================================================

    /// Reads the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths.
    pub fn get(&self, path: &str) -> CoreResult<Option<Value>> {
        self.read(|store| {
            if store.has(path)? {
                store.get(path, Value::Null).map(Some)
            } else {
                Ok(None)
            }
        })
    }

    /// Reads the value at `path`, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths.
    pub fn get_or(&self, path: &str, default: Value) -> CoreResult<Value> {
        self.read(|store| store.get(path, default))
    }

    /// Returns true if anything is stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths.
    pub fn has(&self, path: &str) -> CoreResult<bool> {
        self.read(|store| store.has(path))
    }

    /// Stores a value at `path`, creating intermediate nodes.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths or paths through a
    /// non-container value.
    pub fn set(&self, path: &str, value: Value) -> CoreResult<Value> {
        self.inner.stats.record_write();
        self.mutate(|store| store.set(path, value))
    }

    /// Deletes the value at `path`, pruning emptied parents.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths.
    pub fn delete(&self, path: &str) -> CoreResult<bool> {
        self.inner.stats.record_delete();
        self.mutate(|store| store.delete(path))
    }

    /// Appends to the array at `path`; returns the new length.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not an array.
    pub fn push(&self, path: &str, value: Value) -> CoreResult<usize> {
        self.inner.stats.record_write();
        self.mutate(|store| store.push(path, value))
    }

    /// Removes matching elements from the array at `path`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not an array.
    pub fn pull(&self, path: &str, value: &Value) -> CoreResult<usize> {
        self.inner.stats.record_write();
        self.mutate(|store| store.pull(path, value))
    }

    /// Adds `n` to the number at `path` (absent counts as 0).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number.
    pub fn add(&self, path: &str, n: f64) -> CoreResult<Value> {
        self.arithmetic(path, Arithmetic::Add, n)
    }

    /// Subtracts `n` from the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number.
    pub fn subtract(&self, path: &str, n: f64) -> CoreResult<Value> {
        self.arithmetic(path, Arithmetic::Subtract, n)
    }

    /// Multiplies the number at `path` by `n`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number.
    pub fn multiply(&self, path: &str, n: f64) -> CoreResult<Value> {
        self.arithmetic(path, Arithmetic::Multiply, n)
    }

    /// Divides the number at `path` by `n`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number or
    /// `n` is zero.
    pub fn divide(&self, path: &str, n: f64) -> CoreResult<Value> {
        self.arithmetic(path, Arithmetic::Divide, n)
    }

    /// Adds 1 to the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number.
    pub fn increment(&self, path: &str) -> CoreResult<Value> {
        self.add(path, 1.0)
    }

    /// Subtracts 1 from the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the value there is not a number.
    pub fn decrement(&self, path: &str) -> CoreResult<Value> {
        self.subtract(path, 1.0)
    }

    fn arithmetic(&self, path: &str, op: Arithmetic, n: f64) -> CoreResult<Value> {
        self.inner.stats.record_write();
        self.mutate(|store| store.apply(path, op, n))
    }

    /// Top-level keys.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close.
    pub fn keys(&self) -> CoreResult<Vec<String>> {
        self.read(|store| Ok(store.keys()))
    }

    /// Decoded top-level values.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn values(&self) -> CoreResult<Vec<Value>> {
        self.read(PathStore::values)
    }

    /// Decoded top-level entries.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn entries(&self) -> CoreResult<Vec<(String, Value)>> {
        self.read(PathStore::entries)
    }

    /// First top-level entry matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn find<F>(&self, predicate: F) -> CoreResult<Option<(String, Value)>>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.read(|store| store.find(predicate))
    }

    /// Top-level entries matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn filter<F>(&self, predicate: F) -> CoreResult<Vec<(String, Value)>>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.read(|store| store.filter(predicate))
    }

    /// Maps every top-level entry.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn map<T, F>(&self, f: F) -> CoreResult<Vec<T>>
    where
        F: FnMut(&str, &Value) -> T,
    {
        self.read(|store| store.map(f))
    }

    /// Visits every top-level entry.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn for_each<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnMut(&str, &Value),
    {
        self.read(|store| store.for_each(f))
    }

    /// True if any top-level entry matches.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn some<F>(&self, predicate: F) -> CoreResult<bool>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.read(|store| store.some(predicate))
    }

    /// True if every top-level entry matches.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close, or a crypto error in strict mode.
    pub fn every<F>(&self, predicate: F) -> CoreResult<bool>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.read(|store| store.every(predicate))
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed names, an existing key, or
    /// rules, indexes, and relations that do not fit the columns.
    pub fn create_table(&self, name: &str, schema: TableSchema) -> CoreResult<TableMeta> {
        self.mutate(|store| store.create_table(name, schema))
    }

    /// Applies a schema change.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables or a validation error.
    pub fn alter_table(&self, name: &str, change: AlterTable) -> CoreResult<TableMeta> {
        self.mutate(|store| store.alter_table(name, change))
    }

    /// Removes a table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn drop_table(&self, name: &str) -> CoreResult<()> {
        self.mutate(|store| store.drop_table(name))
    }

    /// Renames a table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables or a validation error if the
    /// new name is malformed or taken.
    pub fn rename_table(&self, from: &str, to: &str) -> CoreResult<()> {
        self.mutate(|store| store.rename_table(from, to))
    }

    /// Describes a table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn describe(&self, name: &str) -> CoreResult<TableInfo> {
        self.read(|store| store.describe(name))
    }

    /// Names of all tables.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after close.
    pub fn list_tables(&self) -> CoreResult<Vec<String>> {
        self.read(|store| Ok(store.list_tables()))
    }

    /// Checks a row without writing it.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate_row(&self, table: &str, row: &Value) -> CoreResult<()> {
        let row = as_row(row)?;
        self.read(|store| store.validate_row(table, &row))
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Inserts a row under a fresh id; returns the row with its `id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the row does not fit the schema.
    pub fn insert(&self, table: &str, row: &Value) -> CoreResult<Row> {
        let row = as_row(row)?;
        self.inner.stats.record_write();
        self.mutate(|store| store.insert_row(table, &row))
    }

    /// Inserts rows in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing row's error; earlier rows stay inserted.
    pub fn insert_many(&self, table: &str, rows: &[Value]) -> CoreResult<Vec<Row>> {
        let rows = rows.iter().map(as_row).collect::<CoreResult<Vec<_>>>()?;
        self.inner.stats.record_write();
        self.mutate(|store| store.insert_rows(table, &rows))
    }

    /// Merges `changes` into row `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not exist, or a validation error.
    pub fn update(&self, table: &str, id: &str, changes: &Value) -> CoreResult<Row> {
        let changes = as_row(changes)?;
        self.inner.stats.record_write();
        self.mutate(|store| store.update_row(table, id, &changes))
    }

    /// Merges `changes` into every row matching `filter`; returns the count.
    ///
    /// # Errors
    ///
    /// Stops at the first row that fails validation.
    pub fn update_many(&self, table: &str, filter: &Filter, changes: &Value) -> CoreResult<usize> {
        let changes = as_row(changes)?;
        self.inner.stats.record_write();
        self.mutate(|store| store.update_where(table, filter, &changes))
    }

    /// Updates the row matching `row` on the `unique` columns, or inserts.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a unique column is unknown or missing,
    /// or the written row fails validation.
    pub fn upsert(&self, table: &str, row: &Value, unique: &[&str]) -> CoreResult<Row> {
        let row = as_row(row)?;
        self.inner.stats.record_write();
        self.mutate(|store| store.upsert_row(table, &row, unique))
    }

    /// Deletes row `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn delete_row(&self, table: &str, id: &str) -> CoreResult<bool> {
        self.inner.stats.record_delete();
        self.mutate(|store| store.delete_row(table, id))
    }

    /// Deletes every row matching `filter`; returns the count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn delete_where(&self, table: &str, filter: &Filter) -> CoreResult<usize> {
        self.inner.stats.record_delete();
        self.mutate(|store| store.delete_where(table, filter))
    }

    /// Deletes every row of a table; returns the count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn truncate(&self, table: &str) -> CoreResult<usize> {
        self.inner.stats.record_delete();
        self.mutate(|store| store.truncate(table))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Runs a query over a table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn query(&self, table: &str, query: &Query) -> CoreResult<Vec<Row>> {
        Ok(query.run(self.scan(table)?))
    }

    /// Runs a query and keeps only `columns`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn select(&self, table: &str, columns: &[&str], query: &Query) -> CoreResult<Vec<Row>> {
        let query = query.clone().select(columns.iter().copied());
        self.query(table, &query)
    }

    /// One row by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn find_by_id(&self, table: &str, id: &str) -> CoreResult<Option<Row>> {
        self.read(|store| store.find_row(table, id))
    }

    /// Rows by id, in the order given; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn find_by_ids(&self, table: &str, ids: &[&str]) -> CoreResult<Vec<Row>> {
        self.read(|store| {
            let mut rows = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(row) = store.find_row(table, id)? {
                    rows.push(row);
                }
            }
            Ok(rows)
        })
    }

    /// First row matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn find_one(&self, table: &str, filter: &Filter) -> CoreResult<Option<Row>> {
        Ok(self.scan(table)?.into_iter().find(|row| filter.matches(row)))
    }

    /// Number of rows matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn count(&self, table: &str, filter: &Filter) -> CoreResult<usize> {
        Ok(Query::new().filter(filter.clone()).count(&self.scan(table)?))
    }

    /// True if any row matches `filter`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn exists(&self, table: &str, filter: &Filter) -> CoreResult<bool> {
        Ok(self.find_one(table, filter)?.is_some())
    }

    /// A page of results plus the number of matches before pagination.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn find_and_count(&self, table: &str, query: &Query) -> CoreResult<(Vec<Row>, usize)> {
        Ok(query.run_counted(self.scan(table)?))
    }

    /// Groups rows and summarizes each group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn group_by(&self, table: &str, spec: &GroupBy) -> CoreResult<Vec<Row>> {
        Ok(group_by(self.scan(table)?, spec))
    }

    /// Distinct rows over `columns` (all declared columns when empty).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn distinct(&self, table: &str, columns: &[&str]) -> CoreResult<Vec<Row>> {
        Ok(distinct(self.projected(table, columns)?))
    }

    /// Computes aggregates over the rows matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn aggregate(
        &self,
        table: &str,
        filter: &Filter,
        aggregates: &[Aggregate],
    ) -> CoreResult<Row> {
        let rows = filter.apply(self.scan(table)?);
        Ok(aggregate(&rows, aggregates))
    }

    /// Joins two tables.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either table is unknown.
    pub fn join(&self, left: &str, right: &str, spec: &JoinSpec) -> CoreResult<Vec<Row>> {
        self.ensure_open()?;
        self.inner.stats.record_query();
        let store = self.inner.store.read();
        let left_meta = store.table_meta(left)?;
        let right_meta = store.table_meta(right)?;
        let left_rows = store.rows(left)?;
        let right_rows = store.rows(right)?;
        drop(store);
        Ok(join(
            JoinSide {
                table: left,
                columns: &left_meta.columns,
                rows: left_rows,
            },
            JoinSide {
                table: right,
                columns: &right_meta.columns,
                rows: right_rows,
            },
            spec,
        ))
    }

    /// Distinct rows of both tables over `columns`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either table is unknown.
    pub fn union(&self, first: &str, second: &str, columns: &[&str]) -> CoreResult<Vec<Row>> {
        Ok(union(
            self.projected(first, columns)?,
            self.projected(second, columns)?,
        ))
    }

    /// All rows of both tables over `columns`, duplicates kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either table is unknown.
    pub fn union_all(&self, first: &str, second: &str, columns: &[&str]) -> CoreResult<Vec<Row>> {
        Ok(union_all(
            self.projected(first, columns)?,
            self.projected(second, columns)?,
        ))
    }

    /// Rows whose `column` matches a SQL `LIKE` pattern.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn like(&self, table: &str, column: &str, pattern: &str) -> CoreResult<Vec<Row>> {
        let filter = Filter::new().like(column, pattern)?;
        Ok(filter.apply(self.scan(table)?))
    }

    /// Rows whose `column` is one of `values`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn in_list(&self, table: &str, column: &str, values: Vec<Value>) -> CoreResult<Vec<Row>> {
        Ok(Filter::new().is_in(column, values).apply(self.scan(table)?))
    }

    /// Rows whose `column` is none of `values`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn not_in(&self, table: &str, column: &str, values: Vec<Value>) -> CoreResult<Vec<Row>> {
        Ok(Filter::new().not_in(column, values).apply(self.scan(table)?))
    }

    /// Rows whose `column` lies in `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn between(&self, table: &str, column: &str, low: Value, high: Value) -> CoreResult<Vec<Row>> {
        Ok(Filter::new()
            .between(column, low, high)
            .apply(self.scan(table)?))
    }

    /// All rows in a multi-column order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown tables.
    pub fn order_by_multiple(&self, table: &str, order: &OrderBy) -> CoreResult<Vec<Row>> {
        let mut rows = self.scan(table)?;
        order.sort(&mut rows);
        Ok(rows)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// A decoded snapshot of a table's rows.
    fn scan(&self, table: &str) -> CoreResult<Vec<Row>> {
        self.inner.stats.record_query();
        self.read(|store| store.rows(table))
    }

    fn projected(&self, table: &str, columns: &[&str]) -> CoreResult<Vec<Row>> {
        let (rows, declared) = self.read(|store| {
            let meta = store.table_meta(table)?;
            Ok((store.rows(table)?, meta.columns))
        })?;
        let columns: Vec<String> = if columns.is_empty() {
            declared
        } else {
            columns.iter().map(|c| (*c).to_string()).collect()
        };
        Ok(rows.into_iter().map(|row| project(row, &columns)).collect())
    }

    fn read<T>(&self, f: impl FnOnce(&PathStore) -> CoreResult<T>) -> CoreResult<T> {
        self.ensure_open()?;
        self.inner.stats.record_read();
        let result = f(&self.inner.store.read());
        self.track(result)
    }

    /// Runs a mutation under the write lock, then saves if the tree changed.
    ///
    /// The save also runs when the mutation failed after changing the tree
    /// (a batch insert that stopped midway), so memory and disk agree.
    fn mutate<T>(&self, f: impl FnOnce(&mut PathStore) -> CoreResult<T>) -> CoreResult<T> {
        self.ensure_open()?;
        let mut store = self.inner.store.write();
        let before = store.revision();
        let result = f(&mut store);

        if store.revision() != before && self.inner.config.auto_save {
            let store = RwLockWriteGuard::downgrade(store);
            if let Err(e) = self.inner.save(&store) {
                if result.is_ok() {
                    return self.track(Err(e));
                }
                warn!(error = %e, "save after failed operation also failed");
            }
        }
        self.track(result)
    }

    fn track<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if result.is_err() {
            self.inner.stats.record_error();
        }
        result
    }
}

fn as_row(value: &Value) -> CoreResult<Row> {
    match value {
        Value::Object(map) => {
            if map.contains_key(META_KEY) {
                return Err(CoreError::validation(format!(
                    "{META_KEY} is not a valid column"
                )));
            }
            Ok(map.clone())
        }
        other => Err(CoreError::validation(format!(
            "row must be an object, got {other}"
        ))),
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("is_open", &self.is_open())
            .field("format", &self.inner.persistence.format())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "close on drop failed");
        }
    }
}
