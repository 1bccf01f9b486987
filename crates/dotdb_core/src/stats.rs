//! Database statistics.
//!
//! Operation counters surfaced through `Database::info()`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let db = Database::open_in_memory(Config::new("secret"))?;
//! db.set("greeting", json!("hi"))?;
//!
//! let stats = db.stats();
//! println!("Writes: {}", stats.writes);
//! println!("Saves: {}", stats.saves);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Database statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    /// Path and row reads.
    reads: AtomicU64,
    /// Path sets and row writes.
    writes: AtomicU64,
    /// Path and row deletions.
    deletes: AtomicU64,
    /// Query engine invocations (each one is a full table scan).
    queries: AtomicU64,
    /// Successful saves.
    saves: AtomicU64,
    /// Backups created.
    backups: AtomicU64,
    /// Restores applied.
    restores: AtomicU64,
    /// Errors returned to callers.
    errors: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_save(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_backup(&self) {
        self.backups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restore(&self) {
        self.restores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
            backups: self.backups.load(Ordering::Relaxed),
            restores: self.restores.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Total number of reads.
    pub reads: u64,
    /// Total number of writes.
    pub writes: u64,
    /// Total number of deletes.
    pub deletes: u64,
    /// Total number of queries.
    pub queries: u64,
    /// Total number of saves.
    pub saves: u64,
    /// Total number of backups.
    pub backups: u64,
    /// Total number of restores.
    pub restores: u64,
    /// Total number of errors.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(DatabaseStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot() {
        let stats = DatabaseStats::new();
        stats.record_read();
        stats.record_write();
        stats.record_write();
        stats.record_query();
        stats.record_save();

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.queries, 1);
        assert_eq!(snap.saves, 1);
        assert_eq!(snap.errors, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_read();
                        s.record_delete();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 1000);
        assert_eq!(snap.deletes, 1000);
    }
}
