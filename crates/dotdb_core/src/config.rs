//! Database configuration.

use std::fmt;
use std::time::Duration;

/// Configuration for opening a database.
#[derive(Clone)]
pub struct Config {
    /// Secret the value cipher key is derived from. Must not be empty.
    pub secret: String,

    /// Whether every mutation is followed by a save.
    pub auto_save: bool,

    /// How many backups to keep (0 = keep all).
    pub max_backups: usize,

    /// Period of the background backup task (`None` = disabled).
    pub auto_backup_interval: Option<Duration>,

    /// Whether value encryption/decryption failures are surfaced as errors
    /// instead of passing the original value through.
    pub strict_crypto: bool,

    /// Whether JSON output is indented.
    pub pretty: bool,

    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret: String::new(),
            auto_save: true,
            max_backups: 10,
            auto_backup_interval: None,
            strict_crypto: false,
            pretty: true,
            create_if_missing: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with the given secret and default values.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Sets whether mutations are saved immediately.
    #[must_use]
    pub const fn auto_save(mut self, value: bool) -> Self {
        self.auto_save = value;
        self
    }

    /// Sets how many backups are retained.
    #[must_use]
    pub const fn max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    /// Enables the periodic background backup.
    #[must_use]
    pub const fn auto_backup_interval(mut self, interval: Duration) -> Self {
        self.auto_backup_interval = Some(interval);
        self
    }

    /// Sets whether crypto failures are surfaced.
    #[must_use]
    pub const fn strict_crypto(mut self, value: bool) -> Self {
        self.strict_crypto = value;
        self
    }

    /// Sets whether JSON output is indented.
    #[must_use]
    pub const fn pretty(mut self, value: bool) -> Self {
        self.pretty = value;
        self
    }

    /// Sets whether to create the database directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"[REDACTED]")
            .field("auto_save", &self.auto_save)
            .field("max_backups", &self.max_backups)
            .field("auto_backup_interval", &self.auto_backup_interval)
            .field("strict_crypto", &self.strict_crypto)
            .field("pretty", &self.pretty)
            .field("create_if_missing", &self.create_if_missing)
            .finish()
    }
}
