//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for opening a [`crate::SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
    /// Whether to create the database file if it does not exist.
    pub create_if_missing: bool,
}

impl StoreConfig {
    /// Creates a configuration for a database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates a configuration for an in-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the maximum pooled connections.
    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether a missing database file is created.
    #[must_use]
    pub fn with_create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}
