//! Loader and store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default depth limit for delete cascades.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 100;

/// Configuration for a [`DataAccessor`](crate::DataAccessor).
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Deadline applied to every store query. None means no deadline.
    pub query_timeout: Option<Duration>,

    /// Maximum depth of delete-related cascades.
    pub max_cascade_depth: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
        }
    }
}

impl LoaderConfig {
    /// Set the query timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the cascade depth limit.
    pub fn max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }
}

/// Configuration for the SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file. None opens a private in-memory database.
    pub path: Option<PathBuf>,

    /// How long to wait on a locked database.
    pub busy_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl SqliteConfig {
    /// In-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Database stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Set the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}
