//! Async-safe connection pool for the SQLite mail directory.
//!
//! SQLite connections are synchronous; `diesel-async`'s
//! `SyncConnectionWrapper` runs them on Tokio's blocking pool so the
//! repository can stay async, and `bb8` manages checkout with a bounded
//! timeout.
//!
//! Every new read-write connection switches the database to WAL journaling,
//! so readers never observe a half-written row and do not block the single
//! writer. Every connection sets a busy timeout so a concurrent writer is
//! waited for instead of failing immediately.
//!
//! Read-only pools open the file through a `mode=ro` URI. They never create
//! the database, so a missing file fails to connect instead of turning into
//! an empty store.

use std::time::Duration;

use diesel::ConnectionError;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use futures_util::future::BoxFuture;

/// Connection type handed out by [`DbPool`].
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

const READ_WRITE_PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;";
const READ_ONLY_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;";
const MIN_IDLE: u32 = 1;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout {
        /// Underlying pool error.
        message: String,
    },

    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build {
        /// Underlying pool error.
        message: String,
    },
}

impl PoolError {
    /// Create a checkout error with the given message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Create a build error with the given message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Configuration for the database connection pool.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mailwire::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("/home/user-data/mail/users.sqlite")
///     .with_max_size(8)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.database_path(), "/home/user-data/mail/users.sqlite");
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_path: String,
    max_size: u32,
    read_only: bool,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Create a new configuration for the SQLite file at `database_path`.
    ///
    /// Defaults: `max_size` 4, read-write, `connection_timeout` 10 seconds.
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            max_size: 4,
            read_only: false,
            connection_timeout: Duration::from_secs(10),
        }
    }

    /// Set the maximum number of connections in the pool.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Open the database read-only. The file must already exist.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set the connection checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> &str {
        &self.database_path
    }

    /// Whether connections are opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Connection string handed to SQLite: the plain path, or a `file:` URI
    /// with `mode=ro` for read-only pools.
    fn connection_url(&self) -> String {
        if !self.read_only {
            return self.database_path.clone();
        }
        let mut url = String::with_capacity(self.database_path.len() + 13);
        url.push_str("file:");
        for c in self.database_path.chars() {
            match c {
                '%' => url.push_str("%25"),
                '?' => url.push_str("%3f"),
                '#' => url.push_str("%23"),
                other => url.push(other),
            }
        }
        url.push_str("?mode=ro");
        url
    }
}

fn establish_connection<'a>(
    url: &'a str,
    pragmas: &'static str,
) -> BoxFuture<'a, Result<SqliteConn, ConnectionError>> {
    Box::pin(async move {
        let mut conn = SqliteConn::establish(url).await?;
        conn.batch_execute(pragmas)
            .await
            .map_err(ConnectionError::CouldntSetupConfiguration)?;
        Ok(conn)
    })
}

fn establish_read_write(url: &str) -> BoxFuture<'_, Result<SqliteConn, ConnectionError>> {
    establish_connection(url, READ_WRITE_PRAGMAS)
}

fn establish_read_only(url: &str) -> BoxFuture<'_, Result<SqliteConn, ConnectionError>> {
    establish_connection(url, READ_ONLY_PRAGMAS)
}

/// Async connection pool over one SQLite database file.
///
/// The pool is the explicit store handle: every repository receives a clone
/// instead of reaching for a global connection.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<SqliteConn>,
}

impl DbPool {
    /// Create a new connection pool with the given configuration.
    ///
    /// A read-write pool creates the database file on first connect if it
    /// does not exist; its parent directory must. A read-only pool requires
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Build` if the initial connections cannot be
    /// opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let mut manager_config = ManagerConfig::default();
        if config.read_only {
            manager_config.custom_setup = Box::new(establish_read_only);
        } else {
            manager_config.custom_setup = Box::new(establish_read_write);
        }
        let manager = AsyncDieselConnectionManager::<SqliteConn>::new_with_config(
            config.connection_url(),
            manager_config,
        );

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(MIN_IDLE))
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner: pool })
    }

    /// Get a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Checkout` if a connection cannot be obtained within
    /// the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, SqliteConn>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_config_default_values() {
        let config = PoolConfig::new("/tmp/users.sqlite");

        assert_eq!(config.database_path(), "/tmp/users.sqlite");
        assert_eq!(config.max_size, 4);
        assert!(!config.is_read_only());
        assert_eq!(config.connection_timeout, Duration::from_secs(10));
        assert_eq!(config.connection_url(), "/tmp/users.sqlite");
    }

    #[rstest]
    #[case("/tmp/users.sqlite", "file:/tmp/users.sqlite?mode=ro")]
    #[case("/tmp/odd?#%.sqlite", "file:/tmp/odd%3f%23%25.sqlite?mode=ro")]
    fn read_only_config_uses_uri(#[case] path: &str, #[case] expected: &str) {
        let config = PoolConfig::new(path).read_only();
        assert!(config.is_read_only());
        assert_eq!(config.connection_url(), expected);
    }

    #[rstest]
    #[case(8, 8)]
    #[case(0, 1)]
    fn pool_config_clamps_max_size(#[case] requested: u32, #[case] expected: u32) {
        let config = PoolConfig::new("/tmp/users.sqlite").with_max_size(requested);
        assert_eq!(config.max_size, expected);
    }

    #[tokio::test]
    async fn pool_opens_and_creates_database_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("users.sqlite");
        let config = PoolConfig::new(path.to_string_lossy());

        let pool = DbPool::new(config).await.expect("pool builds");
        let mut conn = pool.get().await.expect("checkout");
        conn.batch_execute("SELECT 1").await.expect("query runs");

        assert!(path.exists());
    }

    #[tokio::test]
    async fn pool_build_fails_for_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("users.sqlite");
        let config = PoolConfig::new(path.to_string_lossy())
            .with_connection_timeout(Duration::from_millis(500));

        let err = DbPool::new(config).await.err().expect("build must fail");

        assert!(matches!(err, PoolError::Build { .. }));
    }

    #[tokio::test]
    async fn read_only_pool_does_not_create_missing_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("users.sqlite");
        let config = PoolConfig::new(path.to_string_lossy())
            .read_only()
            .with_connection_timeout(Duration::from_millis(500));

        let err = DbPool::new(config).await.err().expect("build must fail");

        assert!(matches!(err, PoolError::Build { .. }));
        assert!(!path.exists());
    }
}
