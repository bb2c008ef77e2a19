//! Consumed driver interface.
//!
//! The wire protocol, authentication handshake and result transport live in
//! an external driver crate. snowbind only ever talks to a driver through the
//! traits below, which mirror the shape of a warehouse driver: prepared
//! statements with 1-based positional binds, and a forward-only cursor whose
//! raw getters return a type-specific default for NULL (callers must consult
//! [`Cursor::was_null`] immediately after the read).

use std::time::Duration;

use thiserror::Error;

/// Result type alias for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;

/// A native failure reported by the underlying driver.
///
/// Carries the backend's SQL state and error code when the driver exposes
/// them, plus the backend-assigned query id when the failure happened after
/// the statement reached the server.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub query_id: Option<String>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            error_code: None,
            query_id: None,
        }
    }

    pub fn with_state(mut self, sql_state: impl Into<String>, error_code: i32) -> Self {
        self.sql_state = Some(sql_state.into());
        self.error_code = Some(error_code);
        self
    }

    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }
}

/// A live connection to the backend.
///
/// Connections are exclusively owned by the session or transaction scope that
/// borrowed them; the core never shares one connection between callers.
pub trait Connection {
    /// Prepare a statement. Placeholders are `?`, bound 1-based.
    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement + '_>>;

    /// Current auto-commit setting.
    fn autocommit(&self) -> DriverResult<bool>;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    fn commit(&mut self) -> DriverResult<()>;

    fn rollback(&mut self) -> DriverResult<()>;

    fn close(&mut self) -> DriverResult<()>;
}

/// A prepared statement with positional parameter slots.
pub trait Statement {
    fn bind_null(&mut self, index: usize) -> DriverResult<()>;
    fn bind_bool(&mut self, index: usize, value: bool) -> DriverResult<()>;
    fn bind_i64(&mut self, index: usize, value: i64) -> DriverResult<()>;
    fn bind_f64(&mut self, index: usize, value: f64) -> DriverResult<()>;
    fn bind_str(&mut self, index: usize, value: &str) -> DriverResult<()>;
    fn bind_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()>;

    /// Cap on server-side execution time. Best-effort passthrough.
    fn set_query_timeout(&mut self, timeout: Duration) -> DriverResult<()>;

    /// Hint for the number of rows fetched per round-trip. Best-effort.
    fn set_fetch_size(&mut self, rows: u32) -> DriverResult<()>;

    fn execute_query(&mut self) -> DriverResult<Box<dyn Cursor>>;

    /// Execute as a mutation, returning the affected-row count.
    fn execute_update(&mut self) -> DriverResult<u64>;

    /// Stage the currently bound parameters as one batch entry.
    fn add_batch(&mut self) -> DriverResult<()>;

    /// Clear the bound (unstaged) parameter slots.
    fn clear_params(&mut self) -> DriverResult<()>;

    /// Execute all staged batches, returning per-batch affected counts in
    /// staging order.
    fn execute_batch(&mut self) -> DriverResult<Vec<u64>>;

    /// Backend-assigned query id of the last execution, if any.
    fn query_id(&self) -> Option<String>;

    fn close(&mut self) -> DriverResult<()>;
}

/// A forward-only cursor over one result set.
///
/// Raw getters return the column value converted to the requested native
/// type; when the column is NULL they return that type's zero value and arm
/// [`Cursor::was_null`]. The flag is only meaningful immediately after a raw
/// read.
pub trait Cursor {
    /// Move to the next row. `false` once the result set is exhausted.
    fn advance(&mut self) -> DriverResult<bool>;

    fn column_count(&self) -> usize;

    /// Original label of a column, 1-based.
    fn column_label(&self, index: usize) -> DriverResult<String>;

    /// Backend type name of a column, when the driver knows it.
    fn column_type(&self, index: usize) -> Option<String>;

    fn get_bool(&mut self, index: usize) -> DriverResult<bool>;
    fn get_i64(&mut self, index: usize) -> DriverResult<i64>;
    fn get_f64(&mut self, index: usize) -> DriverResult<f64>;
    fn get_string(&mut self, index: usize) -> DriverResult<String>;
    fn get_bytes(&mut self, index: usize) -> DriverResult<Vec<u8>>;

    /// Whether the most recent raw read hit a NULL column.
    fn was_null(&self) -> bool;

    /// Backend-assigned query id for this result set, if retrievable.
    fn query_id(&self) -> Option<String>;

    fn close(&mut self) -> DriverResult<()>;
}
