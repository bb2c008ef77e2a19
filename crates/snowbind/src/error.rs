//! Error types for snowbind.

use thiserror::Error;

use crate::driver::DriverError;

/// Result type alias for snowbind operations.
pub type SnowResult<T> = Result<T, SnowError>;

/// Top-level error for all snowbind operations.
///
/// Every public operation returns `Result<_, SnowError>`; native driver
/// failures are caught at the narrowest point and converted into the nearest
/// member of this taxonomy. `Display` always renders a complete diagnostic
/// (SQL state/code, query id, wrapped cause where applicable).
#[derive(Debug, Error)]
pub enum SnowError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SnowError {
    /// The backend-assigned query id attached to this error, if any.
    ///
    /// Only query-shaped errors carry one; binding errors precede execution
    /// and never do.
    pub fn query_id(&self) -> Option<&str> {
        match self {
            Self::Query(QueryError::Sql { query_id, .. })
            | Self::Query(QueryError::ResultSet { query_id, .. }) => query_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Failures while decoding a result column into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The column was NULL and the target type is not nullable.
    #[error("unexpected NULL value")]
    NullValue,

    /// The column's backend type cannot be read as the requested type.
    #[error("type mismatch at column {index}: cannot read {source_type} as {target_type}: {cause}")]
    TypeMismatch {
        index: usize,
        source_type: String,
        target_type: &'static str,
        cause: String,
    },

    /// No column normalized to the requested name.
    #[error("column '{name}' not found (available: {})", .available.join(", "))]
    ColumnNotFound { name: String, available: Vec<String> },

    /// Column index outside 1..=max.
    #[error("column index {index} out of range 1..={max}")]
    InvalidColumnIndex { index: usize, max: usize },

    /// Any uncategorized decode failure.
    #[error("{0}")]
    Custom(String),
}

/// Failures while preparing, binding or executing a statement.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Native backend failure during prepare or execute.
    #[error("sql exception{}{}: {message}", fmt_state(.sql_state, .error_code), fmt_query_id(.query_id))]
    Sql {
        sql_state: Option<String>,
        error_code: Option<i32>,
        message: String,
        query_id: Option<String>,
        #[source]
        source: Option<DriverError>,
    },

    /// Statement misuse detected before reaching the backend, e.g. a
    /// placeholder/parameter count mismatch.
    #[error("prepared statement error: {message}")]
    PreparedStatement { message: String },

    /// A parameter failed to bind at its 1-based position.
    #[error("failed to bind parameter {index}: {message}")]
    ParameterBinding {
        index: usize,
        message: String,
        #[source]
        source: Option<DriverError>,
    },

    /// A failure while reading or decoding the result set.
    #[error("result set error{}: {message}", fmt_query_id(.query_id))]
    ResultSet {
        message: String,
        query_id: Option<String>,
        #[source]
        source: Option<DriverError>,
    },

    /// A failure while sequencing a transaction.
    #[error("transaction error in '{operation}': {message}")]
    Transaction {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<DriverError>,
    },
}

/// Failures while acquiring or releasing a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect: {message}")]
    FailedToConnect {
        message: String,
        #[source]
        source: Option<DriverError>,
    },

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("connection pool exhausted ({max_size} connections in use)")]
    PoolExhausted { max_size: usize },

    #[error("connection error: {0}")]
    Unknown(String),
}

/// Failures while building or loading a [`ConnectionConfig`](crate::ConnectionConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required configuration value '{0}'")]
    MissingRequired(&'static str),

    #[error("invalid configuration value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("failed to load configuration: {0}")]
    LoadFailed(String),
}

fn fmt_state(sql_state: &Option<String>, error_code: &Option<i32>) -> String {
    match (sql_state, error_code) {
        (Some(state), Some(code)) => format!(" [state {state}, code {code}]"),
        (Some(state), None) => format!(" [state {state}]"),
        (None, Some(code)) => format!(" [code {code}]"),
        (None, None) => String::new(),
    }
}

fn fmt_query_id(query_id: &Option<String>) -> String {
    match query_id {
        Some(id) => format!(" [query {id}]"),
        None => String::new(),
    }
}
