//! Session scope: row access and transactions over one borrowed connection.
//!
//! A [`Session`] exclusively owns its connection for the lifetime of the
//! scope. All operations execute strictly in the order issued; concurrency,
//! if any, comes from the caller running independent sessions on distinct
//! connections.

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::driver::{Connection, Cursor, DriverError, Statement};
use crate::error::{QueryError, SnowError, SnowResult};
use crate::execute::{
    self, BatchResult, QueryResult, StatementSettings, UpdateResult, close_cursor, close_statement,
};
use crate::meta::ColumnMeta;
use crate::query::{Command, IntoParams, Query};
use crate::row::{FromRow, Row};

/// A scope bound to one borrowed connection.
pub struct Session<'c, C: Connection> {
    conn: &'c mut C,
    settings: StatementSettings,
    in_transaction: bool,
}

impl<'c, C: Connection> Session<'c, C> {
    pub fn new(conn: &'c mut C) -> Self {
        Self::with_settings(conn, StatementSettings::default())
    }

    pub fn with_settings(conn: &'c mut C, settings: StatementSettings) -> Self {
        Self {
            conn,
            settings,
            in_transaction: false,
        }
    }

    /// Default statement settings applied to every operation in this scope.
    pub fn settings(&self) -> &StatementSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: StatementSettings) {
        self.settings = settings;
    }

    /// Execute a query and decode every row, in result-set order.
    pub fn list<T: FromRow>(&mut self, query: &Query<T>) -> SnowResult<Vec<T>> {
        self.query_result(query).map(|result| result.rows)
    }

    /// Execute a query and return the full [`QueryResult`], including the
    /// backend-assigned query id.
    pub fn query_result<T: FromRow>(&mut self, query: &Query<T>) -> SnowResult<QueryResult<T>> {
        execute::run_query(self.conn, query.fragment(), &self.settings)
    }

    /// Execute a query expected to produce zero or one row.
    ///
    /// Zero rows is `None`; more than one row is an error.
    pub fn option<T: FromRow>(&mut self, query: &Query<T>) -> SnowResult<Option<T>> {
        let mut result = self.query_result(query)?;
        match result.rows.len() {
            0 => Ok(None),
            1 => Ok(result.rows.pop()),
            n => Err(SnowError::Query(QueryError::ResultSet {
                message: format!("expected at most one row, query returned multiple rows ({n})"),
                query_id: result.query_id,
                source: None,
            })),
        }
    }

    /// Execute a query expected to produce exactly one row.
    pub fn unique<T: FromRow>(&mut self, query: &Query<T>) -> SnowResult<T> {
        let mut result = self.query_result(query)?;
        match result.rows.len() {
            1 => Ok(result.rows.pop().expect("len == 1")),
            0 => Err(SnowError::Query(QueryError::ResultSet {
                message: "expected exactly one row, query returned none".to_string(),
                query_id: result.query_id,
                source: None,
            })),
            n => Err(SnowError::Query(QueryError::ResultSet {
                message: format!("expected exactly one row, query returned multiple rows ({n})"),
                query_id: result.query_id,
                source: None,
            })),
        }
    }

    /// Execute a query and decode rows lazily.
    ///
    /// The stream holds the live statement and cursor until it is exhausted,
    /// fails, or is dropped. It is finite and forward-only: restarting means
    /// re-issuing the query.
    pub fn stream<'s, T: FromRow>(&'s mut self, query: &Query<T>) -> SnowResult<RowStream<'s, T>> {
        let fragment = query.fragment();
        fragment.validate()?;

        let mut stmt = self
            .conn
            .prepare(fragment.sql())
            .map_err(execute::sql_error)?;

        match open_stream(stmt.as_mut(), fragment, &self.settings) {
            Ok((cursor, meta, query_id)) => Ok(RowStream {
                stmt,
                cursor: Some(cursor),
                meta,
                query_id,
                done: false,
                marker: PhantomData,
            }),
            Err(e) => {
                close_statement(stmt.as_mut());
                Err(e)
            }
        }
    }

    /// Execute a mutation and return the affected-row count.
    pub fn update(&mut self, command: &Command) -> SnowResult<UpdateResult> {
        execute::run_update(self.conn, command.fragment(), &self.settings)
    }

    /// Execute a command once per parameter row, staged as a single batch.
    ///
    /// The statement is prepared once. A binding failure on any row aborts
    /// before anything executes.
    pub fn batch<R: IntoParams>(
        &mut self,
        command: &Command,
        rows: impl IntoIterator<Item = R>,
    ) -> SnowResult<BatchResult> {
        let batches: Vec<_> = rows.into_iter().map(IntoParams::into_params).collect();
        execute::run_batch(self.conn, command.fragment(), batches)
    }

    /// Run `f` inside a transaction on this session's connection.
    ///
    /// Auto-commit is disabled for the duration and unconditionally restored
    /// to its prior value on every exit. `Ok` commits (a failing commit rolls
    /// back and reports a `commit` transaction error); `Err` rolls back and
    /// propagates unchanged; a panic in `f` rolls back and is reported as a
    /// `transaction` error instead of resuming the unwind.
    ///
    /// Transactions share the session's connection, so nested row-access
    /// calls are fine, but a second `transaction` on the same session fails
    /// fast rather than toggling auto-commit underneath the outer scope.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> SnowResult<T>,
    ) -> SnowResult<T> {
        if self.in_transaction {
            return Err(transaction_error(
                "begin",
                "a transaction is already active on this connection".to_string(),
                None,
            ));
        }

        let prior = self
            .conn
            .autocommit()
            .map_err(|e| transaction_error("begin", e.to_string(), Some(e)))?;
        self.conn
            .set_autocommit(false)
            .map_err(|e| transaction_error("begin", e.to_string(), Some(e)))?;
        self.in_transaction = true;

        let outcome = catch_unwind(AssertUnwindSafe(|| f(&mut *self)));

        self.in_transaction = false;
        let result = match outcome {
            Ok(Ok(value)) => match self.conn.commit() {
                Ok(()) => Ok(value),
                Err(commit_err) => {
                    self.rollback_quietly();
                    Err(transaction_error(
                        "commit",
                        commit_err.to_string(),
                        Some(commit_err),
                    ))
                }
            },
            Ok(Err(err)) => {
                self.rollback_quietly();
                Err(err)
            }
            Err(panic) => {
                self.rollback_quietly();
                Err(transaction_error("transaction", panic_message(panic), None))
            }
        };

        // Restore regardless of outcome; a restore failure cannot override
        // the transaction's result.
        if let Err(e) = self.conn.set_autocommit(prior) {
            warn!(error = %e, "failed to restore auto-commit after transaction");
        }
        result
    }

    fn rollback_quietly(&mut self) {
        if let Err(e) = self.conn.rollback() {
            warn!(error = %e, "rollback failed");
        }
    }
}

fn transaction_error(
    operation: &'static str,
    message: String,
    source: Option<DriverError>,
) -> SnowError {
    SnowError::Query(QueryError::Transaction {
        operation,
        message,
        source,
    })
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "transaction body panicked".to_string()
    }
}

type OpenedStream = (Box<dyn Cursor>, ColumnMeta, Option<String>);

fn open_stream(
    stmt: &mut dyn Statement,
    fragment: &crate::sql::Fragment,
    settings: &StatementSettings,
) -> SnowResult<OpenedStream> {
    execute::apply_settings(stmt, settings);
    execute::bind_params(stmt, fragment.params())?;

    let mut cursor = stmt
        .execute_query()
        .map_err(|e| execute::sql_error_with(e, stmt.query_id()))?;
    let query_id = cursor.query_id();
    match execute::column_meta(cursor.as_mut(), &query_id) {
        Ok(meta) => Ok((cursor, meta, query_id)),
        Err(e) => {
            close_cursor(cursor.as_mut());
            Err(e)
        }
    }
}

/// A lazily-consumed, ordered sequence of decoded rows.
///
/// Fused after the first error. Closes its cursor and statement when
/// exhausted or dropped.
#[must_use]
pub struct RowStream<'s, T: FromRow> {
    stmt: Box<dyn Statement + 's>,
    cursor: Option<Box<dyn Cursor>>,
    meta: ColumnMeta,
    query_id: Option<String>,
    done: bool,
    marker: PhantomData<fn() -> T>,
}

impl<T: FromRow> RowStream<'_, T> {
    /// Backend-assigned query id for this result set, if retrievable.
    pub fn query_id(&self) -> Option<&str> {
        self.query_id.as_deref()
    }

    fn finish(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            close_cursor(cursor.as_mut());
        }
        if !self.done {
            close_statement(self.stmt.as_mut());
            self.done = true;
        }
    }
}

impl<T: FromRow> Iterator for RowStream<'_, T> {
    type Item = SnowResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let advanced = self.cursor.as_mut()?.advance();
        match advanced {
            Ok(false) => {
                self.finish();
                None
            }
            Err(e) => {
                let query_id = self.query_id.clone();
                self.finish();
                Some(Err(execute::result_set_error(
                    format!("row iteration failed: {e}"),
                    query_id,
                    Some(e),
                )))
            }
            Ok(true) => {
                let decoded = {
                    let cursor = self.cursor.as_mut()?;
                    let mut row = Row::new(cursor.as_mut(), &self.meta);
                    T::from_row(&mut row)
                };
                match decoded {
                    Ok(value) => Some(Ok(value)),
                    Err(decode) => {
                        let query_id = self.query_id.clone();
                        self.finish();
                        Some(Err(execute::result_set_error(
                            decode.to_string(),
                            query_id,
                            None,
                        )))
                    }
                }
            }
        }
    }
}

impl<T: FromRow> Drop for RowStream<'_, T> {
    fn drop(&mut self) {
        self.finish();
    }
}
