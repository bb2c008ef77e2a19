//! Query execution core.
//!
//! Binds a fragment's parameters to a prepared statement, executes it, and
//! (for queries) decodes the cursor row-by-row. Statements and cursors are
//! closed on every exit path; the backend-assigned query id is captured
//! best-effort and attached to every query-shaped failure.

use std::time::Duration;

use tracing::{debug, warn};

use crate::driver::{Connection, Cursor, DriverError, Statement};
use crate::error::{QueryError, SnowError, SnowResult};
use crate::meta::ColumnMeta;
use crate::row::{FromRow, Row};
use crate::sql::{Fragment, Param};

/// Per-statement overrides, passed explicitly at call time.
///
/// `None` means "no override": the driver's own defaults apply. Application
/// is best-effort: a driver that rejects a setting produces a warning, never
/// a failure.
#[derive(Debug, Clone, Default)]
pub struct StatementSettings {
    pub query_timeout: Option<Duration>,
    pub fetch_size: Option<u32>,
}

/// Decoded rows plus the backend-assigned query id, when retrievable.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub rows: Vec<T>,
    pub query_id: Option<String>,
}

/// Affected-row count of a mutation.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub updated: u64,
    pub query_id: Option<String>,
}

/// Ordered per-batch affected counts.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub updated: Vec<u64>,
    pub query_id: Option<String>,
}

pub(crate) fn run_query<T: FromRow>(
    conn: &mut dyn Connection,
    fragment: &Fragment,
    settings: &StatementSettings,
) -> SnowResult<QueryResult<T>> {
    fragment.validate()?;
    debug!(sql = fragment.sql(), params = fragment.params().len(), "executing query");

    let mut stmt = conn.prepare(fragment.sql()).map_err(sql_error)?;
    let result = query_on_statement(stmt.as_mut(), fragment, settings);
    close_statement(stmt.as_mut());
    result
}

pub(crate) fn run_update(
    conn: &mut dyn Connection,
    fragment: &Fragment,
    settings: &StatementSettings,
) -> SnowResult<UpdateResult> {
    fragment.validate()?;
    debug!(sql = fragment.sql(), params = fragment.params().len(), "executing update");

    let mut stmt = conn.prepare(fragment.sql()).map_err(sql_error)?;
    let result = update_on_statement(stmt.as_mut(), fragment, settings);
    close_statement(stmt.as_mut());
    result
}

pub(crate) fn run_batch(
    conn: &mut dyn Connection,
    fragment: &Fragment,
    batches: Vec<Vec<Param>>,
) -> SnowResult<BatchResult> {
    if !fragment.params().is_empty() {
        return Err(SnowError::Query(QueryError::PreparedStatement {
            message: "batch statements must not carry inline parameters".to_string(),
        }));
    }
    debug!(sql = fragment.sql(), batches = batches.len(), "executing batch");

    let mut stmt = conn.prepare(fragment.sql()).map_err(sql_error)?;
    let result = batch_on_statement(stmt.as_mut(), &batches);
    close_statement(stmt.as_mut());
    result
}

fn query_on_statement<T: FromRow>(
    stmt: &mut dyn Statement,
    fragment: &Fragment,
    settings: &StatementSettings,
) -> SnowResult<QueryResult<T>> {
    apply_settings(stmt, settings);
    bind_params(stmt, fragment.params())?;

    let mut cursor = stmt
        .execute_query()
        .map_err(|e| sql_error_with(e, stmt.query_id()))?;
    let result = read_rows(cursor.as_mut());
    close_cursor(cursor.as_mut());
    result
}

fn update_on_statement(
    stmt: &mut dyn Statement,
    fragment: &Fragment,
    settings: &StatementSettings,
) -> SnowResult<UpdateResult> {
    apply_settings(stmt, settings);
    bind_params(stmt, fragment.params())?;

    let updated = stmt
        .execute_update()
        .map_err(|e| sql_error_with(e, stmt.query_id()))?;
    Ok(UpdateResult {
        updated,
        query_id: stmt.query_id(),
    })
}

fn batch_on_statement(stmt: &mut dyn Statement, batches: &[Vec<Param>]) -> SnowResult<BatchResult> {
    for batch in batches {
        // A binding failure aborts the whole batch before anything executes.
        bind_params(stmt, batch)?;
        stmt.add_batch()
            .map_err(|e| sql_error_with(e, stmt.query_id()))?;
        stmt.clear_params()
            .map_err(|e| sql_error_with(e, stmt.query_id()))?;
    }

    let updated = stmt
        .execute_batch()
        .map_err(|e| sql_error_with(e, stmt.query_id()))?;
    Ok(BatchResult {
        updated,
        query_id: stmt.query_id(),
    })
}

pub(crate) fn read_rows<T: FromRow>(cursor: &mut dyn Cursor) -> SnowResult<QueryResult<T>> {
    let query_id = cursor.query_id();
    let meta = column_meta(cursor, &query_id)?;

    let mut rows = Vec::new();
    loop {
        match cursor.advance() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                return Err(result_set_error(
                    format!("row iteration failed: {e}"),
                    query_id,
                    Some(e),
                ));
            }
        }

        let mut row = Row::new(cursor, &meta);
        match T::from_row(&mut row) {
            Ok(value) => rows.push(value),
            // The first decode failure aborts iteration.
            Err(decode) => return Err(result_set_error(decode.to_string(), query_id, None)),
        }
    }

    Ok(QueryResult { rows, query_id })
}

pub(crate) fn column_meta(
    cursor: &mut dyn Cursor,
    query_id: &Option<String>,
) -> SnowResult<ColumnMeta> {
    let count = cursor.column_count();
    let mut labels = Vec::with_capacity(count);
    for index in 1..=count {
        let label = cursor.column_label(index).map_err(|e| {
            result_set_error(
                format!("cannot read label of column {index}: {e}"),
                query_id.clone(),
                Some(e),
            )
        })?;
        labels.push(label);
    }
    Ok(ColumnMeta::from_labels(labels))
}

pub(crate) fn bind_params(stmt: &mut dyn Statement, params: &[Param]) -> SnowResult<()> {
    for (i, param) in params.iter().enumerate() {
        param.bind(stmt, i + 1)?;
    }
    Ok(())
}

pub(crate) fn apply_settings(stmt: &mut dyn Statement, settings: &StatementSettings) {
    if let Some(timeout) = settings.query_timeout {
        if let Err(e) = stmt.set_query_timeout(timeout) {
            warn!(error = %e, "could not apply query timeout");
        }
    }
    if let Some(rows) = settings.fetch_size {
        if let Err(e) = stmt.set_fetch_size(rows) {
            warn!(error = %e, "could not apply fetch size");
        }
    }
}

pub(crate) fn close_statement(stmt: &mut dyn Statement) {
    if let Err(e) = stmt.close() {
        warn!(error = %e, "failed to close statement");
    }
}

pub(crate) fn close_cursor(cursor: &mut dyn Cursor) {
    if let Err(e) = cursor.close() {
        warn!(error = %e, "failed to close cursor");
    }
}

/// Native driver failure during prepare/execute, before a query id exists.
pub(crate) fn sql_error(err: DriverError) -> SnowError {
    let query_id = err.query_id.clone();
    sql_error_with(err, query_id)
}

/// Native driver failure; the exception's own query id wins over the
/// statement's.
pub(crate) fn sql_error_with(err: DriverError, query_id: Option<String>) -> SnowError {
    SnowError::Query(QueryError::Sql {
        sql_state: err.sql_state.clone(),
        error_code: err.error_code,
        message: err.message.clone(),
        query_id: err.query_id.clone().or(query_id),
        source: Some(err),
    })
}

pub(crate) fn result_set_error(
    message: String,
    query_id: Option<String>,
    source: Option<DriverError>,
) -> SnowError {
    SnowError::Query(QueryError::ResultSet {
        message,
        query_id,
        source,
    })
}
