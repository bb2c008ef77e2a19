//! In-memory scripted driver for the integration tests.
//!
//! `MemConnection` implements the consumed driver traits over owned data.
//! Tests script result sets and failures up front, run the public API, then
//! assert on the recorded operation journal. Cloning a connection clones the
//! handle, not the state, so a test can keep one for assertions while a
//! session borrows the other.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use snowbind::driver::{Connection, Cursor, DriverError, DriverResult, Statement};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "NUMBER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BINARY",
        }
    }
}

pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

/// What the fake backend will do, consumed front-to-back.
#[derive(Default)]
pub struct Script {
    pub results: VecDeque<ResultSet>,
    pub update_counts: VecDeque<u64>,
    pub batch_counts: VecDeque<Vec<u64>>,
    /// `execute_query` returns the bound parameters back as a single row
    /// with columns `C1..Cn`.
    pub echo: bool,
    /// The nth bind call (1-based, counted across the connection) fails.
    pub fail_bind_at: Option<usize>,
    pub fail_commit: bool,
    pub fail_prepare: Option<DriverError>,
    pub fail_execute: Option<DriverError>,
    pub fail_settings: bool,
    pub fail_close: bool,
    pub query_id: Option<String>,
}

/// Everything the driver was asked to do, in order.
#[derive(Default)]
pub struct Journal {
    pub prepared: Vec<String>,
    pub binds: Vec<(usize, Value)>,
    pub settings: Vec<String>,
    pub autocommit_changes: Vec<bool>,
    pub commits: usize,
    pub rollbacks: usize,
    pub statements_closed: usize,
    pub cursors_closed: usize,
    pub staged_batches: usize,
    pub batch_executions: usize,
    pub params_cleared: usize,
    pub connection_closed: bool,
}

struct Shared {
    script: Script,
    journal: Journal,
    autocommit: bool,
    bind_calls: usize,
}

#[derive(Clone)]
pub struct MemConnection {
    shared: Rc<RefCell<Shared>>,
}

impl std::fmt::Debug for MemConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemConnection").finish_non_exhaustive()
    }
}

impl MemConnection {
    pub fn new(script: Script) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                script,
                journal: Journal::default(),
                autocommit: true,
                bind_calls: 0,
            })),
        }
    }

    /// Connection whose queries echo their bound parameters back.
    pub fn echo() -> Self {
        Self::new(Script {
            echo: true,
            ..Script::default()
        })
    }

    pub fn with_results(results: Vec<ResultSet>) -> Self {
        Self::new(Script {
            results: results.into(),
            ..Script::default()
        })
    }

    pub fn journal<R>(&self, f: impl FnOnce(&Journal) -> R) -> R {
        f(&self.shared.borrow().journal)
    }

    pub fn script_mut<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.shared.borrow_mut().script)
    }

    pub fn autocommit_now(&self) -> bool {
        self.shared.borrow().autocommit
    }
}

impl Connection for MemConnection {
    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement + '_>> {
        let shared = self.shared.clone();
        {
            let mut state = shared.borrow_mut();
            state.journal.prepared.push(sql.to_string());
            if let Some(err) = state.script.fail_prepare.take() {
                return Err(err);
            }
        }
        Ok(Box::new(MemStatement {
            shared,
            params: Vec::new(),
            staged: Vec::new(),
        }))
    }

    fn autocommit(&self) -> DriverResult<bool> {
        Ok(self.shared.borrow().autocommit)
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let mut state = self.shared.borrow_mut();
        state.journal.autocommit_changes.push(enabled);
        state.autocommit = enabled;
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        let mut state = self.shared.borrow_mut();
        if state.script.fail_commit {
            state.script.fail_commit = false;
            return Err(DriverError::new("commit failed").with_state("XX000", 500));
        }
        state.journal.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.shared.borrow_mut().journal.rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        let mut state = self.shared.borrow_mut();
        if state.script.fail_close {
            return Err(DriverError::new("close failed"));
        }
        state.journal.connection_closed = true;
        Ok(())
    }
}

pub struct MemStatement {
    shared: Rc<RefCell<Shared>>,
    params: Vec<Value>,
    staged: Vec<Vec<Value>>,
}

impl MemStatement {
    fn record_bind(&mut self, index: usize, value: Value) -> DriverResult<()> {
        let mut state = self.shared.borrow_mut();
        state.bind_calls += 1;
        if state.script.fail_bind_at == Some(state.bind_calls) {
            return Err(DriverError::new(format!(
                "bind rejected at call {}",
                state.bind_calls
            )));
        }
        if self.params.len() < index {
            self.params.resize(index, Value::Null);
        }
        self.params[index - 1] = value.clone();
        state.journal.binds.push((index, value));
        Ok(())
    }

    fn record_setting(&mut self, setting: String) -> DriverResult<()> {
        let mut state = self.shared.borrow_mut();
        if state.script.fail_settings {
            return Err(DriverError::new("statement settings are not supported"));
        }
        state.journal.settings.push(setting);
        Ok(())
    }
}

impl Statement for MemStatement {
    fn bind_null(&mut self, index: usize) -> DriverResult<()> {
        self.record_bind(index, Value::Null)
    }

    fn bind_bool(&mut self, index: usize, value: bool) -> DriverResult<()> {
        self.record_bind(index, Value::Bool(value))
    }

    fn bind_i64(&mut self, index: usize, value: i64) -> DriverResult<()> {
        self.record_bind(index, Value::Int(value))
    }

    fn bind_f64(&mut self, index: usize, value: f64) -> DriverResult<()> {
        self.record_bind(index, Value::Float(value))
    }

    fn bind_str(&mut self, index: usize, value: &str) -> DriverResult<()> {
        self.record_bind(index, Value::Text(value.to_string()))
    }

    fn bind_bytes(&mut self, index: usize, value: &[u8]) -> DriverResult<()> {
        self.record_bind(index, Value::Bytes(value.to_vec()))
    }

    fn set_query_timeout(&mut self, timeout: Duration) -> DriverResult<()> {
        self.record_setting(format!("query_timeout={}s", timeout.as_secs()))
    }

    fn set_fetch_size(&mut self, rows: u32) -> DriverResult<()> {
        self.record_setting(format!("fetch_size={rows}"))
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn Cursor>> {
        let shared = self.shared.clone();
        let (columns, rows) = {
            let mut state = shared.borrow_mut();
            if let Some(err) = state.script.fail_execute.take() {
                return Err(err);
            }
            if state.script.echo {
                let columns = (1..=self.params.len()).map(|i| format!("C{i}")).collect();
                (columns, vec![self.params.clone()])
            } else {
                match state.script.results.pop_front() {
                    Some(set) => (set.columns, set.rows),
                    None => {
                        return Err(
                            DriverError::new("no scripted result set").with_state("02000", 2)
                        );
                    }
                }
            }
        };
        Ok(Box::new(MemCursor {
            shared,
            columns,
            rows,
            pos: 0,
            null: false,
        }))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        let mut state = self.shared.borrow_mut();
        if let Some(err) = state.script.fail_execute.take() {
            return Err(err);
        }
        Ok(state.script.update_counts.pop_front().unwrap_or(1))
    }

    fn add_batch(&mut self) -> DriverResult<()> {
        self.staged.push(self.params.clone());
        self.shared.borrow_mut().journal.staged_batches += 1;
        Ok(())
    }

    fn clear_params(&mut self) -> DriverResult<()> {
        self.params.clear();
        self.shared.borrow_mut().journal.params_cleared += 1;
        Ok(())
    }

    fn execute_batch(&mut self) -> DriverResult<Vec<u64>> {
        let mut state = self.shared.borrow_mut();
        if let Some(err) = state.script.fail_execute.take() {
            return Err(err);
        }
        state.journal.batch_executions += 1;
        Ok(state
            .script
            .batch_counts
            .pop_front()
            .unwrap_or_else(|| vec![1; self.staged.len()]))
    }

    fn query_id(&self) -> Option<String> {
        self.shared.borrow().script.query_id.clone()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.shared.borrow_mut().journal.statements_closed += 1;
        Ok(())
    }
}

pub struct MemCursor {
    shared: Rc<RefCell<Shared>>,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    pos: usize,
    null: bool,
}

impl MemCursor {
    fn cell(&self, index: usize) -> DriverResult<Value> {
        self.rows
            .get(self.pos.wrapping_sub(1))
            .and_then(|row| row.get(index.wrapping_sub(1)))
            .cloned()
            .ok_or_else(|| DriverError::new(format!("no value at column {index}")))
    }
}

impl Cursor for MemCursor {
    fn advance(&mut self) -> DriverResult<bool> {
        self.pos += 1;
        Ok(self.pos <= self.rows.len())
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_label(&self, index: usize) -> DriverResult<String> {
        self.columns
            .get(index.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| DriverError::new(format!("no column at index {index}")))
    }

    fn column_type(&self, index: usize) -> Option<String> {
        self.rows
            .first()
            .and_then(|row| row.get(index.wrapping_sub(1)))
            .map(|value| value.type_name().to_string())
    }

    fn get_bool(&mut self, index: usize) -> DriverResult<bool> {
        match self.cell(index)? {
            Value::Null => {
                self.null = true;
                Ok(false)
            }
            Value::Bool(v) => {
                self.null = false;
                Ok(v)
            }
            other => Err(DriverError::new(format!(
                "cannot read {} as BOOLEAN",
                other.type_name()
            ))),
        }
    }

    fn get_i64(&mut self, index: usize) -> DriverResult<i64> {
        match self.cell(index)? {
            Value::Null => {
                self.null = true;
                Ok(0)
            }
            Value::Int(v) => {
                self.null = false;
                Ok(v)
            }
            other => Err(DriverError::new(format!(
                "cannot read {} as NUMBER",
                other.type_name()
            ))),
        }
    }

    fn get_f64(&mut self, index: usize) -> DriverResult<f64> {
        match self.cell(index)? {
            Value::Null => {
                self.null = true;
                Ok(0.0)
            }
            Value::Float(v) => {
                self.null = false;
                Ok(v)
            }
            Value::Int(v) => {
                self.null = false;
                Ok(v as f64)
            }
            other => Err(DriverError::new(format!(
                "cannot read {} as FLOAT",
                other.type_name()
            ))),
        }
    }

    fn get_string(&mut self, index: usize) -> DriverResult<String> {
        match self.cell(index)? {
            Value::Null => {
                self.null = true;
                Ok(String::new())
            }
            Value::Text(v) => {
                self.null = false;
                Ok(v)
            }
            other => Err(DriverError::new(format!(
                "cannot read {} as TEXT",
                other.type_name()
            ))),
        }
    }

    fn get_bytes(&mut self, index: usize) -> DriverResult<Vec<u8>> {
        match self.cell(index)? {
            Value::Null => {
                self.null = true;
                Ok(Vec::new())
            }
            Value::Bytes(v) => {
                self.null = false;
                Ok(v)
            }
            other => Err(DriverError::new(format!(
                "cannot read {} as BINARY",
                other.type_name()
            ))),
        }
    }

    fn was_null(&self) -> bool {
        self.null
    }

    fn query_id(&self) -> Option<String> {
        self.shared.borrow().script.query_id.clone()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.shared.borrow_mut().journal.cursors_closed += 1;
        Ok(())
    }
}
