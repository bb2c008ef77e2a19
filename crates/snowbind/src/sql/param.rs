//! Self-binding query parameters.

use std::fmt;

use crate::driver::Statement;
use crate::error::{QueryError, SnowError, SnowResult};
use crate::types::Encode;

type Binder = Box<dyn Fn(&mut dyn Statement, usize) -> SnowResult<()> + Send + Sync>;

/// A typed, self-binding query argument.
///
/// Captures "how to bind myself at position N on a live statement". Created
/// from a typed value through [`param`], owned by the [`Fragment`](super::Fragment)
/// holding it, never shared.
pub struct Param {
    binder: Binder,
}

impl Param {
    /// Bind the captured value at a 1-based position.
    ///
    /// A driver-level bind failure surfaces as
    /// [`QueryError::ParameterBinding`] carrying the position.
    pub fn bind(&self, stmt: &mut dyn Statement, index: usize) -> SnowResult<()> {
        (self.binder)(stmt, index)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Param")
    }
}

/// Capture a typed value as a self-binding parameter.
pub fn param<T>(value: T) -> Param
where
    T: Encode + Send + Sync + 'static,
{
    Param {
        binder: Box::new(move |stmt, index| {
            value.bind(stmt, index).map_err(|e| {
                SnowError::Query(QueryError::ParameterBinding {
                    index,
                    message: e.to_string(),
                    source: Some(e),
                })
            })
        }),
    }
}
