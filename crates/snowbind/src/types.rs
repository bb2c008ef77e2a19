//! Typed value encoding and decoding.
//!
//! One `Encode` and one `Decode` implementation per supported type. The set
//! is open: downstream crates implement the traits for their own types (for
//! example a domain wrapper over a VARIANT column) without touching this
//! module.
//!
//! Temporal, decimal, uuid and semi-structured values travel as text (the
//! driver converts server-side), so their codecs parse from and render to
//! the backend's text forms.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::driver::{Cursor, DriverError, DriverResult, Statement};
use crate::error::DecodeError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Encodes a value into a positional statement parameter.
pub trait Encode {
    /// Bind this value at a 1-based position on a live statement.
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()>;
}

/// Decodes a result column into a typed value.
///
/// Implementations must perform the raw driver read first and check
/// [`Cursor::was_null`] immediately after: the raw getter returns a
/// type-specific default for NULL that is otherwise indistinguishable from a
/// real value.
pub trait Decode: Sized {
    /// Read the column at a 1-based position from the current row.
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        (**self).bind(stmt, index)
    }
}

/// `None` binds NULL; a NULL column decodes to `None`.
///
/// Only the no-value decode failure maps to `None`: every other decoding
/// failure (type mismatch, bad index, parse error) propagates unchanged.
impl<T: Encode> Encode for Option<T> {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        match self {
            Some(value) => value.bind(stmt, index),
            None => stmt.bind_null(index),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        match T::decode(cursor, index) {
            Ok(value) => Ok(Some(value)),
            Err(DecodeError::NullValue) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

fn type_mismatch(
    cursor: &dyn Cursor,
    index: usize,
    target: &'static str,
    cause: DriverError,
) -> DecodeError {
    DecodeError::TypeMismatch {
        index,
        source_type: cursor
            .column_type(index)
            .unwrap_or_else(|| "unknown".to_string()),
        target_type: target,
        cause: cause.to_string(),
    }
}

fn non_null<T>(cursor: &dyn Cursor, value: T) -> Result<T, DecodeError> {
    if cursor.was_null() {
        Err(DecodeError::NullValue)
    } else {
        Ok(value)
    }
}

/// Raw text read plus the mandatory null check, shared by the text-borne
/// codecs below.
fn text_cell(
    cursor: &mut dyn Cursor,
    index: usize,
    target: &'static str,
) -> Result<String, DecodeError> {
    let raw = cursor
        .get_string(index)
        .map_err(|e| type_mismatch(cursor, index, target, e))?;
    non_null(cursor, raw)
}

// ─── Booleans and numbers ───────────────────────────────────────────────────

impl Encode for bool {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_bool(index, *self)
    }
}

impl Decode for bool {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_bool(index)
            .map_err(|e| type_mismatch(cursor, index, "bool", e))?;
        non_null(cursor, raw)
    }
}

impl Encode for i16 {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_i64(index, i64::from(*self))
    }
}

impl Decode for i16 {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_i64(index)
            .map_err(|e| type_mismatch(cursor, index, "i16", e))?;
        let raw = non_null(cursor, raw)?;
        i16::try_from(raw).map_err(|_| DecodeError::TypeMismatch {
            index,
            source_type: "integer".to_string(),
            target_type: "i16",
            cause: format!("value {raw} out of range"),
        })
    }
}

impl Encode for i32 {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_i64(index, i64::from(*self))
    }
}

impl Decode for i32 {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_i64(index)
            .map_err(|e| type_mismatch(cursor, index, "i32", e))?;
        let raw = non_null(cursor, raw)?;
        i32::try_from(raw).map_err(|_| DecodeError::TypeMismatch {
            index,
            source_type: "integer".to_string(),
            target_type: "i32",
            cause: format!("value {raw} out of range"),
        })
    }
}

impl Encode for i64 {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_i64(index, *self)
    }
}

impl Decode for i64 {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_i64(index)
            .map_err(|e| type_mismatch(cursor, index, "i64", e))?;
        non_null(cursor, raw)
    }
}

impl Encode for f32 {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_f64(index, f64::from(*self))
    }
}

impl Decode for f32 {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_f64(index)
            .map_err(|e| type_mismatch(cursor, index, "f32", e))?;
        non_null(cursor, raw as f32)
    }
}

impl Encode for f64 {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_f64(index, *self)
    }
}

impl Decode for f64 {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_f64(index)
            .map_err(|e| type_mismatch(cursor, index, "f64", e))?;
        non_null(cursor, raw)
    }
}

// ─── Text and binary ────────────────────────────────────────────────────────

impl Encode for str {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, self)
    }
}

impl Encode for String {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, self)
    }
}

impl Decode for String {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        text_cell(cursor, index, "String")
    }
}

impl Encode for Vec<u8> {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_bytes(index, self)
    }
}

impl Decode for Vec<u8> {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let raw = cursor
            .get_bytes(index)
            .map_err(|e| type_mismatch(cursor, index, "Vec<u8>", e))?;
        non_null(cursor, raw)
    }
}

// ─── Temporal types ─────────────────────────────────────────────────────────

impl Encode for NaiveDate {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.format(DATE_FORMAT).to_string())
    }
}

impl Decode for NaiveDate {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "NaiveDate")?;
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map_err(|e| DecodeError::Custom(format!("invalid date '{text}': {e}")))
    }
}

impl Encode for NaiveTime {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.format(TIME_FORMAT).to_string())
    }
}

impl Decode for NaiveTime {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "NaiveTime")?;
        NaiveTime::parse_from_str(&text, TIME_FORMAT)
            .map_err(|e| DecodeError::Custom(format!("invalid time '{text}': {e}")))
    }
}

impl Encode for NaiveDateTime {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.format(DATETIME_FORMAT).to_string())
    }
}

impl Decode for NaiveDateTime {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "NaiveDateTime")?;
        NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
            .map_err(|e| DecodeError::Custom(format!("invalid timestamp '{text}': {e}")))
    }
}

impl Encode for DateTime<Utc> {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.to_rfc3339())
    }
}

impl Decode for DateTime<Utc> {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "DateTime<Utc>")?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
            return Ok(parsed.with_timezone(&Utc));
        }
        // Warehouse TIMESTAMP_TZ text form: "2024-01-02 03:04:05.000 +01:00".
        DateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f %:z")
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| DecodeError::Custom(format!("invalid timestamp '{text}': {e}")))
    }
}

// ─── Structured types ───────────────────────────────────────────────────────

impl Encode for uuid::Uuid {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.to_string())
    }
}

impl Decode for uuid::Uuid {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "Uuid")?;
        uuid::Uuid::parse_str(&text)
            .map_err(|e| DecodeError::Custom(format!("invalid uuid '{text}': {e}")))
    }
}

impl Encode for serde_json::Value {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.to_string())
    }
}

impl Decode for serde_json::Value {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        let text = text_cell(cursor, index, "serde_json::Value")?;
        serde_json::from_str(&text)
            .map_err(|e| DecodeError::Custom(format!("invalid json document: {e}")))
    }
}

#[cfg(feature = "rust_decimal")]
impl Encode for rust_decimal::Decimal {
    fn bind(&self, stmt: &mut dyn Statement, index: usize) -> DriverResult<()> {
        stmt.bind_str(index, &self.to_string())
    }
}

#[cfg(feature = "rust_decimal")]
impl Decode for rust_decimal::Decimal {
    fn decode(cursor: &mut dyn Cursor, index: usize) -> Result<Self, DecodeError> {
        use std::str::FromStr;

        let text = text_cell(cursor, index, "Decimal")?;
        rust_decimal::Decimal::from_str(&text)
            .map_err(|e| DecodeError::Custom(format!("invalid decimal '{text}': {e}")))
    }
}
