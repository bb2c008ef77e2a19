//! Row access and row-to-struct mapping.

use crate::driver::Cursor;
use crate::error::DecodeError;
use crate::meta::ColumnMeta;
use crate::types::Decode;

/// Typed access to the current row of a result set.
///
/// Couples the live cursor with the result set's [`ColumnMeta`] so fields can
/// be read by name (normalized resolution) or by 1-based position.
pub struct Row<'a> {
    cursor: &'a mut dyn Cursor,
    meta: &'a ColumnMeta,
}

impl<'a> Row<'a> {
    pub fn new(cursor: &'a mut dyn Cursor, meta: &'a ColumnMeta) -> Self {
        Self { cursor, meta }
    }

    pub fn meta(&self) -> &ColumnMeta {
        self.meta
    }

    /// Resolve a field or column name to its 1-based position.
    pub fn resolve(&self, name: &str) -> Result<usize, DecodeError> {
        self.meta.resolve(name)
    }

    /// Read a column by name: resolve, then decode at the resolved position.
    pub fn get<T: Decode>(&mut self, name: &str) -> Result<T, DecodeError> {
        let index = self.resolve(name)?;
        self.get_at(index)
    }

    /// Read a column by 1-based position.
    pub fn get_at<T: Decode>(&mut self, index: usize) -> Result<T, DecodeError> {
        if index == 0 || index > self.meta.column_count() {
            return Err(DecodeError::InvalidColumnIndex {
                index,
                max: self.meta.column_count(),
            });
        }
        T::decode(self.cursor, index)
    }
}

/// Converts one result row into a Rust value.
///
/// For structs this is typically derived with `#[derive(FromRow)]`: each
/// field resolves its column by (normalized) field name, decodes in
/// declaration order, and the struct is only constructed when every field
/// succeeded; the first failure is returned unchanged.
///
/// # Example
///
/// ```ignore
/// use snowbind::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     user_name: String,       // matches USER_NAME, userName, user_name...
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &mut Row<'_>) -> Result<Self, DecodeError>;
}

// Single-column rows bypass name resolution and always read position 1.
macro_rules! impl_scalar_from_row {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &mut Row<'_>) -> Result<Self, DecodeError> {
                    row.get_at(1)
                }
            }
        )+
    };
}

impl_scalar_from_row!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Vec<u8>,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    uuid::Uuid,
    serde_json::Value,
);

#[cfg(feature = "rust_decimal")]
impl_scalar_from_row!(rust_decimal::Decimal);

impl<T: Decode> FromRow for Option<T> {
    fn from_row(row: &mut Row<'_>) -> Result<Self, DecodeError> {
        row.get_at(1)
    }
}

// Positional tuple rows: column i feeds tuple slot i.
macro_rules! impl_tuple_from_row {
    ($(($($index:tt $name:ident),+)),+ $(,)?) => {
        $(
            impl<$($name: Decode),+> FromRow for ($($name,)+) {
                fn from_row(row: &mut Row<'_>) -> Result<Self, DecodeError> {
                    Ok(($(row.get_at::<$name>($index)?,)+))
                }
            }
        )+
    };
}

impl_tuple_from_row!(
    (1 A, 2 B),
    (1 A, 2 B, 3 C),
    (1 A, 2 B, 3 C, 4 D),
);
