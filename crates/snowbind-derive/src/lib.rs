//! Derive macros for snowbind.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_row;

/// Derives `snowbind::FromRow` for a struct with named fields.
///
/// Each field resolves its column by field name through the normalized
/// column-name resolver, so `created_at` matches a `CREATED_AT` or
/// `createdAt` label. Fields decode in declaration order and the first
/// failure is returned unchanged; the struct is only constructed when every
/// field succeeded.
///
/// Use `#[row(column = "...")]` to look a field up under a different name:
///
/// ```ignore
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     #[row(column = "FULL_NAME")]
///     name: String,
///     email: Option<String>,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(row))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
