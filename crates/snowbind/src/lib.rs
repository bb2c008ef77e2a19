//! # snowbind
//!
//! A typed binding/decoding core for Snowflake-style warehouses.
//!
//! ## Features
//!
//! - **SQL explicit**: SQL is a first-class citizen, composed as [`Fragment`]s
//!   that carry their parameters with them (`frag!` / `clause!`)
//! - **Type-safe mapping**: row → struct via the [`FromRow`] trait, with
//!   normalized column-name resolution (`CREATED_AT` matches `created_at`)
//! - **Driver-agnostic**: the wire driver is consumed through the traits in
//!   [`driver`]; any conforming implementation plugs in
//! - **Scoped sessions**: row access and transactions over one borrowed
//!   connection, with guaranteed auto-commit restoration
//! - **Closed error model**: every operation returns [`SnowResult`]; native
//!   driver failures are classified, never rethrown
//!
//! ## Example
//!
//! ```ignore
//! use snowbind::{frag, Client, FromRow};
//!
//! #[derive(FromRow)]
//! struct User {
//!     id: i64,
//!     user_name: String,
//!     email: Option<String>,
//! }
//!
//! let client = Client::new(provider);
//! let min_id = 100_i64;
//! let users: Vec<User> = client.session(|session| {
//!     session.list(
//!         &frag!("SELECT id, user_name, email FROM users WHERE id >= ", @min_id)
//!             .query(),
//!     )
//! })?;
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod execute;
pub mod meta;
pub mod provider;
pub mod query;
pub mod row;
pub mod session;
pub mod sql;
pub mod types;

pub use config::{Authenticator, ConnectionConfig, ConnectionConfigBuilder, ResultFormat};
pub use error::{ConfigError, ConnectionError, DecodeError, QueryError, SnowError, SnowResult};
pub use execute::{BatchResult, QueryResult, StatementSettings, UpdateResult};
pub use meta::ColumnMeta;
pub use provider::{
    Client, ConfiguredProvider, ConnectionProvider, DirectProvider, PooledProvider, PoolingMode,
    with_connection,
};
pub use query::{Command, IntoParams, Query};
pub use row::{FromRow, Row};
pub use session::{RowStream, Session};
pub use sql::{Fragment, Param, param};
pub use types::{Decode, Encode};

#[cfg(feature = "derive")]
pub use snowbind_derive::FromRow;
