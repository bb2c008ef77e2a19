//! Composable SQL fragments.
//!
//! A [`Fragment`] is an immutable pair of SQL text and positional parameters.
//! Fragments compose without any manual placeholder counting: `?` markers and
//! their parameters always travel together.
//!
//! # Example
//!
//! ```ignore
//! use snowbind::{clause, frag, Fragment};
//!
//! let base = frag!("SELECT id, name FROM users");
//! let filter = clause!("WHERE status = ", @"active");
//! let ids = Fragment::in_list([1_i64, 2, 3]);
//!
//! let query = base.join(filter).join(frag!("AND id IN ", ids));
//! assert_eq!(
//!     query.sql(),
//!     "SELECT id, name FROM users WHERE status = ? AND id IN (?, ?, ?)"
//! );
//! ```

mod interpolate;
mod param;


pub use param::{Param, param};

use std::fmt;
use std::ops::Add;

use crate::error::{QueryError, SnowError, SnowResult};
use crate::query::{Command, Query};
use crate::row::FromRow;
use crate::types::Encode;

/// An immutable pair of SQL text and ordered positional parameters.
///
/// Composition is free-form; the placeholder/parameter count invariant is
/// checked once, at execution time.
#[must_use]
#[derive(Default)]
pub struct Fragment {
    sql: String,
    params: Vec<Param>,
}

impl Fragment {
    /// Create a fragment from constant SQL text with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Create an empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The SQL text with `?` placeholder markers.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The positional parameters, in placeholder order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether the fragment carries neither text nor parameters.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty() && self.params.is_empty()
    }

    /// Append raw SQL text (no parameters). Empty text is a no-op.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: Encode + Send + Sync + 'static,
    {
        self.sql.push('?');
        self.params.push(param(value));
        self
    }

    /// Append a `?` placeholder with a pre-built parameter.
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.sql.push('?');
        self.params.push(param);
        self
    }

    /// Splice another fragment: its text and parameters append positionally.
    /// Empty fragments are a no-op.
    pub fn push_fragment(&mut self, mut other: Fragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.append(&mut other.params);
        self
    }

    /// Bind a parameter and return `self` (consuming version of
    /// [`push_bind`](Fragment::push_bind), convenient for chaining).
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: Encode + Send + Sync + 'static,
    {
        self.push_bind(value);
        self
    }

    /// Concatenate two fragments with no added separator.
    ///
    /// Also available as the `+` operator.
    pub fn concat(mut self, other: Fragment) -> Self {
        self.push_fragment(other);
        self
    }

    /// Soft concatenation: inserts a single space at the seam, but only when
    /// neither boundary already has whitespace. Safe for joining clauses.
    pub fn join(mut self, other: Fragment) -> Self {
        if other.is_empty() {
            return self;
        }
        let left_open = !self.sql.is_empty() && !self.sql.ends_with(char::is_whitespace);
        let right_open = !other.sql.is_empty() && !other.sql.starts_with(char::is_whitespace);
        if left_open && right_open {
            self.sql.push(' ');
        }
        self.concat(other)
    }

    /// Expand an iterable into a parenthesized `IN`-style list: one `?` per
    /// element, comma-separated.
    ///
    /// An empty iterable renders `(SELECT 1 WHERE 1 = 0)`, always false with
    /// zero parameters, so `x IN (...)` stays valid SQL and keeps the
    /// "member of the empty set" meaning.
    pub fn in_list<I, T>(values: I) -> Fragment
    where
        I: IntoIterator<Item = T>,
        T: Encode + Send + Sync + 'static,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Fragment::new("(SELECT 1 WHERE 1 = 0)");
        };

        let mut fragment = Fragment::new("(");
        fragment.push_bind(first);
        for value in iter {
            fragment.push(", ");
            fragment.push_bind(value);
        }
        fragment.push(")");
        fragment
    }

    /// Strip a margin from every line: the first `|` on each line and
    /// everything before it are removed.
    ///
    /// Lets multi-line fragments be written with consistent indentation
    /// without the marker leaking into the SQL text.
    pub fn strip_margin(self) -> Self {
        self.strip_margin_with('|')
    }

    /// [`strip_margin`](Fragment::strip_margin) with a custom marker char.
    pub fn strip_margin_with(mut self, marker: char) -> Self {
        self.sql = self
            .sql
            .split('\n')
            .map(|line| match line.find(marker) {
                Some(pos) => &line[pos + marker.len_utf8()..],
                None => line,
            })
            .collect::<Vec<_>>()
            .join("\n");
        self
    }

    /// Append one trailing soft-join space, skipped when the text is empty or
    /// already ends with whitespace. This is the only difference between the
    /// [`clause!`](crate::clause) and [`frag!`](crate::frag) construction modes.
    pub fn soft_terminate(&mut self) -> &mut Self {
        if !self.sql.is_empty() && !self.sql.ends_with(char::is_whitespace) {
            self.sql.push(' ');
        }
        self
    }

    /// Pair this fragment with a row decoder for `T`.
    pub fn query<T: FromRow>(self) -> Query<T> {
        Query::new(self)
    }

    /// Treat this fragment as a row-less command.
    pub fn command(self) -> Command {
        Command::new(self)
    }

    /// Check the placeholder/parameter count invariant.
    ///
    /// `?` inside single-quoted string literals is not a placeholder.
    pub(crate) fn validate(&self) -> SnowResult<()> {
        let placeholders = placeholder_count(&self.sql);
        let params = self.params.len();
        if placeholders != params {
            return Err(SnowError::Query(QueryError::PreparedStatement {
                message: format!("fragment: placeholders({placeholders}) != params({params})"),
            }));
        }
        Ok(())
    }
}

impl Add for Fragment {
    type Output = Fragment;

    fn add(self, rhs: Fragment) -> Fragment {
        self.concat(rhs)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("sql", &self.sql)
            .field("params", &self.params.len())
            .finish()
    }
}

/// Count `?` markers outside single-quoted string literals. A doubled quote
/// inside a literal is an escape, not a terminator.
fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if in_literal && chars.peek() == Some(&'\'') {
                    chars.next();
                } else {
                    in_literal = !in_literal;
                }
            }
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}
