//! Fragment construction macros.
//!
//! [`frag!`](crate::frag) builds a [`Fragment`](super::Fragment) from
//! comma-separated segments:
//!
//! - a string literal appends SQL text,
//! - `@expr` binds a scalar value as a `?` parameter,
//! - any other expression splices a nested fragment (its text and parameters).
//!
//! [`clause!`](crate::clause) is identical except that it appends one trailing
//! soft-join space, which makes consecutive clauses safe to concatenate.

/// Build a [`Fragment`](crate::Fragment) from literal SQL and typed arguments.
///
/// ```ignore
/// let min_age = 21_i64;
/// let q = frag!("SELECT id FROM users WHERE age >= ", @min_age);
/// assert_eq!(q.sql(), "SELECT id FROM users WHERE age >= ?");
/// ```
#[macro_export]
macro_rules! frag {
    ($($parts:tt)*) => {{
        #[allow(unused_mut)]
        let mut __fragment = $crate::Fragment::empty();
        $crate::__frag_segments!(__fragment; $($parts)*);
        __fragment
    }};
}

/// Like [`frag!`](crate::frag), with one trailing soft-join space appended at
/// the very end.
#[macro_export]
macro_rules! clause {
    ($($parts:tt)*) => {{
        let mut __fragment = $crate::frag!($($parts)*);
        __fragment.soft_terminate();
        __fragment
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __frag_segments {
    ($fragment:ident;) => {};
    ($fragment:ident; @ $value:expr $(, $($rest:tt)*)?) => {
        $fragment.push_bind($value);
        $($crate::__frag_segments!($fragment; $($rest)*);)?
    };
    ($fragment:ident; $text:literal $(, $($rest:tt)*)?) => {
        $fragment.push($text);
        $($crate::__frag_segments!($fragment; $($rest)*);)?
    };
    ($fragment:ident; $nested:expr $(, $($rest:tt)*)?) => {
        $fragment.push_fragment($nested);
        $($crate::__frag_segments!($fragment; $($rest)*);)?
    };
}
