//! Inert query and command values.
//!
//! A [`Query`] or [`Command`] is a [`Fragment`] that has committed to how its
//! results are consumed. Both are pure values with no side effects until
//! handed to a [`Session`](crate::Session).

use std::marker::PhantomData;

use crate::row::FromRow;
use crate::sql::{Fragment, Param, param};
use crate::types::Encode;

/// A fragment paired with a row decoder for `T`.
#[must_use]
#[derive(Debug)]
pub struct Query<T> {
    fragment: Fragment,
    marker: PhantomData<fn() -> T>,
}

impl<T: FromRow> Query<T> {
    pub fn new(fragment: Fragment) -> Self {
        Self {
            fragment,
            marker: PhantomData,
        }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }
}

/// A fragment executed for its effect; no rows are decoded.
#[must_use]
#[derive(Debug)]
pub struct Command {
    fragment: Fragment,
}

impl Command {
    pub fn new(fragment: Fragment) -> Self {
        Self { fragment }
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }
}

/// One row of parameters for a batched command.
///
/// Implemented for tuples of encodable values (the common case) and for
/// `Vec<Param>` when the arity is only known at runtime.
pub trait IntoParams {
    fn into_params(self) -> Vec<Param>;
}

impl IntoParams for Vec<Param> {
    fn into_params(self) -> Vec<Param> {
        self
    }
}

macro_rules! impl_into_params {
    ($(($($name:ident),+)),+ $(,)?) => {
        $(
            impl<$($name),+> IntoParams for ($($name,)+)
            where
                $($name: Encode + Send + Sync + 'static),+
            {
                fn into_params(self) -> Vec<Param> {
                    #[allow(non_snake_case)]
                    let ($($name,)+) = self;
                    vec![$(param($name)),+]
                }
            }
        )+
    };
}

impl_into_params!(
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H),
);
