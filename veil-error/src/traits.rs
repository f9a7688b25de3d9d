// Copyright (C) 2024-2026  The Veil Project.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Extension traits for working with the [`Error`][crate::Error] system on
//! [`Result`][std::result::Result] values.

pub(crate) mod loggable;

pub use loggable::Loggable;

use crate::traits::loggable::Warnable;

/// Convert a foreign error ([`std::error::Error`] outside this system) into a
/// [`crate::Error`], keeping the original as the source.
///
/// Do *not* use this for values that are already [`crate::Result`]; use
/// [`PropagateError`] there so the chain keeps its typed links.
pub trait ForeignError<T, S, E>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::CoreError,
{
    /// Maps `Result<T, S>` to `Result<T, crate::Error<E>>`, wrapping the
    /// foreign error as the source and logging a warning.
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Like [`ForeignError::foreign_err`], but the replacement error is
    /// produced by inspecting the foreign error value.
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> ForeignError<T, S, E> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
    E: crate::CoreError,
{
    #[track_caller]
    fn foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }

    #[track_caller]
    fn match_foreign_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_source(f(&source), source))
            .log_warn(*std::panic::Location::caller())
    }
}

/// [`ForeignError`], but for results carrying an already-boxed error
/// (`Box<dyn std::error::Error + Send + Sync>`), as returned by the
/// capability traits.
pub trait ForeignBoxed<T, E>
where
    E: crate::CoreError,
{
    /// Maps `Result<T, Box<dyn Error + Send + Sync>>` to
    /// `Result<T, crate::Error<E>>`, wrapping the boxed error as the source.
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;
}

impl<T, E> ForeignBoxed<T, E> for std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    E: crate::CoreError,
{
    #[track_caller]
    fn foreign_boxed_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_foreign_boxed_source(f(), source))
            .log_warn(*std::panic::Location::caller())
    }
}

/// Propagate an error that is already a [`crate::Error`] into a different
/// error type, keeping the original as the (typed) source.
pub trait PropagateError<T, S, E>
where
    S: crate::CoreError,
    E: crate::CoreError,
{
    /// Maps `Result<T, Error<S>>` to `Result<T, Error<E>>` with a fixed
    /// replacement error.
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E;

    /// Maps `Result<T, Error<S>>` to `Result<T, Error<E>>`, producing the
    /// replacement error by inspecting the source variant.
    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E;
}

impl<T, S, E> PropagateError<T, S, E> for crate::Result<T, S>
where
    S: crate::CoreError,
    E: crate::CoreError,
{
    fn with_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce() -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(), source))
    }

    fn match_err<F>(self, f: F) -> crate::Result<T, E>
    where
        F: FnOnce(&S) -> E,
    {
        self.map_err(|source| crate::Error::from_known_source(f(&source.error), source))
    }
}

/// Attach lazily-evaluated context to the error variant of a
/// [`crate::Result`].
pub trait ErrorContext<T, E>
where
    E: crate::CoreError,
{
    /// Attach context to the [`Err`] variant; [`Ok`] is untouched.
    fn ctx<C, F>(self, f: F) -> crate::Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for crate::Result<T, E>
where
    E: crate::CoreError,
{
    fn ctx<C, F>(self, f: F) -> crate::Result<T, E>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| error.ctx(f()))
    }
}
