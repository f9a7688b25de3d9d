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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the error handling system used across the Veil
//! workspace.
//!
//! Constructed errors are automatically logged as warnings, and carry the
//! chain of source errors with them, along with any extra context attached
//! along the way.
//!
//! # Details
//!
//! Functions which may fail return `std::result::Result<T, veil_error::Error<E>>`,
//! or equivalently [`Result<T, E>`].
//!
//! The error type `E` inside [`Error<E>`] must implement the [`CoreError`]
//! trait, so every concrete error enum in the workspace implements
//! [`CoreError`].
//!
//! The initial, root error is constructed via [`Error::root`], which also logs
//! a warning at the call site.
//!
//! Errors defined outside this system -- implementing [`std::error::Error`]
//! but not [`CoreError`] -- are called "foreign errors" and are converted &
//! propagated via the [`ForeignError`][traits::ForeignError] and
//! [`ForeignBoxed`][traits::ForeignBoxed] traits.
//!
//! Propagating an [`Error<E>`] into an [`Error<F>`] is done via the
//! [`PropagateError`][traits::PropagateError] trait instead of `?`, which
//! preserves the trace of source errors.
//!
//! Extra context is attached with [`Error::ctx`], or with the
//! [`ErrorContext`][traits::ErrorContext] extension trait on [`Result`].
//!
//! # Examples
//!
//! ```
//! use veil_error::traits::{ErrorContext, ForeignError};
//!
//! #[derive(Debug)]
//! enum CounterError {
//!     NotANumber,
//! }
//!
//! impl std::fmt::Display for CounterError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "counter is not a number")
//!     }
//! }
//!
//! impl veil_error::CoreError for CounterError {}
//!
//! fn parse_counter(raw: &str) -> veil_error::Result<u64, CounterError> {
//!     raw.parse()
//!         // Propagate the foreign error, logging a warning.
//!         .foreign_err(|| CounterError::NotANumber)
//!         // Attach the offending input for diagnostics.
//!         .ctx(|| raw.to_owned())
//! }
//!
//! assert_eq!(parse_counter("17").unwrap(), 17);
//! assert!(parse_counter("seventeen").is_err());
//! ```

mod display;
pub mod traits;

use crate::traits::loggable::Warnable;

/// The trait every concrete error type must implement to be carried by
/// [`Error`].
///
/// Implementors should provide a human-readable [`std::fmt::Display`] message;
/// they should *not* implement [`std::error::Error`] themselves, as [`Error`]
/// takes care of that.
pub trait CoreError: std::fmt::Display + Send + Sync + 'static {}

// Covers boxed error types, including `Box<dyn CoreError>`.
impl<E: CoreError + ?Sized> CoreError for Box<E> {}

pub(crate) trait KnownError: std::error::Error + Send + Sync {
    fn as_err(&self) -> &(dyn std::error::Error + 'static);
}

impl<E: CoreError> KnownError for Error<E> {
    fn as_err(&self) -> &(dyn std::error::Error + 'static) {
        self
    }
}

pub(crate) enum ErrorSource {
    Known(Box<dyn KnownError>),
    Foreign(Box<dyn std::error::Error + Send + Sync>),
}

/// The error wrapper used for all fallible operations in the workspace.
///
/// It carries the concrete error variant `E` (the *message*), any number of
/// context entries attached while the error propagated (the *details*), and
/// an optional source error (the *cause*), which may itself be another
/// [`Error`] or a foreign [`std::error::Error`].
pub struct Error<E>
where
    E: CoreError,
{
    /// The concrete error variant.
    pub error: E,
    /// Context entries attached via [`Error::ctx`], in attachment order.
    pub(crate) context: Vec<Box<dyn std::fmt::Display + Send + Sync>>,
    /// The source of this error, if it was propagated from another one.
    pub(crate) source: Option<ErrorSource>,
}

/// [`std::result::Result`] alias wrapping the error into [`Error`].
pub type Result<T, E> = std::result::Result<T, Error<E>>;

impl<E> Error<E>
where
    E: CoreError,
{
    /// Create a root error (one without a source) and log a warning.
    ///
    /// Use this at the place where an error condition is first detected. Do
    /// *not* use it to propagate another error -- the chain would be lost;
    /// use [`traits::ForeignError`] or [`traits::PropagateError`] instead.
    #[track_caller]
    pub fn root(error: E) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: None,
        }
        .log_warn(*std::panic::Location::caller())
    }

    pub(crate) fn from_foreign_source<S>(error: E, source: S) -> Self
    where
        S: std::error::Error + Send + Sync + 'static,
    {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::Foreign(Box::new(source))),
        }
    }

    pub(crate) fn from_foreign_boxed_source(
        error: E,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::Foreign(source)),
        }
    }

    pub(crate) fn from_known_source<S>(error: E, source: S) -> Self
    where
        S: KnownError + 'static,
    {
        Self {
            error,
            context: Vec::new(),
            source: Some(ErrorSource::Known(Box::new(source))),
        }
    }

    /// Attach additional context to the error and return it.
    ///
    /// Takes ownership of `self` so calls can be chained; context can be
    /// attached any number of times and every entry is kept.
    pub fn ctx<C>(mut self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.context.push(Box::new(context));
        self
    }
}

impl<E> std::error::Error for Error<E>
where
    E: CoreError,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| match source {
            ErrorSource::Known(source) => source.as_ref().as_err(),
            ErrorSource::Foreign(source) => source.as_ref() as _,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum StubError {
        Inner,
        Outer,
    }

    impl std::fmt::Display for StubError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Inner => write!(f, "Inner"),
                Self::Outer => write!(f, "Outer"),
            }
        }
    }

    impl CoreError for StubError {}

    #[test]
    fn root_error_has_no_source() {
        let error = Error::root(StubError::Inner);

        assert_eq!(error.error, StubError::Inner);
        assert!(error.source().is_none());
    }

    #[test]
    fn known_source_is_preserved() {
        let inner = Error::root(StubError::Inner);
        let outer = Error::from_known_source(StubError::Outer, inner);

        assert_eq!(outer.error, StubError::Outer);
        assert!(matches!(outer.source, Some(ErrorSource::Known(_))));
        assert!(outer.source().is_some());
    }

    #[test]
    fn foreign_source_is_preserved() {
        let io_error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let outer = Error::from_foreign_source(StubError::Outer, io_error);

        assert_eq!(outer.error, StubError::Outer);
        assert!(matches!(outer.source, Some(ErrorSource::Foreign(_))));
        assert!(outer.source().is_some());
    }

    #[test]
    fn context_entries_accumulate() {
        let error = Error::root(StubError::Inner)
            .ctx("first detail")
            .ctx("second detail");

        let rendered: Vec<String> = error.context.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["first detail", "second detail"]);
    }
}
