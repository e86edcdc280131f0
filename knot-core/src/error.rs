// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error type shared by the buffer codec, the registry and the engine.
//!
//! Error constructors sit on every bounds check of the codec. They are marked
//! `#[cold]` and `#[track_caller]` so the success path stays small, and they are
//! the only way variants should be created.
//!
//! ## Debug mode: KNOT_PANIC_ON_ERROR
//!
//! Building with `KNOT_PANIC_ON_ERROR=1` makes every constructor panic where the
//! error is created, which together with `RUST_BACKTRACE=1` points at the exact
//! failing read or write:
//!
//! ```bash
//! RUST_BACKTRACE=1 KNOT_PANIC_ON_ERROR=1 cargo test
//! ```

use std::borrow::Cow;

use thiserror::Error;

/// Set at compile time through the `KNOT_PANIC_ON_ERROR` environment variable.
pub const PANIC_ON_ERROR: bool = option_env!("KNOT_PANIC_ON_ERROR").is_some();

#[inline(always)]
pub const fn should_panic_on_error() -> bool {
    PANIC_ON_ERROR
}

/// Error type for every knot write, read and copy operation.
///
/// Use the static constructor functions ([`Error::buffer_overflow`],
/// [`Error::unknown_class`], ...) instead of the enum syntax.
///
/// Errors raised below a struct field or a collection element are wrapped into
/// [`Error::Traced`] on their way up, so the top-level caller sees the path from
/// the root object to the failing node:
///
/// ```
/// use knot_core::error::Error;
///
/// let err = Error::buffer_underflow(4, 1, 0)
///     .with_trace("name (Person)")
///     .with_trace("owner (Account)");
/// assert!(matches!(err.root_cause(), Error::BufferUnderflow { .. }));
/// assert_eq!(err.trace(), ["name (Person)", "owner (Account)"]);
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A write needed more room than the buffer's capacity bound allows.
    #[error("Buffer overflow: {required} byte(s) at position {position} exceed the capacity bound {capacity}")]
    BufferOverflow {
        position: usize,
        required: usize,
        capacity: usize,
    },

    /// A read requested more bytes than remain before the limit.
    #[error("Buffer underflow: {required} byte(s) requested at position {position}, {available} available")]
    BufferUnderflow {
        position: usize,
        required: usize,
        available: usize,
    },

    /// A variable-length integer did not terminate within its maximum group count.
    #[error("Malformed varint: {0}")]
    MalformedVarint(Cow<'static, str>),

    /// Registration is required and the type has none.
    #[error("Class is not registered: {0}")]
    UnregisteredClass(Cow<'static, str>),

    /// A class id or name read from the stream does not resolve to a known type.
    #[error("Unable to find class: {0}")]
    UnknownClass(Cow<'static, str>),

    /// A backreference points at an id the read-side table does not hold.
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(Cow<'static, str>),

    /// `position_to_mark` without an outstanding mark, a stale mark, or a flush
    /// while marks are outstanding.
    #[error("Mark misuse: {0}")]
    MarkMisuse(Cow<'static, str>),

    /// The object graph is nested deeper than the configured maximum depth.
    #[error("{0}")]
    DepthExceed(Cow<'static, str>),

    /// Corrupt input or a writer/reader configuration mismatch.
    #[error("{0}")]
    InvalidData(Cow<'static, str>),

    /// A decoded value does not have the type the caller asked for.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Cow<'static, str>,
        found: Cow<'static, str>,
    },

    /// The operation is not available for this buffer or type.
    #[error("{0}")]
    Unsupported(Cow<'static, str>),

    /// Failure of the sink or source behind a stream-backed buffer.
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// An error with the field path from the failing node up to the root.
    #[error("{source}\nSerialization trace:\n{}", .trace.join("\n"))]
    Traced { source: Box<Error>, trace: Vec<String> },
}

macro_rules! message_constructors {
    ($($(#[$meta:meta])* $fn_name:ident => $variant:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[inline(always)]
            #[cold]
            #[track_caller]
            pub fn $fn_name<S: Into<Cow<'static, str>>>(s: S) -> Self {
                Error::raise(Error::$variant(s.into()))
            }
        )*
    };
}

impl Error {
    #[inline(always)]
    #[track_caller]
    fn raise(err: Error) -> Self {
        if PANIC_ON_ERROR {
            panic!("KNOT_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a new [`Error::BufferOverflow`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_overflow(position: usize, required: usize, capacity: usize) -> Self {
        Error::raise(Error::BufferOverflow {
            position,
            required,
            capacity,
        })
    }

    /// Creates a new [`Error::BufferUnderflow`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_underflow(position: usize, required: usize, available: usize) -> Self {
        Error::raise(Error::BufferUnderflow {
            position,
            required,
            available,
        })
    }

    /// Creates a new [`Error::TypeMismatch`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_mismatch<A, B>(expected: A, found: B) -> Self
    where
        A: Into<Cow<'static, str>>,
        B: Into<Cow<'static, str>>,
    {
        Error::raise(Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    /// Creates a new [`Error::Io`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn io(err: std::io::Error) -> Self {
        Error::raise(Error::Io(err))
    }

    message_constructors! {
        /// Creates a new [`Error::MalformedVarint`].
        malformed_varint => MalformedVarint,
        /// Creates a new [`Error::UnregisteredClass`].
        unregistered_class => UnregisteredClass,
        /// Creates a new [`Error::UnknownClass`].
        unknown_class => UnknownClass,
        /// Creates a new [`Error::UnresolvedReference`].
        unresolved_reference => UnresolvedReference,
        /// Creates a new [`Error::MarkMisuse`].
        mark_misuse => MarkMisuse,
        /// Creates a new [`Error::DepthExceed`].
        depth_exceed => DepthExceed,
        /// Creates a new [`Error::InvalidData`].
        invalid_data => InvalidData,
        /// Creates a new [`Error::Unsupported`].
        unsupported => Unsupported,
    }

    /// Appends one segment of field-path context.
    ///
    /// Segments are pushed innermost first, as the error unwinds towards the root.
    #[inline(never)]
    #[cold]
    pub fn with_trace<S: Into<String>>(self, segment: S) -> Self {
        match self {
            Error::Traced { source, mut trace } => {
                trace.push(segment.into());
                Error::Traced { source, trace }
            }
            other => Error::Traced {
                source: Box::new(other),
                trace: vec![segment.into()],
            },
        }
    }

    /// The taxonomy variant underneath any trace wrapping.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Traced { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Field-path segments, innermost first. Empty when no context was attached.
    pub fn trace(&self) -> &[String] {
        match self {
            Error::Traced { trace, .. } => trace,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for Error {
    #[cold]
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Error::io(err)
    }
}

/// Ensures a condition is true; otherwise returns an [`enum@Error`].
///
/// # Examples
/// ```
/// use knot_core::ensure;
/// use knot_core::error::Error;
///
/// fn check_len(n: usize) -> Result<(), Error> {
///     ensure!(n > 0, "length must be positive");
///     ensure!(n < 10, "length {} too large", n);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:literal) => {
        if !$cond {
            return Err($crate::error::Error::invalid_data($msg));
        }
    };
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::Error::invalid_data(format!($fmt, $($arg)*)));
        }
    };
}

/// Returns early with an [`Error::InvalidData`].
///
/// # Examples
/// ```
/// use knot_core::bail;
/// use knot_core::error::Error;
///
/// fn fail_fast() -> Result<(), Error> {
///     bail!("unexpected tag {}", 7);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::error::Error::invalid_data($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::invalid_data(format!($fmt, $($arg)*)))
    };
}
