// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Error codes shared by the interrupt dispatcher, the wake primitive, the
//! buffer pool and the deferred I/O pipeline.
//!
//! Every fallible operation returns a [`KResult`]. Whether an error can be
//! handled at runtime is answered by [`KErrorKind::is_recoverable`]: only
//! [`KErrorKind::OutOfRange`] (a misconfigured interrupt line) and
//! [`KErrorKind::InvalidInput`] are caller bugs.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use strum::EnumCount;

/// The error kind type used by the I/O core.
#[repr(i32)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, EnumCount)]
pub enum KErrorKind {
    /// An interrupt line outside of the dispatch table was used.
    OutOfRange = 1,
    /// No buffer is left in the pool.
    ResourceExhausted,
    /// The downstream queue is full.
    Backpressure,
    /// The hardware rejected a transmit request.
    HardwareBusy,
    /// A bounded wait expired.
    TimedOut,
    /// Invalid parameter/argument.
    InvalidInput,
    /// The device reported an inconsistent state.
    BadState,
}

impl KErrorKind {
    pub fn as_str(&self) -> &'static str {
        use KErrorKind::*;
        match *self {
            OutOfRange => "Interrupt line out of range",
            ResourceExhausted => "Buffer pool exhausted",
            Backpressure => "Downstream queue full",
            HardwareBusy => "Hardware busy",
            TimedOut => "Timed out",
            InvalidInput => "Invalid input parameter",
            BadState => "Bad device state",
        }
    }

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Whether the condition can be handled by dropping or retrying work.
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, KErrorKind::OutOfRange | KErrorKind::InvalidInput)
    }
}

impl TryFrom<i32> for KErrorKind {
    type Error = i32;

    #[inline]
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value > 0 && value <= KErrorKind::COUNT as i32 {
            Ok(unsafe { core::mem::transmute::<i32, KErrorKind>(value) })
        } else {
            Err(value)
        }
    }
}

impl fmt::Display for KErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The error type used by the I/O core.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct KError(i32);

impl KError {
    const fn new(kind: KErrorKind) -> Self {
        KError(kind.code())
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub fn kind(self) -> KErrorKind {
        // SAFETY: `KError` is only ever built from a `KErrorKind`.
        unsafe { core::mem::transmute::<i32, KErrorKind>(self.0) }
    }

    pub fn is_recoverable(self) -> bool {
        self.kind().is_recoverable()
    }

    pub fn try_from_i32(value: i32) -> Result<Self, i32> {
        KErrorKind::try_from(value).map(KError::new)
    }
}

impl From<KErrorKind> for KError {
    fn from(kind: KErrorKind) -> Self {
        KError::new(kind)
    }
}

impl From<KError> for KErrorKind {
    fn from(e: KError) -> Self {
        e.kind()
    }
}

impl fmt::Debug for KError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KErrorKind::{:?}", self.kind())
    }
}

impl fmt::Display for KError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

impl core::error::Error for KError {}

macro_rules! kerror_consts {
    ($($name:ident),*) => {
        #[allow(non_upper_case_globals)]
        impl KError {
            $(
                #[doc = concat!("An [`KError`] with kind [`KErrorKind::", stringify!($name), "`].")]
                pub const $name: Self = Self::new(KErrorKind::$name);
            )*
        }
    };
}

kerror_consts!(
    OutOfRange,
    ResourceExhausted,
    Backpressure,
    HardwareBusy,
    TimedOut,
    InvalidInput,
    BadState
);

/// A specialized [`Result`] type with [`KError`] as the error type.
pub type KResult<T = ()> = Result<T, KError>;

/// Convenience method to construct an [`KError`] type while printing a warning
/// message.
///
/// # Examples
///
/// ```
/// # use kerrno::{k_err_type, KError};
/// #
/// // Also print "[KError::HardwareBusy]" if the `log` crate is enabled.
/// assert_eq!(k_err_type!(HardwareBusy), KError::HardwareBusy);
///
/// // Also print "[KError::OutOfRange] line 64" if the `log` crate is enabled.
/// assert_eq!(k_err_type!(OutOfRange, "line 64"), KError::OutOfRange);
/// ```
#[macro_export]
macro_rules! k_err_type {
    ($err:ident) => {{
        use $crate::KErrorKind::*;
        let err = $crate::KError::from($err);
        $crate::__priv::warn!("[{:?}]", err);
        err
    }};
    ($err:ident, $msg:expr) => {{
        use $crate::KErrorKind::*;
        let err = $crate::KError::from($err);
        $crate::__priv::warn!("[{:?}] {}", err, $msg);
        err
    }};
}

/// Ensure a condition is true. If it is not, return from the function
/// with an error.
///
/// ## Examples
///
/// ```rust
/// # use kerrno::{ensure, k_err, KError, KResult};
///
/// fn example(line: usize) -> KResult {
///     ensure!(line < 64, k_err!(OutOfRange));
///     Ok(())
/// }
/// assert_eq!(example(64), Err(KError::OutOfRange));
/// ```
#[macro_export]
macro_rules! ensure {
    ($predicate:expr, $context_selector:expr $(,)?) => {
        if !$predicate {
            return $context_selector;
        }
    };
}

/// Convenience method to construct an [`Err(KError)`] type while printing a
/// warning message.
///
/// # Examples
///
/// ```
/// # use kerrno::{k_err, KResult, KError};
/// #
/// assert_eq!(
///     k_err!(Backpressure),
///     KResult::<()>::Err(KError::Backpressure),
/// );
/// assert_eq!(
///     k_err!(TimedOut, "rx wake"),
///     KResult::<()>::Err(KError::TimedOut),
/// );
/// ```
/// [`Err(KError)`]: Err
#[macro_export]
macro_rules! k_err {
    ($err:ident) => {
        Err($crate::k_err_type!($err))
    };
    ($err:ident, $msg:expr) => {
        Err($crate::k_err_type!($err, $msg))
    };
}

/// Throws an error of type [`KError`] with the given error code, optionally
/// with a message.
#[macro_export]
macro_rules! k_bail {
    ($($t:tt)*) => {
        return $crate::k_err!($($t)*);
    };
}

#[doc(hidden)]
pub mod __priv {
    pub use log::warn;
}
