//! Checked access to words and blocks
//!
//! Every slot, header and immediate access in this crate funnels through [`checked`]. With debug
//! assertions enabled the predicate is evaluated against the access target and a failure unwinds
//! with an [`AssertionFailure`] naming the predicate and the caller's location. Release builds
//! return the target untouched without evaluating the predicate.

use std::panic::{self, Location};

use thiserror::Error;

/// Failed structural assertion on a checked access
///
/// This is raised as a panic payload. It indicates a bug in the caller rather than a fault in the
/// program being run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{line}: assertion failed: {predicate}")]
pub struct AssertionFailure {
    /// Source text of the failed predicate
    pub predicate: &'static str,
    /// File containing the access
    pub file: &'static str,
    /// Line of the access
    pub line: u32,
}

/// Returns `target` after asserting `holds` in debug builds
///
/// `target` is evaluated exactly once by the caller; `holds` only borrows it.
#[track_caller]
#[inline(always)]
pub fn checked<T>(target: T, predicate: &'static str, holds: impl FnOnce(&T) -> bool) -> T {
    if cfg!(debug_assertions) && !holds(&target) {
        fail(predicate, Location::caller());
    }

    target
}

/// Asserts a predicate with no access target in debug builds
#[track_caller]
#[inline(always)]
pub fn require(predicate: &'static str, holds: impl FnOnce() -> bool) {
    if cfg!(debug_assertions) && !holds() {
        fail(predicate, Location::caller());
    }
}

#[cold]
#[inline(never)]
fn fail(predicate: &'static str, location: &'static Location<'static>) -> ! {
    let failure = AssertionFailure {
        predicate,
        file: location.file(),
        line: location.line(),
    };

    log::error!("{}", failure);
    panic::panic_any(failure)
}

/// Checked access with the predicate text taken from its source
///
/// `checked!(target, |v| predicate)` evaluates `target` once, asserts the closure in debug builds
/// and evaluates to `target`.
#[macro_export]
macro_rules! checked {
    ($target:expr, |$binding:ident| $predicate:expr) => {
        $crate::check::checked($target, stringify!($predicate), |$binding| $predicate)
    };
}

/// Checked assertion with no access target
#[macro_export]
macro_rules! require {
    ($predicate:expr) => {
        $crate::check::require(stringify!($predicate), || $predicate)
    };
}
