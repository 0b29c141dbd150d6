/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the static scheduler generator.
//!
//! Every variant here is **fatal**: the binary logs it and exits non-zero
//! without writing any output.  Non-fatal conditions are
//! [`Advisory`](crate::diagnostics::Advisory) values instead.
//!
//! Two layers of detail:
//!
//! * [`RecordFault`]: why a single input line could not be decoded.
//! * [`SchedError`]: top-level failure returned by the parser, the
//!   allocator and option validation.
//!
//! Every variant carries the task name or source location and the offending
//! value, so the operator can fix the input without re-running with more
//! logging.

use thiserror::Error;

// ── Record decoding ───────────────────────────────────────────────────────────

/// Detailed reason why an input record is malformed.
///
/// Carried inside [`SchedError::MalformedRecord`] together with the source
/// name and line number.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFault {
    /// The record has a name but no period and/or length field.
    MissingField { field: &'static str },

    /// A period or length token is not a decimal number.
    BadNumber { field: &'static str, token: String },

    /// After stripping `!`, `?flag` and `/N`, the name is not a C identifier.
    BadName { name: String },

    /// A `/N` suffix with `N == 0`.
    BadVariantCount { name: String },

    /// A `?` with nothing after it.
    EmptyConditional { name: String },

    /// A record line that is not valid UTF-8.
    InvalidEncoding,
}

impl std::fmt::Display for RecordFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFault::MissingField { field } => write!(f, "missing {} field", field),
            RecordFault::BadNumber { field, token } => {
                write!(f, "{} '{}' is not a number", field, token)
            }
            RecordFault::BadName { name } => {
                write!(f, "'{}' is not a valid C identifier", name)
            }
            RecordFault::BadVariantCount { name } => write!(
                f,
                "'{}' declares zero pre-unrolled variants (use /1 .. /9)",
                name
            ),
            RecordFault::EmptyConditional { name } => {
                write!(f, "'{}' has an empty conditional after '?'", name)
            }
            RecordFault::InvalidEncoding => write!(f, "line is not valid UTF-8"),
        }
    }
}

// ── Top-level errors ──────────────────────────────────────────────────────────

/// Fatal error raised while building a schedule.
///
/// | Variant | Raised by |
/// |---|---|
/// | `MalformedRecord` / `InvalidPeriod` / `LengthExceedsPeriod` / `NegativeLength` | parser |
/// | `DividerTooLarge` / `SlotTableFull` / `TaskTableFull` / `TickOutOfRange` | allocator |
/// | `Read` | parser (I/O) |
/// | `InvalidUnrollWidth` / `InvalidPrefix` | option validation |
#[derive(Debug, Error)]
pub enum SchedError {
    /// A line could not be decoded into a record.
    #[error("{source_name}:{line}: malformed record: {fault}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        fault: RecordFault,
    },

    /// The period is zero or not a power of two.
    #[error("invalid period '{period}' for '{task}' (must be power of 2)")]
    InvalidPeriod { task: String, period: u32 },

    /// `length >= period`: the task could never meet its own rate.
    #[error("'{task}' has length {length} which is not less than its period {period}")]
    LengthExceedsPeriod {
        task: String,
        length: f64,
        period: u32,
    },

    /// Lengths are estimates of execution time and cannot be negative.
    #[error("'{task}' has negative length {length}")]
    NegativeLength { task: String, length: f64 },

    /// The runtime divider counter is a single byte.
    #[error(
        "period {period} of '{task}' is too large: divider {divider} exceeds the \
         one-byte range (max 255)"
    )]
    DividerTooLarge {
        task: String,
        period: u32,
        divider: u32,
    },

    /// The per-tick slot table is a fixed-size resource.
    #[error(
        "too many tasks scheduled in tick {tick} (limit {limit}); increase \
         max_slots_per_tick in the target profile and regenerate"
    )]
    SlotTableFull { tick: usize, limit: usize },

    /// The task table is a fixed-size resource.
    #[error(
        "too many tasks declared (limit {limit}) while adding '{task}'; increase \
         max_tasks in the target profile and regenerate"
    )]
    TaskTableFull { task: String, limit: usize },

    /// A slot was requested in a tick that does not exist.
    #[error("tick {tick} is outside the tick table (width {width})")]
    TickOutOfRange { tick: usize, width: usize },

    /// An input stream failed while being read.
    #[error("{source_name}: read error")]
    Read {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// `-M` must be a power of two no larger than the absolute unrolling cap.
    #[error("invalid maximum unrolling width {width} (must be a power of 2 between 1 and {cap})")]
    InvalidUnrollWidth { width: usize, cap: usize },

    /// Every generated symbol starts with the prefix, so it must be a C identifier.
    #[error("invalid symbol prefix '{prefix}' (must be a C identifier)")]
    InvalidPrefix { prefix: String },
}
