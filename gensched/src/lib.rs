/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! gensched – static interrupt scheduler generator
//!
//! Reads periodic task declarations and emits C source for a fully unrolled,
//! load-balanced, interrupt-driven dispatcher.
//!
//! ```text
//! lib.rs
//! ├── task          – task declarations and scheduled tasks
//! ├── parser/       – text record format → TaskDecl
//! ├── schedule/     – tick table, slot allocator, fatal errors
//! ├── diagnostics   – non-fatal advisories about the finished table
//! ├── config/       – target profile (YAML) and generator options
//! ├── context       – per-run state threaded through every stage
//! ├── codegen/      – C source emission
//! └── sim           – dispatcher model used to verify task periods
//! ```

pub mod codegen;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod parser;
pub mod schedule;
pub mod sim;
pub mod task;
