/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The build context threaded through parser, allocator and generator.
//!
//! One `BuildContext` holds everything a generator run mutates: the
//! [`Schedule`], the collected [`Diagnostics`], and the read-only
//! [`Options`] / [`TargetConfig`].  There is no ambient global state, so
//! several independent runs can coexist (e.g. in tests).
//!
//! # Example
//! ```rust
//! use gensched::config::{Options, TargetConfig};
//! use gensched::context::BuildContext;
//!
//! let mut ctx = BuildContext::new(Options::default(), TargetConfig::default()).unwrap();
//! ctx.parse_str("foo 1 0.1\n", "inline").unwrap();
//! let source = ctx.generate();
//! assert!(source.contains("void tick_driver (void)"));
//! ```

use std::io::Cursor;

use tracing::{debug, info};

use crate::codegen;
use crate::config::{Options, TargetConfig};
use crate::diagnostics::{self, Advisory, Diagnostics};
use crate::parser;
use crate::schedule::{SchedError, Schedule};
use crate::task::{TaskDecl, TaskId};

/// Mutable state of one generator run.
#[derive(Debug)]
pub struct BuildContext {
    options: Options,
    target: TargetConfig,
    schedule: Schedule,
    diagnostics: Diagnostics,
}

impl BuildContext {
    /// Create a context with an empty schedule.
    ///
    /// # Errors
    /// [`SchedError::InvalidUnrollWidth`] if `options.max_ticks` is unusable.
    pub fn new(options: Options, target: TargetConfig) -> Result<Self, SchedError> {
        options.validate()?;
        let schedule = Schedule::new(options.limits(&target));
        Ok(Self {
            options,
            target,
            schedule,
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Resolve the record's conditional and, if it holds, schedule the task.
    ///
    /// Returns `Ok(None)` when the record is skipped because its conditional
    /// is not defined; an advisory is reported in that case.
    pub fn accept(&mut self, decl: TaskDecl) -> Result<Option<TaskId>, SchedError> {
        if let Some(cond) = &decl.conditional {
            if !self.options.is_defined(cond) {
                self.diagnostics.report(Advisory::ConditionalSkipped {
                    task: decl.name.clone(),
                    conditional: cond.clone(),
                });
                return Ok(None);
            }
            debug!(task = %decl.name, conditional = %cond, "conditional defined");
        }
        self.schedule.add_task(&decl).map(Some)
    }

    /// Parse and schedule records held in a string.
    pub fn parse_str(&mut self, text: &str, source_name: &str) -> Result<usize, SchedError> {
        parser::parse_schedule(Cursor::new(text), source_name, self)
    }

    /// Review the finished schedule and render it as C source.
    ///
    /// An empty run (no task accepted) still produces a well-formed
    /// dispatcher: the table is widened here so every symbol exists.
    pub fn generate(&mut self) -> String {
        if !self.schedule.is_widened() {
            self.schedule.widen(self.options.max_ticks);
        }

        for advisory in diagnostics::review(&self.schedule, &self.target) {
            self.diagnostics.report(advisory);
        }

        info!(
            tasks       = self.schedule.tasks().len(),
            ticks       = self.schedule.width(),
            max_divider = self.schedule.max_divider(),
            average_load = self.schedule.average_load(),
            advisories  = self.diagnostics.advisories().len(),
            "=== Schedule complete ==="
        );

        codegen::render(&self.schedule, &self.options, &self.target)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
