/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Advisory diagnostics.
//!
//! Advisories are code-quality signals for the operator: they are logged to
//! stderr at `warn` level and collected, but never change the exit code or
//! suppress output.  Fatal conditions live in
//! [`SchedError`](crate::schedule::SchedError).
//!
//! Advisories come from two places:
//! * the parser, when a record is skipped because its conditional is not
//!   defined;
//! * [`review`], run once over the finished schedule before code generation.

use std::fmt;

use tracing::warn;

use crate::config::TargetConfig;
use crate::schedule::Schedule;

// ── Advisory ──────────────────────────────────────────────────────────────────

/// A non-fatal finding about the schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Large inline body expanded in many ticks: wastes code space.
    ShouldNotBeInline { task: String, slots: usize, cycles: u32 },

    /// Tiny out-of-line task: call/return overhead dominates its cost.
    ShouldBeInline { task: String, cycles: u32, overhead: u32 },

    /// A tick's estimated load reaches a full interrupt period.
    TickOverloaded { tick: usize, load: f64 },

    /// The mean load over all ticks is above the configured threshold.
    HighUtilization { average: f64, threshold: f64 },

    /// A record was dropped because its conditional flag is not defined.
    ConditionalSkipped { task: String, conditional: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::ShouldNotBeInline { task, slots, cycles } => write!(
                f,
                "{} should not be inline ({} copies of {} cycles)",
                task, slots, cycles
            ),
            Advisory::ShouldBeInline {
                task,
                cycles,
                overhead,
            } => write!(
                f,
                "{} should be inline, only takes {} cycles (call/return costs {})",
                task, cycles, overhead
            ),
            Advisory::TickOverloaded { tick, load } => {
                write!(f, "tick {} takes too long ({:.3} interrupts)", tick, load)
            }
            Advisory::HighUtilization { average, threshold } => write!(
                f,
                "average tick utilization {:.1}% exceeds {:.0}%",
                average * 100.0,
                threshold * 100.0
            ),
            Advisory::ConditionalSkipped { task, conditional } => write!(
                f,
                "skipping entry for '{}' ('{}' is not defined)",
                task, conditional
            ),
        }
    }
}

// ── Diagnostics collector ─────────────────────────────────────────────────────

/// Collects advisories for one generator run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    advisories: Vec<Advisory>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `advisory` and keep it.
    pub fn report(&mut self, advisory: Advisory) {
        warn!("{}", advisory);
        self.advisories.push(advisory);
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }
}

// ── Schedule review ───────────────────────────────────────────────────────────

/// Inline tasks used in more than this many slots are candidates for
/// [`Advisory::ShouldNotBeInline`].
const INLINE_COPIES_LIMIT: usize = 2;

/// Inspect a finished schedule for inefficient inlining and overload.
///
/// Task findings come first in task order, then tick findings in tick order,
/// then the utilisation summary.
pub fn review(schedule: &Schedule, target: &TargetConfig) -> Vec<Advisory> {
    let mut found = Vec::new();

    for task in schedule.tasks() {
        let cycles = task.cycles(target.cycles_per_tick);
        if task.is_inline() {
            if task.slot_count > INLINE_COPIES_LIMIT && cycles > target.inline_max_cycles {
                found.push(Advisory::ShouldNotBeInline {
                    task: task.name.clone(),
                    slots: task.slot_count,
                    cycles,
                });
            }
        } else if cycles < target.inline_min_cycles {
            found.push(Advisory::ShouldBeInline {
                task: task.name.clone(),
                cycles,
                overhead: target.call_overhead_cycles(),
            });
        }
    }

    for (n, tick) in schedule.ticks().iter().enumerate() {
        if tick.load >= 1.0 {
            found.push(Advisory::TickOverloaded {
                tick: n,
                load: tick.load,
            });
        }
    }

    let average = schedule.average_load();
    if average > target.warn_utilization_high {
        found.push(Advisory::HighUtilization {
            average,
            threshold: target.warn_utilization_high,
        });
    }

    found
}

// ── Tests ─────────────────────────────────────────────────────────────────────
