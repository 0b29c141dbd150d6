/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-process model of the generated dispatcher.
//!
//! [`Dispatcher`] executes a [`Schedule`] exactly the way the generated C
//! does: one tick function per interrupt, round-robin through the table, a
//! wrapping one-byte divider counter bumped at the end of the last tick, and
//! `divider & (d-1) == 0` gates.  It lets the generator check its own output
//! without a target toolchain.
//!
//! [`verify_periods`] runs one super-cycle (`width × max_divider`
//! interrupts, after which the whole pattern repeats) and checks that every
//! task fires at exactly its declared period.

use tracing::debug;

use crate::schedule::Schedule;
use crate::task::TaskId;

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Runtime state of the generated dispatcher.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    schedule: &'a Schedule,
    /// Index of the tick `<p>_function` designates.
    function: usize,
    /// `<p>_divider`.
    divider: u8,
}

impl<'a> Dispatcher<'a> {
    /// State after `<p>_init ()`.
    pub fn new(schedule: &'a Schedule) -> Self {
        Self {
            schedule,
            function: 0,
            divider: 0,
        }
    }

    /// Service one interrupt; returns the tasks invoked, in call order.
    pub fn step(&mut self) -> Vec<TaskId> {
        let width = self.schedule.width();
        if width == 0 {
            return Vec::new();
        }

        let n = self.function;
        let tick = &self.schedule.ticks()[n];
        let mut invoked = Vec::new();

        for divider in tick.dividers() {
            if u32::from(self.divider) & (divider - 1) != 0 {
                // Gates nest, so no larger divider can pass either.
                break;
            }
            invoked.extend(
                tick.slots
                    .iter()
                    .filter(|s| s.divider == divider)
                    .map(|s| s.task),
            );
        }

        if n == width - 1 && self.schedule.max_divider() > 1 {
            self.divider = self.divider.wrapping_add(1);
        }
        self.function = (n + 1) % width;

        invoked
    }

    /// Run `interrupts` interrupts from the current state and count the
    /// invocations of each task (indexed by `TaskId`).
    pub fn invocation_counts(&mut self, interrupts: usize) -> Vec<usize> {
        let mut counts = vec![0usize; self.schedule.tasks().len()];
        for _ in 0..interrupts {
            for id in self.step() {
                counts[id.0] += 1;
            }
        }
        counts
    }
}

// ── Period verification ───────────────────────────────────────────────────────

/// A task that does not fire at its declared rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodViolation {
    pub task: String,
    pub period: u32,
    /// Interrupt numbers (within one super-cycle) at which the task ran.
    pub fired_at: Vec<usize>,
}

/// Interrupts after which the dispatcher returns to its initial state.
pub fn super_cycle(schedule: &Schedule) -> usize {
    schedule.width() * schedule.max_divider() as usize
}

/// Simulate one super-cycle and report every task whose invocations are not
/// spaced exactly `period` interrupts apart (cyclically).
pub fn verify_periods(schedule: &Schedule) -> Vec<PeriodViolation> {
    let cycle = super_cycle(schedule);
    let mut fired_at: Vec<Vec<usize>> = vec![Vec::new(); schedule.tasks().len()];

    let mut dispatcher = Dispatcher::new(schedule);
    for interrupt in 0..cycle {
        for id in dispatcher.step() {
            fired_at[id.0].push(interrupt);
        }
    }

    let mut violations = Vec::new();
    for (task, times) in schedule.tasks().iter().zip(fired_at) {
        let period = task.period as usize;
        let expected = cycle / period;
        let evenly_spaced = times.len() == expected
            && times
                .iter()
                .zip(times.iter().cycle().skip(1))
                .all(|(&a, &b)| (b + cycle - a) % cycle == period % cycle);

        if !evenly_spaced {
            violations.push(PeriodViolation {
                task: task.name.clone(),
                period: task.period,
                fired_at: times,
            });
        }
    }

    debug!(cycle, violations = violations.len(), "period verification");
    violations
}

// ── Tests ─────────────────────────────────────────────────────────────────────
