/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tick allocator: the load balancer that places each task into ticks.
//!
//! Allocation is greedy and incremental.  Each task is placed as soon as it
//! is parsed, against the fill state left by the tasks before it, so the
//! result depends on input order but is fully deterministic for a given
//! order.
//!
//! # Decision procedure for period `P`, length `L`
//! 1. `P` wider than the table but within `max_ticks`: widen (once), then
//!    `count = width / P` evenly spaced slots.
//! 2. `P > max_ticks`: one slot, gated by `divider = P / width`.  Dividers
//!    above [`MAX_DIVIDER`] are fatal.
//! 3. Otherwise `count = width / P` slots.
//!
//! The starting tick is then chosen by [`Schedule::find_best_tick`]: the
//! candidate whose affected ticks carry the least load wins.  Two terms bias
//! the search:
//!
//! | Term | Cost | Effect |
//! |---|---|---|
//! | `load + L >= 1.0` | [`OVERLOAD_COST`] | soft-rejects ticks that would run past the next interrupt |
//! | divided task, last tick | [`DIVIDER_AFFINITY_COST`] | clusters divider gates into one tick |

use tracing::debug;

use super::{Schedule, SchedError, MAX_DIVIDER};
use crate::task::{Task, TaskDecl, TaskId};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Cost of a tick that would be overloaded by the new task.
pub const OVERLOAD_COST: f64 = 99999.0;

/// Cost of the last tick for a task that needs a divider.
pub const DIVIDER_AFFINITY_COST: f64 = -1.0;

// ── Placement plan ────────────────────────────────────────────────────────────

/// How many slots a task needs and how each is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub count: usize,
    pub divider: u32,
}

impl Schedule {
    /// Register `decl` as a task and allocate its slots.
    ///
    /// # Errors
    /// * [`SchedError::TaskTableFull`]: task table exhausted.
    /// * [`SchedError::DividerTooLarge`]: `P / width` does not fit a byte.
    /// * [`SchedError::SlotTableFull`]: a chosen tick is full.
    pub fn add_task(&mut self, decl: &TaskDecl) -> Result<TaskId, SchedError> {
        let id = self.register_task(Task::from_decl(decl))?;
        let placement = self.plan(decl)?;

        let period = decl.period as usize;
        let mut tick = self.find_best_tick(period, placement.count, decl.length);

        debug!(
            task    = %decl.name,
            period  = decl.period,
            length  = decl.length,
            count   = placement.count,
            divider = placement.divider,
            start   = tick,
            "placing task"
        );

        for _ in 0..placement.count {
            self.alloc_slot(tick, id, placement.divider)?;
            tick = (tick + period) % self.width();
        }

        Ok(id)
    }

    /// Decide the slot count and divider for a task, widening the table when
    /// the period calls for it.
    fn plan(&mut self, decl: &TaskDecl) -> Result<Placement, SchedError> {
        let period = decl.period as usize;

        if period > self.width() {
            if period <= self.limits.max_ticks {
                self.widen(period);
                return Ok(Placement {
                    count: self.width() / period,
                    divider: 1,
                });
            }

            // Dividers are relative to the unrolled table, so it must exist.
            if !self.is_widened() {
                self.widen(self.limits.max_ticks);
            }

            let divider = decl.period / self.width() as u32;
            if divider > MAX_DIVIDER {
                return Err(SchedError::DividerTooLarge {
                    task: decl.name.clone(),
                    period: decl.period,
                    divider,
                });
            }
            self.note_divider(divider);
            return Ok(Placement { count: 1, divider });
        }

        Ok(Placement {
            count: self.width() / period,
            divider: 1,
        })
    }

    /// Choose the first tick for a task that needs `count` slots spaced
    /// `width / count` apart.
    ///
    /// Every starting tick `0 <= s < width / count` is scored by summing the
    /// cost of the ticks it would use; the lowest total wins and ties go to
    /// the lowest index.
    pub fn find_best_tick(&self, period: usize, count: usize, length: f64) -> usize {
        let width = self.width();
        let stride = width / count;
        let divided = period > width;

        let mut best = 0;
        let mut best_cost = f64::INFINITY;

        for start in 0..stride {
            let total: f64 = (0..count)
                .map(|i| {
                    let load = self.ticks[start + stride * i].load;
                    if load + length >= 1.0 {
                        OVERLOAD_COST
                    } else if divided && start == stride - 1 {
                        DIVIDER_AFFINITY_COST
                    } else {
                        load
                    }
                })
                .sum();

            if total < best_cost {
                best_cost = total;
                best = start;
            }
        }

        best
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
