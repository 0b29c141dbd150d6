/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The schedule model: tasks, ticks and slots.
//!
//! A [`Schedule`] is the single mutable table that the parser feeds, the
//! allocator populates and the code generator reads.  It replaces the
//! process-wide arrays of a classic generator with an explicit value, so each
//! stage can be tested on its own.
//!
//! ```text
//! Schedule
//! ├── tasks: Vec<Task>            (index = TaskId)
//! └── ticks: Vec<Tick>            (len = width, power of two, ≤ max_ticks)
//!     └── slots: Vec<Slot>        (task: TaskId, divider: power of two)
//! ```
//!
//! # Static limits
//! The generated dispatcher must have a statically bounded footprint, so the
//! task table and the per-tick slot table are hard caps ([`Limits`]).
//! Exceeding either is a fatal [`SchedError`], never silent growth.

pub mod allocator;
pub mod error;

pub use error::{RecordFault, SchedError};

use tracing::{debug, info};

use crate::task::{Task, TaskId};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Absolute cap on the unrolling width accepted from the command line.
pub const MAX_UNROLL: usize = 32;

/// Default maximum unrolling width (`-M`).
pub const DEFAULT_MAX_TICKS: usize = 8;

/// Largest divider representable by the one-byte runtime counter.
pub const MAX_DIVIDER: u32 = 255;

// ── Limits ────────────────────────────────────────────────────────────────────

/// Static capacities of the schedule tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum unrolling width in ticks.  Must be a power of two.
    pub max_ticks: usize,
    pub max_tasks: usize,
    /// Slots per tick.  A tick may be filled to exactly this many; no slot
    /// is held in reserve.
    pub max_slots_per_tick: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            max_tasks: 64,
            max_slots_per_tick: 32,
        }
    }
}

// ── Slot / Tick ───────────────────────────────────────────────────────────────

/// One scheduled invocation of a task within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub task: TaskId,
    /// Power-of-two runtime gate; `1` fires on every pass through the tick.
    pub divider: u32,
}

/// One unrolled instance of the interrupt handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tick {
    /// Slots in insertion order.
    pub slots: Vec<Slot>,
    /// Estimated load in interrupt periods: Σ length / divider.
    /// A load estimate only; values ≥ 1.0 are allowed and reported.
    pub load: f64,
}

impl Tick {
    /// Distinct dividers used in this tick, ascending.
    pub fn dividers(&self) -> Vec<u32> {
        let mut divs: Vec<u32> = self.slots.iter().map(|s| s.divider).collect();
        divs.sort_unstable();
        divs.dedup();
        divs
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// The task and tick tables for one generator run.
#[derive(Debug, Clone)]
pub struct Schedule {
    limits: Limits,
    tasks: Vec<Task>,
    ticks: Vec<Tick>,
    widened: bool,
    max_divider: u32,
}

impl Schedule {
    /// Create an empty schedule.  No ticks exist until the first
    /// [`widen`](Self::widen).
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            tasks: Vec::new(),
            ticks: Vec::new(),
            widened: false,
            max_divider: 1,
        }
    }

    // ── Read access ───────────────────────────────────────────────────────────

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Current number of ticks (0 before widening).
    pub fn width(&self) -> usize {
        self.ticks.len()
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    /// Largest divider in use; `1` means no gates are generated.
    pub fn max_divider(&self) -> u32 {
        self.max_divider
    }

    pub fn is_widened(&self) -> bool {
        self.widened
    }

    /// Mean estimated load over all ticks; `0.0` for an empty table.
    pub fn average_load(&self) -> f64 {
        if self.ticks.is_empty() {
            0.0
        } else {
            self.ticks.iter().map(|t| t.load).sum::<f64>() / self.ticks.len() as f64
        }
    }

    /// All `(tick index, slot)` pairs that invoke `id`, in tick order.
    pub fn slots_of(&self, id: TaskId) -> Vec<(usize, Slot)> {
        self.ticks
            .iter()
            .enumerate()
            .flat_map(|(n, tick)| {
                tick.slots
                    .iter()
                    .filter(move |s| s.task == id)
                    .map(move |s| (n, *s))
            })
            .collect()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Append `task` to the task table.
    ///
    /// # Errors
    /// [`SchedError::TaskTableFull`] once `max_tasks` tasks are registered.
    pub fn register_task(&mut self, task: Task) -> Result<TaskId, SchedError> {
        if self.tasks.len() >= self.limits.max_tasks {
            return Err(SchedError::TaskTableFull {
                task: task.name,
                limit: self.limits.max_tasks,
            });
        }
        let id = TaskId(self.tasks.len());
        debug!(task = %task.name, id = %id, "task registered");
        self.tasks.push(task);
        Ok(id)
    }

    /// Size the tick table.
    ///
    /// The table is widened to `max_ticks` in one shot, the first time this is
    /// called, whatever `requested` width triggered it.  Later calls leave it
    /// untouched.  Returns `true` if this call created the ticks.
    pub fn widen(&mut self, requested: usize) -> bool {
        if self.widened {
            debug!(requested, width = self.width(), "tick table already widened");
            return false;
        }
        let width = self.limits.max_ticks;
        self.ticks = vec![Tick::default(); width];
        self.widened = true;
        info!(requested, width, "tick table widened");
        true
    }

    /// Append a slot for `task` to tick `tick` and charge its load.
    ///
    /// # Errors
    /// * [`SchedError::TickOutOfRange`] if `tick >= width` (including before
    ///   the first widen).
    /// * [`SchedError::SlotTableFull`] if the tick already holds
    ///   `max_slots_per_tick` slots.
    pub fn alloc_slot(&mut self, tick: usize, task: TaskId, divider: u32) -> Result<(), SchedError> {
        let limit = self.limits.max_slots_per_tick;
        let width = self.width();
        let length = self.tasks[task.0].length;
        let t = self
            .ticks
            .get_mut(tick)
            .ok_or(SchedError::TickOutOfRange { tick, width })?;

        if t.slots.len() >= limit {
            return Err(SchedError::SlotTableFull { tick, limit });
        }

        t.slots.push(Slot { task, divider });
        t.load += length / f64::from(divider);
        self.tasks[task.0].slot_count += 1;
        Ok(())
    }

    /// Record that `divider` is in use.
    pub(crate) fn note_divider(&mut self, divider: u32) {
        self.max_divider = self.max_divider.max(divider);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
