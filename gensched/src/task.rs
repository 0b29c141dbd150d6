/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the static interrupt scheduler.
//!
//! Two distinct types model the two sides of the pipeline:
//!
//! ```text
//! input line ──(parser)──►  TaskDecl  ──(Schedule::add_task)──►  Task  ──(codegen)──►  C source
//!                            ↑ decoded record                      ↑ registered, slot_count filled
//! ```
//!
//! # Ownership model
//! `Task` is **owned** by the [`Schedule`](crate::schedule::Schedule) task
//! table.  Slots never copy a task; they refer to it through a [`TaskId`], so
//! a task scheduled into eight ticks exists exactly once.

use std::fmt;

// ── Invocation style ──────────────────────────────────────────────────────────

/// How a task is invoked from a tick function.
///
/// Replaces the leading-`!` naming convention with a typed value decoded once
/// by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invocation {
    /// Called through a forward-declared function (`extern void f (void);`).
    #[default]
    Call,
    /// Expanded at the call site (a macro in the target code).
    Inline,
}

// ── Task identity ─────────────────────────────────────────────────────────────

/// Index of a task in the schedule's task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── TaskDecl (parsed record) ──────────────────────────────────────────────────

/// One decoded input record, before conditional resolution and allocation.
///
/// All string-suffix metadata (`!name`, `name?flag`, `name/N`) has already
/// been split into structured fields; nothing downstream re-parses the name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDecl {
    /// Bare C identifier.
    pub name: String,
    pub invocation: Invocation,
    /// Conditional flag that must be defined for this record to be kept.
    pub conditional: Option<String>,
    /// Number of pre-unrolled variants of the target function (`name_0 ..`).
    pub pre_unrolled: Option<u8>,
    /// Period in ticks (power of two).
    pub period: u32,
    /// Estimated length in interrupt periods.
    pub length: f64,
}

// ── Task (registered) ─────────────────────────────────────────────────────────

/// A registered unit of periodic work.
///
/// # Invariants
/// * `period` is a non-zero power of two.
/// * `0.0 <= length < period`.
///
/// Both are enforced by the parser before a `Task` can be created through
/// [`Schedule::add_task`](crate::schedule::Schedule::add_task).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Task {
    pub name: String,
    pub invocation: Invocation,
    pub period: u32,
    pub length: f64,
    pub pre_unrolled: Option<u8>,

    /// Number of slots this task occupies.  Filled in by the allocator.
    pub slot_count: usize,
}

impl Task {
    /// Build a registered task from a decoded record.  The conditional has
    /// already been resolved at this point and is dropped.
    pub fn from_decl(decl: &TaskDecl) -> Self {
        Self {
            name: decl.name.clone(),
            invocation: decl.invocation,
            period: decl.period,
            length: decl.length,
            pre_unrolled: decl.pre_unrolled,
            slot_count: 0,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.invocation == Invocation::Inline
    }

    /// Estimated cost in CPU cycles, truncated.
    pub fn cycles(&self, cycles_per_tick: u32) -> u32 {
        (self.length * f64::from(cycles_per_tick)) as u32
    }

    /// Name of the function to call from tick `tick_index`.
    ///
    /// For a task with `N` pre-unrolled variants, the variants `name_0 ..
    /// name_{N-1}` are cycled through once per period, so tick `n` calls
    /// `name_k` with `k = (n mod N·period) / period`.
    pub fn call_name(&self, tick_index: usize) -> String {
        match self.pre_unrolled {
            Some(count) => {
                let period = self.period as usize;
                let cycle = usize::from(count) * period;
                let variant = (tick_index % cycle) / period;
                format!("{}_{}", self.name, variant)
            }
            None => self.name.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, period: u32, length: f64) -> Task {
        Task {
            name: name.to_string(),
            period,
            length,
            ..Default::default()
        }
    }

    // ── Invocation ────────────────────────────────────────────────────────────

    #[test]
    fn default_invocation_is_call() {
        assert_eq!(Invocation::default(), Invocation::Call);
        assert!(!task("f", 1, 0.1).is_inline());
    }

    #[test]
    fn from_decl_copies_fields_and_resets_slot_count() {
        let decl = TaskDecl {
            name: "lamp_rtt".to_string(),
            invocation: Invocation::Inline,
            conditional: Some("MACHINE_TZ".to_string()),
            pre_unrolled: Some(2),
            period: 4,
            length: 0.25,
        };
        let t = Task::from_decl(&decl);
        assert_eq!(t.name, "lamp_rtt");
        assert!(t.is_inline());
        assert_eq!(t.period, 4);
        assert_eq!(t.length, 0.25);
        assert_eq!(t.pre_unrolled, Some(2));
        assert_eq!(t.slot_count, 0);
    }

    // ── cycles ────────────────────────────────────────────────────────────────

    #[test]
    fn cycles_scales_by_cycles_per_tick() {
        assert_eq!(task("f", 2, 0.5).cycles(1952), 976);
        assert_eq!(task("f", 2, 0.0).cycles(1952), 0);
    }

    // ── call_name ─────────────────────────────────────────────────────────────

    #[test]
    fn call_name_without_variants_is_plain_name() {
        let t = task("switch_rtt", 2, 0.1);
        assert_eq!(t.call_name(0), "switch_rtt");
        assert_eq!(t.call_name(7), "switch_rtt");
    }

    #[test]
    fn call_name_cycles_through_pre_unrolled_variants() {
        // period 2, two variants: ticks 0,1 → _0 ; ticks 2,3 → _1 ; 4,5 → _0 ...
        let t = Task {
            pre_unrolled: Some(2),
            ..task("lamp_rtt", 2, 0.1)
        };
        let names: Vec<String> = (0..8).map(|n| t.call_name(n)).collect();
        assert_eq!(
            names,
            [
                "lamp_rtt_0",
                "lamp_rtt_0",
                "lamp_rtt_1",
                "lamp_rtt_1",
                "lamp_rtt_0",
                "lamp_rtt_0",
                "lamp_rtt_1",
                "lamp_rtt_1"
            ]
        );
    }

    #[test]
    fn task_id_display() {
        assert_eq!(TaskId(3).to_string(), "#3");
    }
}
