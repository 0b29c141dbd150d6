/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! C code generation for a finished [`Schedule`].
//!
//! The generated dispatcher is a ring of tick functions chained through a
//! single function pointer:
//!
//! ```text
//! <p>_driver ──► (*<p>_function)() ──► <p>_0 ──► <p>_1 ──► … ──► <p>_{W-1} ─┐
//!                        ▲                                                  │
//!                        └────────── <p>_function = <p>_0, <p>_divider++ ──┘
//! ```
//!
//! Each interrupt runs exactly one tick function, which invokes its slots and
//! then points `<p>_function` at the next tick, so dispatch is O(1) whatever
//! the table width.  Slots with a divider `d > 1` run under
//! `if (!(<p>_divider & (d-1)))`; the counter is bumped once per sweep by the
//! last tick.  These two variables are the only state shared between
//! interrupts and both are written only at the end of a tick function.
//!
//! Output layout, in order: header comment, shared state, includes, tick
//! prototypes, tick bodies, driver, init routine.

pub mod writer;

use crate::config::{Options, TargetConfig};
use crate::schedule::Schedule;

use writer::{format_g, CodeWriter};

/// Render `schedule` as a complete C translation unit.
///
/// The generator trusts task names; it does not check that the called
/// functions exist.
pub fn render(schedule: &Schedule, options: &Options, target: &TargetConfig) -> String {
    let p = options.prefix.as_str();
    let mut w = CodeWriter::new();

    w.line("/* Automatically generated by gensched */");
    w.blank();

    // ── Shared dispatcher state ───────────────────────────────────────────────
    w.line(&with_attr(
        &target.fastvar_attr,
        &format!("void (*{p}_function) (void);"),
    ));
    w.line(&with_attr(
        &target.fastvar_attr,
        &format!("unsigned char {p}_divider;"),
    ));
    w.blank();

    if !options.includes.is_empty() {
        for include in &options.includes {
            w.raw(&format!("#include \"{include}\""));
        }
        w.blank();
    }

    // ── Prototypes ────────────────────────────────────────────────────────────
    for n in 0..schedule.width() {
        w.line(&format!("{};", tick_signature(p, n, target)));
    }
    w.blank();

    // ── Tick bodies ───────────────────────────────────────────────────────────
    for n in 0..schedule.width() {
        write_tick(&mut w, schedule, n, p, target);
        w.blank();
    }

    // ── Driver ────────────────────────────────────────────────────────────────
    w.line(&format!("void {p}_driver (void)"));
    w.open_block();
    match &target.direct_jump_guard {
        // A single indirect jump; the C compiler cannot be relied on to
        // turn the call below into one.
        Some(guard) => {
            w.raw(&format!("#ifdef {guard}"));
            w.line(&format!("asm (\"jmp\\t[_{p}_function]\");"));
            w.raw("#else");
            w.line(&format!("(*{p}_function) ();"));
            w.raw("#endif");
        }
        None => w.line(&format!("(*{p}_function) ();")),
    }
    w.close_block();
    w.blank();

    // ── Init ──────────────────────────────────────────────────────────────────
    w.line(&format!("void {p}_init (void)"));
    w.open_block();
    w.line(&format!("{p}_function = {p}_0;"));
    w.line(&format!("{p}_divider = 0;"));
    w.close_block();

    w.finish()
}

fn with_attr(attr: &str, decl: &str) -> String {
    if attr.is_empty() {
        decl.to_string()
    } else {
        format!("{attr} {decl}")
    }
}

fn tick_signature(p: &str, n: usize, target: &TargetConfig) -> String {
    format!(
        "static {}",
        with_attr(&target.interrupt_attr, &format!("void {p}_{n} (void)"))
    )
}

fn time_comment(length: f64, target: &TargetConfig) -> String {
    format!(
        "/* {} interrupts / {} cycles */",
        format_g(length),
        format_g(length * f64::from(target.cycles_per_tick))
    )
}

/// Emit the body of tick `n`.
fn write_tick(w: &mut CodeWriter, schedule: &Schedule, n: usize, p: &str, target: &TargetConfig) {
    let tick = &schedule.ticks()[n];
    let width = schedule.width();

    w.line(&tick_signature(p, n, target));
    w.open_block();

    // Gates nest: every gate tests residue 0, so a `d`-gate is only reached
    // when all smaller gates already passed.
    let mut open_gates = 0usize;
    for divider in tick.dividers() {
        if divider > 1 {
            w.blank();
            w.line(&format!("if (!({p}_divider & {}))", divider - 1));
            w.open_block();
            open_gates += 1;
        }

        for slot in tick.slots.iter().filter(|s| s.divider == divider) {
            let task = schedule.task(slot.task);
            let name = task.call_name(n);
            if !task.is_inline() {
                w.line(&format!("extern void {name} (void);"));
            }
            w.line(&format!("{name} (); {}", time_comment(task.length, target)));
        }
    }
    for _ in 0..open_gates {
        w.close_block();
    }

    if n == width - 1 && schedule.max_divider() > 1 {
        w.line(&format!("{p}_divider++;"));
    }
    // With a single tick the pointer already designates it.
    if width > 1 {
        w.line(&format!("{p}_function = {p}_{};", (n + 1) % width));
    }
    w.line(&time_comment(tick.load, target));

    w.close_block();
}

// ── Tests ─────────────────────────────────────────────────────────────────────
