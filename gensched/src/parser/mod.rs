/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule input parser.
//!
//! Input is line-oriented text, one task per line:
//!
//! ```text
//! # name[?cond][/N]   period[c]   length[c]
//! switch_rtt          2           0.08
//! !lamp_rtt/2         2           330c
//! sol_update?HAVE_SOL 4           0.12
//! ```
//!
//! * Blank lines and lines whose first token starts with `#` are ignored.
//! * A `c` / `C` suffix gives a value in CPU cycles; it is divided by the
//!   target's `cycles_per_tick`.
//! * Tokens after the length are ignored.
//!
//! Parsing and allocation are interleaved: every accepted record is handed
//! to [`BuildContext::accept`] before the next line is read, because the
//! placement of later tasks depends on the load left by earlier ones.

use std::borrow::Cow;
use std::io::BufRead;

use tracing::{debug, info};

use crate::context::BuildContext;
use crate::schedule::{RecordFault, SchedError};
use crate::task::{Invocation, TaskDecl};

// ── Time values ───────────────────────────────────────────────────────────────

/// Parse a period or length token into interrupt periods.
///
/// Returns `None` if the token is not a finite decimal number.
pub fn parse_time(token: &str, cycles_per_tick: u32) -> Option<f64> {
    let (digits, in_cycles) = match token.strip_suffix(|c: char| c == 'c' || c == 'C') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    let value = digits.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if in_cycles {
        Some(value / f64::from(cycles_per_tick))
    } else {
        Some(value)
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// Structured form of a name token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub name: String,
    pub invocation: Invocation,
    pub conditional: Option<String>,
    pub pre_unrolled: Option<u8>,
}

/// Split a trailing `/<digit>` off `s`.
fn split_variants(s: &str) -> (&str, Option<u8>) {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[bytes.len() - 2] == b'/' && bytes[bytes.len() - 1].is_ascii_digit() {
        (&s[..s.len() - 2], Some(bytes[bytes.len() - 1] - b'0'))
    } else {
        (s, None)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode `[!]name[?cond][/N]` (or `[!]name[/N][?cond]`).
pub fn decode_name(token: &str) -> Result<NameParts, RecordFault> {
    let (body, invocation) = match token.strip_prefix('!') {
        Some(rest) => (rest, Invocation::Inline),
        None => (token, Invocation::Call),
    };

    let (body, mut pre_unrolled) = split_variants(body);

    let (mut name, conditional) = match body.split_once('?') {
        Some((name, cond)) => {
            if cond.is_empty() {
                return Err(RecordFault::EmptyConditional {
                    name: name.to_string(),
                });
            }
            (name, Some(cond.to_string()))
        }
        None => (body, None),
    };

    if pre_unrolled.is_none() {
        let (stripped, variants) = split_variants(name);
        name = stripped;
        pre_unrolled = variants;
    }

    if pre_unrolled == Some(0) {
        return Err(RecordFault::BadVariantCount {
            name: name.to_string(),
        });
    }
    if !is_c_identifier(name) {
        return Err(RecordFault::BadName {
            name: name.to_string(),
        });
    }

    Ok(NameParts {
        name: name.to_string(),
        invocation,
        conditional,
        pre_unrolled,
    })
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Parse one line.
///
/// Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
/// * [`SchedError::MalformedRecord`]: missing field, bad number or bad name.
/// * [`SchedError::InvalidPeriod`]: period zero or not a power of two.
/// * [`SchedError::NegativeLength`] / [`SchedError::LengthExceedsPeriod`].
pub fn parse_record(
    line: &str,
    source_name: &str,
    lineno: usize,
    cycles_per_tick: u32,
) -> Result<Option<TaskDecl>, SchedError> {
    let malformed = |fault| SchedError::MalformedRecord {
        source_name: source_name.to_string(),
        line: lineno,
        fault,
    };

    let mut fields = line.split_whitespace();
    let name_tok = match fields.next() {
        Some(tok) if !tok.starts_with('#') => tok,
        _ => return Ok(None),
    };
    let period_tok = fields
        .next()
        .ok_or_else(|| malformed(RecordFault::MissingField { field: "period" }))?;
    let length_tok = fields
        .next()
        .ok_or_else(|| malformed(RecordFault::MissingField { field: "length" }))?;

    let parts = decode_name(name_tok).map_err(malformed)?;

    let period = parse_time(period_tok, cycles_per_tick).ok_or_else(|| {
        malformed(RecordFault::BadNumber {
            field: "period",
            token: period_tok.to_string(),
        })
    })?;
    // Fractional periods are truncated; negative ones become zero.
    let period = period as u32;
    if !period.is_power_of_two() {
        return Err(SchedError::InvalidPeriod {
            task: parts.name,
            period,
        });
    }

    let length = parse_time(length_tok, cycles_per_tick).ok_or_else(|| {
        malformed(RecordFault::BadNumber {
            field: "length",
            token: length_tok.to_string(),
        })
    })?;
    if length < 0.0 {
        return Err(SchedError::NegativeLength {
            task: parts.name,
            length,
        });
    }
    if length >= f64::from(period) {
        return Err(SchedError::LengthExceedsPeriod {
            task: parts.name,
            length,
            period,
        });
    }

    Ok(Some(TaskDecl {
        name: parts.name,
        invocation: parts.invocation,
        conditional: parts.conditional,
        pre_unrolled: parts.pre_unrolled,
        period,
        length,
    }))
}

/// Blank line, or first token starts with `#`.
fn is_ignored(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .map_or(true, |tok| tok.starts_with('#'))
}

/// Parse every record in `reader` into `ctx`, allocating each as it is read.
///
/// Lines are read as bytes.  Comment and blank lines may hold any encoding;
/// a record that is not valid UTF-8 is malformed.
///
/// Returns the number of tasks scheduled from this source.
///
/// # Errors
/// The first fatal error stops parsing; see [`parse_record`] and
/// [`BuildContext::accept`].
pub fn parse_schedule<R: BufRead>(
    mut reader: R,
    source_name: &str,
    ctx: &mut BuildContext,
) -> Result<usize, SchedError> {
    let cycles_per_tick = ctx.target().cycles_per_tick;
    let mut scheduled = 0usize;
    let mut buf = Vec::new();
    let mut lineno = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|error| SchedError::Read {
                source_name: source_name.to_string(),
                error,
            })?;
        if read == 0 {
            break;
        }
        lineno += 1;

        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            if is_ignored(&line) {
                continue;
            }
            return Err(SchedError::MalformedRecord {
                source_name: source_name.to_string(),
                line: lineno,
                fault: RecordFault::InvalidEncoding,
            });
        }

        if let Some(decl) = parse_record(&line, source_name, lineno, cycles_per_tick)? {
            debug!(source = source_name, line = lineno, task = %decl.name, "record");
            if ctx.accept(decl)?.is_some() {
                scheduled += 1;
            }
        }
    }

    info!(source = source_name, scheduled, "input parsed");
    Ok(scheduled)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Options, TargetConfig};
    use crate::diagnostics::Advisory;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const CPT: u32 = 1952;

    fn record(line: &str) -> Result<Option<TaskDecl>, SchedError> {
        parse_record(line, "test.sched", 1, CPT)
    }

    fn context(defines: &[&str]) -> BuildContext {
        let options = Options {
            conditionals: defines.iter().map(|d| d.to_string()).collect(),
            ..Options::default()
        };
        BuildContext::new(options, TargetConfig::default()).unwrap()
    }

    // ── parse_time ────────────────────────────────────────────────────────────

    #[test]
    fn parse_time_plain_value_is_in_ticks() {
        assert_eq!(parse_time("16", CPT), Some(16.0));
        assert_eq!(parse_time("0.25", CPT), Some(0.25));
    }

    #[test]
    fn parse_time_cycle_suffix_divides_by_cycles_per_tick() {
        assert_eq!(parse_time("976c", CPT), Some(0.5));
        assert_eq!(parse_time("1952C", CPT), Some(1.0));
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert_eq!(parse_time("fast", CPT), None);
        assert_eq!(parse_time("c", CPT), None);
        assert_eq!(parse_time("inf", CPT), None);
        assert_eq!(parse_time("", CPT), None);
    }

    // ── decode_name ───────────────────────────────────────────────────────────

    #[test]
    fn decode_plain_name() {
        let p = decode_name("switch_rtt").unwrap();
        assert_eq!(p.name, "switch_rtt");
        assert_eq!(p.invocation, Invocation::Call);
        assert_eq!(p.conditional, None);
        assert_eq!(p.pre_unrolled, None);
    }

    #[test]
    fn decode_inline_marker() {
        let p = decode_name("!lamp_rtt").unwrap();
        assert_eq!(p.name, "lamp_rtt");
        assert_eq!(p.invocation, Invocation::Inline);
    }

    #[test]
    fn decode_conditional_and_variants_in_either_order() {
        for token in ["!sol_rtt?HAVE_SOL/4", "!sol_rtt/4?HAVE_SOL"] {
            let p = decode_name(token).unwrap();
            assert_eq!(p.name, "sol_rtt", "token {token}");
            assert_eq!(p.invocation, Invocation::Inline);
            assert_eq!(p.conditional.as_deref(), Some("HAVE_SOL"));
            assert_eq!(p.pre_unrolled, Some(4));
        }
    }

    #[test]
    fn decode_rejects_bad_names() {
        assert!(matches!(decode_name("9lives"), Err(RecordFault::BadName { .. })));
        assert!(matches!(decode_name("a-b"), Err(RecordFault::BadName { .. })));
        assert!(matches!(decode_name("!"), Err(RecordFault::BadName { .. })));
        assert!(matches!(
            decode_name("f/0"),
            Err(RecordFault::BadVariantCount { .. })
        ));
        assert!(matches!(
            decode_name("f?"),
            Err(RecordFault::EmptyConditional { .. })
        ));
    }

    // ── parse_record ──────────────────────────────────────────────────────────

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(record("").unwrap(), None);
        assert_eq!(record("   \t ").unwrap(), None);
        assert_eq!(record("# name period length").unwrap(), None);
        assert_eq!(record("   #indented comment").unwrap(), None);
    }

    #[test]
    fn full_record_is_decoded() {
        let d = record("!lamp_rtt?TZ/2  4  390.4c  trailing ignored")
            .unwrap()
            .unwrap();
        assert_eq!(d.name, "lamp_rtt");
        assert_eq!(d.invocation, Invocation::Inline);
        assert_eq!(d.conditional.as_deref(), Some("TZ"));
        assert_eq!(d.pre_unrolled, Some(2));
        assert_eq!(d.period, 4);
        assert!((d.length - 0.2).abs() < 1e-12);
    }

    #[test]
    fn period_may_be_given_in_cycles() {
        let d = record("f 31232c 0.1").unwrap().unwrap();
        assert_eq!(d.period, 16);
    }

    #[test]
    fn non_power_of_two_period_is_fatal() {
        let err = record("f 6 0.1").unwrap_err();
        assert!(matches!(err, SchedError::InvalidPeriod { period: 6, .. }));
        assert!(err.to_string().contains("must be power of 2"));

        let err = record("f 0 0.1").unwrap_err();
        assert!(matches!(err, SchedError::InvalidPeriod { period: 0, .. }));
    }

    #[test]
    fn length_not_below_period_is_fatal() {
        let err = record("baz 4 5.0").unwrap_err();
        assert!(matches!(
            err,
            SchedError::LengthExceedsPeriod { period: 4, .. }
        ));
        assert!(matches!(
            record("f 1 1.0").unwrap_err(),
            SchedError::LengthExceedsPeriod { .. }
        ));
    }

    #[test]
    fn negative_length_is_fatal() {
        assert!(matches!(
            record("f 2 -0.5").unwrap_err(),
            SchedError::NegativeLength { .. }
        ));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = parse_record("f 2", "in.sched", 7, CPT).unwrap_err();
        match err {
            SchedError::MalformedRecord {
                source_name,
                line,
                fault,
            } => {
                assert_eq!(source_name, "in.sched");
                assert_eq!(line, 7);
                assert_eq!(fault, RecordFault::MissingField { field: "length" });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparsable_number_is_malformed() {
        let err = record("f two 0.1").unwrap_err();
        assert!(matches!(
            err,
            SchedError::MalformedRecord {
                fault: RecordFault::BadNumber { field: "period", .. },
                ..
            }
        ));
    }

    // ── parse_schedule ────────────────────────────────────────────────────────

    #[test]
    fn parse_schedule_allocates_each_record() {
        let input = "# realtime tasks\nfoo 1 0.1\n\nbar 16 0.5\n";
        let mut ctx = context(&[]);
        let n = parse_schedule(Cursor::new(input), "mem", &mut ctx).unwrap();

        assert_eq!(n, 2);
        let s = ctx.schedule();
        assert_eq!(s.width(), 8);
        assert_eq!(s.tasks()[0].slot_count, 8);
        assert_eq!(s.tasks()[1].slot_count, 1);
        assert_eq!(s.max_divider(), 2);
    }

    #[test]
    fn defined_conditional_keeps_record() {
        let mut ctx = context(&["FOO"]);
        let n = parse_schedule(Cursor::new("x?FOO 2 0.1\n"), "mem", &mut ctx).unwrap();
        assert_eq!(n, 1);
        assert_eq!(ctx.schedule().tasks()[0].name, "x");
        assert_eq!(ctx.schedule().tasks()[0].slot_count, 4);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn undefined_conditional_skips_record_with_advisory() {
        let mut ctx = context(&[]);
        let n = parse_schedule(Cursor::new("x?FOO 2 0.1\ny 2 0.1\n"), "mem", &mut ctx).unwrap();
        assert_eq!(n, 1);
        assert_eq!(ctx.schedule().tasks().len(), 1);
        assert_eq!(ctx.schedule().tasks()[0].name, "y");
        assert_eq!(
            ctx.diagnostics().advisories(),
            &[Advisory::ConditionalSkipped {
                task: "x".to_string(),
                conditional: "FOO".to_string()
            }]
        );
    }

    #[test]
    fn invalid_period_under_undefined_conditional_is_still_fatal() {
        let mut ctx = context(&[]);
        let err = parse_schedule(Cursor::new("x?FOO 3 0.1\n"), "mem", &mut ctx).unwrap_err();
        assert!(matches!(err, SchedError::InvalidPeriod { .. }));
    }

    #[test]
    fn error_reports_line_number() {
        let mut ctx = context(&[]);
        let input = "a 1 0.1\n# comment\nb 2\n";
        let err = parse_schedule(Cursor::new(input), "tasks.sched", &mut ctx).unwrap_err();
        assert!(err.to_string().starts_with("tasks.sched:3:"), "got: {err}");
    }

    #[test]
    fn non_utf8_comment_is_ignored() {
        let mut ctx = context(&[]);
        let input: &[u8] = b"# caf\xe9 timing\nfoo 1 0.1\n";
        let n = parse_schedule(Cursor::new(input), "mem", &mut ctx).unwrap();
        assert_eq!(n, 1);
        assert_eq!(ctx.schedule().tasks()[0].name, "foo");
    }

    #[test]
    fn non_utf8_record_is_malformed_at_its_line() {
        let mut ctx = context(&[]);
        let input: &[u8] = b"foo 1 0.1\nb\xe4r 2 0.1\n";
        let err = parse_schedule(Cursor::new(input), "mem", &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            SchedError::MalformedRecord {
                line: 2,
                fault: RecordFault::InvalidEncoding,
                ..
            }
        ));
        assert!(err.to_string().starts_with("mem:2:"), "got: {err}");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut ctx = context(&[]);
        let n = parse_schedule(Cursor::new("# dos\r\nfoo 2 0.1\r\n"), "mem", &mut ctx).unwrap();
        assert_eq!(n, 1);
        assert_eq!(ctx.schedule().tasks()[0].period, 2);
    }

    #[test]
    fn parse_schedule_reads_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"a 2 0.3\nb 2 0.3\n").unwrap();

        let mut ctx = context(&[]);
        let file = std::io::BufReader::new(std::fs::File::open(f.path()).unwrap());
        parse_schedule(file, "file", &mut ctx).unwrap();

        assert!(ctx.schedule().ticks().iter().all(|t| t.load <= 0.6 + 1e-12));
    }
}
