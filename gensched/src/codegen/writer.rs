/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Indentation-aware text sink for generated C, plus `%g`-style number
//! formatting for the timing comments.

/// Significant digits used by [`format_g`] (C's default `%g` precision).
const G_PRECISION: usize = 6;

/// Accumulates generated source, one line at a time.
///
/// Indentation is one tab per open block; preprocessor lines go through
/// [`raw`](Self::raw) and are never indented.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an indented line.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Append a line at column 0.
    pub fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    pub fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Format `value` like C's `printf("%g")`: six significant digits, trailing
/// zeros trimmed, exponent form outside `1e-4 ..= 1e6`.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return String::from("0");
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // Rounding to the requested precision fixes the decimal exponent.
    let sci = format!("{:.*e}", G_PRECISION - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= G_PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (G_PRECISION as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
