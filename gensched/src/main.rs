/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use gensched::config::{Options, TargetConfig};
use gensched::context::BuildContext;
use gensched::parser;
use gensched::schedule::DEFAULT_MAX_TICKS;
use gensched::sim;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Static interrupt scheduler generator.
///
/// Example:
///   gensched -M 16 -i sys.h -D HAVE_SOUND -o sched.c tasks.sched
#[derive(Debug, Parser)]
#[command(
    name = "gensched",
    about = "Generate an unrolled, load-balanced C interrupt dispatcher",
    long_about = None,
)]
struct Cli {
    /// Output file (standard output when omitted).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Header to #include in the generated file (repeatable).
    #[arg(short = 'i', long = "include")]
    includes: Vec<String>,

    /// Maximum number of unrolled ticks (power of 2).
    #[arg(short = 'M', long = "max-ticks", default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: usize,

    /// Prefix for every generated symbol.
    #[arg(short = 'p', long = "prefix", default_value = "tick")]
    prefix: String,

    /// Define a conditional for `name?FLAG` records (repeatable).
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,

    /// Extra task record given on the command line (repeatable).
    #[arg(short = 't', long = "task")]
    tasks: Vec<String>,

    /// Path to the YAML target profile.
    #[arg(short = 'c', long = "target-config")]
    target_config: Option<PathBuf>,

    /// Task description files; `-` reads standard input.
    inputs: Vec<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr so they never mix with generated source on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    info!(
        max_ticks     = cli.max_ticks,
        prefix        = %cli.prefix,
        includes      = ?cli.includes,
        defines       = ?cli.defines,
        inputs        = ?cli.inputs,
        target_config = ?cli.target_config,
        output        = ?cli.output,
        "Configuration"
    );

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // ── Load target profile ───────────────────────────────────────────────────
    let target = match &cli.target_config {
        Some(path) => {
            info!("Loading target profile from: {}", path.display());
            TargetConfig::load_from_file(path)?
        }
        None => TargetConfig::default(),
    };

    let options = Options {
        max_ticks: cli.max_ticks,
        prefix: cli.prefix,
        includes: cli.includes,
        conditionals: cli.defines.into_iter().collect::<BTreeSet<_>>(),
    };

    let mut ctx = BuildContext::new(options, target)?;

    // ── Read task descriptions ────────────────────────────────────────────────
    for path in &cli.inputs {
        if path.as_os_str() == "-" {
            parser::parse_schedule(io::stdin().lock(), "<stdin>", &mut ctx)?;
        } else {
            let file = File::open(path)
                .with_context(|| format!("Cannot open task file: {}", path.display()))?;
            let name = path.display().to_string();
            parser::parse_schedule(BufReader::new(file), &name, &mut ctx)?;
        }
    }

    for (i, record) in cli.tasks.iter().enumerate() {
        let name = format!("--task #{}", i + 1);
        ctx.parse_str(record, &name)?;
    }

    // ── Generate ──────────────────────────────────────────────────────────────
    let source = ctx.generate();

    for violation in sim::verify_periods(ctx.schedule()) {
        warn!(
            task     = %violation.task,
            period   = violation.period,
            fired_at = ?violation.fired_at,
            "Task does not run at its declared period"
        );
    }

    match &cli.output {
        Some(path) => {
            fs::write(path, &source)
                .with_context(|| format!("Cannot write output file: {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(source.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Cannot write to standard output")?;
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::Path;
    use tempfile::TempDir;

    /// Helper: write `records` to `tasks.sched` in `dir` and return its path.
    fn task_file(dir: &TempDir, records: &str) -> PathBuf {
        let path = dir.path().join("tasks.sched");
        fs::write(&path, records).unwrap();
        path
    }

    fn cli(output: &Path, input: &Path) -> Cli {
        let args: Vec<OsString> = vec![
            "gensched".into(),
            "-o".into(),
            output.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ];
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn fatal_error_leaves_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = task_file(&dir, "foo 1 0.1\nbaz 4 5.0\n");
        let output = dir.path().join("sched.c");

        let err = run(cli(&output, &input)).unwrap_err();
        assert!(err.to_string().contains("baz"), "got: {err:#}");
        assert!(!output.exists());
    }

    #[test]
    fn successful_run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = task_file(&dir, "foo 1 0.1\nbar 4 0.5\n");
        let output = dir.path().join("sched.c");

        run(cli(&output, &input)).unwrap();
        let source = fs::read_to_string(&output).unwrap();
        assert!(source.starts_with("/* Automatically generated by gensched */"));
        assert!(source.contains("void tick_driver (void)"));
        assert!(source.contains("foo ();"));
        assert!(source.contains("bar ();"));
    }

    #[test]
    fn task_option_records_follow_input_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = task_file(&dir, "foo 2 0.1\n");
        let output = dir.path().join("sched.c");

        let mut cli = cli(&output, &input);
        cli.tasks.push("late 2 0.1".to_string());
        run(cli).unwrap();

        let source = fs::read_to_string(&output).unwrap();
        let foo = source.find("foo ();").unwrap();
        assert!(source.contains("late ();"));
        assert!(foo < source.rfind("late ();").unwrap());
    }

    #[test]
    fn missing_input_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("sched.c");
        let err = run(cli(&output, &dir.path().join("absent.sched"))).unwrap_err();
        assert!(err.to_string().contains("Cannot open task file"));
        assert!(!output.exists());
    }

    #[test]
    fn invalid_prefix_is_rejected_before_reading_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = task_file(&dir, "foo 1 0.1\n");
        let output = dir.path().join("sched.c");

        let mut cli = cli(&output, &input);
        cli.prefix = "1x".to_string();
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("invalid symbol prefix"));
        assert!(!output.exists());
    }
}
