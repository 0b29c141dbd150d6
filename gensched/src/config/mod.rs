//! Generator configuration: command-line options and the target profile.
//!
//! Two layers:
//!
//! * [`Options`]: per-run settings taken from the command line (unrolling
//!   width, symbol prefix, includes, conditionals).
//! * [`TargetConfig`]: properties of the target CPU and toolchain, loaded
//!   from an optional YAML file.  Every field has a default matching a WPC
//!   6809 board, so the file only needs the values that differ.
//!
//! The expected YAML structure is:
//! ```yaml
//! target:
//!   cycles_per_tick: 1952
//!   interrupt_attr: "__interrupt__"
//!   fastvar_attr: "__attribute__((section (\"direct\")))"
//!   direct_jump_guard: "__m6809__"
//!   max_slots_per_tick: 32
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::parser::is_c_identifier;
use crate::schedule::{Limits, SchedError, DEFAULT_MAX_TICKS, MAX_UNROLL};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct TargetConfigFile {
    #[serde(default)]
    target: TargetConfigEntry,
}

/// Target fields as they appear in the YAML file.
///
/// All optional; missing values fall back to [`TargetConfig::default`].
/// `direct_jump_guard` distinguishes "absent" (keep the default guard) from
/// an explicit `null` (no asm driver).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetConfigEntry {
    cycles_per_tick: Option<u32>,
    cycles_per_call: Option<u32>,
    cycles_per_return: Option<u32>,
    interrupt_attr: Option<String>,
    fastvar_attr: Option<String>,
    #[serde(default, deserialize_with = "explicit_option")]
    direct_jump_guard: Option<Option<String>>,
    max_tasks: Option<usize>,
    max_slots_per_tick: Option<usize>,
    inline_min_cycles: Option<u32>,
    inline_max_cycles: Option<u32>,
    warn_utilization_high: Option<f64>,
}

/// Deserialize a present field (even `null`) as `Some(..)`.
fn explicit_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ── TargetConfig ──────────────────────────────────────────────────────────────

/// Cycle costs, attributes, static limits and advisory thresholds of the
/// target platform.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    /// CPU cycles in one periodic interrupt (976 µs at 2 MHz on WPC).
    pub cycles_per_tick: u32,
    pub cycles_per_call: u32,
    pub cycles_per_return: u32,
    /// Attribute placed on every generated tick function.
    pub interrupt_attr: String,
    /// Attribute placed on the shared dispatcher state (fast RAM section).
    pub fastvar_attr: String,
    /// Preprocessor symbol guarding the single-jump asm driver.
    /// `None` emits only the portable function-pointer call.
    pub direct_jump_guard: Option<String>,
    pub max_tasks: usize,
    pub max_slots_per_tick: usize,
    /// Out-of-line tasks cheaper than this should be inline.
    pub inline_min_cycles: u32,
    /// Inline tasks costlier than this, used more than twice, should not be.
    pub inline_max_cycles: u32,
    /// Average tick load above which a utilisation warning is issued.
    pub warn_utilization_high: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            cycles_per_tick: 1952,
            cycles_per_call: 7,
            cycles_per_return: 5,
            interrupt_attr: String::from("__interrupt__"),
            fastvar_attr: String::from("__attribute__((section (\"direct\")))"),
            direct_jump_guard: Some(String::from("__m6809__")),
            max_tasks: 64,
            max_slots_per_tick: 32,
            inline_min_cycles: 40,
            inline_max_cycles: 200,
            warn_utilization_high: 0.80,
        }
    }
}

impl TargetConfig {
    /// Parses `path` as a target profile, layering its values over the
    /// defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, or it contains unknown keys.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading target profile from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open target profile: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }

    /// Parses a target profile from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: TargetConfigFile = serde_yaml::from_str(content)?;
        let entry = file.target;
        let defaults = Self::default();

        let cfg = Self {
            cycles_per_tick: entry.cycles_per_tick.unwrap_or(defaults.cycles_per_tick),
            cycles_per_call: entry.cycles_per_call.unwrap_or(defaults.cycles_per_call),
            cycles_per_return: entry.cycles_per_return.unwrap_or(defaults.cycles_per_return),
            interrupt_attr: entry.interrupt_attr.unwrap_or(defaults.interrupt_attr),
            fastvar_attr: entry.fastvar_attr.unwrap_or(defaults.fastvar_attr),
            direct_jump_guard: entry
                .direct_jump_guard
                .unwrap_or(defaults.direct_jump_guard),
            max_tasks: entry.max_tasks.unwrap_or(defaults.max_tasks),
            max_slots_per_tick: entry
                .max_slots_per_tick
                .unwrap_or(defaults.max_slots_per_tick),
            inline_min_cycles: entry.inline_min_cycles.unwrap_or(defaults.inline_min_cycles),
            inline_max_cycles: entry.inline_max_cycles.unwrap_or(defaults.inline_max_cycles),
            warn_utilization_high: entry
                .warn_utilization_high
                .unwrap_or(defaults.warn_utilization_high),
        };

        anyhow::ensure!(cfg.cycles_per_tick > 0, "cycles_per_tick must be non-zero");

        debug!(
            "  Target: {} cycles/tick | call {} | return {} | slots/tick {} | tasks {}",
            cfg.cycles_per_tick,
            cfg.cycles_per_call,
            cfg.cycles_per_return,
            cfg.max_slots_per_tick,
            cfg.max_tasks,
        );

        Ok(cfg)
    }

    /// Cycles spent on one call/return pair.
    pub fn call_overhead_cycles(&self) -> u32 {
        self.cycles_per_call + self.cycles_per_return
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Per-run generator options.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Maximum unrolling width in ticks (`-M`).
    pub max_ticks: usize,
    /// Prefix for every generated symbol (`-p`).  No trailing underscore.
    pub prefix: String,
    /// Files to `#include` in the generated source (`-i`).
    pub includes: Vec<String>,
    /// Defined conditional flags (`-D`).
    pub conditionals: BTreeSet<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            prefix: String::from("tick"),
            includes: Vec::new(),
            conditionals: BTreeSet::new(),
        }
    }
}

impl Options {
    /// Reject settings the generator cannot honour.
    ///
    /// # Errors
    /// * [`SchedError::InvalidUnrollWidth`] unless `max_ticks` is a power of
    ///   two in `1..=MAX_UNROLL`.
    /// * [`SchedError::InvalidPrefix`] unless `prefix` is a C identifier.
    pub fn validate(&self) -> Result<(), SchedError> {
        if !self.max_ticks.is_power_of_two() || self.max_ticks > MAX_UNROLL {
            return Err(SchedError::InvalidUnrollWidth {
                width: self.max_ticks,
                cap: MAX_UNROLL,
            });
        }
        if !is_c_identifier(&self.prefix) {
            return Err(SchedError::InvalidPrefix {
                prefix: self.prefix.clone(),
            });
        }
        Ok(())
    }

    pub fn is_defined(&self, conditional: &str) -> bool {
        self.conditionals.contains(conditional)
    }

    /// Table limits for a schedule built with these options on `target`.
    pub fn limits(&self, target: &TargetConfig) -> Limits {
        Limits {
            max_ticks: self.max_ticks,
            max_tasks: target.max_tasks,
            max_slots_per_tick: target.max_slots_per_tick,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
