//! Logging utilities for the Lumen compiler.
//!
//! Provides macros for:
//! - Debug traces by category (`trace_dbg!`)
//! - Verbose logging (`log_dbg!`, `log_trc!`)
//!
//! All output goes to stderr to avoid mixing with dumps/stdout.

use lumen_config::{DebugTrace, LumenConfig, OutputLevel};

pub fn effective_verbose(config: &LumenConfig) -> u8 {
  if config.quiet {
    return 0;
  }

  if config.debug && config.verbose < 2 {
    return 2;
  }

  config.verbose
}

/// Returns true if output should be shown (Detailed or Verbose mode).
pub fn show_output(config: &LumenConfig) -> bool {
  !matches!(config.output_level, OutputLevel::Quiet)
}

pub fn log_info(config: &LumenConfig) -> bool {
  effective_verbose(config) >= 1
}

pub fn log_debug(config: &LumenConfig) -> bool {
  effective_verbose(config) >= 2
}

pub fn log_trace(config: &LumenConfig) -> bool {
  effective_verbose(config) >= 3
}

pub fn debug_trace_enabled(
  config: &LumenConfig,
  trace: DebugTrace,
) -> bool {
  !config.quiet && (config.debug || config.debug_trace.contains(&trace))
}

/// Returns lowercase name of a DebugTrace variant for log output.
pub fn trace_name(trace: DebugTrace) -> &'static str {
  match trace {
    DebugTrace::Lexer => "lexer",
    DebugTrace::Parser => "parser",
    DebugTrace::Analyzer => "analyzer",
    DebugTrace::Lir => "lir",
    DebugTrace::Regions => "regions",
  }
}

/// Log a debug trace for a specific compiler component.
///
/// Output format: `debug[component]: message`
///
/// # Examples
///
/// ```ignore
/// trace_dbg!(&config, DebugTrace::Regions, "unhandled instruction kind {:?}", kind);
/// // Output: debug[regions]: unhandled instruction kind ...
/// ```
#[macro_export]
macro_rules! trace_dbg {
  ($config:expr, $trace:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::debug_trace_enabled($config, $trace) {
      eprintln!(
        "debug[{}]: {}",
        $crate::trace_name($trace),
        format!($fmt $(, $arg)*)
      );
    }
  }};
}

/// Log a verbose debug message (verbosity >= 2).
///
/// # Examples
///
/// ```ignore
/// log_dbg!(&config, "checking function {}", name);
/// // Output: debug: checking function main
/// ```
#[macro_export]
macro_rules! log_dbg {
  ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_debug($config) {
      eprintln!("debug: {}", format!($fmt $(, $arg)*));
    }
  }};
}

/// Log a trace message (verbosity >= 3).
///
/// # Examples
///
/// ```ignore
/// log_trc!(&config, "block order {:?}", blocks);
/// // Output: trace: block order [...]
/// ```
#[macro_export]
macro_rules! log_trc {
  ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_trace($config) {
      eprintln!("trace: {}", format!($fmt $(, $arg)*));
    }
  }};
}
