use serde::{Deserialize, Serialize};

/// Per-component debug trace categories. Enabled individually via
/// `--debug-trace <name>` or collectively via `--debug`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DebugTrace {
  Lexer,
  Parser,
  Analyzer,
  Lir,
  /// The region-based thread-safety analysis.
  Regions,
}

/// How much output the compiler produces on stderr.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputLevel {
  Quiet,
  #[default]
  Detailed,
  Verbose,
}

/// Opt-in language and checking features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
  /// Run the region-based thread-safety (data race) analysis on lowered
  /// functions instead of rejecting transfers during type checking.
  #[serde(default)]
  pub deferred_thread_safety_checking: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LumenConfig {
  pub quiet: bool,
  pub verbose: u8,
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  pub output_level: OutputLevel,
  pub features: FeatureFlags,
}

impl LumenConfig {
  pub fn new_basic(
    quiet: bool,
    verbose: u8,
  ) -> Self {
    Self {
      quiet,
      verbose,
      ..Self::default()
    }
  }

  /// Config with a single feature switched on; used by tests and tools.
  pub fn with_features(features: FeatureFlags) -> Self {
    Self {
      features,
      ..Self::default()
    }
  }
}
