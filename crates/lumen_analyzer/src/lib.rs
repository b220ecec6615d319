//! Region-based thread-safety analysis.
//!
//! Diagnoses data races caused by non-thread-safe values crossing
//! concurrency-isolation boundaries. Each lowered function is reduced to a
//! stream of partition ops over canonical value ids; a monotone fixpoint over
//! the CFG computes, per block, the partition of ids into regions with a
//! consumed flag per region; a final replay with failure hooks reports uses
//! of consumed regions and illegal transfers of function arguments, tracing
//! each racy use back to the consume sites responsible.

pub mod oracle;
pub mod partition;
pub mod solver;
pub mod tracer;
pub mod translate;
pub mod value;

use lumen_config::{DebugTrace, LumenConfig};
use lumen_diagnostics::diagnostic_report::Diagnostic;
use lumen_lir::{FunctionLir, LirProgram};
use lumen_log::log_dbg;
use lumen_type::{traits::TraitRegistry, types::TypeStore};

pub use oracle::{THREAD_SAFE_TRAIT, ThreadSafetyOracle};
pub use partition::{OpKind, Partition, PartitionObserver, PartitionOp};
pub use solver::{BlockPartitionState, NUM_REQUIREMENTS_TO_DIAGNOSE, PartitionAnalysis};
pub use tracer::{ConsumeRequireAccumulator, ConsumeRequireStep, ConsumedReason, LocalConsumedReason, RaceTracer};
pub use translate::PartitionOpTranslator;
pub use value::{AccessRoot, TrackedId, TrackedValue, ValueNormalizer, ValueRegistry};

/// Run the region-based thread-safety analysis over a whole program.
///
/// Skipped entirely unless the `deferred_thread_safety_checking` feature is
/// enabled and the `ThreadSafe` marker trait is declared; without the trait,
/// every value would have to be treated as unsafe to share.
pub fn check_program(
  program: &LirProgram,
  types: &TypeStore,
  traits: &TraitRegistry,
  config: &LumenConfig,
) -> Vec<Diagnostic> {
  if !config.features.deferred_thread_safety_checking {
    return Vec::new();
  }

  let Some(oracle) = ThreadSafetyOracle::find(types, traits) else {
    log_dbg!(config, "thread-safety trait not declared, skipping region checks");
    return Vec::new();
  };

  let mut diagnostics = Vec::new();
  for (_, func) in program.functions.iter() {
    if func.is_extern {
      continue;
    }
    diagnostics.extend(check_function(func, types, &oracle, config));
  }
  diagnostics
}

/// Analyze a single lowered function.
pub fn check_function(
  func: &FunctionLir,
  types: &TypeStore,
  oracle: &ThreadSafetyOracle,
  config: &LumenConfig,
) -> Vec<Diagnostic> {
  let mut analysis = PartitionAnalysis::new(func, types, oracle, config);
  analysis.solve();

  if lumen_log::debug_trace_enabled(config, DebugTrace::Regions) {
    analysis.dump();
  }

  analysis.diagnose()
}
