#![allow(dead_code)]

use lumen_analyzer::{THREAD_SAFE_TRAIT, ThreadSafetyOracle, check_function};
use lumen_config::{FeatureFlags, LumenConfig};
use lumen_diagnostics::diagnostic_report::{Diagnostic, Severity};
use lumen_lir::{FuncId, FunctionLir, Operand};
use lumen_type::{
  BytePosition,
  file::{FileId, SourceMap},
  span::Span,
  symbol::SymbolTable,
  traits::TraitRegistry,
  types::{TypeId, TypeStore},
};

/// Shared fixture: type/trait/symbol stores, a virtual source file for spans,
/// and a config with the analysis feature enabled.
pub struct TestContext {
  pub types: TypeStore,
  pub traits: TraitRegistry,
  pub symbols: SymbolTable,
  pub source_map: SourceMap,
  pub file: FileId,
  pub config: LumenConfig,
}

impl TestContext {
  pub fn new() -> Self {
    let types = TypeStore::new();

    let mut traits = TraitRegistry::new();
    traits.declare(THREAD_SAFE_TRAIT);

    let mut source_map = SourceMap::new();
    let text = "--------\n".repeat(256);
    let file = source_map.add_virtual("region_check_test", text);

    let config = LumenConfig {
      features: FeatureFlags {
        deferred_thread_safety_checking: true,
      },
      ..LumenConfig::default()
    };

    Self {
      types,
      traits,
      symbols: SymbolTable::new(),
      source_map,
      file,
      config,
    }
  }

  /// Span for source slot `n`: one line of the virtual file per slot.
  pub fn span(
    &self,
    slot: u32,
  ) -> Span {
    Span::new(self.file, BytePosition(slot * 9), BytePosition(slot * 9 + 8))
  }

  /// A non-thread-safe nominal type.
  pub fn cell(&mut self) -> TypeId {
    let name = self.symbols.intern("Cell");
    self.types.record(name)
  }

  /// Address of a `Cell` (also non-thread-safe).
  pub fn cell_ptr(&mut self) -> TypeId {
    let cell = self.cell();
    self.types.pointer(cell)
  }

  /// A nominal type registered as conforming to `ThreadSafe`.
  pub fn stats(&mut self) -> TypeId {
    let name = self.symbols.intern("Stats");
    let ty = self.types.record(name);
    let thread_safe = self.traits.declare(THREAD_SAFE_TRAIT);
    self.traits.add_conformance(ty, thread_safe);
    ty
  }

  pub fn check(
    &self,
    func: &FunctionLir,
  ) -> Vec<Diagnostic> {
    let oracle = ThreadSafetyOracle::find(&self.types, &self.traits).expect("ThreadSafe trait is declared");
    check_function(func, &self.types, &oracle, &self.config)
  }
}

/// A callee operand for call instructions. The analysis never resolves
/// function references, so any id works.
pub fn func_ref() -> Operand {
  Operand::FuncRef(FuncId::new(0))
}

/// Format diagnostics in emission order. Deliberately unsorted: determinism
/// tests compare the raw stream.
pub fn format_diagnostics(diags: &[Diagnostic]) -> String {
  if diags.is_empty() {
    return "(no diagnostics)".to_string();
  }

  let mut output = String::new();
  for diag in diags {
    let severity = match diag.severity {
      Severity::Error => "ERROR",
      Severity::Warning => "WARN",
      Severity::Info => "INFO",
      Severity::Hint => "HINT",
    };
    output.push_str(&format!(
      "[{}] {}: {}\n  at {}-{}\n",
      severity, diag.error_code, diag.message, diag.primary_span.start.0, diag.primary_span.end.0,
    ));
  }
  output
}

pub fn codes(diags: &[Diagnostic]) -> Vec<String> {
  diags.iter().map(|d| d.error_code.clone()).collect()
}

pub fn count_code(
  diags: &[Diagnostic],
  code: &str,
) -> usize {
  diags.iter().filter(|d| d.error_code == code).count()
}

/// Assert a diagnostic with the given code sits exactly at the given span.
pub fn assert_diagnostic_at(
  diags: &[Diagnostic],
  code: &str,
  span: &Span,
) {
  let found = diags.iter().any(|d| d.error_code == code && &d.primary_span == span);
  assert!(
    found,
    "expected {} at {}-{}, got:\n{}",
    code,
    span.start.0,
    span.end.0,
    format_diagnostics(diags)
  );
}
