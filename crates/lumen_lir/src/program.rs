use lumen_type::{Store, span::Span, symbol::SymbolId, types::TypeId};

use crate::{Block, BlockId, FuncId, Instr, TempId};

/// Top-level LIR program containing all functions.
#[derive(Debug, Clone, Default)]
pub struct LirProgram {
  /// All functions in the program, in lowering order.
  pub functions: Store<FunctionLir>,
  /// Entry point function (main).
  pub entry_point: Option<FuncId>,
}

impl LirProgram {
  pub fn new() -> Self {
    Self {
      functions: Store::new(),
      entry_point: None,
    }
  }
}

/// A single function in LIR form.
#[derive(Debug, Clone)]
pub struct FunctionLir {
  /// Interned function name.
  pub name: SymbolId,
  /// Parameter temps, allocated before any instruction result.
  pub params: Vec<TempId>,
  /// Distinguished receiver temp for methods.
  pub receiver: Option<TempId>,
  /// Return type.
  pub return_type: TypeId,
  /// Temporary values (SSA-like).
  pub temps: Store<TempData>,
  /// Basic blocks forming the CFG, in program order.
  pub blocks: Store<Block>,
  /// Entry block ID.
  pub entry_block: BlockId,
  /// Whether this is an extern declaration (no body).
  pub is_extern: bool,
  /// Source span for error reporting.
  pub span: Span,
}

/// Metadata for a temporary value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempData {
  /// Type of the temporary value.
  pub ty: TypeId,
  /// Source span (for error reporting).
  pub span: Span,
}

/// Stable handle to an instruction inside a function. An index equal to the
/// block's instruction count designates the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrRef {
  pub block: BlockId,
  pub index: usize,
}

impl FunctionLir {
  pub fn temp_type(
    &self,
    temp: TempId,
  ) -> TypeId {
    self.temps.get(&temp).ty
  }

  /// Parameters followed by the receiver, if any.
  pub fn args(&self) -> impl Iterator<Item = TempId> + '_ {
    self.params.iter().copied().chain(self.receiver)
  }

  /// The instruction behind a handle, or `None` for a terminator handle.
  pub fn instr(
    &self,
    r: &InstrRef,
  ) -> Option<&Instr> {
    self.blocks.get(&r.block).instructions.get(r.index)
  }

  /// Source span of the instruction or terminator behind a handle.
  pub fn ref_span(
    &self,
    r: &InstrRef,
  ) -> Span {
    let block = self.blocks.get(&r.block);
    match block.instructions.get(r.index) {
      Some(instr) => instr.span.clone(),
      None => block.terminator.span.clone(),
    }
  }

  /// Predecessor lists indexed by block position.
  pub fn predecessor_map(&self) -> Vec<Vec<BlockId>> {
    let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); self.blocks.len()];
    for (id, block) in self.blocks.iter() {
      for succ in block.successors() {
        preds[succ.index()].push(id);
      }
    }
    preds
  }
}
