use lumen_type::span::Span;

use crate::{BlockId, Instr, Operand};

/// A basic block: a sequence of instructions ending with a terminator.
#[derive(Debug, Clone)]
pub struct Block {
  /// Unique label for this block (for debugging).
  pub label: String,
  /// Instructions in this block (executed sequentially).
  pub instructions: Vec<Instr>,
  /// How this block exits (branch, return, etc.).
  pub terminator: Terminator,
  /// Source span covering this block.
  pub span: Span,
}

impl Block {
  pub fn new(label: String) -> Self {
    Self {
      label,
      instructions: Vec::new(),
      terminator: Terminator {
        kind: TerminatorKind::Unreachable,
        span: Span::default(),
      },
      span: Span::default(),
    }
  }

  /// CFG successors of this block.
  pub fn successors(&self) -> Vec<BlockId> {
    match &self.terminator.kind {
      TerminatorKind::Goto(target) => vec![*target],
      TerminatorKind::Branch {
        then_block, else_block, ..
      } => vec![*then_block, *else_block],
      TerminatorKind::Return(_) | TerminatorKind::Unreachable => Vec::new(),
    }
  }
}

/// Block terminator: how control exits a basic block.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminator {
  pub kind: TerminatorKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminatorKind {
  /// Unconditional jump to a target block.
  Goto(BlockId),

  /// Conditional branch: if condition is true, go to then_block, else else_block.
  Branch {
    condition: Operand,
    then_block: BlockId,
    else_block: BlockId,
  },

  /// Return from function with optional value.
  Return(Option<Operand>),

  /// Unreachable code (after diverging expressions or unset).
  Unreachable,
}
