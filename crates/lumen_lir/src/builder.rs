use lumen_type::{Store, span::Span, symbol::SymbolId, types::TypeId};

use crate::{Block, BlockId, FunctionLir, Instr, InstrKind, TempData, TempId, Terminator, TerminatorKind};

/// Builder for constructing a single function's LIR.
pub struct FunctionBuilder {
  name: SymbolId,
  params: Vec<TempId>,
  receiver: Option<TempId>,
  return_type: TypeId,
  is_extern: bool,
  span: Span,

  temps: Store<TempData>,
  blocks: Store<Block>,

  /// Currently active block being built.
  current_block: Option<BlockId>,

  /// Counter for generating unique block labels.
  block_counter: u32,
}

impl FunctionBuilder {
  pub fn new(
    name: SymbolId,
    return_type: TypeId,
    span: Span,
  ) -> Self {
    let mut builder = Self {
      name,
      params: Vec::new(),
      receiver: None,
      return_type,
      is_extern: false,
      span,
      temps: Store::new(),
      blocks: Store::new(),
      current_block: None,
      block_counter: 0,
    };

    // Create entry block
    let entry = builder.create_block("entry");
    builder.switch_to_block(entry);

    builder
  }

  /// Register a parameter temp. Must be called before any instruction is
  /// emitted so parameters occupy the leading temp ids.
  pub fn add_param(
    &mut self,
    ty: TypeId,
    span: Span,
  ) -> TempId {
    debug_assert!(
      self.temps.len() == self.params.len() + self.receiver.iter().len(),
      "parameters must be registered before any other temp"
    );
    let temp = self.temps.alloc(TempData { ty, span });
    self.params.push(temp);
    temp
  }

  /// Register the distinguished receiver temp for a method.
  pub fn add_receiver(
    &mut self,
    ty: TypeId,
    span: Span,
  ) -> TempId {
    debug_assert!(self.receiver.is_none(), "receiver already registered");
    let temp = self.temps.alloc(TempData { ty, span });
    self.receiver = Some(temp);
    temp
  }

  /// Create a new basic block with a label.
  pub fn create_block(
    &mut self,
    prefix: &str,
  ) -> BlockId {
    let label = format!("{}_{}", prefix, self.block_counter);
    self.block_counter += 1;
    self.blocks.alloc(Block::new(label))
  }

  /// Switch to building a different block.
  pub fn switch_to_block(
    &mut self,
    block: BlockId,
  ) {
    self.current_block = Some(block);
  }

  /// Get the current block ID.
  pub fn current_block(&self) -> BlockId {
    self.current_block.expect("no current block")
  }

  /// Allocate a new temporary.
  pub fn alloc_temp(
    &mut self,
    ty: TypeId,
    span: Span,
  ) -> TempId {
    self.temps.alloc(TempData { ty, span })
  }

  /// Get the type of a temporary.
  pub fn temp_type(
    &self,
    temp: TempId,
  ) -> TypeId {
    self.temps.get(&temp).ty
  }

  /// Get the return type.
  pub fn return_type(&self) -> TypeId {
    self.return_type
  }

  /// Emit an instruction to the current block.
  pub fn emit(
    &mut self,
    kind: InstrKind,
    span: Span,
  ) {
    let block = self.blocks.get_mut(self.current_block());
    block.instructions.push(Instr { kind, span });
  }

  /// Set the terminator for the current block.
  pub fn terminate(
    &mut self,
    kind: TerminatorKind,
    span: Span,
  ) {
    let block = self.blocks.get_mut(self.current_block());
    block.terminator = Terminator { kind, span };
  }

  /// Check if the current block is terminated.
  pub fn is_terminated(&self) -> bool {
    let block = self.blocks.get(&self.current_block());
    !matches!(block.terminator.kind, TerminatorKind::Unreachable)
  }

  /// Mark this function as an extern declaration.
  pub fn set_extern(&mut self) {
    self.is_extern = true;
  }

  /// Finish building and return the completed function.
  pub fn finish(self) -> FunctionLir {
    FunctionLir {
      name: self.name,
      params: self.params,
      receiver: self.receiver,
      return_type: self.return_type,
      temps: self.temps,
      blocks: self.blocks,
      entry_block: BlockId::new(0), // Entry is always first
      is_extern: self.is_extern,
      span: self.span,
    }
  }
}
