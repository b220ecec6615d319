use std::collections::{BTreeSet, HashSet};

use lumen_config::{DebugTrace, LumenConfig};
use lumen_lir::{BlockId, FunctionLir, InstrKind, InstrRef, Operand, TempId, TerminatorKind};
use lumen_log::trace_dbg;
use lumen_type::types::TypeStore;

use crate::oracle::ThreadSafetyOracle;
use crate::partition::{OpKind, Partition, PartitionOp};
use crate::value::{TrackedId, ValueNormalizer, ValueRegistry};

/// Translates LIR instructions into partition ops. One instance per function:
/// canonical values receive their dense ids through this type, and the
/// captured-address set is fixed at construction.
pub struct PartitionOpTranslator<'a> {
  func: &'a FunctionLir,
  oracle: &'a ThreadSafetyOracle<'a>,
  config: &'a LumenConfig,
  normalizer: ValueNormalizer<'a>,
  registry: ValueRegistry,

  /// Canonical roots of uniquely-identified addresses that some call-like
  /// instruction receives as an operand. The callee may retain such an
  /// address, so stores through it cannot be treated as write-through.
  captured: HashSet<TempId>,

  /// Instruction currently being translated; stamped into generated ops.
  current: InstrRef,

  /// Running count of translated instructions, for debug output.
  translation_index: usize,
}

impl<'a> PartitionOpTranslator<'a> {
  pub fn new(
    func: &'a FunctionLir,
    types: &'a TypeStore,
    oracle: &'a ThreadSafetyOracle<'a>,
    config: &'a LumenConfig,
  ) -> Self {
    let mut translator = Self {
      func,
      oracle,
      config,
      normalizer: ValueNormalizer::new(func, types),
      registry: ValueRegistry::new(),
      captured: HashSet::new(),
      current: InstrRef {
        block: func.entry_block,
        index: 0,
      },
      translation_index: 0,
    };
    translator.init_captured_addresses();
    translator
  }

  /// Pre-pass: record every non-thread-safe, uniquely-identified address
  /// passed to a call-like instruction.
  fn init_captured_addresses(&mut self) {
    for (_, block) in self.func.blocks.iter() {
      for instr in &block.instructions {
        if !instr.kind.is_call_like() {
          continue;
        }
        for operand in instr.kind.operands() {
          if let Some(temp) = operand.as_temp()
            && self.is_non_thread_safe_operand(&operand)
            && self.is_uniquely_identified(temp)
          {
            let root = self.normalizer.canonical(temp);
            self.captured.insert(root);
            trace_dbg!(self.config, DebugTrace::Regions, "captured address root t{}", root.0);
          }
        }
      }
    }
  }

  fn is_non_thread_safe_operand(
    &mut self,
    operand: &Operand,
  ) -> bool {
    match operand {
      // Constants carry no storage identity; function references are safe to
      // share even though function types are not.
      Operand::Const(_) | Operand::FuncRef(_) => false,
      Operand::Temp(temp) => self.is_non_thread_safe_temp(*temp),
    }
  }

  fn is_non_thread_safe_temp(
    &mut self,
    temp: TempId,
  ) -> bool {
    let root = self.normalizer.canonical(temp);

    // Method lookups and type descriptors are non-thread-safe by type but can
    // safely be treated as shared.
    if matches!(
      self.normalizer.defining_kind(root),
      Some(InstrKind::Method { .. }) | Some(InstrKind::Metatype { .. })
    ) {
      return false;
    }

    self.oracle.is_non_thread_safe_type(&self.func.temp_type(root))
  }

  /// An address whose storage is statically identified and never captured.
  /// Stores through such an address rebind the storage's region.
  fn is_uniquely_identified(
    &mut self,
    temp: TempId,
  ) -> bool {
    if !self.normalizer.is_address(temp) {
      return false;
    }
    let root = self.normalizer.access_root(temp);
    root.uniquely_identified && !self.captured.contains(&root.root)
  }

  fn lookup_id(
    &mut self,
    temp: TempId,
  ) -> TrackedId {
    let root = self.normalizer.canonical(temp);
    debug_assert!(
      self.is_non_thread_safe_temp(temp),
      "only non-thread-safe values enter the registry"
    );
    self.registry.lookup(root)
  }

  fn has_id(
    &mut self,
    temp: TempId,
  ) -> bool {
    let root = self.normalizer.canonical(temp);
    self.registry.has_id(root)
  }

  fn op(
    &self,
    kind: OpKind,
  ) -> PartitionOp {
    PartitionOp::new(kind, self.current)
  }

  // Primitive op constructors. Merge/assign/consume/require preconditions
  // are translator invariants; violations are programmer errors.

  fn assign_fresh(
    &mut self,
    value: TempId,
  ) -> Vec<PartitionOp> {
    let id = self.lookup_id(value);
    vec![self.op(OpKind::AssignFresh(id))]
  }

  fn assign(
    &mut self,
    tgt: TempId,
    src: TempId,
  ) -> Vec<PartitionOp> {
    assert!(self.has_id(src), "assignment source should already have been encountered");

    let tgt_id = self.lookup_id(tgt);
    let src_id = self.lookup_id(src);
    if tgt_id == src_id {
      return Vec::new(); // noop
    }

    vec![self.op(OpKind::Assign(tgt_id, src_id))]
  }

  fn consume(
    &mut self,
    value: TempId,
  ) -> Vec<PartitionOp> {
    assert!(self.has_id(value), "consumed value should already have been encountered");

    let id = self.lookup_id(value);
    vec![self.op(OpKind::Consume(id))]
  }

  fn merge(
    &mut self,
    fst: TempId,
    snd: TempId,
  ) -> Vec<PartitionOp> {
    assert!(
      self.has_id(fst) && self.has_id(snd),
      "merged values should already have been encountered"
    );

    let fst_id = self.lookup_id(fst);
    let snd_id = self.lookup_id(snd);
    if fst_id == snd_id {
      return Vec::new(); // noop
    }

    vec![self.op(OpKind::Merge(fst_id, snd_id))]
  }

  fn require(
    &mut self,
    value: TempId,
  ) -> Vec<PartitionOp> {
    assert!(self.has_id(value), "required value should already have been encountered");

    let id = self.lookup_id(value);
    vec![self.op(OpKind::Require(id))]
  }

  // Wrappers with the thread-safety logic shared by the per-kind
  // translations.

  fn translate_assign_fresh(
    &mut self,
    value: TempId,
  ) -> Vec<PartitionOp> {
    if self.is_non_thread_safe_temp(value) {
      self.assign_fresh(value)
    } else {
      Vec::new()
    }
  }

  fn translate_assign(
    &mut self,
    tgt: TempId,
    src: &Operand,
  ) -> Vec<PartitionOp> {
    // no work to be done if assignment is to a thread-safe target
    if !self.is_non_thread_safe_temp(tgt) {
      return Vec::new();
    }

    if let Some(s) = src.as_temp()
      && self.is_non_thread_safe_temp(s)
    {
      return self.assign(tgt, s);
    }

    // A non-thread-safe value extracted from a thread-safe one (e.g. a raw
    // bitcast): nothing aliases it yet.
    self.assign_fresh(tgt)
  }

  fn translate_merge(
    &mut self,
    fst: TempId,
    snd: &Operand,
  ) -> Vec<PartitionOp> {
    if let Some(s) = snd.as_temp()
      && self.is_non_thread_safe_temp(fst)
      && self.is_non_thread_safe_temp(s)
    {
      return self.merge(fst, s);
    }
    Vec::new()
  }

  fn translate_store(
    &mut self,
    dst: &Operand,
    src: &Operand,
  ) -> Vec<PartitionOp> {
    let Some(d) = dst.as_temp() else {
      return Vec::new();
    };

    if self.is_uniquely_identified(d) {
      // Write-through: the stored-into location is fully rebound.
      self.translate_assign(d, src)
    } else {
      self.translate_merge(d, src)
    }
  }

  fn translate_require(
    &mut self,
    value: &Operand,
  ) -> Vec<PartitionOp> {
    if let Some(v) = value.as_temp()
      && self.is_non_thread_safe_temp(v)
    {
      return self.require(v);
    }
    Vec::new()
  }

  fn translate_call(
    &mut self,
    dest: Option<TempId>,
    operands: &[Operand],
    crossing: bool,
  ) -> Vec<PartitionOp> {
    // Non-thread-safe operands in operand order, callee and receiver
    // included.
    let mut ns_operands: Vec<TempId> = Vec::new();
    for operand in operands {
      if self.is_non_thread_safe_operand(operand)
        && let Some(temp) = operand.as_temp()
      {
        ns_operands.push(temp);
      }
    }

    let ns_result = dest.filter(|d| self.is_non_thread_safe_temp(*d));

    let mut translated = Vec::new();

    if crossing {
      // Calls that cross isolation domains transfer all their operands. A
      // non-thread-safe result from such a call is inherently suspect and
      // diagnosed elsewhere; give it a fresh region to avoid cascade noise.
      for &operand in &ns_operands {
        translated.extend(self.consume(operand));
      }
      if let Some(d) = ns_result {
        translated.extend(self.assign_fresh(d));
      }
      return translated;
    }

    if ns_operands.is_empty() {
      if let Some(d) = ns_result {
        translated.extend(self.assign_fresh(d));
      }
      return translated;
    }

    if ns_operands.len() == 1 {
      // Only one operand, so no merges required; just a require.
      translated.extend(self.require(ns_operands[0]));
    } else {
      for i in 1..ns_operands.len() {
        translated.extend(self.merge(ns_operands[i - 1], ns_operands[i]));
      }
    }

    if let Some(d) = ns_result {
      translated.extend(self.assign(d, ns_operands[0]));
    }

    translated
  }

  /// Ops induced by one instruction, per its kind class.
  fn translate_instruction(
    &mut self,
    r: InstrRef,
    kind: &InstrKind,
  ) -> Vec<PartitionOp> {
    self.current = r;
    self.translation_index += 1;

    use InstrKind::*;
    match kind {
      // Allocations and literals produce fresh regions.
      AllocStack { dest } | AllocBox { dest } | AllocRef { dest } | Literal { dest, .. } => {
        self.translate_assign_fresh(*dest)
      },

      // Non-projecting single-operand assignments.
      Copy { dest, source }
      | BeginBorrow { dest, source }
      | BeginAccess { dest, source }
      | Cast { dest, source, .. }
      | BitCast { dest, source, .. }
      | InitExistential { dest, source, .. } => self.translate_assign(*dest, source),
      Load { dest, address } | LoadWeak { dest, address } => self.translate_assign(*dest, address),
      ElementAddr { dest, base, .. } | FieldAddr { dest, base, .. } => self.translate_assign(*dest, base),

      // Stores assign or merge between their operands.
      Store { address, value } | StoreWeak { address, value } | StoreBorrow { address, value } => {
        self.translate_store(address, value)
      },
      CopyAddr {
        dest_address,
        source_address,
      }
      | ExplicitCopyAddr {
        dest_address,
        source_address,
      } => self.translate_store(dest_address, source_address),

      // Call-like kinds.
      Call {
        dest, callee, args, crossing,
      }
      | TryCall {
        dest, callee, args, crossing,
      } => {
        let mut operands = vec![callee.clone()];
        operands.extend(args.iter().cloned());
        self.translate_call(*dest, &operands, *crossing)
      },
      PartialApply { dest, callee, args } => {
        let mut operands = vec![callee.clone()];
        operands.extend(args.iter().cloned());
        self.translate_call(Some(*dest), &operands, false)
      },
      Builtin { dest, args, .. } => self.translate_call(*dest, args, false),
      BinOp { dest, left, right, .. } => {
        let operands = [left.clone(), right.clone()];
        self.translate_call(Some(*dest), &operands, false)
      },
      UnaryOp { dest, operand, .. } => {
        let operands = [operand.clone()];
        self.translate_call(Some(*dest), &operands, false)
      },

      // Tuple destruction is a series of individual assignments.
      DestructureTuple { dests, source } => {
        let mut translated = Vec::new();
        for dest in dests {
          translated.extend(self.translate_assign(*dest, source));
        }
        translated
      },

      // Bookkeeping with no effect on regions.
      Destroy { .. }
      | DeallocStack { .. }
      | DeallocBox { .. }
      | DebugValue { .. }
      | EndBorrow { .. }
      | EndAccess { .. }
      | EndLifetime { .. }
      | HopToExecutor { .. }
      | Metatype { .. }
      | Method { .. }
      | Nop => Vec::new(),

      // Anything else weakens soundness rather than crashing: no ops, one
      // trace line.
      other => {
        trace_dbg!(
          self.config,
          DebugTrace::Regions,
          "unhandled instruction kind {}",
          other.mnemonic()
        );
        Vec::new()
      },
    }
  }

  fn translate_terminator(
    &mut self,
    r: InstrRef,
    kind: &TerminatorKind,
  ) -> Vec<PartitionOp> {
    self.current = r;
    match kind {
      // Returning a consumed value is a race against the caller.
      TerminatorKind::Return(Some(operand)) => self.translate_require(operand),
      _ => Vec::new(),
    }
  }

  /// Reduce a basic block to the op sequence it induces, in instruction
  /// order, terminator last.
  pub fn translate_block(
    &mut self,
    block_id: BlockId,
  ) -> Vec<PartitionOp> {
    let block = self.func.blocks.get(&block_id);
    let mut ops = Vec::new();

    for (index, instr) in block.instructions.iter().enumerate() {
      let r = InstrRef { block: block_id, index };
      ops.extend(self.translate_instruction(r, &instr.kind));
    }

    let r = InstrRef {
      block: block_id,
      index: block.instructions.len(),
    };
    ops.extend(self.translate_terminator(r, &block.terminator.kind));

    trace_dbg!(
      self.config,
      DebugTrace::Regions,
      "block {} translated to {} ops ({} instructions translated so far)",
      block.label,
      ops.len(),
      self.translation_index
    );

    ops
  }

  /// Ids of the non-thread-safe arguments (receiver included), assigning ids
  /// on first call.
  fn arg_ids(&mut self) -> Vec<TrackedId> {
    let args: Vec<TempId> = self.func.args().collect();
    let mut ids = Vec::new();
    for arg in args {
      if self.oracle.is_non_thread_safe_type(&self.func.temp_type(arg)) {
        ids.push(self.lookup_id(arg));
      }
    }
    ids
  }

  /// The partition at function entry: all non-thread-safe arguments share
  /// one region, non-consumed.
  pub fn entry_partition(&mut self) -> Partition {
    Partition::single_region(&self.arg_ids())
  }

  /// Ids that may never be consumed: a value participating in the function
  /// signature must remain usable by the caller.
  pub fn non_consumables(&mut self) -> BTreeSet<TrackedId> {
    self.arg_ids().into_iter().collect()
  }
}
