use lumen_type::{span::Span, symbol::SymbolId, types::TypeId};

use crate::{ConstValue, Operand, TempId};

/// A single LIR instruction: a kind plus the source span it was lowered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
  pub kind: InstrKind,
  pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  And,
  Or,
  BitAnd,
  BitOr,
  BitXor,
  Shl,
  Shr,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperation {
  Neg,
  Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
  /// Allocate a stack slot; `dest` is the slot's address.
  AllocStack {
    dest: TempId,
  },

  /// Allocate a heap box; `dest` is the box's address.
  AllocBox {
    dest: TempId,
  },

  /// Allocate a class instance; `dest` is the object reference.
  AllocRef {
    dest: TempId,
  },

  /// Materialize a literal constant into a temporary.
  Literal {
    dest: TempId,
    value: ConstValue,
  },

  /// Copy a value to a new temporary. `dest = source`
  Copy {
    dest: TempId,
    source: Operand,
  },

  /// Begin a borrow scope over a value.
  BeginBorrow {
    dest: TempId,
    source: Operand,
  },

  /// Begin a formal access to a memory location.
  BeginAccess {
    dest: TempId,
    source: Operand,
  },

  /// Load from an address. `dest = *address`
  Load {
    dest: TempId,
    address: Operand,
  },

  /// Load from a weak reference cell.
  LoadWeak {
    dest: TempId,
    address: Operand,
  },

  /// Identity-preserving conversion. `dest = source as target_type`
  Cast {
    dest: TempId,
    source: Operand,
    target_type: TypeId,
  },

  /// Bit-level reinterpretation; produces an unrelated value.
  BitCast {
    dest: TempId,
    source: Operand,
    target_type: TypeId,
  },

  /// Address of an element. `dest = &base[index]`
  ElementAddr {
    dest: TempId,
    base: Operand,
    index: Operand,
  },

  /// Address of a field. `dest = &base.field`
  FieldAddr {
    dest: TempId,
    base: Operand,
    field: u32,
  },

  /// Initialize existential storage from a concrete value's storage.
  InitExistential {
    dest: TempId,
    source: Operand,
    target_type: TypeId,
  },

  /// Store a value through an address. `*address = value`
  Store {
    address: Operand,
    value: Operand,
  },

  /// Store through a weak reference cell.
  StoreWeak {
    address: Operand,
    value: Operand,
  },

  /// Store a borrowed value without consuming it.
  StoreBorrow {
    address: Operand,
    value: Operand,
  },

  /// Memory-to-memory copy. `*dest_address = *source_address`
  CopyAddr {
    dest_address: Operand,
    source_address: Operand,
  },

  /// Memory-to-memory copy that always copies (never moves).
  ExplicitCopyAddr {
    dest_address: Operand,
    source_address: Operand,
  },

  /// Function call. `dest = callee(args...)`. `crossing` is set by the
  /// frontend when caller and callee run in different isolation domains.
  Call {
    dest: Option<TempId>,
    callee: Operand,
    args: Vec<Operand>,
    crossing: bool,
  },

  /// Call with an error path (the error edge is lowered separately).
  TryCall {
    dest: Option<TempId>,
    callee: Operand,
    args: Vec<Operand>,
    crossing: bool,
  },

  /// Partial application: bundle a callee with leading arguments.
  PartialApply {
    dest: TempId,
    callee: Operand,
    args: Vec<Operand>,
  },

  /// Call to a compiler builtin by name.
  Builtin {
    dest: Option<TempId>,
    name: String,
    args: Vec<Operand>,
  },

  /// Binary operation: `dest = left op right`
  BinOp {
    dest: TempId,
    op: BinaryOperation,
    left: Operand,
    right: Operand,
  },

  /// Unary operation: `dest = op operand`
  UnaryOp {
    dest: TempId,
    op: UnaryOperation,
    operand: Operand,
  },

  /// Split a tuple into one temporary per element.
  DestructureTuple {
    dests: Vec<TempId>,
    source: Operand,
  },

  /// End an owned value's lifetime.
  Destroy {
    value: Operand,
  },

  /// Release a stack slot.
  DeallocStack {
    address: Operand,
  },

  /// Release a heap box.
  DeallocBox {
    address: Operand,
  },

  /// Debugger bookkeeping; no runtime effect.
  DebugValue {
    value: Operand,
  },

  /// Close a borrow scope.
  EndBorrow {
    borrow: Operand,
  },

  /// Close a formal access.
  EndAccess {
    access: Operand,
  },

  /// Explicitly end a value's lifetime without destroying it.
  EndLifetime {
    value: Operand,
  },

  /// Switch execution to another executor.
  HopToExecutor {
    executor: Operand,
  },

  /// Materialize a type descriptor.
  Metatype {
    dest: TempId,
    ty: TypeId,
  },

  /// Look up a class method on an instance.
  Method {
    dest: TempId,
    receiver: Operand,
    name: SymbolId,
  },

  Nop,

  /// Initialize a record in memory with field values.
  InitRecord {
    dest_address: Operand,
    fields: Vec<(u32, Operand)>,
  },

  /// Initialize a vector in memory.
  InitVector {
    dest_address: Operand,
    elements: Vec<Operand>,
  },
}

impl InstrKind {
  /// The temporaries this instruction defines, in definition order.
  pub fn results(&self) -> Vec<TempId> {
    use InstrKind::*;
    match self {
      AllocStack { dest }
      | AllocBox { dest }
      | AllocRef { dest }
      | Literal { dest, .. }
      | Copy { dest, .. }
      | BeginBorrow { dest, .. }
      | BeginAccess { dest, .. }
      | Load { dest, .. }
      | LoadWeak { dest, .. }
      | Cast { dest, .. }
      | BitCast { dest, .. }
      | ElementAddr { dest, .. }
      | FieldAddr { dest, .. }
      | InitExistential { dest, .. }
      | PartialApply { dest, .. }
      | BinOp { dest, .. }
      | UnaryOp { dest, .. }
      | Metatype { dest, .. }
      | Method { dest, .. } => vec![*dest],

      Call { dest, .. } | TryCall { dest, .. } | Builtin { dest, .. } => dest.iter().copied().collect(),

      DestructureTuple { dests, .. } => dests.clone(),

      Store { .. }
      | StoreWeak { .. }
      | StoreBorrow { .. }
      | CopyAddr { .. }
      | ExplicitCopyAddr { .. }
      | Destroy { .. }
      | DeallocStack { .. }
      | DeallocBox { .. }
      | DebugValue { .. }
      | EndBorrow { .. }
      | EndAccess { .. }
      | EndLifetime { .. }
      | HopToExecutor { .. }
      | Nop
      | InitRecord { .. }
      | InitVector { .. } => Vec::new(),
    }
  }

  /// The operands this instruction reads, in operand order. For call-like
  /// kinds the callee comes first.
  pub fn operands(&self) -> Vec<Operand> {
    use InstrKind::*;
    match self {
      AllocStack { .. } | AllocBox { .. } | AllocRef { .. } | Literal { .. } | Metatype { .. } | Nop => Vec::new(),

      Copy { source, .. }
      | BeginBorrow { source, .. }
      | BeginAccess { source, .. }
      | Cast { source, .. }
      | BitCast { source, .. }
      | InitExistential { source, .. } => vec![source.clone()],

      Load { address, .. } | LoadWeak { address, .. } => vec![address.clone()],

      ElementAddr { base, index, .. } => vec![base.clone(), index.clone()],
      FieldAddr { base, .. } => vec![base.clone()],

      Store { address, value } | StoreWeak { address, value } | StoreBorrow { address, value } => {
        vec![value.clone(), address.clone()]
      },
      CopyAddr {
        dest_address,
        source_address,
      }
      | ExplicitCopyAddr {
        dest_address,
        source_address,
      } => vec![source_address.clone(), dest_address.clone()],

      Call { callee, args, .. } | TryCall { callee, args, .. } | PartialApply { callee, args, .. } => {
        let mut ops = vec![callee.clone()];
        ops.extend(args.iter().cloned());
        ops
      },
      Builtin { args, .. } => args.clone(),

      BinOp { left, right, .. } => vec![left.clone(), right.clone()],
      UnaryOp { operand, .. } => vec![operand.clone()],

      DestructureTuple { source, .. } => vec![source.clone()],

      Destroy { value } | DebugValue { value } | EndLifetime { value } => vec![value.clone()],
      DeallocStack { address } | DeallocBox { address } => vec![address.clone()],
      EndBorrow { borrow } => vec![borrow.clone()],
      EndAccess { access } => vec![access.clone()],
      HopToExecutor { executor } => vec![executor.clone()],
      Method { receiver, .. } => vec![receiver.clone()],

      InitRecord { dest_address, fields } => {
        let mut ops = vec![dest_address.clone()];
        ops.extend(fields.iter().map(|(_, op)| op.clone()));
        ops
      },
      InitVector { dest_address, elements } => {
        let mut ops = vec![dest_address.clone()];
        ops.extend(elements.iter().cloned());
        ops
      },
    }
  }

  /// Short printable name of this kind, for logs and dumps.
  pub fn mnemonic(&self) -> &'static str {
    use InstrKind::*;
    match self {
      AllocStack { .. } => "alloc_stack",
      AllocBox { .. } => "alloc_box",
      AllocRef { .. } => "alloc_ref",
      Literal { .. } => "literal",
      Copy { .. } => "copy",
      BeginBorrow { .. } => "begin_borrow",
      BeginAccess { .. } => "begin_access",
      Load { .. } => "load",
      LoadWeak { .. } => "load_weak",
      Cast { .. } => "cast",
      BitCast { .. } => "bitcast",
      ElementAddr { .. } => "element_addr",
      FieldAddr { .. } => "field_addr",
      InitExistential { .. } => "init_existential",
      Store { .. } => "store",
      StoreWeak { .. } => "store_weak",
      StoreBorrow { .. } => "store_borrow",
      CopyAddr { .. } => "copy_addr",
      ExplicitCopyAddr { .. } => "explicit_copy_addr",
      Call { .. } => "call",
      TryCall { .. } => "try_call",
      PartialApply { .. } => "partial_apply",
      Builtin { .. } => "builtin",
      BinOp { .. } => "binop",
      UnaryOp { .. } => "unaryop",
      DestructureTuple { .. } => "destructure_tuple",
      Destroy { .. } => "destroy",
      DeallocStack { .. } => "dealloc_stack",
      DeallocBox { .. } => "dealloc_box",
      DebugValue { .. } => "debug_value",
      EndBorrow { .. } => "end_borrow",
      EndAccess { .. } => "end_access",
      EndLifetime { .. } => "end_lifetime",
      HopToExecutor { .. } => "hop_to_executor",
      Metatype { .. } => "metatype",
      Method { .. } => "method",
      Nop => "nop",
      InitRecord { .. } => "init_record",
      InitVector { .. } => "init_vector",
    }
  }

  /// Call-like kinds may capture address operands passed to them.
  pub fn is_call_like(&self) -> bool {
    matches!(
      self,
      InstrKind::Call { .. }
        | InstrKind::TryCall { .. }
        | InstrKind::PartialApply { .. }
        | InstrKind::Builtin { .. }
        | InstrKind::BinOp { .. }
        | InstrKind::UnaryOp { .. }
    )
  }
}
