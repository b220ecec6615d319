use lumen_type::types::TypeId;

use crate::{FuncId, TempId};

/// An operand: a value that can be used in an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
  /// A temporary value (parameter or result of a previous instruction).
  Temp(TempId),
  /// A constant/literal value.
  Const(ConstValue),
  /// Direct reference to a function.
  FuncRef(FuncId),
}

impl Operand {
  /// The temp behind this operand, if it is one.
  pub fn as_temp(&self) -> Option<TempId> {
    match self {
      Operand::Temp(t) => Some(*t),
      _ => None,
    }
  }
}

/// Compile-time constant values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
  Int(i64, TypeId),
  UInt(u64, TypeId),
  Float(ordered_float::OrderedFloat<f64>, TypeId),
  Bool(bool, TypeId),
  Char(char, TypeId),
  String(String, TypeId),
  Null(TypeId),
  /// Undefined/uninitialized.
  Undef(TypeId),
}

impl ConstValue {
  /// Returns the TypeId of this constant value.
  pub fn type_id(&self) -> TypeId {
    match self {
      ConstValue::Int(_, ty) => *ty,
      ConstValue::UInt(_, ty) => *ty,
      ConstValue::Float(_, ty) => *ty,
      ConstValue::Bool(_, ty) => *ty,
      ConstValue::Char(_, ty) => *ty,
      ConstValue::String(_, ty) => *ty,
      ConstValue::Null(ty) => *ty,
      ConstValue::Undef(ty) => *ty,
    }
  }
}
