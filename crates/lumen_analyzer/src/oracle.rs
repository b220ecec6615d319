use lumen_type::{
  traits::{TraitId, TraitRegistry},
  types::{Type, TypeId, TypeStore},
};

/// Name of the marker trait that declares a type safe to share across
/// isolation domains.
pub const THREAD_SAFE_TRAIT: &str = "ThreadSafe";

/// Answers "is this type thread-safe?". Structural for primitives and
/// aggregates, conformance-table lookups for nominal, function, and address
/// types. The raw platform object type is never thread-safe, whatever the
/// table says.
pub struct ThreadSafetyOracle<'a> {
  types: &'a TypeStore,
  traits: &'a TraitRegistry,
  thread_safe: TraitId,
}

impl<'a> ThreadSafetyOracle<'a> {
  /// Returns `None` when the `ThreadSafe` trait is not declared. Without it
  /// every value would have to be treated as unsafe to share, which is not a
  /// useful mode to run in.
  pub fn find(
    types: &'a TypeStore,
    traits: &'a TraitRegistry,
  ) -> Option<Self> {
    let thread_safe = traits.find(THREAD_SAFE_TRAIT)?;
    Some(Self {
      types,
      traits,
      thread_safe,
    })
  }

  pub fn is_non_thread_safe_type(
    &self,
    ty: &TypeId,
  ) -> bool {
    match self.types.get(ty) {
      Type::RawObject => true,

      Type::I8
      | Type::I16
      | Type::I32
      | Type::I64
      | Type::U8
      | Type::U16
      | Type::U32
      | Type::U64
      | Type::F32
      | Type::F64
      | Type::Boolean
      | Type::Char
      | Type::String
      | Type::Void
      | Type::Never
      | Type::Unknown
      | Type::Error => false,

      Type::Tuple(elements) => elements.iter().any(|e| self.is_non_thread_safe_type(e)),
      Type::Vector { element, .. } => self.is_non_thread_safe_type(element),

      Type::Pointer(_) | Type::Reference { .. } | Type::Function { .. } | Type::Record { .. } => {
        !self.traits.conforms(ty, &self.thread_safe)
      },
    }
  }

  pub fn is_thread_safe_type(
    &self,
    ty: &TypeId,
  ) -> bool {
    !self.is_non_thread_safe_type(ty)
  }
}
