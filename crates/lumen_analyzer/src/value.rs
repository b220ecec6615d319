use std::collections::HashMap;

use lumen_lir::{FunctionLir, InstrKind, InstrRef, TempId};
use lumen_type::{Id, Store, types::TypeStore};

/// A canonical value admitted to the analysis. Ids are dense, assigned on
/// first encounter, and never reused within one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedValue {
  pub root: TempId,
}

pub type TrackedId = Id<TrackedValue>;

/// Result of resolving an address to the storage it denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRoot {
  pub root: TempId,
  /// True when the storage is a local allocation that no one else can see.
  pub uniquely_identified: bool,
}

/// Reduces LIR values to canonical roots so that projections and aliases of
/// one storage location share a single identity. Without this, stores through
/// an address would never propagate to loads of the same location.
pub struct ValueNormalizer<'a> {
  func: &'a FunctionLir,
  types: &'a TypeStore,
  defs: HashMap<TempId, InstrRef>,
  memo: HashMap<TempId, TempId>,
}

impl<'a> ValueNormalizer<'a> {
  pub fn new(
    func: &'a FunctionLir,
    types: &'a TypeStore,
  ) -> Self {
    let mut defs = HashMap::new();
    for (block_id, block) in func.blocks.iter() {
      for (index, instr) in block.instructions.iter().enumerate() {
        for result in instr.kind.results() {
          defs.insert(result, InstrRef { block: block_id, index });
        }
      }
    }

    Self {
      func,
      types,
      defs,
      memo: HashMap::new(),
    }
  }

  /// The instruction that defines `temp`, if any (parameters have none).
  pub fn defining_kind(
    &self,
    temp: TempId,
  ) -> Option<&'a InstrKind> {
    let r = self.defs.get(&temp)?;
    self.func.instr(r).map(|instr| &instr.kind)
  }

  pub fn is_address(
    &self,
    temp: TempId,
  ) -> bool {
    self.types.is_address(&self.func.temp_type(temp))
  }

  /// Canonical root of a value. Object values peel identity-preserving
  /// wrappers; address values resolve to the storage they denote.
  pub fn canonical(
    &mut self,
    temp: TempId,
  ) -> TempId {
    if let Some(&root) = self.memo.get(&temp) {
      return root;
    }

    let root = if self.is_address(temp) {
      self.access_root(temp).root
    } else {
      self.underlying_object(temp)
    };

    self.memo.insert(temp, root);
    root
  }

  fn underlying_object(
    &mut self,
    temp: TempId,
  ) -> TempId {
    match self.defining_kind(temp) {
      Some(InstrKind::Copy { source, .. })
      | Some(InstrKind::BeginBorrow { source, .. })
      | Some(InstrKind::Cast { source, .. }) => match source.as_temp() {
        Some(s) => self.canonical(s),
        None => temp,
      },
      _ => temp,
    }
  }

  /// Resolve an address-typed value to the storage location it denotes.
  pub fn access_root(
    &mut self,
    temp: TempId,
  ) -> AccessRoot {
    let opaque = AccessRoot {
      root: temp,
      uniquely_identified: false,
    };

    let Some(kind) = self.defining_kind(temp) else {
      // Parameter: storage belongs to the caller.
      return opaque;
    };

    match kind {
      InstrKind::AllocStack { .. } | InstrKind::AllocBox { .. } => AccessRoot {
        root: temp,
        uniquely_identified: true,
      },

      InstrKind::BeginAccess { source, .. }
      | InstrKind::BeginBorrow { source, .. }
      | InstrKind::Copy { source, .. }
      | InstrKind::Cast { source, .. }
      | InstrKind::InitExistential { source, .. } => match source.as_temp() {
        Some(s) if self.is_address(s) => self.access_root(s),
        _ => opaque,
      },

      InstrKind::ElementAddr { base, .. } | InstrKind::FieldAddr { base, .. } => match base.as_temp() {
        Some(b) if self.is_address(b) => self.access_root(b),
        // Projection out of a class instance: the object is the root, but the
        // storage is reachable through every alias of that object.
        Some(b) => AccessRoot {
          root: self.canonical(b),
          uniquely_identified: false,
        },
        None => opaque,
      },

      // Loads of pointers, call results, casts from non-addresses: storage
      // cannot be identified.
      _ => opaque,
    }
  }
}

/// Dense id registry over canonical non-thread-safe values.
#[derive(Debug, Default)]
pub struct ValueRegistry {
  ids: HashMap<TempId, TrackedId>,
  values: Store<TrackedValue>,
}

impl ValueRegistry {
  pub fn new() -> Self {
    Self {
      ids: HashMap::new(),
      values: Store::new(),
    }
  }

  pub fn has_id(
    &self,
    root: TempId,
  ) -> bool {
    self.ids.contains_key(&root)
  }

  /// The id for a canonical root, assigned on first encounter.
  pub fn lookup(
    &mut self,
    root: TempId,
  ) -> TrackedId {
    if let Some(&id) = self.ids.get(&root) {
      return id;
    }
    let id = self.values.alloc(TrackedValue { root });
    self.ids.insert(root, id);
    id
  }

  pub fn get(
    &self,
    id: &TrackedId,
  ) -> &TrackedValue {
    self.values.get(id)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}
