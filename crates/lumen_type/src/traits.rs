use std::collections::{HashMap, HashSet};

use crate::{Id, Store, types::TypeId};

/// A marker trait: a name and nothing else. Conformances are recorded in the
/// registry by the frontend; this crate only stores and answers lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitDef {
  pub name: String,
}

pub type TraitId = Id<TraitDef>;

/// Marker-trait table plus type-conformance facts.
pub struct TraitRegistry {
  traits: Store<TraitDef>,
  by_name: HashMap<String, TraitId>,
  conformances: HashSet<(TypeId, TraitId)>,
}

impl TraitRegistry {
  pub fn new() -> Self {
    Self {
      traits: Store::new(),
      by_name: HashMap::new(),
      conformances: HashSet::new(),
    }
  }

  /// Declare a marker trait, or return the existing id for the name.
  pub fn declare(
    &mut self,
    name: &str,
  ) -> TraitId {
    if let Some(id) = self.by_name.get(name) {
      return *id;
    }
    let id = self.traits.alloc(TraitDef { name: name.to_string() });
    self.by_name.insert(name.to_string(), id);
    id
  }

  pub fn find(
    &self,
    name: &str,
  ) -> Option<TraitId> {
    self.by_name.get(name).copied()
  }

  pub fn get(
    &self,
    id: &TraitId,
  ) -> &TraitDef {
    self.traits.get(id)
  }

  pub fn add_conformance(
    &mut self,
    ty: TypeId,
    trait_id: TraitId,
  ) {
    self.conformances.insert((ty, trait_id));
  }

  pub fn conforms(
    &self,
    ty: &TypeId,
    trait_id: &TraitId,
  ) -> bool {
    self.conformances.contains(&(*ty, *trait_id))
  }
}

impl Default for TraitRegistry {
  fn default() -> Self {
    Self::new()
  }
}
