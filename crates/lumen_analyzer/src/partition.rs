use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lumen_lir::InstrRef;

use crate::value::TrackedId;

/// One abstract effect of an instruction on the region partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
  /// Place the id alone in a brand-new non-consumed region.
  AssignFresh(TrackedId),
  /// Rebind the first id to the second id's region.
  Assign(TrackedId, TrackedId),
  /// Union the regions of the two ids.
  Merge(TrackedId, TrackedId),
  /// Mark the id's region as consumed (transferred out of this domain).
  Consume(TrackedId),
  /// Fail if the id's region is consumed; no state change.
  Require(TrackedId),
}

/// A partition op plus the instruction it was translated from. The source
/// handle supplies both the diagnostic location and op identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionOp {
  pub kind: OpKind,
  pub source: InstrRef,
}

impl PartitionOp {
  pub fn new(
    kind: OpKind,
    source: InstrRef,
  ) -> Self {
    Self { kind, source }
  }
}

// Ordered by program position first so diagnostic emission follows source
// order.
impl Ord for PartitionOp {
  fn cmp(
    &self,
    other: &Self,
  ) -> std::cmp::Ordering {
    self.source.cmp(&other.source).then_with(|| self.kind.cmp(&other.kind))
  }
}

impl PartialOrd for PartitionOp {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for PartitionOp {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match &self.kind {
      OpKind::AssignFresh(x) => write!(f, "assign_fresh %{}", x.0)?,
      OpKind::Assign(d, s) => write!(f, "assign %{} = %{}", d.0, s.0)?,
      OpKind::Merge(a, b) => write!(f, "merge %{} %{}", a.0, b.0)?,
      OpKind::Consume(x) => write!(f, "consume %{}", x.0)?,
      OpKind::Require(x) => write!(f, "require %{}", x.0)?,
    }
    write!(f, " (bb{}[{}])", self.source.block.0, self.source.index)
  }
}

/// Hooks fired while replaying ops with diagnosis enabled. Solving applies
/// ops silently; only the post-fixpoint replay observes failures.
pub trait PartitionObserver {
  fn use_after_consume(
    &mut self,
    op: &PartitionOp,
    id: TrackedId,
  );

  fn consume_non_consumable(
    &mut self,
    op: &PartitionOp,
    id: TrackedId,
  );
}

type RegionLabel = u32;

/// A partition of tracked ids into regions, each with a consumed flag.
/// Region labels are opaque; equality goes through canonical form.
#[derive(Debug, Clone, Default)]
pub struct Partition {
  region_of: BTreeMap<TrackedId, RegionLabel>,
  consumed: BTreeSet<RegionLabel>,
  next_label: RegionLabel,
}

impl Partition {
  pub fn new() -> Self {
    Self::default()
  }

  /// A partition placing all the given ids into one non-consumed region.
  /// Used as the entry state: all arguments may alias each other.
  pub fn single_region(ids: &[TrackedId]) -> Self {
    let mut partition = Self::new();
    if !ids.is_empty() {
      partition.insert_region(ids, false);
    }
    partition
  }

  pub fn is_tracked(
    &self,
    id: TrackedId,
  ) -> bool {
    self.region_of.contains_key(&id)
  }

  pub fn is_consumed(
    &self,
    id: TrackedId,
  ) -> bool {
    match self.region_of.get(&id) {
      Some(label) => self.consumed.contains(label),
      None => false,
    }
  }

  pub fn tracked_ids(&self) -> impl Iterator<Item = TrackedId> + '_ {
    self.region_of.keys().copied()
  }

  /// Ids whose region is consumed, in ascending order.
  pub fn consumed_ids(&self) -> Vec<TrackedId> {
    self
      .region_of
      .iter()
      .filter(|(_, label)| self.consumed.contains(label))
      .map(|(id, _)| *id)
      .collect()
  }

  /// Canonical form: regions as sorted member lists with their consumed bit,
  /// sorted by first member. Independent of internal labeling.
  pub fn regions(&self) -> Vec<(Vec<TrackedId>, bool)> {
    let mut by_label: BTreeMap<RegionLabel, Vec<TrackedId>> = BTreeMap::new();
    for (id, label) in &self.region_of {
      by_label.entry(*label).or_default().push(*id);
    }

    let mut regions: Vec<(Vec<TrackedId>, bool)> = by_label
      .into_iter()
      .map(|(label, members)| (members, self.consumed.contains(&label)))
      .collect();
    regions.sort();
    regions
  }

  /// Member lists of the non-consumed regions.
  pub fn non_consumed_regions(&self) -> Vec<Vec<TrackedId>> {
    self
      .regions()
      .into_iter()
      .filter(|(_, consumed)| !consumed)
      .map(|(members, _)| members)
      .collect()
  }

  fn fresh_label(&mut self) -> RegionLabel {
    let label = self.next_label;
    self.next_label += 1;
    label
  }

  fn insert_region(
    &mut self,
    ids: &[TrackedId],
    consumed: bool,
  ) {
    let label = self.fresh_label();
    for id in ids {
      self.region_of.insert(*id, label);
    }
    if consumed {
      self.consumed.insert(label);
    }
  }

  /// Remove an id from its region, dropping the region (and its consumed
  /// bit) if it becomes empty.
  fn remove(
    &mut self,
    id: TrackedId,
  ) {
    let Some(label) = self.region_of.remove(&id) else {
      return;
    };
    if !self.region_of.values().any(|l| *l == label) {
      self.consumed.remove(&label);
    }
  }

  /// Place `x` alone in a brand-new non-consumed region.
  pub fn assign_fresh(
    &mut self,
    x: TrackedId,
  ) {
    self.remove(x);
    let label = self.fresh_label();
    self.region_of.insert(x, label);
  }

  /// Rebind `d` to `s`'s region (inheriting its consumed flag).
  pub fn assign(
    &mut self,
    d: TrackedId,
    s: TrackedId,
  ) {
    assert!(self.is_tracked(s), "assign source must be tracked");
    if d == s {
      return;
    }
    let label = self.region_of[&s];
    self.remove(d);
    self.region_of.insert(d, label);
  }

  /// Union the regions of `a` and `b`; the result is consumed iff either was.
  pub fn merge(
    &mut self,
    a: TrackedId,
    b: TrackedId,
  ) {
    assert!(self.is_tracked(a) && self.is_tracked(b), "merge operands must be tracked");
    let la = self.region_of[&a];
    let lb = self.region_of[&b];
    if la == lb {
      return;
    }
    for label in self.region_of.values_mut() {
      if *label == lb {
        *label = la;
      }
    }
    if self.consumed.remove(&lb) {
      self.consumed.insert(la);
    }
  }

  /// Mark `x`'s region as consumed.
  pub fn consume(
    &mut self,
    x: TrackedId,
  ) {
    assert!(self.is_tracked(x), "consume operand must be tracked");
    let label = self.region_of[&x];
    self.consumed.insert(label);
  }

  /// Apply an op with failures suppressed (the solving mode).
  pub fn apply(
    &mut self,
    op: &PartitionOp,
  ) {
    match op.kind {
      OpKind::AssignFresh(x) => self.assign_fresh(x),
      OpKind::Assign(d, s) => {
        if self.is_tracked(s) {
          self.assign(d, s);
        } else {
          self.assign_fresh(d);
        }
      },
      OpKind::Merge(a, b) => self.merge(a, b),
      OpKind::Consume(x) => self.consume(x),
      OpKind::Require(_) => {},
    }
  }

  /// Apply an op, reporting failures to the observer. State changes are the
  /// same as `apply`; a failed require does not abort the replay.
  pub fn apply_observed(
    &mut self,
    op: &PartitionOp,
    non_consumables: &BTreeSet<TrackedId>,
    observer: &mut dyn PartitionObserver,
  ) {
    match op.kind {
      OpKind::Consume(x) => {
        if non_consumables.contains(&x) {
          observer.consume_non_consumable(op, x);
        }
        self.consume(x);
      },
      OpKind::Require(x) => {
        if self.is_consumed(x) {
          observer.use_after_consume(op, x);
        }
      },
      _ => self.apply(op),
    }
  }

  /// Join at a control-flow merge: two ids share a joined region iff they
  /// share a region in both inputs; consumed flags OR where ids co-occur.
  /// An id tracked on only one side joins as a singleton carrying that
  /// side's consumed flag.
  pub fn join(
    a: &Partition,
    b: &Partition,
  ) -> Partition {
    let mut result = Partition::new();

    let ids: BTreeSet<TrackedId> = a.region_of.keys().chain(b.region_of.keys()).copied().collect();

    let mut groups: BTreeMap<(RegionLabel, RegionLabel), Vec<TrackedId>> = BTreeMap::new();
    let mut singles: Vec<(TrackedId, bool)> = Vec::new();

    for id in ids {
      match (a.region_of.get(&id), b.region_of.get(&id)) {
        (Some(&la), Some(&lb)) => groups.entry((la, lb)).or_default().push(id),
        (Some(&la), None) => singles.push((id, a.consumed.contains(&la))),
        (None, Some(&lb)) => singles.push((id, b.consumed.contains(&lb))),
        (None, None) => unreachable!(),
      }
    }

    for ((la, lb), members) in groups {
      let consumed = a.consumed.contains(&la) || b.consumed.contains(&lb);
      result.insert_region(&members, consumed);
    }
    for (id, consumed) in singles {
      result.insert_region(&[id], consumed);
    }

    result
  }
}

impl PartialEq for Partition {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.regions() == other.regions()
  }
}

impl Eq for Partition {}

impl fmt::Display for Partition {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "[")?;
    for (i, (members, consumed)) in self.regions().iter().enumerate() {
      if i > 0 {
        write!(f, " ")?;
      }
      write!(f, "{{")?;
      for (j, id) in members.iter().enumerate() {
        if j > 0 {
          write!(f, " ")?;
        }
        write!(f, "%{}", id.0)?;
      }
      write!(f, "}}")?;
      if *consumed {
        write!(f, "*")?;
      }
    }
    write!(f, "]")
  }
}
