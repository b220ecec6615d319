use std::collections::{BTreeMap, BTreeSet, VecDeque};

use lumen_lir::BlockId;

use crate::partition::{OpKind, PartitionOp};
use crate::solver::BlockPartitionState;
use crate::value::TrackedId;

/// Why a value was consumed, looking only inside one block.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalConsumedReason {
  /// A consume op in this block.
  ConsumeOp(PartitionOp),
  /// Consumed on entry to the block, as the carried value. Usually the value
  /// the search started from; a merge or assignment that imported an
  /// already-consumed region retargets the search to that region's value.
  NonLocal(TrackedId),
}

/// First op observed to consume the searched value during a local scan.
enum Seed {
  Consume(PartitionOp),
  /// A merge or assignment imported consumption from `source`'s region;
  /// resolve by searching for `source`'s reason up to that op.
  Indirect { op: PartitionOp, source: TrackedId },
}

/// Everything known about why a region was consumed: consume ops keyed by
/// distance, where distance counts the cross-block region-merge steps that
/// had to chain to propagate the consumption. Smaller distances make more
/// informative diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ConsumedReason {
  consume_ops: BTreeMap<u32, Vec<PartitionOp>>,
}

impl ConsumedReason {
  pub fn new() -> Self {
    Self::default()
  }

  /// Valid if at least one consume op was found.
  pub fn is_valid(&self) -> bool {
    self.consume_ops.values().any(|ops| !ops.is_empty())
  }

  fn distance_of(
    &self,
    op: &PartitionOp,
  ) -> Option<u32> {
    for (distance, ops) in &self.consume_ops {
      if ops.contains(op) {
        return Some(*distance);
      }
    }
    None
  }

  /// Record a consume op at a distance, keeping the minimal distance when
  /// the same op is rediscovered along another path.
  pub fn add_consume_op(
    &mut self,
    op: PartitionOp,
    distance: u32,
  ) {
    debug_assert!(matches!(op.kind, OpKind::Consume(_)), "only consume ops explain consumption");

    if let Some(existing) = self.distance_of(&op) {
      if existing <= distance {
        return;
      }
      if let Some(ops) = self.consume_ops.get_mut(&existing) {
        ops.retain(|o| o != &op);
        if ops.is_empty() {
          self.consume_ops.remove(&existing);
        }
      }
    }

    self.consume_ops.entry(distance).or_default().push(op);
  }

  /// Merge in another reason, adding the specified distance to all its ops.
  pub fn add_other_reason_at_distance(
    &mut self,
    other: &ConsumedReason,
    distance: u32,
  ) {
    for (other_distance, ops) in &other.consume_ops {
      for op in ops {
        self.add_consume_op(op.clone(), distance + other_distance);
      }
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &PartitionOp)> {
    self
      .consume_ops
      .iter()
      .flat_map(|(distance, ops)| ops.iter().map(|op| (*distance, op)))
  }
}

/// A requirement site at its distance from one consume site. Ordered by
/// distance first so the closest sites are reported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RequireAtDistance {
  distance: u32,
  op: PartitionOp,
}

/// One step of the ranked diagnostic walk: a consume site with its counts,
/// followed by each of its displayed requirement sites.
pub enum ConsumeRequireStep<'a> {
  Consume {
    op: &'a PartitionOp,
    num_displayed: usize,
    num_hidden: usize,
  },
  Require {
    op: &'a PartitionOp,
  },
}

/// The inverse view the diagnostics want: each consume op mapped to the
/// requirement sites it poisoned, closest first.
#[derive(Debug, Default)]
pub struct ConsumeRequireAccumulator {
  requirements_for_consumptions: BTreeMap<PartitionOp, BTreeSet<RequireAtDistance>>,
}

impl ConsumeRequireAccumulator {
  pub fn accumulate_consumed_reason(
    &mut self,
    require_op: &PartitionOp,
    reason: &ConsumedReason,
  ) {
    for (distance, consume_op) in reason.iter() {
      self
        .requirements_for_consumptions
        .entry(consume_op.clone())
        .or_default()
        .insert(RequireAtDistance {
          distance,
          op: require_op.clone(),
        });
    }
  }

  /// Walk the consume ops in source order. Each consume step reports how many
  /// requirements will be shown and how many stay hidden; it is followed by
  /// one require step per shown requirement, in distance order.
  pub fn for_each_consume_require(
    &self,
    num_requires_per_consume: usize,
    mut step: impl FnMut(ConsumeRequireStep<'_>),
  ) {
    for (consume_op, requires) in &self.requirements_for_consumptions {
      let num_displayed = requires.len().min(num_requires_per_consume);
      step(ConsumeRequireStep::Consume {
        op: consume_op,
        num_displayed,
        num_hidden: requires.len() - num_displayed,
      });

      for require in requires.iter().take(num_requires_per_consume) {
        step(ConsumeRequireStep::Require { op: &require.op });
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.requirements_for_consumptions.is_empty()
  }
}

/// Traces each use-after-consume failure back through the CFG to the consume
/// ops that could be responsible, with dataflow distances.
pub struct RaceTracer<'a> {
  states: &'a [BlockPartitionState],
  preds: &'a [Vec<BlockId>],

  /// Why values were consumed at entry to blocks. Entries are pre-seeded
  /// empty before recursing so CFG cycles terminate; the first real result
  /// replaces the placeholder.
  consumed_at_entry_reasons: BTreeMap<(BlockId, TrackedId), ConsumedReason>,

  /// Why values were consumed at exit from blocks.
  consumed_at_exit_reasons: BTreeMap<(BlockId, TrackedId), LocalConsumedReason>,

  accumulator: ConsumeRequireAccumulator,
}

impl<'a> RaceTracer<'a> {
  pub fn new(
    states: &'a [BlockPartitionState],
    preds: &'a [Vec<BlockId>],
  ) -> Self {
    Self {
      states,
      preds,
      consumed_at_entry_reasons: BTreeMap::new(),
      consumed_at_exit_reasons: BTreeMap::new(),
      accumulator: ConsumeRequireAccumulator::default(),
    }
  }

  pub fn trace_use_of_consumed_value(
    &mut self,
    use_op: PartitionOp,
    consumed_val: TrackedId,
  ) {
    let reason = self.find_consumed_at_op_reason(consumed_val, &use_op);
    self.accumulator.accumulate_consumed_reason(&use_op, &reason);
  }

  pub fn accumulator(&self) -> &ConsumeRequireAccumulator {
    &self.accumulator
  }

  fn find_consumed_at_op_reason(
    &mut self,
    consumed_val: TrackedId,
    op: &PartitionOp,
  ) -> ConsumedReason {
    let mut reason = ConsumedReason::new();
    self.find_and_add_consumed_reasons(op.source.block, consumed_val, &mut reason, 0, Some(op));
    reason
  }

  fn find_and_add_consumed_reasons(
    &mut self,
    block: BlockId,
    consumed_val: TrackedId,
    reason: &mut ConsumedReason,
    distance: u32,
    target_op: Option<&PartitionOp>,
  ) {
    debug_assert!(
      target_op.is_some() || self.states[block.index()].exit.is_consumed(consumed_val),
      "tracing a value that is not consumed at block exit"
    );

    match self.find_local_consumed_reason(block, consumed_val, target_op) {
      LocalConsumedReason::ConsumeOp(op) => reason.add_consume_op(op, distance),
      LocalConsumedReason::NonLocal(val) => {
        let entry_reason = self.find_consumed_at_entry_reason(block, val);
        reason.add_other_reason_at_distance(&entry_reason, distance);
      },
    }
  }

  /// Why was this value consumed at entry to this block? Collects consume
  /// reasons from predecessors of every value the entry join merges with the
  /// target, at a distance counting the single-step joins in between.
  fn find_consumed_at_entry_reason(
    &mut self,
    block: BlockId,
    consumed_val: TrackedId,
  ) -> ConsumedReason {
    let key = (block, consumed_val);
    if let Some(reason) = self.consumed_at_entry_reasons.get(&key) {
      return reason.clone();
    }

    // Placeholder breaks cycles: a recursive query for the same key sees an
    // empty reason instead of recursing forever.
    self.consumed_at_entry_reasons.insert(key, ConsumedReason::new());

    let entry = &self.states[block.index()].entry;

    // Values tracked at entry that are consumed at the exit of some
    // predecessor, with the predecessors that consumed them.
    let mut consumed_in_some_pred: BTreeMap<TrackedId, Vec<BlockId>> = BTreeMap::new();

    // Single-step join edges: pairs co-resident in some predecessor's exit
    // (non-consumed) region. Deliberately not transitively closed; the BFS
    // counts how many steps a transitive merge needs.
    let mut single_step_joins: BTreeMap<TrackedId, BTreeSet<TrackedId>> = BTreeMap::new();

    for pred in &self.preds[block.index()] {
      let pred_exit = &self.states[pred.index()].exit;

      for val in pred_exit.consumed_ids() {
        if entry.is_tracked(val) {
          consumed_in_some_pred.entry(val).or_default().push(*pred);
        }
      }

      for region in pred_exit.non_consumed_regions() {
        for &fst in &region {
          for &snd in &region {
            if fst != snd && entry.is_tracked(fst) && entry.is_tracked(snd) {
              single_step_joins.entry(fst).or_default().insert(snd);
            }
          }
        }
      }
    }

    // BFS over the join edges from the target value.
    let mut distances: BTreeMap<TrackedId, u32> = BTreeMap::new();
    let mut queue: VecDeque<(TrackedId, u32)> = VecDeque::new();
    queue.push_back((consumed_val, 0));
    distances.insert(consumed_val, 0);
    while let Some((current, current_distance)) = queue.pop_front() {
      if let Some(next) = single_step_joins.get(&current) {
        for &next_val in next {
          if !distances.contains_key(&next_val) {
            distances.insert(next_val, current_distance + 1);
            queue.push_back((next_val, current_distance + 1));
          }
        }
      }
    }

    let mut reason = ConsumedReason::new();
    for (pred_val, distance_from_target) in distances {
      let Some(pred_blocks) = consumed_in_some_pred.get(&pred_val).cloned() else {
        continue;
      };
      for pred_block in pred_blocks {
        // One reason the target is consumed here: `pred_val` was consumed at
        // the exit of `pred_block`, and `distance_from_target` joins chain it
        // to the target.
        self.find_and_add_consumed_reasons(pred_block, pred_val, &mut reason, distance_from_target, None);
      }
    }

    self.consumed_at_entry_reasons.insert(key, reason.clone());
    reason
  }

  /// The in-block reason a value is consumed: re-play the block's ops from
  /// its entry partition and watch the value's consumption state. If the
  /// value is consumed at entry it is first revived, since only local
  /// reasons are sought here. When the first consuming op is a merge or
  /// assignment, the consumption arrived from another region; the search
  /// retargets to that region's value so the originating transfer is still
  /// found.
  fn find_local_consumed_reason(
    &mut self,
    block: BlockId,
    consumed_val: TrackedId,
    target_op: Option<&PartitionOp>,
  ) -> LocalConsumedReason {
    let key = (block, consumed_val);
    if target_op.is_none()
      && let Some(reason) = self.consumed_at_exit_reasons.get(&key)
    {
      return reason.clone();
    }

    let state = &self.states[block.index()];
    debug_assert!(
      target_op.is_some() || state.exit.is_consumed(consumed_val),
      "querying exit consumption reason for a non-consumed value"
    );

    let entry_consumed = state.entry.is_consumed(consumed_val);

    let mut working = state.entry.clone();
    if entry_consumed {
      working.assign_fresh(consumed_val);
    }

    let mut seed: Option<Seed> = None;

    for op in state.ops() {
      if let Some(target) = target_op
        && op == target
      {
        break;
      }

      // Peek before applying: a merge that consumes the searched value does
      // so because one operand's region was already consumed.
      let merge_source = match op.kind {
        OpKind::Merge(a, b) => {
          if working.is_consumed(a) {
            Some(a)
          } else if working.is_consumed(b) {
            Some(b)
          } else {
            None
          }
        },
        _ => None,
      };

      working.apply(op);

      if working.is_consumed(consumed_val) && seed.is_none() {
        seed = Some(match &op.kind {
          OpKind::Consume(_) => Seed::Consume(op.clone()),
          OpKind::Assign(_, source) => Seed::Indirect {
            op: op.clone(),
            source: *source,
          },
          OpKind::Merge(..) => {
            let source = merge_source.expect("merge consumed a value without a consumed operand");
            Seed::Indirect { op: op.clone(), source }
          },
          _ => unreachable!("only consume, assign, and merge ops can consume a value"),
        });
      }
      if !working.is_consumed(consumed_val) && seed.is_some() {
        // No longer consumed: reassigned or freshened. Keep looking.
        seed = None;
      }
    }

    let resolved = match seed {
      Some(Seed::Consume(op)) => Some(LocalConsumedReason::ConsumeOp(op)),
      Some(Seed::Indirect { op, source }) => Some(self.find_local_consumed_reason(block, source, Some(&op))),
      None if entry_consumed => Some(LocalConsumedReason::NonLocal(consumed_val)),
      None => None,
    };

    let reason = resolved.expect("queried consume reason for a value that was never consumed");

    if target_op.is_none() {
      self.consumed_at_exit_reasons.insert(key, reason.clone());
    }
    reason
  }
}
