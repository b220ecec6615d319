use std::collections::BTreeSet;

use lumen_config::{DebugTrace, LumenConfig};
use lumen_diagnostics::{diagnostic_report::Diagnostic, message::DiagnosticMessage};
use lumen_lir::{BlockId, FunctionLir};
use lumen_log::trace_dbg;
use lumen_type::types::TypeStore;

use crate::oracle::ThreadSafetyOracle;
use crate::partition::{Partition, PartitionObserver, PartitionOp};
use crate::tracer::{ConsumeRequireStep, RaceTracer};
use crate::translate::PartitionOpTranslator;
use crate::value::TrackedId;

/// How many requirement sites are reported per consume site.
pub const NUM_REQUIREMENTS_TO_DIAGNOSE: usize = 5;

/// Fixpoint state for one basic block.
#[derive(Debug, Default)]
pub struct BlockPartitionState {
  pub needs_update: bool,
  pub reached: bool,
  pub entry: Partition,
  pub exit: Partition,
  /// Op sequence, translated once on first need. Blocks the fixpoint never
  /// reaches keep `None` and are skipped by diagnosis.
  pub ops: Option<Vec<PartitionOp>>,
}

impl BlockPartitionState {
  pub fn ops(&self) -> &[PartitionOp] {
    self.ops.as_deref().unwrap_or(&[])
  }
}

/// The region-based thread-safety analysis for one function: translation,
/// fixpoint solving, and diagnosis.
pub struct PartitionAnalysis<'a> {
  func: &'a FunctionLir,
  config: &'a LumenConfig,
  translator: PartitionOpTranslator<'a>,
  states: Vec<BlockPartitionState>,
  preds: Vec<Vec<BlockId>>,
  non_consumables: BTreeSet<TrackedId>,
  solved: bool,
}

impl<'a> PartitionAnalysis<'a> {
  pub fn new(
    func: &'a FunctionLir,
    types: &'a TypeStore,
    oracle: &'a ThreadSafetyOracle<'a>,
    config: &'a LumenConfig,
  ) -> Self {
    let mut translator = PartitionOpTranslator::new(func, types, oracle, config);

    let mut states: Vec<BlockPartitionState> = (0..func.blocks.len()).map(|_| BlockPartitionState::default()).collect();

    // Seed the entry block: all non-thread-safe arguments share one region.
    let entry_index = func.entry_block.index();
    states[entry_index].needs_update = true;
    states[entry_index].entry = translator.entry_partition();

    let non_consumables = translator.non_consumables();
    let preds = func.predecessor_map();

    Self {
      func,
      config,
      translator,
      states,
      preds,
      non_consumables,
      solved: false,
    }
  }

  /// Iterate to a fixpoint over the CFG. Blocks are swept in program order so
  /// runs are deterministic.
  pub fn solve(&mut self) {
    assert!(!self.solved, "solve should only be called once");
    self.solved = true;

    let mut any_needs_update = true;
    while any_needs_update {
      any_needs_update = false;

      for index in 0..self.states.len() {
        if !self.states[index].needs_update {
          continue;
        }
        self.states[index].needs_update = false;
        self.states[index].reached = true;

        // Join the exit partitions of all predecessors the analysis has
        // reached.
        let mut new_entry: Option<Partition> = None;
        for pred in &self.preds[index] {
          let pred_state = &self.states[pred.index()];
          if !pred_state.reached {
            continue;
          }
          new_entry = Some(match new_entry {
            None => pred_state.exit.clone(),
            Some(current) => Partition::join(&current, &pred_state.exit),
          });
        }

        if let Some(entry) = new_entry {
          if entry == self.states[index].entry {
            continue;
          }
          self.states[index].entry = entry;
        }

        let block_id = BlockId::new(index as u32);
        if self.states[index].ops.is_none() {
          self.states[index].ops = Some(self.translator.translate_block(block_id));
        }

        // Recompute the exit by folding ops over the entry; failures are
        // suppressed while solving.
        let new_exit = {
          let state = &self.states[index];
          let mut working = state.entry.clone();
          for op in state.ops() {
            working.apply(op);
          }
          working
        };

        if new_exit != self.states[index].exit {
          self.states[index].exit = new_exit;
          for succ in self.func.blocks.get(&block_id).successors() {
            any_needs_update = true;
            self.states[succ.index()].needs_update = true;
          }
        }
      }
    }
  }

  /// Re-play every reached block against the fixpoint state with failure
  /// hooks enabled, trace each failure to its consume sites, and format the
  /// findings.
  pub fn diagnose(&self) -> Vec<Diagnostic> {
    assert!(self.solved, "diagnose should not be called before solve");

    let mut tracer = RaceTracer::new(&self.states, &self.preds);
    let mut diagnostics = Vec::new();

    for state in &self.states {
      let mut sink = DiagnoseSink {
        tracer: &mut tracer,
        diagnostics: &mut diagnostics,
        func: self.func,
      };
      let mut working = state.entry.clone();
      for op in state.ops() {
        working.apply_observed(op, &self.non_consumables, &mut sink);
      }
    }

    tracer
      .accumulator()
      .for_each_consume_require(NUM_REQUIREMENTS_TO_DIAGNOSE, |step| match step {
        ConsumeRequireStep::Consume {
          op,
          num_displayed,
          num_hidden,
        } => {
          diagnostics.push(
            DiagnosticMessage::ConsumptionYieldsRace {
              span: self.func.ref_span(&op.source),
              num_displayed,
              num_hidden,
            }
            .report(),
          );
        },
        ConsumeRequireStep::Require { op } => {
          diagnostics.push(
            DiagnosticMessage::PossibleRacyAccessSite {
              span: self.func.ref_span(&op.source),
            }
            .report(),
          );
        },
      });

    diagnostics
  }

  pub fn entry_partition(
    &self,
    block: BlockId,
  ) -> &Partition {
    &self.states[block.index()].entry
  }

  pub fn exit_partition(
    &self,
    block: BlockId,
  ) -> &Partition {
    &self.states[block.index()].exit
  }

  pub fn block_ops(
    &self,
    block: BlockId,
  ) -> &[PartitionOp] {
    self.states[block.index()].ops()
  }

  pub fn reached(
    &self,
    block: BlockId,
  ) -> bool {
    self.states[block.index()].reached
  }

  pub fn non_consumables(&self) -> &BTreeSet<TrackedId> {
    &self.non_consumables
  }

  /// Dump per-block fixpoint state through the `regions` debug trace.
  pub fn dump(&self) {
    for (index, state) in self.states.iter().enumerate() {
      let block = self.func.blocks.get(&BlockId::new(index as u32));
      trace_dbg!(
        self.config,
        DebugTrace::Regions,
        "{} reached={} entry={} exit={}",
        block.label,
        state.reached,
        state.entry,
        state.exit
      );
      for op in state.ops() {
        trace_dbg!(self.config, DebugTrace::Regions, "  {}", op);
      }
    }
  }
}

/// Observer wiring replay failures into the tracer and the diagnostics list.
struct DiagnoseSink<'a, 'b> {
  tracer: &'b mut RaceTracer<'a>,
  diagnostics: &'b mut Vec<Diagnostic>,
  func: &'a FunctionLir,
}

impl PartitionObserver for DiagnoseSink<'_, '_> {
  fn use_after_consume(
    &mut self,
    op: &PartitionOp,
    id: TrackedId,
  ) {
    self.tracer.trace_use_of_consumed_value(op.clone(), id);
  }

  fn consume_non_consumable(
    &mut self,
    op: &PartitionOp,
    _id: TrackedId,
  ) {
    self.diagnostics.push(
      DiagnosticMessage::ArgumentRegionConsumed {
        span: self.func.ref_span(&op.source),
      }
      .report(),
    );
  }
}
