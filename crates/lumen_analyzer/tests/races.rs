mod common;

use common::{TestContext, assert_diagnostic_at, count_code, format_diagnostics, func_ref};
use lumen_analyzer::check_program;
use lumen_config::LumenConfig;
use lumen_lir::{FunctionBuilder, InstrKind, LirProgram, Operand, TerminatorKind};
use lumen_type::traits::TraitRegistry;

#[test]
fn linear_consume_then_use() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("consume_then_use"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));
  let aliased = b.alloc_temp(cell, ctx.span(2));
  b.emit(
    InstrKind::Copy {
      dest: aliased,
      source: Operand::Temp(a),
    },
    ctx.span(2),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(3),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(aliased)],
      crossing: false,
    },
    ctx.span(4),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(5));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 2, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0091", &ctx.span(3));
  assert_diagnostic_at(&diags, "A0092", &ctx.span(4));
}

#[test]
fn fresh_reassignment_clears_consumption() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();
  let cell_ptr = ctx.cell_ptr();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("reassign"), ctx.types.void(), ctx.span(0));
  let slot = b.alloc_temp(cell_ptr, ctx.span(1));
  b.emit(InstrKind::AllocStack { dest: slot }, ctx.span(1));

  let first = b.alloc_temp(cell, ctx.span(2));
  b.emit(InstrKind::AllocRef { dest: first }, ctx.span(2));
  b.emit(
    InstrKind::Store {
      address: Operand::Temp(slot),
      value: Operand::Temp(first),
    },
    ctx.span(3),
  );

  let loaded = b.alloc_temp(cell, ctx.span(4));
  b.emit(
    InstrKind::Load {
      dest: loaded,
      address: Operand::Temp(slot),
    },
    ctx.span(4),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(loaded)],
      crossing: true,
    },
    ctx.span(5),
  );

  // Rebind the storage to a fresh value; the old consumption must not stick.
  let second = b.alloc_temp(cell, ctx.span(6));
  b.emit(InstrKind::AllocRef { dest: second }, ctx.span(6));
  b.emit(
    InstrKind::Store {
      address: Operand::Temp(slot),
      value: Operand::Temp(second),
    },
    ctx.span(7),
  );

  let reloaded = b.alloc_temp(cell, ctx.span(8));
  b.emit(
    InstrKind::Load {
      dest: reloaded,
      address: Operand::Temp(slot),
    },
    ctx.span(8),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(reloaded)],
      crossing: false,
    },
    ctx.span(9),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(10));
  let func = b.finish();

  let diags = ctx.check(&func);
  assert!(diags.is_empty(), "expected no diagnostics:\n{}", format_diagnostics(&diags));
}

#[test]
fn diamond_consumed_on_one_branch() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("diamond"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));

  let cond = b.alloc_temp(ctx.types.boolean(), ctx.span(2));
  b.emit(
    InstrKind::Literal {
      dest: cond,
      value: lumen_lir::ConstValue::Bool(true, ctx.types.boolean()),
    },
    ctx.span(2),
  );

  let consume_block = b.create_block("consume");
  let skip_block = b.create_block("skip");
  let merge_block = b.create_block("merge");
  b.terminate(
    TerminatorKind::Branch {
      condition: Operand::Temp(cond),
      then_block: consume_block,
      else_block: skip_block,
    },
    ctx.span(3),
  );

  b.switch_to_block(consume_block);
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(4),
  );
  b.terminate(TerminatorKind::Goto(merge_block), ctx.span(5));

  b.switch_to_block(skip_block);
  b.terminate(TerminatorKind::Goto(merge_block), ctx.span(6));

  b.switch_to_block(merge_block);
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: false,
    },
    ctx.span(7),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(8));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 2, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0091", &ctx.span(4));
  assert_diagnostic_at(&diags, "A0092", &ctx.span(7));
}

#[test]
fn loop_with_consume_inside() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("consume_in_loop"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));

  let cond = b.alloc_temp(ctx.types.boolean(), ctx.span(2));
  b.emit(
    InstrKind::Literal {
      dest: cond,
      value: lumen_lir::ConstValue::Bool(true, ctx.types.boolean()),
    },
    ctx.span(2),
  );

  let header = b.create_block("header");
  let body = b.create_block("body");
  let after = b.create_block("after");

  b.terminate(TerminatorKind::Goto(header), ctx.span(3));

  b.switch_to_block(header);
  b.terminate(
    TerminatorKind::Branch {
      condition: Operand::Temp(cond),
      then_block: body,
      else_block: after,
    },
    ctx.span(4),
  );

  b.switch_to_block(body);
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(5),
  );
  b.terminate(TerminatorKind::Goto(header), ctx.span(6));

  b.switch_to_block(after);
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: false,
    },
    ctx.span(7),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(8));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 2, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0091", &ctx.span(5));
  assert_diagnostic_at(&diags, "A0092", &ctx.span(7));
}

#[test]
fn argument_transfer_is_its_own_error() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("transfer_arg"), ctx.types.void(), ctx.span(0));
  let arg = b.add_param(cell, ctx.span(1));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(arg)],
      crossing: true,
    },
    ctx.span(2),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(3));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 1, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0090", &ctx.span(2));
  assert_eq!(count_code(&diags, "A0091"), 0);
  assert_eq!(count_code(&diags, "A0092"), 0);
}

#[test]
fn aliased_argument_transfer_is_still_an_argument_error() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("transfer_arg_alias"), ctx.types.void(), ctx.span(0));
  let arg = b.add_param(cell, ctx.span(1));
  let alias = b.alloc_temp(cell, ctx.span(2));
  b.emit(
    InstrKind::Copy {
      dest: alias,
      source: Operand::Temp(arg),
    },
    ctx.span(2),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(alias)],
      crossing: true,
    },
    ctx.span(3),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(4));
  let func = b.finish();

  let diags = ctx.check(&func);

  // Copies normalize to the argument itself, so this is the argument error,
  // not a race.
  assert_eq!(diags.len(), 1, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0090", &ctx.span(3));
}

#[test]
fn captured_address_store_falls_back_to_merge() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();
  let cell_ptr = ctx.cell_ptr();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("captured_store"), ctx.types.void(), ctx.span(0));
  let slot = b.alloc_temp(cell_ptr, ctx.span(1));
  b.emit(InstrKind::AllocStack { dest: slot }, ctx.span(1));

  // Passing the address to a call captures it: later stores may be observed
  // by whoever retained it.
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(slot)],
      crossing: false,
    },
    ctx.span(2),
  );

  let x = b.alloc_temp(cell, ctx.span(3));
  b.emit(InstrKind::AllocRef { dest: x }, ctx.span(3));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(x)],
      crossing: true,
    },
    ctx.span(4),
  );

  // The store must merge rather than rebind, so the slot inherits the
  // consumption of `x`.
  b.emit(
    InstrKind::Store {
      address: Operand::Temp(slot),
      value: Operand::Temp(x),
    },
    ctx.span(5),
  );

  let loaded = b.alloc_temp(cell, ctx.span(6));
  b.emit(
    InstrKind::Load {
      dest: loaded,
      address: Operand::Temp(slot),
    },
    ctx.span(6),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(loaded)],
      crossing: false,
    },
    ctx.span(7),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(8));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 2, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0091", &ctx.span(4));
  assert_diagnostic_at(&diags, "A0092", &ctx.span(7));
}

#[test]
fn returning_a_consumed_value_is_a_race() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("return_consumed"), cell, ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(2),
  );
  b.terminate(TerminatorKind::Return(Some(Operand::Temp(a))), ctx.span(3));
  let func = b.finish();

  let diags = ctx.check(&func);

  assert_eq!(diags.len(), 2, "unexpected diagnostics:\n{}", format_diagnostics(&diags));
  assert_diagnostic_at(&diags, "A0091", &ctx.span(2));
  assert_diagnostic_at(&diags, "A0092", &ctx.span(3));
}

#[test]
fn requirement_sites_are_capped_with_hidden_count() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("many_uses"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(2),
  );
  for slot in 3..10 {
    b.emit(
      InstrKind::Call {
        dest: None,
        callee: func_ref(),
        args: vec![Operand::Temp(a)],
        crossing: false,
      },
      ctx.span(slot),
    );
  }
  b.terminate(TerminatorKind::Return(None), ctx.span(10));
  let func = b.finish();

  let diags = ctx.check(&func);

  // One consume with seven uses: five reported, two hidden.
  assert_eq!(count_code(&diags, "A0091"), 1);
  assert_eq!(count_code(&diags, "A0092"), 5);
  let race = diags.iter().find(|d| d.error_code == "A0091").unwrap();
  assert!(
    race.message.contains("5 access sites (2 more hidden)"),
    "unexpected message: {}",
    race.message
  );
}

#[test]
fn diagnostics_are_deterministic() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("determinism"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));
  let other = b.alloc_temp(cell, ctx.span(2));
  b.emit(InstrKind::AllocRef { dest: other }, ctx.span(2));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a), Operand::Temp(other)],
      crossing: true,
    },
    ctx.span(3),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: false,
    },
    ctx.span(4),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(other)],
      crossing: false,
    },
    ctx.span(5),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(6));
  let func = b.finish();

  let first = format_diagnostics(&ctx.check(&func));
  let second = format_diagnostics(&ctx.check(&func));
  assert_eq!(first, second, "diagnostic stream must be byte-identical across runs");
}

#[test]
fn feature_gate_skips_the_analysis() {
  let mut ctx = TestContext::new();
  let cell = ctx.cell();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("gated"), ctx.types.void(), ctx.span(0));
  let a = b.alloc_temp(cell, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: a }, ctx.span(1));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: true,
    },
    ctx.span(2),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(a)],
      crossing: false,
    },
    ctx.span(3),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(4));

  let mut program = LirProgram::new();
  program.functions.alloc(b.finish());

  // Feature off: nothing runs.
  let off = LumenConfig::default();
  assert!(check_program(&program, &ctx.types, &ctx.traits, &off).is_empty());

  // Feature on but no ThreadSafe trait declared: nothing runs either.
  let bare_traits = TraitRegistry::new();
  assert!(check_program(&program, &ctx.types, &bare_traits, &ctx.config).is_empty());

  // Feature on with the trait available: the race is reported.
  let diags = check_program(&program, &ctx.types, &ctx.traits, &ctx.config);
  assert_eq!(count_code(&diags, "A0091"), 1);
  assert_eq!(count_code(&diags, "A0092"), 1);
}

#[test]
fn thread_safe_values_are_never_tracked() {
  let mut ctx = TestContext::new();
  let stats = ctx.stats();

  let mut b = FunctionBuilder::new(ctx.symbols.intern("safe_values"), ctx.types.void(), ctx.span(0));
  let s = b.alloc_temp(stats, ctx.span(1));
  b.emit(InstrKind::AllocRef { dest: s }, ctx.span(1));
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(s)],
      crossing: true,
    },
    ctx.span(2),
  );
  b.emit(
    InstrKind::Call {
      dest: None,
      callee: func_ref(),
      args: vec![Operand::Temp(s)],
      crossing: false,
    },
    ctx.span(3),
  );
  b.terminate(TerminatorKind::Return(None), ctx.span(4));
  let func = b.finish();

  let diags = ctx.check(&func);
  assert!(diags.is_empty(), "expected no diagnostics:\n{}", format_diagnostics(&diags));
}
