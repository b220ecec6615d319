use std::fmt::Write;

use lumen_type::{
  symbol::SymbolTable,
  types::{Type, TypeStore},
};

use crate::{Block, ConstValue, FunctionLir, Instr, InstrKind, LirProgram, Operand, TerminatorKind};

/// Pretty printer for LIR programs.
pub struct LirPrinter<'a> {
  program: &'a LirProgram,
  types: &'a TypeStore,
  symbols: &'a SymbolTable,
  output: String,
}

/// Render a whole program for dumps and goldens.
pub fn print_lir(
  program: &LirProgram,
  types: &TypeStore,
  symbols: &SymbolTable,
) -> String {
  LirPrinter::new(program, types, symbols).print()
}

impl<'a> LirPrinter<'a> {
  pub fn new(
    program: &'a LirProgram,
    types: &'a TypeStore,
    symbols: &'a SymbolTable,
  ) -> Self {
    Self {
      program,
      types,
      symbols,
      output: String::new(),
    }
  }

  pub fn print(mut self) -> String {
    writeln!(self.output, "=== LIR ===").unwrap();

    if let Some(entry) = self.program.entry_point {
      let name = self.symbols.get(&self.program.functions.get(&entry).name);
      writeln!(self.output, "entry: {}", name).unwrap();
    }

    for (_, func) in self.program.functions.iter() {
      writeln!(self.output).unwrap();
      self.print_function(func);
    }

    self.output
  }

  fn print_function(
    &mut self,
    func: &FunctionLir,
  ) {
    let name = self.symbols.get(&func.name).to_string();
    let ret_ty = self.format_type(func.return_type);

    let mut params: Vec<String> = func
      .params
      .iter()
      .map(|&p| format!("t{}: {}", p.0, self.format_type(func.temp_type(p))))
      .collect();
    if let Some(recv) = func.receiver {
      params.push(format!("self t{}: {}", recv.0, self.format_type(func.temp_type(recv))));
    }

    let extern_str = if func.is_extern { " [extern]" } else { "" };

    writeln!(self.output, "fn {}({}): {}{} {{", name, params.join(", "), ret_ty, extern_str).unwrap();

    for block in func.blocks.get_all() {
      self.print_block(block);
    }

    writeln!(self.output, "}}").unwrap();
  }

  fn print_block(
    &mut self,
    block: &Block,
  ) {
    writeln!(self.output, "  {}:", block.label).unwrap();

    for instr in &block.instructions {
      let line = self.format_instr(instr);
      writeln!(self.output, "    {}", line).unwrap();
    }

    let term = match &block.terminator.kind {
      TerminatorKind::Goto(target) => format!("goto bb{}", target.0),
      TerminatorKind::Branch {
        condition,
        then_block,
        else_block,
      } => format!(
        "branch {} bb{} bb{}",
        self.format_operand(condition),
        then_block.0,
        else_block.0
      ),
      TerminatorKind::Return(Some(op)) => format!("return {}", self.format_operand(op)),
      TerminatorKind::Return(None) => "return".to_string(),
      TerminatorKind::Unreachable => "unreachable".to_string(),
    };
    writeln!(self.output, "    {}", term).unwrap();
  }

  fn format_instr(
    &self,
    instr: &Instr,
  ) -> String {
    use InstrKind::*;
    match &instr.kind {
      AllocStack { dest } => format!("t{} = alloc_stack", dest.0),
      AllocBox { dest } => format!("t{} = alloc_box", dest.0),
      AllocRef { dest } => format!("t{} = alloc_ref", dest.0),
      Literal { dest, value } => format!("t{} = literal {}", dest.0, self.format_const(value)),
      Copy { dest, source } => format!("t{} = copy {}", dest.0, self.format_operand(source)),
      BeginBorrow { dest, source } => format!("t{} = begin_borrow {}", dest.0, self.format_operand(source)),
      BeginAccess { dest, source } => format!("t{} = begin_access {}", dest.0, self.format_operand(source)),
      Load { dest, address } => format!("t{} = load {}", dest.0, self.format_operand(address)),
      LoadWeak { dest, address } => format!("t{} = load_weak {}", dest.0, self.format_operand(address)),
      Cast { dest, source, target_type } => format!(
        "t{} = cast {} to {}",
        dest.0,
        self.format_operand(source),
        self.format_type(*target_type)
      ),
      BitCast { dest, source, target_type } => format!(
        "t{} = bitcast {} to {}",
        dest.0,
        self.format_operand(source),
        self.format_type(*target_type)
      ),
      ElementAddr { dest, base, index } => format!(
        "t{} = element_addr {}[{}]",
        dest.0,
        self.format_operand(base),
        self.format_operand(index)
      ),
      FieldAddr { dest, base, field } => format!("t{} = field_addr {}.{}", dest.0, self.format_operand(base), field),
      InitExistential { dest, source, target_type } => format!(
        "t{} = init_existential {} as {}",
        dest.0,
        self.format_operand(source),
        self.format_type(*target_type)
      ),
      Store { address, value } => format!("store {} to {}", self.format_operand(value), self.format_operand(address)),
      StoreWeak { address, value } => {
        format!("store_weak {} to {}", self.format_operand(value), self.format_operand(address))
      },
      StoreBorrow { address, value } => format!(
        "store_borrow {} to {}",
        self.format_operand(value),
        self.format_operand(address)
      ),
      CopyAddr {
        dest_address,
        source_address,
      } => format!(
        "copy_addr {} to {}",
        self.format_operand(source_address),
        self.format_operand(dest_address)
      ),
      ExplicitCopyAddr {
        dest_address,
        source_address,
      } => format!(
        "explicit_copy_addr {} to {}",
        self.format_operand(source_address),
        self.format_operand(dest_address)
      ),
      Call {
        dest,
        callee,
        args,
        crossing,
      } => self.format_call("call", dest, callee, args, *crossing),
      TryCall {
        dest,
        callee,
        args,
        crossing,
      } => self.format_call("try_call", dest, callee, args, *crossing),
      PartialApply { dest, callee, args } => {
        self.format_call("partial_apply", &Some(*dest), callee, args, false)
      },
      Builtin { dest, name, args } => {
        let args_str = args.iter().map(|a| self.format_operand(a)).collect::<Vec<_>>().join(", ");
        match dest {
          Some(d) => format!("t{} = builtin \"{}\"({})", d.0, name, args_str),
          None => format!("builtin \"{}\"({})", name, args_str),
        }
      },
      BinOp { dest, op, left, right } => format!(
        "t{} = {:?} {} {}",
        dest.0,
        op,
        self.format_operand(left),
        self.format_operand(right)
      ),
      UnaryOp { dest, op, operand } => format!("t{} = {:?} {}", dest.0, op, self.format_operand(operand)),
      DestructureTuple { dests, source } => {
        let dests_str = dests.iter().map(|d| format!("t{}", d.0)).collect::<Vec<_>>().join(", ");
        format!("({}) = destructure {}", dests_str, self.format_operand(source))
      },
      Destroy { value } => format!("destroy {}", self.format_operand(value)),
      DeallocStack { address } => format!("dealloc_stack {}", self.format_operand(address)),
      DeallocBox { address } => format!("dealloc_box {}", self.format_operand(address)),
      DebugValue { value } => format!("debug_value {}", self.format_operand(value)),
      EndBorrow { borrow } => format!("end_borrow {}", self.format_operand(borrow)),
      EndAccess { access } => format!("end_access {}", self.format_operand(access)),
      EndLifetime { value } => format!("end_lifetime {}", self.format_operand(value)),
      HopToExecutor { executor } => format!("hop_to_executor {}", self.format_operand(executor)),
      Metatype { dest, ty } => format!("t{} = metatype {}", dest.0, self.format_type(*ty)),
      Method { dest, receiver, name } => format!(
        "t{} = method {}.{}",
        dest.0,
        self.format_operand(receiver),
        self.symbols.get(name)
      ),
      Nop => "nop".to_string(),
      InitRecord { dest_address, fields } => {
        let fields_str = fields
          .iter()
          .map(|(i, op)| format!("{}: {}", i, self.format_operand(op)))
          .collect::<Vec<_>>()
          .join(", ");
        format!("init_record {} {{{}}}", self.format_operand(dest_address), fields_str)
      },
      InitVector { dest_address, elements } => {
        let elems_str = elements
          .iter()
          .map(|e| self.format_operand(e))
          .collect::<Vec<_>>()
          .join(", ");
        format!("init_vector {} [{}]", self.format_operand(dest_address), elems_str)
      },
    }
  }

  fn format_call(
    &self,
    mnemonic: &str,
    dest: &Option<crate::TempId>,
    callee: &Operand,
    args: &[Operand],
    crossing: bool,
  ) -> String {
    let args_str = args.iter().map(|a| self.format_operand(a)).collect::<Vec<_>>().join(", ");
    let crossing_str = if crossing { " [crossing]" } else { "" };
    match dest {
      Some(d) => format!(
        "t{} = {} {}({}){}",
        d.0,
        mnemonic,
        self.format_operand(callee),
        args_str,
        crossing_str
      ),
      None => format!("{} {}({}){}", mnemonic, self.format_operand(callee), args_str, crossing_str),
    }
  }

  fn format_operand(
    &self,
    operand: &Operand,
  ) -> String {
    match operand {
      Operand::Temp(t) => format!("t{}", t.0),
      Operand::Const(c) => self.format_const(c),
      Operand::FuncRef(f) => {
        let name = self.symbols.get(&self.program.functions.get(f).name);
        format!("@{}", name)
      },
    }
  }

  fn format_const(
    &self,
    value: &ConstValue,
  ) -> String {
    match value {
      ConstValue::Int(v, _) => format!("{}", v),
      ConstValue::UInt(v, _) => format!("{}u", v),
      ConstValue::Float(v, _) => format!("{}", v),
      ConstValue::Bool(v, _) => format!("{}", v),
      ConstValue::Char(v, _) => format!("'{}'", v),
      ConstValue::String(v, _) => format!("{:?}", v),
      ConstValue::Null(_) => "null".to_string(),
      ConstValue::Undef(_) => "undef".to_string(),
    }
  }

  fn format_type(
    &self,
    ty: lumen_type::types::TypeId,
  ) -> String {
    match self.types.get(&ty) {
      Type::I8 => "i8".to_string(),
      Type::I16 => "i16".to_string(),
      Type::I32 => "i32".to_string(),
      Type::I64 => "i64".to_string(),
      Type::U8 => "u8".to_string(),
      Type::U16 => "u16".to_string(),
      Type::U32 => "u32".to_string(),
      Type::U64 => "u64".to_string(),
      Type::F32 => "f32".to_string(),
      Type::F64 => "f64".to_string(),
      Type::Boolean => "bool".to_string(),
      Type::Char => "char".to_string(),
      Type::String => "string".to_string(),
      Type::Void => "void".to_string(),
      Type::Never => "never".to_string(),
      Type::Unknown => "unknown".to_string(),
      Type::RawObject => "raw_object".to_string(),
      Type::Pointer(inner) => format!("*{}", self.format_type(*inner)),
      Type::Reference { inner, mutable } => {
        if *mutable {
          format!("&mut {}", self.format_type(*inner))
        } else {
          format!("&{}", self.format_type(*inner))
        }
      },
      Type::Vector { element, size } => match size {
        Some(n) => format!("[{}; {}]", self.format_type(*element), n),
        None => format!("[{}]", self.format_type(*element)),
      },
      Type::Tuple(elements) => {
        let elems = elements.iter().map(|e| self.format_type(*e)).collect::<Vec<_>>().join(", ");
        format!("({})", elems)
      },
      Type::Function { params, ret, .. } => {
        let params_str = params.iter().map(|p| self.format_type(*p)).collect::<Vec<_>>().join(", ");
        format!("fn({}) -> {}", params_str, self.format_type(*ret))
      },
      Type::Record { name } => self.symbols.get(name).to_string(),
      Type::Error => "error".to_string(),
    }
  }
}
