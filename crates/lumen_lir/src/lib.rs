pub mod block;
pub mod builder;
pub mod display;
pub mod instr;
pub mod operand;
pub mod program;

use lumen_type::Id;

pub use block::{Block, Terminator, TerminatorKind};
pub use builder::FunctionBuilder;
pub use instr::{BinaryOperation, Instr, InstrKind, UnaryOperation};
pub use operand::{ConstValue, Operand};
pub use program::{FunctionLir, InstrRef, LirProgram, TempData};

/// Unique identifier for a temporary value within a function.
pub type TempId = Id<TempData>;

/// Unique identifier for a basic block within a function.
pub type BlockId = Id<Block>;

/// Unique identifier for a function within a program.
pub type FuncId = Id<FunctionLir>;
