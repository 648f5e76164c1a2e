// Copyright 2025-2026 Neil Henderson
//
//! The `ir` module defines the MiniC linear intermediate representation and the translation from
//! the AST into it.
//!
//! The IR is a per-function list of typed instructions with explicit labels and branches. It is
//! produced by the [translator], rendered by the [printer], and consumed by the ARM32 backend in
//! the `codegen` module.

mod instruction;
mod label_maker;
mod module;
mod printer;
mod translator;
mod types;
mod value;


pub use instruction::{BinaryOp, CompareCond, InstrKind, IrInstruction, MoveMode};
pub use label_maker::LabelMaker;
pub use module::{IrFunction, IrModule};
pub use printer::print_module;
pub use translator::translate_ast_to_ir;
pub use types::IrType;
pub use value::{Value, ValueId, ValueKind};
