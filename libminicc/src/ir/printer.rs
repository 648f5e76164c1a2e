// Copyright 2025-2026 Neil Henderson
//
//! The `printer` module renders the IR in its stable textual form.
//!
//! The output is deterministic and byte-stable: the integration suite compares it against golden
//! files, so any format change here must be reflected in `minicc-tests/tests/programs`.

use std::fmt::Write;

use crate::ICE;

use super::instruction::{InstrKind, MoveMode};
use super::module::{IrFunction, IrModule};
use super::types::IrType;
use super::value::ValueId;

/// Renders the whole module: global declarations first, then each function definition.
pub fn print_module(module: &IrModule) -> String {
    let mut out = String::new();

    for &global in &module.globals {
        print_global(module, global, &mut out);
    }
    if !module.globals.is_empty() {
        out.push('\n');
    }

    let mut first = true;
    for function in &module.functions {
        if !function.is_definition {
            continue;
        }
        if !first {
            out.push('\n');
        }
        print_function(module, function, &mut out);
        first = false;
    }

    out
}

fn print_global(module: &IrModule, global: ValueId, out: &mut String) {
    let value = module.value(global);
    match &value.ty {
        IrType::Array { .. } => {
            _ = write!(out, "declare i32 {}", value.ir_name);
            for dim in value.ty.array_dims() {
                _ = write!(out, "[{dim}]");
            }
            out.push('\n');
        }
        _ => {
            _ = writeln!(out, "declare {} {} = 0", value.ty, value.ir_name);
        }
    }
}

/// Renders one function definition.
pub fn print_function(module: &IrModule, function: &IrFunction, out: &mut String) {
    _ = write!(out, "define {} @{}(", function.return_type, function.name);
    for (i, &param) in function.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let value = module.value(param);
        _ = write!(out, "{} {}", value.ty, value.ir_name);
    }
    out.push_str(") {\n");

    for instruction in &function.instructions {
        print_instruction(module, &instruction.kind, out);
    }

    out.push_str("}\n");
}

fn print_instruction(module: &IrModule, kind: &InstrKind, out: &mut String) {
    let name = |id: ValueId| module.value(id).ir_name.clone();

    match kind {
        InstrKind::Label { name } => {
            _ = writeln!(out, "{}:", display_label(name));
        }

        // Entry carries no textual form; the frame setup it stands for is a backend concern.
        InstrKind::Entry => (),

        InstrKind::Exit { value } => match value {
            Some(value) => _ = writeln!(out, "  ret {}", name(*value)),
            None => out.push_str("  ret\n"),
        },

        InstrKind::Move { dst, src, mode } => match mode {
            MoveMode::Scalar => _ = writeln!(out, "  {} = {}", name(*dst), name(*src)),
            MoveMode::ArrayRead => _ = writeln!(out, "  {} = *{}", name(*dst), name(*src)),
            MoveMode::ArrayWrite => _ = writeln!(out, "  *{} = {}", name(*dst), name(*src)),
        },

        InstrKind::Negate { src, dst } => {
            _ = writeln!(out, "  {} = neg {}", name(*dst), name(*src));
        }

        InstrKind::Binary { op, lhs, rhs, dst } => {
            _ = writeln!(out, "  {} = {op} {}, {}", name(*dst), name(*lhs), name(*rhs));
        }

        InstrKind::Compare { cond, lhs, rhs, dst } => {
            _ = writeln!(out, "  {} = icmp {cond} {}, {}", name(*dst), name(*lhs), name(*rhs));
        }

        InstrKind::Jump { target } => {
            _ = writeln!(out, "  br label {}", display_label(target));
        }

        InstrKind::Branch { cond, true_target, false_target } => {
            _ = writeln!(
                out,
                "  bc {}, label {}, label {}",
                name(*cond),
                display_label(true_target),
                display_label(false_target)
            );
        }

        InstrKind::Call { callee, args, dst } => {
            out.push_str("  ");
            let return_type = match module.find_function(callee) {
                Some(index) => module.function(index).return_type.clone(),
                None => ICE!("Call to unknown function '{callee}'"),
            };
            if let Some(dst) = dst {
                _ = write!(out, "{} = ", name(*dst));
            }
            _ = write!(out, "call {return_type} @{callee}(");
            for (i, &arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&name(arg));
            }
            out.push_str(")\n");
        }
    }
}

/// Labels are stored bare (`L3`) and printed with a leading `.` unless they already have one.
fn display_label(name: &str) -> String {
    if name.starts_with('.') {
        name.to_string()
    } else {
        format!(".{name}")
    }
}
