// Copyright 2025-2026 Neil Henderson
//
//! The `globals` module emits the data sections for global variables.
//!
//! MiniC globals are always zero-initialised, so every one of them lands in `.bss` as reserved,
//! 4-byte aligned space.

use crate::ir::IrModule;
use crate::ICE;

use super::emitter::Emitter;

pub(super) fn emit_data_sections(module: &IrModule, emit: &mut Emitter) {
    if module.globals.is_empty() {
        return;
    }

    emit.blank();
    emit.directive(".bss");

    for &global in &module.globals {
        let value = module.value(global);
        let name = match value.ir_name.strip_prefix('@') {
            Some(name) => name,
            None => ICE!("Global value '{}' has no '@' prefix", value.ir_name),
        };
        let size = value.ty.size_in_bytes().max(4);

        emit.directive(&format!(".globl {name}"));
        emit.directive(".align 2");
        emit.label(name);
        emit.directive(&format!(".space {size}"));
    }
}
