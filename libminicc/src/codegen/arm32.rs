// Copyright 2025-2026 Neil Henderson
//
//! The `arm32` module is the ARM32 backend: register inventory, the simple register allocator,
//! the assembly emitter, the instruction selector, and the data-section emitter for globals.

mod emitter;
mod globals;
mod register_allocator;
mod registers;
mod selector;

#[cfg(test)]
mod tests;

pub use emitter::Emitter;
pub use register_allocator::SimpleRegisterAllocator;

use crate::ir::IrModule;

use selector::InstructionSelector;

/// Generates the complete GAS listing for a module: `.text` with every defined function, then
/// the `.bss` section for the zero-initialised globals.
///
/// Each function's set of actually used callee-saved registers is recorded back onto it.
pub fn generate_assembly(module: &mut IrModule) -> String {
    let mut emit = Emitter::new();
    emit.directive(".text");

    for index in 0..module.functions.len() {
        if !module.functions[index].is_definition {
            continue;
        }

        emit.blank();
        let name = module.functions[index].name.clone();
        emit.directive(&format!(".globl {name}"));
        emit.label(&name);

        let used_callee_saved = {
            let module_ref: &IrModule = module;
            let function = &module_ref.functions[index];
            let mut selector = InstructionSelector::new(module_ref, function, &mut emit);
            selector.run();
            selector.finish()
        };
        module.functions[index].callee_saved = used_callee_saved;
    }

    globals::emit_data_sections(module, &mut emit);

    emit.blank();
    emit.directive(".section .note.GNU-stack,\"\",%progbits");
    emit.text()
}
