// Copyright 2025-2026 Neil Henderson
//
//! The `selector` module translates one function's IR into ARM32 instructions.
//!
//! Every local, temporary and parameter lives in the frame; registers only bridge the operands
//! of a single IR instruction, which is what makes the no-lookahead allocator sufficient. The
//! prologue is spliced in at the end, once the selector knows the frame size and which
//! callee-saved registers the function touched.
//!
//! Frame layout, low to high addresses (`fp == sp` after the prologue):
//!
//! ```text
//! [fp, #0]                outgoing-argument area (max_call_args words)
//! [fp, #outgoing]         spilled parameters, then locals and temporaries
//! …                       saved allocatable registers, saved fp/lr (pushed, above the frame)
//! [fp, #frame + saved]    caller's stack arguments
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::ir::{
    BinaryOp, CompareCond, InstrKind, IrFunction, IrModule, MoveMode, ValueId, ValueKind,
};
use crate::ICE;

use super::emitter::Emitter;
use super::register_allocator::SimpleRegisterAllocator;
use super::registers::{is_callee_saved, reg_name, ARG_REGS, SP_REG, TMP_REG};

/// The caller-saved intra-procedure scratch register (`ip`); free during the prologue, where it
/// carries incoming stack arguments to their frame slots.
const IP_REG: u8 = 12;

/// Frame-slot assignment for every frame-resident value of one function.
pub(super) struct FrameLayout {
    slots: HashMap<ValueId, i32>,
    pub frame_size: u32,
}

impl FrameLayout {
    pub(super) fn compute(module: &IrModule, func: &IrFunction) -> Self {
        let mut slots = HashMap::new();

        // The outgoing-argument area sits at the frame bottom; the staging slots in
        // `func.temp_mems` address it as `[sp, #k]` directly, so only parameters and locals
        // need fp-relative slots.
        let mut offset = func.max_call_args as u32 * 4;

        for &param in &func.params {
            slots.insert(param, offset as i32);
            offset += 4;
        }

        for &local in &func.locals {
            let size = module.value(local).ty.size_in_bytes().max(4);
            slots.insert(local, offset as i32);
            offset += size.next_multiple_of(4);
        }

        // AAPCS wants an 8-byte aligned stack at call boundaries.
        let frame_size = offset.next_multiple_of(8);

        Self { slots, frame_size }
    }

    fn slot(&self, id: ValueId) -> i32 {
        match self.slots.get(&id) {
            Some(&offset) => offset,
            None => ICE!("Value {id:?} has no frame slot"),
        }
    }
}

/// Translates the IR of one function, in order, into assembly.
pub(super) struct InstructionSelector<'a> {
    module: &'a IrModule,
    func: &'a IrFunction,
    emit: &'a mut Emitter,
    alloc: SimpleRegisterAllocator,
    frame: FrameLayout,
    used_callee_saved: BTreeSet<u8>,
    entry_mark: Option<usize>,
    /// Set when an integer compare was fused into the following conditional branch: the
    /// condition and the `i1` value the suppressed compare would have defined.
    pending_compare: Option<(CompareCond, ValueId)>,
}

impl<'a> InstructionSelector<'a> {
    pub(super) fn new(module: &'a IrModule, func: &'a IrFunction, emit: &'a mut Emitter) -> Self {
        let frame = FrameLayout::compute(module, func);
        Self {
            module,
            func,
            emit,
            alloc: SimpleRegisterAllocator::new(),
            frame,
            used_callee_saved: BTreeSet::new(),
            entry_mark: None,
            pending_compare: None,
        }
    }

    /// Translates every live instruction.
    pub(super) fn run(&mut self) {
        for index in 0..self.func.instructions.len() {
            let instruction = &self.func.instructions[index];
            if instruction.is_dead() {
                continue;
            }

            match &instruction.kind {
                InstrKind::Label { name } => {
                    let label = format!(".{name}");
                    self.emit.label(&label);
                }

                InstrKind::Entry => self.entry_mark = Some(self.emit.mark()),

                InstrKind::Exit { value } => self.translate_exit(*value),

                InstrKind::Jump { target } => self.emit.inst(format!("b .{target}")),

                InstrKind::Branch { cond, true_target, false_target } => {
                    let (cond, true_target, false_target) =
                        (*cond, true_target.clone(), false_target.clone());
                    self.translate_branch(cond, &true_target, &false_target);
                }

                InstrKind::Move { dst, src, mode } => {
                    let (dst, src, mode) = (*dst, *src, *mode);
                    self.translate_move(dst, src, mode);
                }

                InstrKind::Negate { src, dst } => {
                    let (src, dst) = (*src, *dst);
                    self.translate_negate(src, dst);
                }

                InstrKind::Binary { op, lhs, rhs, dst } => {
                    let (op, lhs, rhs, dst) = (*op, *lhs, *rhs, *dst);
                    self.translate_binary(op, lhs, rhs, dst);
                }

                InstrKind::Compare { cond, lhs, rhs, dst } => {
                    let (cond, lhs, rhs, dst) = (*cond, *lhs, *rhs, *dst);
                    self.translate_compare(index, cond, lhs, rhs, dst);
                }

                InstrKind::Call { callee, args, dst } => {
                    let (callee, args, dst) = (callee.clone(), args.clone(), *dst);
                    self.translate_call(&callee, &args, dst);
                }
            }

            debug_assert!(
                self.alloc.all_free(),
                "register leaked translating instruction {index} of '{}'",
                self.func.name
            );
        }
    }

    /// Splices in the prologue and returns the callee-saved registers the function used.
    pub(super) fn finish(self) -> BTreeSet<u8> {
        let Some(mark) = self.entry_mark else {
            ICE!("Function '{}' has no entry instruction", self.func.name);
        };

        let saved: Vec<u8> = self.used_callee_saved.iter().copied().collect();
        let mut lines = Emitter::prologue_lines(&saved, self.frame.frame_size);

        // Spill the incoming parameters to their frame slots: register arguments directly,
        // stack arguments through ip (r9 stays free to carry large offsets).
        let mut spill = Emitter::new();
        for (position, &param) in self.func.params.iter().enumerate() {
            let slot = self.frame.slot(param);
            if position < 4 {
                spill.store_frame(position as u8, slot);
            } else {
                let incoming =
                    self.frame.frame_size as i32 + saved.len() as i32 * 4 + 8 + 4 * (position as i32 - 4);
                spill.load_frame(IP_REG, incoming);
                spill.store_frame(IP_REG, slot);
            }
        }
        lines.extend(spill.take_lines());

        self.emit.insert_at(mark, lines);
        self.used_callee_saved
    }

    // --- Register plumbing --------------------------------------------------------------------

    /// Takes a scratch register, falling back to the reserved temporary when the pool is empty.
    fn alloc_reg(&mut self) -> u8 {
        match self.alloc.allocate() {
            Some(reg) => {
                if is_callee_saved(reg) {
                    self.used_callee_saved.insert(reg);
                }
                reg
            }
            None => TMP_REG,
        }
    }

    fn free_reg(&mut self, reg: u8) {
        if reg != TMP_REG {
            self.alloc.free_reg(reg);
        }
    }

    /// Brings a value into a register: register-pinned values are used in place, everything else
    /// is loaded into a freshly allocated scratch register.
    fn value_to_reg(&mut self, id: ValueId) -> (u8, bool) {
        if let ValueKind::Register { reg_no } = self.module.value(id).kind {
            return (reg_no, false);
        }
        let reg = self.alloc_reg();
        self.load_value_into(reg, id);
        (reg, true)
    }

    fn release(&mut self, reg: u8, allocated: bool) {
        if allocated {
            self.free_reg(reg);
        }
    }

    /// Loads (or for arrays, takes the address of) a value into the given register.
    fn load_value_into(&mut self, reg: u8, id: ValueId) {
        let value = self.module.value(id);
        match &value.kind {
            ValueKind::Constant(constant) => self.emit.load_immediate(reg, *constant),

            ValueKind::Global { .. } => {
                let name = global_symbol_name(&value.ir_name);
                if value.ty.is_array() {
                    self.emit.load_global_address(reg, &name);
                } else {
                    self.emit.load_global_address(reg, &name);
                    self.emit.inst(format!("ldr {}, [{}]", reg_name(reg), reg_name(reg)));
                }
            }

            ValueKind::Local { .. } | ValueKind::Temp => {
                // A local array decays to its base address; scalars and pointers load.
                if value.ty.is_array() {
                    self.emit.frame_address(reg, self.frame.slot(id));
                } else {
                    self.emit.load_frame(reg, self.frame.slot(id));
                }
            }

            // Parameters were spilled to the frame by the prologue; an array parameter's slot
            // holds the caller's pointer.
            ValueKind::FormalParam { .. } => self.emit.load_frame(reg, self.frame.slot(id)),

            // Staging slots only carry values out to a callee.
            ValueKind::TempMem { .. } => {
                ICE!("Outgoing-argument slot '{}' used as a source operand", value.ir_name)
            }

            ValueKind::Register { reg_no } => {
                if *reg_no != reg {
                    self.emit.inst(format!("mov {}, {}", reg_name(reg), reg_name(*reg_no)));
                }
            }
        }
    }

    /// Stores a register into the location a value names.
    fn store_reg_into(&mut self, id: ValueId, reg: u8) {
        let value = self.module.value(id);
        match &value.kind {
            ValueKind::Local { .. } | ValueKind::Temp | ValueKind::FormalParam { .. } => {
                self.emit.store_frame(reg, self.frame.slot(id));
            }

            ValueKind::Global { .. } => {
                let name = global_symbol_name(&value.ir_name);
                self.emit.load_global_address(TMP_REG, &name);
                self.emit.inst(format!("str {}, [{}]", reg_name(reg), reg_name(TMP_REG)));
            }

            ValueKind::TempMem { base_reg, offset } => {
                self.emit.inst(format!(
                    "str {}, [{}, #{offset}]",
                    reg_name(reg),
                    reg_name(*base_reg)
                ));
            }

            ValueKind::Register { reg_no } => {
                if *reg_no != reg {
                    self.emit.inst(format!("mov {}, {}", reg_name(*reg_no), reg_name(reg)));
                }
            }

            ValueKind::Constant(_) => ICE!("Store into a constant operand"),
        }
    }

    // --- Per-opcode translation ---------------------------------------------------------------

    fn translate_exit(&mut self, value: Option<ValueId>) {
        if let Some(value) = value {
            self.load_value_into(0, value);
        }

        // `fp` sits at the frame bottom, so the frame must be stepped over before the saved
        // registers and the saved `fp`/`lr` come back off the stack.
        let saved: Vec<u8> = self.used_callee_saved.iter().copied().collect();
        let lines = Emitter::epilogue_lines(&saved, self.frame.frame_size);
        self.emit.append_lines(lines);
    }

    fn translate_branch(&mut self, cond: ValueId, true_target: &str, false_target: &str) {
        // A fused compare has already set the flags; emit the conditional branch pair directly.
        if let Some((compare_cond, compare_dst)) = self.pending_compare.take() {
            if compare_dst != cond {
                ICE!("Fused compare feeds the wrong branch condition");
            }
            self.emit.inst(format!("b{} .{true_target}", compare_cond.arm_suffix()));
            self.emit.inst(format!("b .{false_target}"));
            return;
        }

        let (reg, allocated) = self.value_to_reg(cond);
        self.emit.inst(format!("cmp {}, #0", reg_name(reg)));
        self.emit.inst(format!("bne .{true_target}"));
        self.emit.inst(format!("b .{false_target}"));
        self.release(reg, allocated);
    }

    fn translate_move(&mut self, dst: ValueId, src: ValueId, mode: MoveMode) {
        match mode {
            MoveMode::Scalar => {
                let (reg, allocated) = self.value_to_reg(src);
                self.store_reg_into(dst, reg);
                self.release(reg, allocated);
            }

            // dst = *src
            MoveMode::ArrayRead => {
                let (reg, allocated) = self.value_to_reg(src);
                self.emit.inst(format!("ldr {}, [{}]", reg_name(reg), reg_name(reg)));
                self.store_reg_into(dst, reg);
                self.release(reg, allocated);
            }

            // *dst = src
            MoveMode::ArrayWrite => {
                let (value_reg, value_allocated) = self.value_to_reg(src);
                let (addr_reg, addr_allocated) = self.value_to_reg(dst);
                self.emit.inst(format!("str {}, [{}]", reg_name(value_reg), reg_name(addr_reg)));
                self.release(addr_reg, addr_allocated);
                self.release(value_reg, value_allocated);
            }
        }
    }

    fn translate_negate(&mut self, src: ValueId, dst: ValueId) {
        let (src_reg, src_allocated) = self.value_to_reg(src);
        let dst_reg = self.alloc_reg();
        self.emit.inst(format!("rsb {}, {}, #0", reg_name(dst_reg), reg_name(src_reg)));
        self.release(src_reg, src_allocated);
        self.store_reg_into(dst, dst_reg);
        self.free_reg(dst_reg);
    }

    fn translate_binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId, dst: ValueId) {
        let (lhs_reg, lhs_allocated) = self.value_to_reg(lhs);
        let (rhs_reg, rhs_allocated) = self.value_to_reg(rhs);

        match op {
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
                let mnemonic = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Subtract => "sub",
                    BinaryOp::Multiply => "mul",
                    BinaryOp::Divide => "sdiv",
                    BinaryOp::Remainder => unreachable!(),
                };
                let dst_reg = self.alloc_reg();
                self.emit.inst(format!(
                    "{mnemonic} {}, {}, {}",
                    reg_name(dst_reg),
                    reg_name(lhs_reg),
                    reg_name(rhs_reg)
                ));
                self.release(lhs_reg, lhs_allocated);
                self.release(rhs_reg, rhs_allocated);
                self.store_reg_into(dst, dst_reg);
                self.free_reg(dst_reg);
            }

            // ARM32 has no hardware remainder: quotient, multiply back, subtract.
            BinaryOp::Remainder => {
                let quotient = self.alloc_reg();
                let product = self.alloc_reg();
                let dst_reg = self.alloc_reg();
                self.emit.inst(format!(
                    "sdiv {}, {}, {}",
                    reg_name(quotient),
                    reg_name(lhs_reg),
                    reg_name(rhs_reg)
                ));
                self.emit.inst(format!(
                    "mul {}, {}, {}",
                    reg_name(product),
                    reg_name(quotient),
                    reg_name(rhs_reg)
                ));
                self.emit.inst(format!(
                    "sub {}, {}, {}",
                    reg_name(dst_reg),
                    reg_name(lhs_reg),
                    reg_name(product)
                ));
                self.free_reg(quotient);
                self.free_reg(product);
                self.release(lhs_reg, lhs_allocated);
                self.release(rhs_reg, rhs_allocated);
                self.store_reg_into(dst, dst_reg);
                self.free_reg(dst_reg);
            }
        }
    }

    fn translate_compare(
        &mut self,
        index: usize,
        cond: CompareCond,
        lhs: ValueId,
        rhs: ValueId,
        dst: ValueId,
    ) {
        let (lhs_reg, lhs_allocated) = self.value_to_reg(lhs);

        // Compare against a small immediate directly; anything else through a register.
        let rhs_imm = self
            .module
            .value(rhs)
            .as_constant()
            .filter(|&constant| Emitter::fits_operand_imm(constant));
        match rhs_imm {
            Some(constant) => {
                self.emit.inst(format!("cmp {}, #{constant}", reg_name(lhs_reg)));
            }
            None => {
                let (rhs_reg, rhs_allocated) = self.value_to_reg(rhs);
                self.emit.inst(format!("cmp {}, {}", reg_name(lhs_reg), reg_name(rhs_reg)));
                self.release(rhs_reg, rhs_allocated);
            }
        }
        self.release(lhs_reg, lhs_allocated);

        // One-instruction lookahead: when the very next live instruction branches on this
        // result, leave the flags for it and never materialise the boolean.
        if self.next_live_branch_consumes(index, dst) {
            self.pending_compare = Some((cond, dst));
            return;
        }

        let dst_reg = self.alloc_reg();
        self.emit.inst(format!("mov {}, #0", reg_name(dst_reg)));
        self.emit.inst(format!("mov{} {}, #1", cond.arm_suffix(), reg_name(dst_reg)));
        self.store_reg_into(dst, dst_reg);
        self.free_reg(dst_reg);
    }

    /// The staging slot call lowering created for the outgoing argument at the given offset.
    fn staging_slot(&self, offset: i32) -> ValueId {
        let found = self.func.temp_mems.iter().copied().find(|&id| {
            matches!(
                self.module.value(id).kind,
                ValueKind::TempMem { base_reg: SP_REG, offset: slot_offset } if slot_offset == offset
            )
        });
        match found {
            Some(id) => id,
            None => ICE!("No outgoing-argument staging slot at offset {offset}"),
        }
    }

    fn next_live_branch_consumes(&self, index: usize, compare_dst: ValueId) -> bool {
        let next = self.func.instructions[index + 1..].iter().find(|inst| !inst.is_dead());
        matches!(next, Some(inst) if matches!(inst.kind, InstrKind::Branch { cond, .. } if cond == compare_dst))
    }

    fn translate_call(&mut self, callee: &str, args: &[ValueId], dst: Option<ValueId>) {
        // Arguments beyond the fourth go through their staging slots in the pre-reserved
        // outgoing area, lowest offset first, before r0..r3 are committed.
        for (position, &arg) in args.iter().enumerate().skip(4) {
            let staging = self.staging_slot(4 * (position as i32 - 4));
            let (reg, allocated) = self.value_to_reg(arg);
            self.store_reg_into(staging, reg);
            self.release(reg, allocated);
        }

        let register_args = args.len().min(ARG_REGS.len());
        for position in 0..register_args {
            self.alloc.mark_in_use(ARG_REGS[position]);
            self.load_value_into(ARG_REGS[position], args[position]);
        }

        self.emit.inst(format!("bl {callee}"));

        for position in 0..register_args {
            self.alloc.free_reg(ARG_REGS[position]);
        }

        if let Some(dst) = dst {
            self.store_reg_into(dst, 0);
        }
    }
}

fn global_symbol_name(ir_name: &str) -> String {
    match ir_name.strip_prefix('@') {
        Some(name) => name.to_string(),
        None => ICE!("Global value '{ir_name}' has no '@' prefix"),
    }
}
