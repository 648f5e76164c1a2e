// Copyright 2025-2026 Neil Henderson
//
//! The `emitter` module is the assembly text buffer.
//!
//! It owns the growing list of output lines and the small set of idioms the selector needs:
//! labels and comments, immediate materialisation, frame loads/stores that survive offsets
//! outside the `ldr`/`str` immediate range, and the prologue line sequence (spliced in after the
//! selector knows which registers the function really used).

use super::registers::{reg_name, FP_REG, TMP_REG};

/// The biggest offset `ldr`/`str` accept as an immediate.
const MAX_MEM_OFFSET: i32 = 4095;

/// The biggest immediate we put directly into `mov`/`add`/`sub`/`cmp`.
const MAX_OPERAND_IMM: i32 = 255;

/// An append-only assembly text buffer.
#[derive(Debug, Default)]
pub struct Emitter {
    lines: Vec<String>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished listing.
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// The current line count; used to mark a splice point for the prologue.
    pub fn mark(&self) -> usize {
        self.lines.len()
    }

    /// Splices lines in at an earlier mark.
    pub fn insert_at(&mut self, mark: usize, lines: Vec<String>) {
        self.lines.splice(mark..mark, lines);
    }

    /// Appends pre-formatted lines, as produced by the prologue/epilogue helpers.
    pub fn append_lines(&mut self, lines: Vec<String>) {
        self.lines.extend(lines);
    }

    /// Consumes the buffer, yielding its lines; used to assemble the prologue splice.
    pub fn take_lines(self) -> Vec<String> {
        self.lines
    }

    /// Appends a directive line.
    pub fn directive(&mut self, text: &str) {
        self.lines.push(format!("    {text}"));
    }

    /// Appends a label line at column zero.
    pub fn label(&mut self, name: &str) {
        self.lines.push(format!("{name}:"));
    }

    /// Appends a comment line.
    pub fn comment(&mut self, text: &str) {
        self.lines.push(format!("    @ {text}"));
    }

    /// Appends one instruction line.
    pub fn inst(&mut self, text: String) {
        self.lines.push(format!("    {text}"));
    }

    /// Appends an empty line.
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Can `value` be used as an immediate operand of `mov`/`add`/`sub`/`cmp`?
    pub fn fits_operand_imm(value: i32) -> bool {
        (0..=MAX_OPERAND_IMM).contains(&value)
    }

    /// Materialises an integer into a register.
    pub fn load_immediate(&mut self, reg: u8, value: i32) {
        if Self::fits_operand_imm(value) {
            self.inst(format!("mov {}, #{value}", reg_name(reg)));
        } else {
            self.inst(format!("ldr {}, ={value}", reg_name(reg)));
        }
    }

    /// Materialises the address of a global into a register.
    pub fn load_global_address(&mut self, reg: u8, name: &str) {
        self.inst(format!("ldr {}, ={name}", reg_name(reg)));
    }

    /// Loads a word from `[fp, #offset]`, going through the scratch register when the offset is
    /// out of immediate range.
    pub fn load_frame(&mut self, reg: u8, offset: i32) {
        if offset.abs() <= MAX_MEM_OFFSET {
            self.inst(format!("ldr {}, [{}, #{offset}]", reg_name(reg), reg_name(FP_REG)));
        } else {
            self.frame_address(TMP_REG, offset);
            self.inst(format!("ldr {}, [{}]", reg_name(reg), reg_name(TMP_REG)));
        }
    }

    /// Stores a word to `[fp, #offset]`; the scratch register carries large offsets, so `reg`
    /// must not be the scratch register itself in that case.
    pub fn store_frame(&mut self, reg: u8, offset: i32) {
        if offset.abs() <= MAX_MEM_OFFSET {
            self.inst(format!("str {}, [{}, #{offset}]", reg_name(reg), reg_name(FP_REG)));
        } else {
            debug_assert_ne!(reg, TMP_REG, "scratch register collision on large-offset store");
            self.frame_address(TMP_REG, offset);
            self.inst(format!("str {}, [{}]", reg_name(reg), reg_name(TMP_REG)));
        }
    }

    /// Computes `fp + offset` into a register.
    pub fn frame_address(&mut self, reg: u8, offset: i32) {
        if Self::fits_operand_imm(offset) {
            self.inst(format!("add {}, {}, #{offset}", reg_name(reg), reg_name(FP_REG)));
        } else {
            self.inst(format!("ldr {}, ={offset}", reg_name(reg)));
            self.inst(format!("add {}, {}, {}", reg_name(reg), reg_name(FP_REG), reg_name(reg)));
        }
    }

    /// The prologue line sequence, built once the saved-register set and frame size are final.
    ///
    /// The frame pointer is set after the allocation, so locals sit at small positive offsets
    /// from `fp`; the saved registers and the saved `fp`/`lr` sit above the frame, at
    /// `fp + frame_size` and up. [Emitter::epilogue_lines] undoes this sequence in reverse.
    pub fn prologue_lines(saved_regs: &[u8], frame_size: u32) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push("    push {fp, lr}".to_string());

        if !saved_regs.is_empty() {
            let names: Vec<&str> = saved_regs.iter().map(|&r| reg_name(r)).collect();
            lines.push(format!("    push {{{}}}", names.join(", ")));
        }

        if frame_size > 0 {
            if Self::fits_operand_imm(frame_size as i32) {
                lines.push(format!("    sub sp, sp, #{frame_size}"));
            } else {
                lines.push(format!("    ldr {}, ={frame_size}", reg_name(TMP_REG)));
                lines.push(format!("    sub sp, sp, {}", reg_name(TMP_REG)));
            }
        }

        lines.push("    mov fp, sp".to_string());
        lines
    }

    /// The epilogue line sequence: restore `sp` to the frame bottom, step over the frame to
    /// reach the saved registers, pop them and the saved `fp`/`lr`, and return.
    pub fn epilogue_lines(saved_regs: &[u8], frame_size: u32) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push("    mov sp, fp".to_string());

        if frame_size > 0 {
            if Self::fits_operand_imm(frame_size as i32) {
                lines.push(format!("    add sp, sp, #{frame_size}"));
            } else {
                lines.push(format!("    ldr {}, ={frame_size}", reg_name(TMP_REG)));
                lines.push(format!("    add sp, sp, {}", reg_name(TMP_REG)));
            }
        }

        if !saved_regs.is_empty() {
            let names: Vec<&str> = saved_regs.iter().map(|&r| reg_name(r)).collect();
            lines.push(format!("    pop {{{}}}", names.join(", ")));
        }

        lines.push("    pop {fp, lr}".to_string());
        lines.push("    bx lr".to_string());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frame_offsets_use_immediates() {
        let mut emit = Emitter::new();
        emit.load_frame(4, 16);
        emit.store_frame(5, 20);
        assert_eq!(emit.text(), "    ldr r4, [fp, #16]\n    str r5, [fp, #20]\n");
    }

    #[test]
    fn large_frame_offsets_go_through_the_scratch_register() {
        let mut emit = Emitter::new();
        emit.load_frame(4, 5000);
        let text = emit.text();
        assert!(text.contains("ldr r9, =5000"));
        assert!(text.contains("add r9, fp, r9"));
        assert!(text.contains("ldr r4, [r9]"));
    }

    #[test]
    fn immediates_above_the_operand_range_use_a_literal_load() {
        let mut emit = Emitter::new();
        emit.load_immediate(4, 255);
        emit.load_immediate(5, 256);
        emit.load_immediate(6, -1);
        let text = emit.text();
        assert!(text.contains("mov r4, #255"));
        assert!(text.contains("ldr r5, =256"));
        assert!(text.contains("ldr r6, =-1"));
    }

    #[test]
    fn prologue_orders_pushes_allocation_and_frame_pointer() {
        let lines = Emitter::prologue_lines(&[4, 5], 24);
        assert_eq!(
            lines,
            vec![
                "    push {fp, lr}".to_string(),
                "    push {r4, r5}".to_string(),
                "    sub sp, sp, #24".to_string(),
                "    mov fp, sp".to_string(),
            ]
        );
    }

    #[test]
    fn large_frames_allocate_through_the_scratch_register() {
        let lines = Emitter::prologue_lines(&[], 70000);
        assert!(lines.contains(&"    ldr r9, =70000".to_string()));
        assert!(lines.contains(&"    sub sp, sp, r9".to_string()));
    }

    #[test]
    fn epilogue_reverses_the_prologue() {
        let lines = Emitter::epilogue_lines(&[4, 5], 24);
        assert_eq!(
            lines,
            vec![
                "    mov sp, fp".to_string(),
                "    add sp, sp, #24".to_string(),
                "    pop {r4, r5}".to_string(),
                "    pop {fp, lr}".to_string(),
                "    bx lr".to_string(),
            ]
        );
    }

    #[test]
    fn empty_frames_pop_straight_away() {
        let lines = Emitter::epilogue_lines(&[], 0);
        assert_eq!(
            lines,
            vec![
                "    mov sp, fp".to_string(),
                "    pop {fp, lr}".to_string(),
                "    bx lr".to_string(),
            ]
        );
    }

    #[test]
    fn large_frames_release_through_the_scratch_register() {
        let lines = Emitter::epilogue_lines(&[], 70000);
        assert!(lines.contains(&"    ldr r9, =70000".to_string()));
        assert!(lines.contains(&"    add sp, sp, r9".to_string()));
    }
}
