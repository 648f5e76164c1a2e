// Copyright 2025-2026 Neil Henderson
//
//! The `options` module defines [DriverOptions], which control what the compiler driver runs
//! and emits.

use std::path::PathBuf;

/// Options that control the compiler driver.
///
/// At most one of the `show_*` stages is set; with none set the driver runs the whole pipeline
/// and produces the assembly listing.
#[derive(Debug, Default, Clone)]
pub struct DriverOptions {
    /// Stop after parsing and render the AST.
    pub show_ast: bool,

    /// Stop after lowering and render the textual IR.
    pub show_ir: bool,

    /// Run the whole pipeline and hand the assembly back instead of writing it to a file.
    pub show_asm: bool,

    /// Where to write the assembly listing; defaults to the source path with extension `.s`.
    pub output_file: Option<PathBuf>,
}
