// Copyright 2025-2026 Neil Henderson
//
//! The `driver` module defines `Driver`, which is the MiniC compiler driver type.

use std::io::Write;

use crate::codegen;
use crate::ir;
use crate::lexer;
use crate::parser;

use super::diagnostics::Diagnostic;
use super::options::DriverOptions;

/// An error returned by the compiler driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// One or more diagnostics were recorded; see [Driver::print_diagnostics].
    CompilerFailed,
}

/// The text the driver hands back, depending on the requested stage.
#[derive(Debug)]
pub enum CompilerOutput {
    Ast(String),
    Ir(String),
    Assembly(String),
}

impl CompilerOutput {
    /// The rendered text, whatever the stage.
    pub fn text(&self) -> &str {
        match self {
            CompilerOutput::Ast(text) | CompilerOutput::Ir(text) | CompilerOutput::Assembly(text) => {
                text
            }
        }
    }
}

/// The MiniC compiler driver.
///
/// Diagnostics are recorded on the driver itself rather than threaded through `Result` values,
/// so a single run can report every error the translation unit contains.
pub struct Driver {
    pub source_name: String,
    options: DriverOptions,
    errors: Vec<Diagnostic>,
}

impl Driver {
    /// Creates a driver for the given source file name.
    pub fn new(source_name: &str, options: DriverOptions) -> Self {
        Self { source_name: source_name.to_string(), options, errors: Vec::new() }
    }

    /// Creates a driver for unit tests, with default options and no source name.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self { source_name: String::new(), options: DriverOptions::default(), errors: Vec::new() }
    }

    /// The driver's options.
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Runs the pipeline over the given source text.
    ///
    /// Lexing, parsing and lowering each record diagnostics on the driver; the first stage
    /// boundary with errors pending stops the run.
    pub fn compile(&mut self, source: &str) -> Result<CompilerOutput, DriverError> {
        let tokens = lexer::lex(self, source);
        if self.has_error_diagnostics() {
            return Err(DriverError::CompilerFailed);
        }

        let Some(ast) = parser::parse(self, tokens) else {
            return Err(DriverError::CompilerFailed);
        };

        if self.options.show_ast {
            return Ok(CompilerOutput::Ast(parser::print_ast(&ast)));
        }

        let mut module = ir::translate_ast_to_ir(self, &ast);
        if self.has_error_diagnostics() {
            return Err(DriverError::CompilerFailed);
        }

        if self.options.show_ir {
            return Ok(CompilerOutput::Ir(ir::print_module(&module)));
        }

        Ok(CompilerOutput::Assembly(codegen::generate_assembly(&mut module)))
    }

    /// Adds a diagnostic.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    /// Are there any error diagnostics?
    pub fn has_error_diagnostics(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// The recorded diagnostics, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Prints every diagnostic to stderr, in emission order.
    pub fn print_diagnostics(&self) {
        self.print_diagnostics_to_buffer(std::io::stderr());
    }

    /// Prints every diagnostic into the given buffer.
    pub fn print_diagnostics_to_buffer(&self, mut buffer: impl Write) {
        for diagnostic in &self.errors {
            _ = writeln!(buffer, "{}: {diagnostic}", self.source_name);
        }
    }
}
