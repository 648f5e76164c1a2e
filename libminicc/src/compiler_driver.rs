// Copyright 2025-2026 Neil Henderson
//
//! The `compiler_driver` module defines the functions and types which orchestrate the
//! compilation stages.

pub mod diagnostics;
pub mod options;

mod driver;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use driver::{CompilerOutput, Driver, DriverError};
pub use options::DriverOptions;
