// Copyright 2025-2026 Neil Henderson
//
//! The `codegen` module lowers the IR into an ARM32 (AAPCS) assembly listing in GAS syntax.

pub mod arm32;

pub use arm32::generate_assembly;
