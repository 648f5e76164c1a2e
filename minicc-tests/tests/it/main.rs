// Copyright 2025-2026 Neil Henderson

//! Integration-test binary: one module per test area.

mod golden_ir;
mod invalid_programs;
