// Copyright 2025-2026 Neil Henderson
//
//! Integration-test crate for the MiniC compiler. The tests live under `tests/it` and are
//! generated by `build.rs` from the programs in `tests/programs`.
