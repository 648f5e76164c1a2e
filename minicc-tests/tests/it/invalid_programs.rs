// Copyright 2025-2026 Neil Henderson

//! Integration tests that compile invalid programs and verify that diagnostics are reported.

use libminicc::compiler_driver::{Driver, DriverOptions};

// Include the generated test case functions.
include!(concat!(env!("OUT_DIR"), "/generated_invalid_tests.rs"));

/// Compiles the program and asserts that the driver fails with at least one diagnostic.
fn compile_and_expect_diagnostics(source_filename: &str) {
    let source = std::fs::read_to_string(source_filename).expect("cannot read test program");

    let mut driver = Driver::new(source_filename, DriverOptions::default());
    let result = driver.compile(&source);

    assert!(result.is_err(), "expected {source_filename} to fail to compile");
    assert!(
        driver.has_error_diagnostics(),
        "expected diagnostics for {source_filename}"
    );

    // Every diagnostic must render; this also exercises the printer.
    let mut rendered = Vec::new();
    driver.print_diagnostics_to_buffer(&mut rendered);
    assert!(!rendered.is_empty());
}
