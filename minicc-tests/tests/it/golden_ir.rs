// Copyright 2025-2026 Neil Henderson

//! Integration tests that compile source programs and compare the textual IR against golden
//! files byte for byte, then smoke-check the assembly listing.

use libminicc::compiler_driver::{CompilerOutput, Driver, DriverOptions};

// Include the generated test case functions.
include!(concat!(env!("OUT_DIR"), "/generated_golden_tests.rs"));

/// Compiles the program to textual IR and compares it against the golden file.
fn compare_ir_against_golden(source_filename: &str, golden_filename: &str) {
    let source = std::fs::read_to_string(source_filename).expect("cannot read test program");
    let golden = std::fs::read_to_string(golden_filename).expect("cannot read golden file");

    let options = DriverOptions { show_ir: true, ..DriverOptions::default() };
    let mut driver = Driver::new(source_filename, options);

    let output = driver.compile(&source);

    if driver.has_error_diagnostics() {
        driver.print_diagnostics();
    }
    let output = output.expect("expected a successful compilation");

    let CompilerOutput::Ir(ir_text) = output else {
        panic!("expected IR output for {source_filename}");
    };

    assert_eq!(
        ir_text, golden,
        "IR mismatch for {source_filename}\n--- produced ---\n{ir_text}\n--- golden ---\n{golden}"
    );
}

/// Compiles the program all the way to assembly and checks the listing's basic shape, including
/// that every function's epilogue unwinds the frame its prologue allocated.
fn check_assembly_smoke(source_filename: &str) {
    let source = std::fs::read_to_string(source_filename).expect("cannot read test program");

    let mut driver = Driver::new(source_filename, DriverOptions::default());
    let output = driver.compile(&source).expect("expected a successful compilation");

    let CompilerOutput::Assembly(asm) = output else {
        panic!("expected assembly output for {source_filename}");
    };

    assert!(asm.contains(".text"), "no .text section for {source_filename}");
    assert!(asm.contains("bx lr"), "no function return for {source_filename}");
    assert!(asm.contains(".note.GNU-stack"), "no GNU-stack note for {source_filename}");

    // Every frame allocation must have a matching release, so `pop {fp, lr}` reads the real
    // saved registers and not the bottom of the frame.
    for line in asm.lines() {
        if let Some(size) = line.trim().strip_prefix("sub sp, sp, #") {
            assert!(
                asm.contains(&format!("add sp, sp, #{size}")),
                "frame of {size} bytes is never released in {source_filename}"
            );
        }
    }

    let frame_release = asm.find("mov sp, fp").expect("no frame release");
    let fp_restore = asm.find("pop {fp, lr}").expect("no fp/lr restore");
    assert!(
        frame_release < fp_restore,
        "fp/lr restored before the frame is released in {source_filename}"
    );
}
