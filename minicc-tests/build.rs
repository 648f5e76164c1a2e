// Copyright 2025-2026 Neil Henderson

//! Build script to generate integration test cases from the programs in `tests/programs`.
//!
//! Every `tests/programs/valid/*.mc` has a sibling `.ir` golden file; a test is generated that
//! compares the compiler's textual IR against it byte for byte and smoke-checks the assembly.
//! Every `tests/programs/invalid/*.mc` gets a test asserting that diagnostics are produced.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use glob::glob;

const GOLDEN_TEST_CASES_FILENAME: &str = "generated_golden_tests.rs";
const INVALID_TEST_CASES_FILENAME: &str = "generated_invalid_tests.rs";

fn main() {
    generate_golden_tests();
    generate_invalid_tests();

    // Rerun when any test program or golden file changes.
    println!("cargo:rerun-if-changed=tests/programs");
}

fn generate_golden_tests() {
    let out_dir = std::env::var("OUT_DIR").unwrap(); // Set by cargo
    let generated_rs_filename = Path::new(&out_dir).join(GOLDEN_TEST_CASES_FILENAME);
    let mut writer = BufWriter::new(File::create(generated_rs_filename).expect("Failed to create file"));

    let programs_dir = get_programs_directory_path("valid");

    for entry in glob(&format!("{programs_dir}/*.mc")).expect("Failed to read glob pattern") {
        let source_file_path = entry.expect("Failed to read glob entry");

        let mut golden_file_path = source_file_path.clone();
        golden_file_path.set_extension("ir");
        assert!(
            golden_file_path.exists(),
            "valid program {} has no .ir golden file",
            source_file_path.display()
        );

        let test_case_name = make_test_case_name(&source_file_path);
        let source_filename = source_file_path.into_os_string().into_string().expect("Invalid path");
        let golden_filename = golden_file_path.into_os_string().into_string().expect("Invalid path");

        let test_case_code = format!(
            r#"
                #[test]
                fn golden_{test_case_name}() {{
                    compare_ir_against_golden("{source_filename}", "{golden_filename}");
                    check_assembly_smoke("{source_filename}");
                }}
            "#
        );

        writer.write_all(test_case_code.as_bytes()).expect("Failed to write test case");
    }
}

fn generate_invalid_tests() {
    let out_dir = std::env::var("OUT_DIR").unwrap(); // Set by cargo
    let generated_rs_filename = Path::new(&out_dir).join(INVALID_TEST_CASES_FILENAME);
    let mut writer = BufWriter::new(File::create(generated_rs_filename).expect("Failed to create file"));

    let programs_dir = get_programs_directory_path("invalid");

    for entry in glob(&format!("{programs_dir}/*.mc")).expect("Failed to read glob pattern") {
        let source_file_path = entry.expect("Failed to read glob entry");

        let test_case_name = make_test_case_name(&source_file_path);
        let source_filename = source_file_path.into_os_string().into_string().expect("Invalid path");

        let test_case_code = format!(
            r#"
                #[test]
                fn invalid_{test_case_name}() {{
                    compile_and_expect_diagnostics("{source_filename}");
                }}
            "#
        );

        writer.write_all(test_case_code.as_bytes()).expect("Failed to write test case");
    }
}

fn make_test_case_name(source_file_path: &Path) -> String {
    source_file_path
        .file_stem()
        .expect("Test program has no file stem")
        .to_string_lossy()
        .replace('-', "_")
}

fn get_programs_directory_path(directory: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR")); // Only set when using `cargo ...`
    path.push("tests/programs");
    path.push(directory);
    path.into_os_string().into_string().expect("Invalid path")
}
