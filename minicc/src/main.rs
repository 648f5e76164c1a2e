// Copyright 2025-2026 Neil Henderson

//! main entry point for the compiler driver executable.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use libminicc::compiler_driver::{CompilerOutput, Driver, DriverError, DriverOptions};

/// The MiniC compiler: produces a textual IR and an ARM32 assembly listing.
#[derive(Debug, Parser)]
#[command(group(clap::ArgGroup::new("stage").args(["show_ast", "show_ir", "show_asm"])))]
struct Cli {
    /// Input MiniC source file
    input: PathBuf,

    /// Print the AST and stop
    #[arg(long)]
    show_ast: bool,

    /// Print the textual IR and stop
    #[arg(long)]
    show_ir: bool,

    /// Print the assembly listing to stdout instead of writing a file
    #[arg(long)]
    show_asm: bool,

    /// Output file for the assembly listing [default: <input>.s]
    #[arg(short)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            eprintln!("minicc: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read '{}'", cli.input.display()))?;

    let options = DriverOptions {
        show_ast: cli.show_ast,
        show_ir: cli.show_ir,
        show_asm: cli.show_asm,
        output_file: cli.output.clone(),
    };

    let mut driver = Driver::new(&cli.input.to_string_lossy(), options);

    match driver.compile(&source) {
        Ok(CompilerOutput::Ast(text) | CompilerOutput::Ir(text)) => {
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }

        Ok(CompilerOutput::Assembly(text)) => {
            if cli.show_asm {
                print!("{text}");
            } else {
                let output_path =
                    cli.output.unwrap_or_else(|| cli.input.with_extension("s"));
                std::fs::write(&output_path, text)
                    .with_context(|| format!("cannot write '{}'", output_path.display()))?;
            }
            Ok(ExitCode::SUCCESS)
        }

        Err(DriverError::CompilerFailed) => {
            driver.print_diagnostics();
            Ok(ExitCode::FAILURE)
        }
    }
}
