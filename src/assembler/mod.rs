// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler driver - main entry point.
//!
//! This module ties together source loading, the pass driver, and the
//! table-driven statement encoder.

pub mod cli;
mod engine;
mod output;
mod passes;
mod statements;

use crate::core::error::{AsmRunError, AsmRunReport};
use crate::core::eval::Evaluation;

use engine::Bass;
use output::emit_symbols_file;

/// Run the assembler with parsed command-line arguments.
pub fn run_with_cli(cli: &cli::Cli) -> Result<AsmRunReport, AsmRunError> {
    let config = cli::validate_cli(cli)?;
    run_with_config(&config)
}

/// Run one assembly with a validated configuration.
pub fn run_with_config(config: &cli::CliConfig) -> Result<AsmRunReport, AsmRunError> {
    let mut bass = Bass::new();
    bass.arch_paths = config.arch_paths.clone();
    bass.cli_target = config.output.clone();

    for (name, value) in &config.defines {
        bass.symbols.define(name, value);
    }
    for (name, value) in &config.constants {
        // Command-line constants evaluate strictly; failures leave the
        // constant unset, matching in-source resolution order.
        if let Ok(result) = bass.evaluate_in(value, Evaluation::Strict) {
            bass.symbols.assign(name, result.value, false);
        }
    }

    for path in &config.sources {
        if let Err(err) = bass.program.load_file(path) {
            return Err(AsmRunError::new(err, bass.take_diagnostics()));
        }
    }

    match bass.run(config.strict) {
        Ok(()) => {
            if let Some(path) = &config.symbols {
                let entries = bass.symbols.entries();
                if let Err(err) = emit_symbols_file(path, config.format, &entries) {
                    return Err(AsmRunError::new(err, bass.take_diagnostics()));
                }
            }
            Ok(AsmRunReport::new(bass.take_diagnostics()))
        }
        Err(err) => Err(AsmRunError::new(err, bass.take_diagnostics())),
    }
}

/// Assemble in-memory source text. Used by embedding callers and tests; the
/// command-line flow goes through [`run_with_config`].
pub fn assemble_text(name: &str, text: &str, strict: bool) -> Result<AsmRunReport, AsmRunError> {
    let mut bass = Bass::new();
    if let Err(err) = bass.program.load_text(name, text) {
        return Err(AsmRunError::new(err, Vec::new()));
    }
    match bass.run(strict) {
        Ok(()) => Ok(AsmRunReport::new(bass.take_diagnostics())),
        Err(err) => Err(AsmRunError::new(err, bass.take_diagnostics())),
    }
}
