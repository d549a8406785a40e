// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for bass.

use clap::Parser;

use bass::assembler::cli::{validate_cli, Cli};
use bass::core::error::Severity;

fn main() {
    let cli = Cli::parse();
    let cli_config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match bass::assembler::run_with_config(&cli_config) {
        Ok(report) => {
            if cli_config.quiet {
                return;
            }
            for diag in report.diagnostics() {
                eprintln!("{}", diag.format());
            }
        }
        Err(err) => {
            for diag in err.diagnostics() {
                if diag.severity() == Severity::Warning && cli_config.quiet {
                    continue;
                }
                eprintln!("{}", diag.format());
            }
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
