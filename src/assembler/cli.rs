// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::error::{AsmError, AsmErrorKind, AsmRunError};
use crate::core::target::TargetMode;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Table-driven multi-pass assembler.

The instruction set is not built in: source programs load an architecture
description with the `arch` statement (searched through -I paths) or extend
the table in place with `instrument`. Forward references converge over up to
ten refinement passes before the target file is written.";

#[derive(Parser, Debug)]
#[command(
    name = "bass",
    version = VERSION,
    about = "Table-driven multi-pass assembler",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        long_help = "Write assembled output to FILE. Without -o, output goes to an `output \"file\"` statement's target, or to stdout when redirected."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        short = 'm',
        long = "modify",
        action = ArgAction::SetTrue,
        requires = "output",
        long_help = "Open the -o target in place instead of truncating it, for patching an existing image."
    )]
    pub modify: bool,
    #[arg(
        short = 'd',
        long = "define",
        value_name = "NAME=VALUE",
        action = ArgAction::Append,
        long_help = "Register a textual define before assembly. Repeatable."
    )]
    pub defines: Vec<String>,
    #[arg(
        short = 'c',
        long = "constant",
        value_name = "NAME=VALUE",
        action = ArgAction::Append,
        long_help = "Register an integer constant before assembly. VALUE is evaluated strictly. Repeatable."
    )]
    pub constants: Vec<String>,
    #[arg(
        short = 'I',
        long = "arch-path",
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Add DIR to the architecture search path used by `arch` statements and `#include` table directives. Repeatable."
    )]
    pub arch_paths: Vec<PathBuf>,
    #[arg(
        long = "symbols",
        value_name = "FILE",
        long_help = "After a successful run, export the constant table to FILE."
    )]
    pub symbols: Option<PathBuf>,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = SymbolFormat::Text,
        long_help = "Symbol export format for --symbols. text writes `name = $hex` lines; json writes a machine-readable document."
    )]
    pub format: SymbolFormat,
    #[arg(
        long = "strict",
        action = ArgAction::SetTrue,
        long_help = "Treat warnings as fatal errors."
    )]
    pub strict: bool,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress diagnostic output for successful assembly runs."
    )]
    pub quiet: bool,
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SymbolFormat {
    Text,
    Json,
}

/// Validated run configuration derived from the raw CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub output: Option<(PathBuf, TargetMode)>,
    pub defines: Vec<(String, String)>,
    pub constants: Vec<(String, String)>,
    pub arch_paths: Vec<PathBuf>,
    pub symbols: Option<PathBuf>,
    pub format: SymbolFormat,
    pub strict: bool,
    pub quiet: bool,
    pub sources: Vec<PathBuf>,
}

pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmRunError> {
    let mut defines = Vec::new();
    for pair in &cli.defines {
        defines.push(split_pair(pair, "-d/--define")?);
    }
    let mut constants = Vec::new();
    for pair in &cli.constants {
        constants.push(split_pair(pair, "-c/--constant")?);
    }

    let output = cli.output.as_ref().map(|path| {
        let mode = if cli.modify {
            TargetMode::Modify
        } else {
            TargetMode::Write
        };
        (path.clone(), mode)
    });

    Ok(CliConfig {
        output,
        defines,
        constants,
        arch_paths: cli.arch_paths.clone(),
        symbols: cli.symbols.clone(),
        format: cli.format,
        strict: cli.strict,
        quiet: cli.quiet,
        sources: cli.sources.clone(),
    })
}

fn split_pair(pair: &str, flag: &str) -> Result<(String, String), AsmRunError> {
    let cli_error = |msg: String| {
        AsmRunError::new(AsmError::new(AsmErrorKind::Cli, &msg, None), Vec::new())
    };
    let Some((name, value)) = pair.split_once('=') else {
        return Err(cli_error(format!("{flag} expects NAME=VALUE, got '{pair}'")));
    };
    if name.is_empty() {
        return Err(cli_error(format!("{flag} has an empty name in '{pair}'")));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn defines_and_constants_split_on_equals() {
        let cli = parse(&["bass", "-d", "mode=fast", "-c", "top=$ff", "main.asm"]);
        let config = validate_cli(&cli).unwrap();
        assert_eq!(
            config.defines,
            vec![("mode".to_string(), "fast".to_string())]
        );
        assert_eq!(config.constants, vec![("top".to_string(), "$ff".to_string())]);
    }

    #[test]
    fn malformed_pairs_are_cli_errors() {
        let cli = parse(&["bass", "-d", "novalue", "main.asm"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(err.error().kind(), AsmErrorKind::Cli);

        let cli = parse(&["bass", "-c", "=5", "main.asm"]);
        assert!(validate_cli(&cli).is_err());
    }

    #[test]
    fn modify_switches_the_target_mode() {
        let cli = parse(&["bass", "-o", "out.bin", "main.asm"]);
        let config = validate_cli(&cli).unwrap();
        assert_eq!(config.output.unwrap().1, TargetMode::Write);

        let cli = parse(&["bass", "-o", "out.bin", "-m", "main.asm"]);
        let config = validate_cli(&cli).unwrap();
        assert_eq!(config.output.unwrap().1, TargetMode::Modify);
    }

    #[test]
    fn sources_are_required() {
        assert!(Cli::try_parse_from(["bass"]).is_err());
    }
}
