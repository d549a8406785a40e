// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source loading: statement splitting and recursive include expansion.
//!
//! Each statement is tagged with its origin (file index, 1-based line,
//! 1-based block within the line) and is immutable once loaded.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{AsmError, AsmErrorKind, SourceLocation};
use crate::core::pattern::match_pattern;

/// A single source statement with its origin tag.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub statement: String,
    pub file_number: usize,
    pub line_number: u32,
    pub block_number: u32,
}

/// The loaded program: every statement from every source file, in order.
#[derive(Debug, Default)]
pub struct Program {
    pub filenames: Vec<String>,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self, instruction: &Instruction) -> SourceLocation {
        SourceLocation {
            file: self.filenames[instruction.file_number].clone(),
            line: instruction.line_number,
            block: instruction.block_number,
        }
    }

    /// Load a source file, expanding `include "file"` statements recursively.
    pub fn load_file(&mut self, path: &Path) -> Result<(), AsmError> {
        let data = fs::read_to_string(path).map_err(|err| {
            AsmError::new(
                AsmErrorKind::Source,
                "source file not found",
                Some(&format!("{} ({err})", path.display())),
            )
        })?;
        self.load_text(&path.to_string_lossy(), &data)
    }

    /// Load source text under the given name. Includes resolve relative to
    /// the directory of `name`.
    pub fn load_text(&mut self, name: &str, text: &str) -> Result<(), AsmError> {
        let file_number = self.filenames.len();
        self.filenames.push(name.to_string());

        let data = text.replace(['\t', '\r'], " ");
        for (line_index, raw_line) in data.split('\n').enumerate() {
            let line = strip_comment(raw_line);
            for (block_index, block) in split_statements(line).into_iter().enumerate() {
                let statement = block.trim();
                if statement.is_empty() {
                    continue;
                }

                if match_pattern(statement, "include \"?*\"") {
                    let target = statement
                        .trim_start_matches("include")
                        .trim()
                        .trim_matches('"');
                    let resolved = resolve_relative(name, target);
                    self.load_file(&resolved)?;
                } else {
                    self.instructions.push(Instruction {
                        statement: statement.to_string(),
                        file_number,
                        line_number: 1 + line_index as u32,
                        block_number: 1 + block_index as u32,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Resolve `target` against the directory containing `name`.
fn resolve_relative(name: &str, target: &str) -> PathBuf {
    let base = Path::new(name).parent().unwrap_or_else(|| Path::new(""));
    base.join(target)
}

/// Remove the first unquoted `//` comment.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut index = 0;
    while index < bytes.len() {
        let ch = bytes[index];
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None => {
                if ch == b'"' || ch == b'\'' {
                    quote = Some(ch);
                } else if ch == b'/' && bytes.get(index + 1) == Some(&b'/') {
                    return &line[..index];
                }
            }
        }
        index += 1;
    }
    line
}

/// Split a line on unquoted `;` into statement blocks.
fn split_statements(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut blocks = Vec::new();
    let mut start = 0;
    for (index, &ch) in bytes.iter().enumerate() {
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
            }
            None => {
                if ch == b'"' || ch == b'\'' {
                    quote = Some(ch);
                } else if ch == b';' {
                    blocks.push(&line[start..index]);
                    start = index + 1;
                }
            }
        }
    }
    blocks.push(&line[start..]);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_tagged_with_line_and_block() {
        let mut program = Program::new();
        program
            .load_text("main.asm", "nop\nlda #$01; sta $2000\n")
            .unwrap();
        let statements: Vec<(&str, u32, u32)> = program
            .instructions
            .iter()
            .map(|i| (i.statement.as_str(), i.line_number, i.block_number))
            .collect();
        assert_eq!(
            statements,
            vec![("nop", 1, 1), ("lda #$01", 2, 1), ("sta $2000", 2, 2)]
        );
    }

    #[test]
    fn comments_and_blank_statements_are_dropped() {
        let mut program = Program::new();
        program
            .load_text("main.asm", "nop // trailing\n// full line\n;;\n")
            .unwrap();
        assert_eq!(program.instructions.len(), 1);
        assert_eq!(program.instructions[0].statement, "nop");
    }

    #[test]
    fn quoted_delimiters_are_preserved() {
        let mut program = Program::new();
        program
            .load_text("main.asm", "db \"a;b//c\"; nop\n")
            .unwrap();
        let statements: Vec<&str> = program
            .instructions
            .iter()
            .map(|i| i.statement.as_str())
            .collect();
        assert_eq!(statements, vec!["db \"a;b//c\"", "nop"]);
    }

    #[test]
    fn tabs_and_carriage_returns_map_to_spaces() {
        let mut program = Program::new();
        program.load_text("main.asm", "\tnop\r\n").unwrap();
        assert_eq!(program.instructions[0].statement, "nop");
    }

    #[test]
    fn missing_include_is_a_source_error() {
        let mut program = Program::new();
        let err = program
            .load_text("main.asm", "include \"does-not-exist.asm\"\n")
            .unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::Source);
    }
}
