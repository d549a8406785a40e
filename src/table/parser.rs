// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Parser for the architecture description grammar.
//!
//! Each non-directive line is `pattern; encoding`: the pattern alternates
//! literal text with `*NN` wildcards, the encoding is a whitespace-separated
//! list of format tokens. Lines that do not split into both halves are
//! skipped silently so descriptions can carry prose.

use crate::core::endian::Endian;
use crate::core::error::{AsmError, AsmErrorKind};

use super::{Format, MatchMode, Number, Opcode, Prefix, Table, TableContext};

impl Table {
    /// Parse an architecture description, appending to the opcode list.
    /// `#include` recurses through the context's architecture reader.
    pub fn parse(&mut self, ctx: &mut dyn TableContext, text: &str) -> Result<(), AsmError> {
        for raw_line in text.split('\n') {
            let line = match raw_line.find("//") {
                Some(position) => &raw_line[..position],
                None => raw_line,
            };
            let line = line.trim();

            if line.starts_with('#') {
                if line == "#endian lsb" {
                    ctx.set_endian(Endian::Lsb);
                    continue;
                }
                if line == "#endian msb" {
                    ctx.set_endian(Endian::Msb);
                    continue;
                }
                if let Some(rest) = line.strip_prefix("#include ") {
                    let more = ctx.read_architecture(rest.trim())?;
                    self.parse(ctx, &more)?;
                    continue;
                }
                if line.strip_prefix("#directive ").is_some() {
                    parse_directive(ctx, line)?;
                    continue;
                }
            }

            let Some((lhs, rhs)) = line.split_once(';') else {
                continue;
            };

            let mut opcode = Opcode {
                prefix: Vec::new(),
                number: Vec::new(),
                pattern: String::new(),
                format: Vec::new(),
            };
            parse_lhs(&mut opcode, lhs.trim())?;
            parse_rhs(&mut opcode, rhs.trim())?;

            for format in &opcode.format {
                if let Some(argument) = format.argument() {
                    if argument >= opcode.number.len() {
                        return Err(AsmError::new(
                            AsmErrorKind::Syntax,
                            "encoding references a missing argument",
                            Some(line),
                        ));
                    }
                }
            }
            self.opcodes.push(opcode);
        }
        Ok(())
    }
}

// #directive <name> <byte_size>
fn parse_directive(ctx: &mut dyn TableContext, line: &str) -> Result<(), AsmError> {
    let work = line.trim().trim_start_matches("#directive ");
    let items: Vec<&str> = work.split(' ').filter(|item| !item.is_empty()).collect();
    if items.len() != 2 {
        return Err(AsmError::new(
            AsmErrorKind::Syntax,
            "wrong syntax",
            Some(line),
        ));
    }
    let value: u32 = items[1].parse().unwrap_or(0);
    ctx.set_directive(items[0], value);
    Ok(())
}

/// Split the pattern half into literal prefixes and `*NN` argument widths,
/// then derive the matcher pattern.
fn parse_lhs(opcode: &mut Opcode, text: &str) -> Result<(), AsmError> {
    let bytes = text.as_bytes();
    let mut offset = 0;

    while offset < bytes.len() {
        let start = offset;
        while offset < bytes.len() && bytes[offset] != b'*' {
            offset += 1;
        }
        opcode.prefix.push(Prefix {
            text: text[start..offset].to_string(),
        });

        if offset >= bytes.len() {
            continue;
        }
        let (tens, ones) = match (bytes.get(offset + 1), bytes.get(offset + 2)) {
            (Some(tens), Some(ones)) if tens.is_ascii_digit() && ones.is_ascii_digit() => {
                (tens - b'0', ones - b'0')
            }
            _ => {
                return Err(AsmError::new(
                    AsmErrorKind::Syntax,
                    "malformed argument width in pattern",
                    Some(text),
                ))
            }
        };
        opcode.number.push(Number {
            bits: u32::from(10 * tens + ones),
        });
        offset += 3;
    }

    let texts: Vec<&str> = opcode.prefix.iter().map(|p| p.text.as_str()).collect();
    opcode.pattern = texts.join("*");
    if opcode.number.len() == opcode.prefix.len() {
        opcode.pattern.push('*');
    }
    Ok(())
}

/// Case-insensitive argument letter: a..z maps to 0..25, A..Z to 26..51.
fn argument_index(letter: u8) -> Result<usize, AsmError> {
    match letter {
        b'a'..=b'z' => Ok((letter - b'a') as usize),
        b'A'..=b'Z' => Ok(26 + (letter - b'A') as usize),
        _ => Err(AsmError::new(
            AsmErrorKind::Syntax,
            "malformed argument letter in encoding",
            Some(&(letter as char).to_string()),
        )),
    }
}

fn two_digits(bytes: &[u8], offset: usize) -> Result<u32, AsmError> {
    match (bytes.get(offset), bytes.get(offset + 1)) {
        (Some(tens), Some(ones)) if tens.is_ascii_digit() && ones.is_ascii_digit() => {
            Ok(u32::from(10 * (tens - b'0') + (ones - b'0')))
        }
        _ => Err(AsmError::new(
            AsmErrorKind::Syntax,
            "malformed shift amount in encoding",
            None,
        )),
    }
}

fn one_digit(bytes: &[u8], offset: usize) -> Result<i32, AsmError> {
    match bytes.get(offset) {
        Some(digit) if digit.is_ascii_digit() => Ok(i32::from(digit - b'0')),
        _ => Err(AsmError::new(
            AsmErrorKind::Syntax,
            "malformed displacement in encoding",
            None,
        )),
    }
}

fn letter_at(bytes: &[u8], offset: usize) -> Result<usize, AsmError> {
    match bytes.get(offset) {
        Some(&letter) => argument_index(letter),
        None => Err(AsmError::new(
            AsmErrorKind::Syntax,
            "truncated encoding token",
            None,
        )),
    }
}

fn hex_value(digits: &str) -> Result<u64, AsmError> {
    u64::from_str_radix(digits, 16).map_err(|_| {
        AsmError::new(AsmErrorKind::Syntax, "malformed hex constant", Some(digits))
    })
}

fn binary_value(digits: &str) -> Result<u64, AsmError> {
    u64::from_str_radix(digits, 2).map_err(|_| {
        AsmError::new(
            AsmErrorKind::Syntax,
            "malformed binary constant",
            Some(digits),
        )
    })
}

/// Parse the encoding half: first-match dispatch on each token's prefix.
fn parse_rhs(opcode: &mut Opcode, text: &str) -> Result<(), AsmError> {
    for item in text.split_whitespace() {
        let bytes = item.as_bytes();
        let format = if let Some(digits) = item.strip_prefix('$') {
            Format::Static {
                data: hex_value(digits)?,
                bits: 4 * digits.len() as u32,
            }
        } else if item.starts_with(">>") {
            Format::ShiftRight {
                argument: letter_at(bytes, 4)?,
                data: two_digits(bytes, 2)?,
            }
        } else if item.starts_with("<<") {
            Format::ShiftLeft {
                argument: letter_at(bytes, 4)?,
                data: two_digits(bytes, 2)?,
            }
        } else if bytes.first() == Some(&b'+') && item.get(2..4) == Some(">>") {
            Format::RelativeShiftRight {
                argument: letter_at(bytes, 6)?,
                displacement: one_digit(bytes, 1)?,
                data: two_digits(bytes, 4)?,
            }
        } else if bytes.first() == Some(&b'N') && item.get(1..3) == Some(">>") {
            Format::NegativeShiftRight {
                argument: letter_at(bytes, 5)?,
                data: two_digits(bytes, 3)?,
            }
        } else if bytes.first() == Some(&b'N') {
            Format::Negative {
                argument: letter_at(bytes, 1)?,
            }
        } else if bytes.first() == Some(&b'C') && item.get(1..3) == Some(">>") {
            Format::ComplimentShiftRight {
                argument: letter_at(bytes, 5)?,
                data: two_digits(bytes, 3)?,
            }
        } else if bytes.first() == Some(&b'C') {
            Format::Compliment {
                argument: letter_at(bytes, 1)?,
            }
        } else if bytes.first() == Some(&b'D') && item.get(1..3) == Some(">>") {
            Format::DecrementShiftRight {
                argument: letter_at(bytes, 5)?,
                data: two_digits(bytes, 3)?,
            }
        } else if bytes.first() == Some(&b'D') {
            Format::Decrement {
                argument: letter_at(bytes, 1)?,
            }
        } else if bytes.first() == Some(&b'I') && item.get(1..3) == Some(">>") {
            Format::IncrementShiftRight {
                argument: letter_at(bytes, 5)?,
                data: two_digits(bytes, 3)?,
            }
        } else if bytes.first() == Some(&b'I') {
            Format::Increment {
                argument: letter_at(bytes, 1)?,
            }
        } else if let Some(digits) = item.strip_prefix('%') {
            Format::Static {
                data: binary_value(digits)?,
                bits: digits.len() as u32,
            }
        } else if bytes.first() == Some(&b'!') {
            Format::Absolute {
                argument: letter_at(bytes, 1)?,
                mode: MatchMode::Exact,
            }
        } else if bytes.first() == Some(&b'=') {
            Format::Absolute {
                argument: letter_at(bytes, 1)?,
                mode: MatchMode::Strong,
            }
        } else if bytes.first() == Some(&b'~') {
            Format::Absolute {
                argument: letter_at(bytes, 1)?,
                mode: MatchMode::Weak,
            }
        } else if bytes.first() == Some(&b'+') {
            Format::Relative {
                argument: letter_at(bytes, 2)?,
                displacement: one_digit(bytes, 1)?,
            }
        } else if bytes.first() == Some(&b'-') {
            Format::Relative {
                argument: letter_at(bytes, 2)?,
                displacement: -one_digit(bytes, 1)?,
            }
        } else if bytes.first() == Some(&b'*') {
            let digits = &item[2..];
            let digits = digits.strip_prefix('$').unwrap_or(digits);
            Format::Repeat {
                argument: letter_at(bytes, 1)?,
                data: hex_value(digits)?,
            }
        } else {
            // Unrecognized tokens are ignored, matching the description
            // grammar's tolerance for stray text.
            continue;
        };
        opcode.format.push(format);
    }
    Ok(())
}
