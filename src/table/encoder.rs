// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement matching and encoding against the instruction table.
//!
//! Opcodes are tried in declaration order. A candidate must tokenize against
//! the opcode pattern, supply the right number of arguments, and pass the
//! Strong/Exact width pre-checks before anything is emitted.

use crate::core::endian::{swap_endian, Endian};
use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::pattern::tokenize;

use super::{bit_length, Format, MatchMode, Table, TableContext};

impl Table {
    /// Assemble one statement. Returns `Ok(false)` when no opcode matches so
    /// the caller can report an unrecognized instruction.
    pub fn assemble(
        &mut self,
        ctx: &mut dyn TableContext,
        statement: &str,
    ) -> Result<bool, AsmError> {
        if let Some(captures) = tokenize(statement, "instrument \"*\"") {
            self.parse(ctx, &captures[0])?;
            return Ok(true);
        }

        // All relative encodings in a statement share one pc snapshot.
        let pc = ctx.pc();

        let Table { opcodes, writer } = self;
        'next_opcode: for opcode in opcodes.iter() {
            let Some(mut args) = tokenize(statement, &opcode.pattern) else {
                continue;
            };
            if args.len() != opcode.number.len() {
                continue;
            }

            for format in &opcode.format {
                let Format::Absolute { argument, mode } = *format else {
                    continue;
                };
                if mode == MatchMode::Weak {
                    continue;
                }
                let (bits, stripped) = bit_length(ctx, &args[argument])?;
                args[argument] = stripped;
                let declared = opcode.number[argument].bits;
                let mismatch = match mode {
                    MatchMode::Weak => false,
                    MatchMode::Strong => bits > declared,
                    MatchMode::Exact => bits != declared,
                };
                if mismatch {
                    continue 'next_opcode;
                }
            }

            for format in &opcode.format {
                match *format {
                    Format::Static { data, bits } => {
                        writer.write_bits(ctx, data, bits)?;
                    }

                    Format::Absolute { argument, .. } => {
                        let data = ctx.evaluate(&args[argument])?.value;
                        writer.write_bits(ctx, data as u64, opcode.number[argument].bits)?;
                    }

                    Format::Relative {
                        argument,
                        displacement,
                    } => {
                        let bits = opcode.number[argument].bits;
                        let data = ctx.evaluate(&args[argument])?.value
                            - (pc + i64::from(displacement));
                        check_signed_range(data, bits)?;
                        writer.write_bits(ctx, data as u64, bits)?;
                    }

                    Format::Repeat { argument, data } => {
                        let count = ctx.evaluate(&args[argument])?.value;
                        for _ in 0..count.max(0) {
                            writer.write_bits(ctx, data, opcode.number[argument].bits)?;
                        }
                    }

                    Format::ShiftRight { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            value.checked_shr(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }

                    Format::ShiftLeft { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            value.checked_shl(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }

                    Format::RelativeShiftRight {
                        argument,
                        displacement,
                        data,
                    } => {
                        let bits = opcode.number[argument].bits;
                        let value = ctx.evaluate(&args[argument])?.value
                            - (pc + i64::from(displacement));
                        check_signed_range(value, bits)?;
                        let bits = bits.checked_sub(data).ok_or_else(|| {
                            AsmError::new(
                                AsmErrorKind::Syntax,
                                "shift amount exceeds argument width",
                                None,
                            )
                        })?;
                        let shifted = (value >> data) as u64;
                        if ctx.endian() == Endian::Lsb {
                            writer.write_bits(ctx, shifted, bits)?;
                        } else {
                            writer.write_bits(ctx, swap_endian(shifted, bits)?, bits)?;
                        }
                    }

                    Format::Negative { argument } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(ctx, value.wrapping_neg(), opcode.number[argument].bits)?;
                    }

                    Format::NegativeShiftRight { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            value.wrapping_neg().checked_shr(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }

                    Format::Compliment { argument } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(ctx, !value, opcode.number[argument].bits)?;
                    }

                    Format::ComplimentShiftRight { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            (!value).checked_shr(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }

                    Format::Decrement { argument } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(ctx, value.wrapping_sub(1), opcode.number[argument].bits)?;
                    }

                    Format::DecrementShiftRight { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            value.wrapping_sub(1).checked_shr(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }

                    Format::Increment { argument } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(ctx, value.wrapping_add(1), opcode.number[argument].bits)?;
                    }

                    Format::IncrementShiftRight { argument, data } => {
                        let value = ctx.evaluate(&args[argument])?.value as u64;
                        writer.write_bits(
                            ctx,
                            value.wrapping_add(1).checked_shr(data).unwrap_or(0),
                            opcode.number[argument].bits,
                        )?;
                    }
                }
            }

            return Ok(true);
        }

        Ok(false)
    }
}

fn check_signed_range(value: i64, bits: u32) -> Result<(), AsmError> {
    let bits = bits.max(1);
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << (bits - 1)) - 1;
    let value = i128::from(value);
    if value < min || value > max {
        return Err(AsmError::new(
            AsmErrorKind::BranchOutOfBounds,
            &format!("branch out of bounds: {value}"),
            None,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AsmErrorKind;
    use crate::core::eval::{self, Evaluated, Evaluation};
    use crate::core::symbol_table::SymbolTable;
    use std::collections::HashMap;

    /// Minimal driver stand-in: evaluates through the real evaluator and
    /// collects emitted bytes.
    struct TestContext {
        symbols: SymbolTable,
        pc: i64,
        endian: Endian,
        bytes: Vec<u8>,
        directives: HashMap<String, u32>,
    }

    impl TestContext {
        fn at(pc: i64) -> Self {
            Self {
                symbols: SymbolTable::new(),
                pc,
                endian: Endian::Lsb,
                bytes: Vec::new(),
                directives: HashMap::new(),
            }
        }
    }

    impl TableContext for TestContext {
        fn pc(&self) -> i64 {
            self.pc
        }

        fn endian(&self) -> Endian {
            self.endian
        }

        fn set_endian(&mut self, endian: Endian) {
            self.endian = endian;
        }

        fn evaluate(&mut self, text: &str) -> Result<Evaluated, AsmError> {
            struct Ctx<'a> {
                symbols: &'a mut SymbolTable,
                pc: i64,
            }
            impl eval::EvalContext for Ctx<'_> {
                fn resolve_define(&self, name: &str) -> Option<String> {
                    self.symbols.lookup_define(name).map(str::to_string)
                }
                fn resolve_constant(
                    &mut self,
                    name: &str,
                    _mode: Evaluation,
                ) -> Result<(i64, bool), AsmError> {
                    self.symbols.reference(name, self.pc, true).ok_or_else(|| {
                        AsmError::new(AsmErrorKind::Expression, "constant not found", Some(name))
                    })
                }
                fn pc(&self) -> i64 {
                    self.pc
                }
            }
            let mut ctx = Ctx {
                symbols: &mut self.symbols,
                pc: self.pc,
            };
            eval::evaluate(&mut ctx, text, Evaluation::Default)
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), AsmError> {
            self.bytes.push(byte);
            Ok(())
        }

        fn read_architecture(&mut self, name: &str) -> Result<String, AsmError> {
            Err(AsmError::new(
                AsmErrorKind::Source,
                "architecture not found",
                Some(name),
            ))
        }

        fn set_directive(&mut self, name: &str, data_length: u32) {
            self.directives.insert(name.to_string(), data_length);
        }
    }

    fn assemble(table_text: &str, pc: i64, statement: &str) -> Result<(bool, Vec<u8>), AsmError> {
        let mut ctx = TestContext::at(pc);
        let mut table = Table::from_source(&mut ctx, table_text)?;
        let matched = table.assemble(&mut ctx, statement)?;
        assert!(table.bit_position() < 8);
        Ok((matched, ctx.bytes))
    }

    #[test]
    fn static_only_opcode() {
        let (matched, bytes) = assemble("nop; $ea\n", 0, "nop").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0xea]);
    }

    #[test]
    fn absolute_eight_bit_argument() {
        let (matched, bytes) = assemble("lda #*08; $a9 =a\n", 0, "lda #$42").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0xa9, 0x42]);
    }

    #[test]
    fn strong_match_rejects_wider_literals() {
        let (matched, bytes) = assemble("lda #*08; $a9 =a\n", 0, "lda #$1234").unwrap();
        assert!(!matched);
        assert!(bytes.is_empty());
    }

    #[test]
    fn exact_match_requires_equal_width() {
        let table = "lda #*16; $ad !a\n";
        let (matched, _) = assemble(table, 0, "lda #$42").unwrap();
        assert!(!matched);
        let (matched, bytes) = assemble(table, 0, "lda #$1234").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0xad, 0x34, 0x12]);
    }

    #[test]
    fn width_sigil_overrides_the_literal_width() {
        let (matched, bytes) = assemble("lda #*16; $ad !a\n", 0, "lda #>$42").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0xad, 0x42, 0x00]);
    }

    #[test]
    fn relative_branch_backward() {
        let mut ctx = TestContext::at(0x8000);
        let mut table = Table::from_source(&mut ctx, "beq *08; $f0 +1a\n").unwrap();
        ctx.symbols.assign("label", 0x8000, false);
        let matched = table.assemble(&mut ctx, "beq label").unwrap();
        assert!(matched);
        assert_eq!(ctx.bytes, vec![0xf0, 0xff]);
    }

    #[test]
    fn relative_branch_out_of_bounds() {
        let err = assemble("beq *08; $f0 +1a\n", 0, "beq 0x200").unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::BranchOutOfBounds);
    }

    #[test]
    fn relative_shift_right_msb_swaps_bytes() {
        let table = "#endian msb\njmp *24; $4c +0>>02a\n";
        let (matched, bytes) = assemble(table, 0x100, "jmp 0x204").unwrap();
        assert!(matched);
        // v = 0x104 >> 2 = 0x41 in 22 bits, swapped across three bytes, then
        // flushed low byte first with the top six bits left pending.
        let mut ctx = TestContext::at(0x100);
        let swapped = swap_endian(0x41, 22).unwrap();
        let mut writer = crate::table::BitWriter::default();
        writer.write_bits(&mut ctx, 0x4c, 8).unwrap();
        writer.write_bits(&mut ctx, swapped, 22).unwrap();
        assert_eq!(bytes, ctx.bytes);
        assert_eq!(bytes[0], 0x4c);
    }

    #[test]
    fn relative_shift_right_lsb_keeps_byte_order() {
        let table = "jmp *24; $4c +0>>02a\n";
        let (matched, bytes) = assemble(table, 0x100, "jmp 0x204").unwrap();
        assert!(matched);
        let mut ctx = TestContext::at(0x100);
        let mut writer = crate::table::BitWriter::default();
        writer.write_bits(&mut ctx, 0x4c, 8).unwrap();
        writer.write_bits(&mut ctx, 0x41, 22).unwrap();
        assert_eq!(bytes, ctx.bytes);
    }

    #[test]
    fn repeat_emits_the_constant_count_times() {
        let (matched, bytes) = assemble("fill *08; *a$00\n", 0, "fill 3").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0x00, 0x00, 0x00]);
    }

    #[test]
    fn shift_families() {
        let (_, bytes) = assemble("hi *08; >>08a\n", 0, "hi $1234").unwrap();
        assert_eq!(bytes, vec![0x12]);
        let (_, bytes) = assemble("neg *08; Na\n", 0, "neg 1").unwrap();
        assert_eq!(bytes, vec![0xff]);
        let (_, bytes) = assemble("not *08; Ca\n", 0, "not $0f").unwrap();
        assert_eq!(bytes, vec![0xf0]);
        let (_, bytes) = assemble("dec *08; Da\n", 0, "dec 5").unwrap();
        assert_eq!(bytes, vec![0x04]);
        let (_, bytes) = assemble("inc *08; Ia\n", 0, "inc 5").unwrap();
        assert_eq!(bytes, vec![0x06]);
    }

    #[test]
    fn sub_byte_statics_accumulate_into_one_byte() {
        let (matched, bytes) = assemble("mix; %1010 %0101\n", 0, "mix").unwrap();
        assert!(matched);
        assert_eq!(bytes, vec![0xa5]);
    }

    #[test]
    fn opcodes_match_in_declaration_order() {
        let table = "lda #*08; $a9 =a\nlda #*16; $ad =a\n";
        let (_, bytes) = assemble(table, 0, "lda #$42").unwrap();
        assert_eq!(bytes, vec![0xa9, 0x42]);
        let (_, bytes) = assemble(table, 0, "lda #$1234").unwrap();
        assert_eq!(bytes, vec![0xad, 0x34, 0x12]);
    }

    #[test]
    fn instrument_augments_the_table_in_source() {
        let mut ctx = TestContext::at(0);
        let mut table = Table::from_source(&mut ctx, "").unwrap();
        assert!(table
            .assemble(&mut ctx, "instrument \"nop; $ea\"")
            .unwrap());
        assert!(table.assemble(&mut ctx, "nop").unwrap());
        assert_eq!(ctx.bytes, vec![0xea]);
    }

    #[test]
    fn unmatched_statement_reports_no_match() {
        let (matched, bytes) = assemble("nop; $ea\n", 0, "halt").unwrap();
        assert!(!matched);
        assert!(bytes.is_empty());
    }
}
