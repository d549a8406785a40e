// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::collections::HashSet;
use std::fs;
use std::io::{self, IsTerminal, Write as _};
use std::path::{Path, PathBuf};

use crate::core::endian::Endian;
use crate::core::error::{AsmError, AsmErrorKind, Diagnostic, Severity};
use crate::core::eval::{self, Evaluated, Evaluation};
use crate::core::source::Program;
use crate::core::symbol_table::SymbolTable;
use crate::core::target::{OverwriteTracker, TargetFile, TargetMode};
use crate::table::TableContext;

use super::statements::DirectiveRegistry;

/// One traversal of the program. Only `Write` touches the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Analyze,
    Query,
    Refine,
    Write,
}

/// The assembler driver: owns the program, the symbol store, and all state
/// shared across statements within a pass.
pub(crate) struct Bass {
    pub(crate) program: Program,
    pub(crate) symbols: SymbolTable,
    pub(crate) directives: DirectiveRegistry,
    pub(crate) arch_paths: Vec<PathBuf>,
    pub(crate) phase: Phase,
    pub(crate) endian: Endian,
    pub(crate) origin: u64,
    pub(crate) base: i64,
    pub(crate) strict: bool,
    pub(crate) tracker: OverwriteTracker,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) declared: HashSet<String>,
    /// Target requested on the command line, attached at write-phase start.
    pub(crate) cli_target: Option<(PathBuf, TargetMode)>,
    pub(crate) target: Option<TargetFile>,
    pub(crate) active: Option<usize>,
}

impl Bass {
    pub(crate) fn new() -> Self {
        Self {
            program: Program::new(),
            symbols: SymbolTable::new(),
            directives: DirectiveRegistry::new(),
            arch_paths: Vec::new(),
            phase: Phase::Analyze,
            endian: Endian::Lsb,
            origin: 0,
            base: 0,
            strict: false,
            tracker: OverwriteTracker::new(),
            diagnostics: Vec::new(),
            declared: HashSet::new(),
            cli_target: None,
            target: None,
            active: None,
        }
    }

    pub(crate) fn write_phase(&self) -> bool {
        self.phase == Phase::Write
    }

    pub(crate) fn program_counter(&self) -> i64 {
        self.origin as i64 + self.base
    }

    /// Position the target at `offset`. A no-op outside the write phase and
    /// without an attached target.
    pub(crate) fn seek(&mut self, offset: u64) -> Result<(), AsmError> {
        if !self.write_phase() {
            return Ok(());
        }
        if let Some(target) = &mut self.target {
            target.seek(offset).map_err(io_error)?;
        }
        Ok(())
    }

    /// Emit `length` bytes of `data` at the current program counter. The
    /// logical origin advances in every phase; bytes only move in the write
    /// phase, to the target if one is attached, else to redirected stdout.
    pub(crate) fn write(&mut self, data: u64, length: u32) -> Result<(), AsmError> {
        if self.write_phase() {
            if let Some(target) = &mut self.target {
                let address = target.offset().map_err(io_error)?;
                self.tracker.track(address, length, self.base)?;
                match self.endian {
                    Endian::Lsb => target.writel(data, length).map_err(io_error)?,
                    Endian::Msb => target.writem(data, length).map_err(io_error)?,
                }
            } else if !io::stdout().is_terminal() {
                let mut bytes = [0u8; 8];
                for n in 0..length as usize {
                    bytes[n] = (data >> (n * 8)) as u8;
                }
                if self.endian == Endian::Msb {
                    bytes[..length as usize].reverse();
                }
                io::stdout()
                    .write_all(&bytes[..length as usize])
                    .map_err(io_error)?;
            }
        }
        self.origin += u64::from(length);
        Ok(())
    }

    /// Attach the target requested by an `output` statement or the command
    /// line. Open failures are warnings: assembly continues with output
    /// suppressed.
    pub(crate) fn attach_target(&mut self, path: &Path, mode: TargetMode) -> Result<(), AsmError> {
        self.target = None;
        self.tracker.reset();
        if !self.write_phase() {
            return Ok(());
        }
        match TargetFile::open(path, mode) {
            Ok(target) => {
                self.target = Some(target);
                Ok(())
            }
            Err(err) => self.warn(AsmError::new(
                AsmErrorKind::Target,
                "unable to open target file",
                Some(&format!("{} ({err})", path.display())),
            )),
        }
    }

    /// Resolve an architecture description by name: as given, then with an
    /// `.arch` suffix, through every architecture search path.
    pub(crate) fn read_architecture_text(&self, name: &str) -> Result<String, AsmError> {
        let mut candidates = vec![PathBuf::from(name), PathBuf::from(format!("{name}.arch"))];
        for dir in &self.arch_paths {
            candidates.push(dir.join(name));
            candidates.push(dir.join(format!("{name}.arch")));
        }
        for candidate in &candidates {
            if let Ok(text) = fs::read_to_string(candidate) {
                return Ok(text);
            }
        }
        Err(AsmError::new(
            AsmErrorKind::Source,
            "architecture not found",
            Some(name),
        ))
    }

    /// Record a warning; fatal under `--strict`.
    pub(crate) fn warn(&mut self, err: AsmError) -> Result<(), AsmError> {
        self.diagnostics
            .push(self.contextualize(Severity::Warning, err.clone()));
        if self.strict {
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn report_error(&mut self, err: AsmError) {
        self.diagnostics
            .push(self.contextualize(Severity::Error, err));
    }

    fn contextualize(&self, severity: Severity, err: AsmError) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(severity, err);
        if let Some(index) = self.active {
            let instruction = &self.program.instructions[index];
            diagnostic = diagnostic
                .with_location(self.program.location(instruction))
                .with_statement(instruction.statement.clone());
        }
        diagnostic
    }

    pub(crate) fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn evaluate_in(
        &mut self,
        text: &str,
        mode: Evaluation,
    ) -> Result<Evaluated, AsmError> {
        let mut ctx = BassEvalContext { bass: self };
        eval::evaluate(&mut ctx, text, mode)
    }
}

fn io_error(err: io::Error) -> AsmError {
    AsmError::new(
        AsmErrorKind::Io,
        "target write failed",
        Some(&err.to_string()),
    )
}

/// Evaluator view of the driver. Outside the write phase an undefined name
/// becomes an unknown constant holding the current pc; the write phase and
/// strict evaluation reject it.
struct BassEvalContext<'a> {
    bass: &'a mut Bass,
}

impl eval::EvalContext for BassEvalContext<'_> {
    fn resolve_define(&self, name: &str) -> Option<String> {
        self.bass.symbols.lookup_define(name).map(str::to_string)
    }

    fn resolve_constant(
        &mut self,
        name: &str,
        mode: Evaluation,
    ) -> Result<(i64, bool), AsmError> {
        let create = mode == Evaluation::Default
            && matches!(self.bass.phase, Phase::Query | Phase::Refine);
        let placeholder = self.bass.program_counter();
        self.bass
            .symbols
            .reference(name, placeholder, create)
            .ok_or_else(|| {
                AsmError::new(AsmErrorKind::Expression, "constant not found", Some(name))
            })
    }

    fn pc(&self) -> i64 {
        self.bass.program_counter()
    }
}

impl TableContext for Bass {
    fn pc(&self) -> i64 {
        self.program_counter()
    }

    fn endian(&self) -> Endian {
        self.endian
    }

    fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    fn evaluate(&mut self, text: &str) -> Result<Evaluated, AsmError> {
        self.evaluate_in(text, Evaluation::Default)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), AsmError> {
        self.write(u64::from(byte), 1)
    }

    fn read_architecture(&mut self, name: &str) -> Result<String, AsmError> {
        self.read_architecture_text(name)
    }

    fn set_directive(&mut self, name: &str, data_length: u32) {
        self.directives.set(name, data_length);
    }
}
