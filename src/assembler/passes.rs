// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Pass orchestration: the analyze/query/refine/write sequence and the
//! fixed-point convergence loop over the constant store.

use crate::core::endian::Endian;
use crate::core::error::{AsmError, AsmErrorKind};
use crate::table::Table;

use super::engine::{Bass, Phase};

/// Refinement is bounded: query is pass 1, refine passes run 2 through 10.
const MAX_PASSES: u32 = 10;

impl Bass {
    /// Drive the full pass sequence. Errors recorded in any pass suppress
    /// the write phase and fail the run.
    pub(crate) fn run(&mut self, strict: bool) -> Result<(), AsmError> {
        self.strict = strict;

        self.phase = Phase::Analyze;
        self.analyze();

        self.phase = Phase::Query;
        self.execute()?;
        self.check_clean()?;

        if !self.symbols.take_unknowns().is_empty() {
            self.refine()?;
        }

        self.phase = Phase::Write;
        self.execute()?;
        self.check_clean()?;
        Ok(())
    }

    /// Re-run the program until the constant store reaches a fixed point.
    fn refine(&mut self) -> Result<(), AsmError> {
        for _pass in 2..=MAX_PASSES {
            let refinement = self.symbols.inspect_for_refinement();
            if !refinement.any_changed {
                if refinement.any_unset() {
                    return Err(self.never_determined(&refinement.unset));
                }
                self.symbols.finalize();
                return Ok(());
            }

            self.phase = Phase::Refine;
            self.execute()?;
            self.check_clean()?;
            self.symbols.take_unknowns();
        }

        // The last refine pass was never inspected; give it one chance to
        // have settled before declaring divergence.
        let refinement = self.symbols.inspect_for_refinement();
        if refinement.any_changed || refinement.any_unset() {
            return Err(self.never_determined(&refinement.unset));
        }
        self.symbols.finalize();
        Ok(())
    }

    /// One traversal of the whole program with a fresh architecture.
    fn execute(&mut self) -> Result<(), AsmError> {
        self.origin = 0;
        self.base = 0;
        self.endian = Endian::Lsb;
        self.target = None;
        self.active = None;
        let mut table = Table::new();

        if let Some((path, mode)) = self.cli_target.clone() {
            self.attach_target(&path, mode)?;
        }

        for index in 0..self.program.instructions.len() {
            self.active = Some(index);
            let statement = self.program.instructions[index].statement.clone();
            match self.execute_statement(&mut table, &statement) {
                Ok(()) => {}
                Err(err) => {
                    // Target warnings were already recorded by warn().
                    if err.kind() != AsmErrorKind::Target {
                        self.report_error(err.clone());
                    }
                    if err.is_fatal() || self.strict {
                        self.active = None;
                        return Err(err);
                    }
                }
            }
        }
        self.active = None;
        Ok(())
    }

    fn check_clean(&self) -> Result<(), AsmError> {
        if self.error_count() > 0 {
            return Err(AsmError::new(
                AsmErrorKind::Assembler,
                "errors detected in source",
                None,
            ));
        }
        Ok(())
    }

    fn never_determined(&self, unset: &[String]) -> AsmError {
        let undeclared: Vec<&str> = unset
            .iter()
            .filter(|name| !self.declared.contains(name.as_str()))
            .map(String::as_str)
            .collect();
        let names = if undeclared.is_empty() {
            unset.join(", ")
        } else {
            undeclared.join(", ")
        };
        if names.is_empty() {
            return AsmError::new(AsmErrorKind::Constant, "constant never determined", None);
        }
        AsmError::new(
            AsmErrorKind::Constant,
            "constant never determined",
            Some(&names),
        )
    }
}
