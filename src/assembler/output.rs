// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Symbol-table export after a successful run.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::core::error::{AsmError, AsmErrorKind};

use super::cli::SymbolFormat;

/// Write the constant table to `path`, sorted case-insensitively by name.
pub(super) fn emit_symbols_file(
    path: &Path,
    format: SymbolFormat,
    entries: &[(String, i64)],
) -> Result<(), AsmError> {
    let mut entries = entries.to_vec();
    entries.sort_by(|left, right| {
        left.0
            .to_ascii_lowercase()
            .cmp(&right.0.to_ascii_lowercase())
    });

    let output = match format {
        SymbolFormat::Json => {
            let symbols: Vec<serde_json::Value> = entries
                .into_iter()
                .map(|(name, value)| {
                    json!({
                        "name": name,
                        "address": format!("{value:08X}"),
                        "value": value,
                    })
                })
                .collect();
            json!({ "symbols": symbols }).to_string()
        }
        SymbolFormat::Text => {
            let mut output = String::new();
            for (name, value) in entries {
                output.push_str(&format!("{name} = ${value:08X}\n"));
            }
            output
        }
    };

    fs::write(path, output).map_err(|err| {
        AsmError::new(
            AsmErrorKind::Io,
            "error writing symbols file",
            Some(&format!("{} ({err})", path.display())),
        )
    })
}
