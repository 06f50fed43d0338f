//! Error and diagnostic types for the simulator.
//!
//! This module distinguishes two classes of problem a run can hit:
//! 1. **Fatal load errors** — the program or cache-config file cannot be
//!    opened. These abort the run before a single cycle executes.
//! 2. **Non-fatal diagnostics** — a malformed instruction, an undefined
//!    branch target, or a livelock cutoff. These are recorded and logged
//!    but never abort the run; the simulator keeps going per spec.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run before simulation starts.
#[derive(Debug, Error)]
pub enum SimError {
    /// The program file could not be opened.
    #[error("could not open program file {path}: {source}")]
    ProgramUnreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache-configuration file could not be opened.
    #[error("could not open cache configuration file {path}: {source}")]
    ConfigUnreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The requested core count is outside the supported range.
    #[error("core count {0} is out of range (must be 1..=4)")]
    InvalidCoreCount(u32),
}

/// A recorded, non-fatal anomaly encountered while running a program.
///
/// These never abort the run (spec §7): they are logged at `warn` and
/// tallied so a caller can inspect how "clean" a run was after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An instruction line didn't match any known opcode/operand grammar.
    DecodeError {
        /// Zero-based index into the program.
        line: usize,
        /// The raw instruction text.
        text: String,
    },
    /// A branch or jump referenced a label not present in the label map.
    UndefinedLabel {
        /// The core that hit the undefined reference.
        core: usize,
        /// The label text.
        label: String,
    },
    /// A duplicate label definition was seen; the first definition wins.
    DuplicateLabel {
        /// The label text.
        label: String,
    },
    /// The simulation hit its cycle ceiling before all cores went idle.
    Livelock {
        /// The configured ceiling that was reached.
        cycle_limit: u64,
    },
}

impl Diagnostic {
    /// Logs this diagnostic at the appropriate level via `tracing`.
    pub fn log(&self) {
        match self {
            Diagnostic::DecodeError { line, text } => {
                tracing::warn!(line, text, "unrecognized instruction, skipping");
            }
            Diagnostic::UndefinedLabel { core, label } => {
                tracing::warn!(core, label, "branch/jump target undefined, not taken");
            }
            Diagnostic::DuplicateLabel { label } => {
                tracing::warn!(label, "duplicate label definition, keeping first");
            }
            Diagnostic::Livelock { cycle_limit } => {
                tracing::warn!(cycle_limit, "cycle ceiling reached, reporting partial results");
            }
        }
    }
}
