//! Program loading: label extraction and blank-line skipping (spec §6).
//!
//! The tokenizer/operand-rewrite pass itself (the `offset(reg)` rewrite) is
//! an external collaborator; this module picks up right after it, turning
//! already-rewritten lines into a label table and an instruction-text list.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Diagnostic, SimError};

/// A loaded program: instruction text lines (pre-decode) plus a label to
/// instruction-index map. Both are read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub lines: Vec<String>,
    pub labels: HashMap<String, usize>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Loads and labels a program file, skipping blank lines (spec §6).
    /// A label is a token ending in `:`, either on its own line or
    /// prefixed to the first instruction token on that line.
    pub fn load(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ProgramUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut program = Program::default();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let mut rest = line;
            if let Some(colon) = line.find(':') {
                let (label, remainder) = line.split_at(colon);
                let remainder = remainder[1..].trim();
                let label = label.trim().to_string();
                if program.labels.contains_key(&label) {
                    diagnostics.push(Diagnostic::DuplicateLabel { label });
                } else {
                    let _ = program.labels.insert(label, program.lines.len());
                }
                if remainder.is_empty() {
                    continue;
                }
                rest = remainder;
            }

            program.lines.push(rest.to_string());
        }

        Ok(program)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn standalone_label_points_at_the_following_instruction() {
        let mut diags = Vec::new();
        let dir = std::env::temp_dir().join(format!("coresim-test-{:p}", &diags));
        fs::write(&dir, "ADDI x1 x0 3\nEND:\nADDI x2 x0 5\n").unwrap();
        let program = Program::load(&dir, &mut diags).unwrap();
        let _ = fs::remove_file(&dir).ok();
        assert_eq!(program.labels.get("END"), Some(&1));
        assert_eq!(program.lines.len(), 2);
    }

    #[test]
    fn inline_label_keeps_the_instruction_on_the_same_line() {
        let mut diags = Vec::new();
        let dir = std::env::temp_dir().join(format!("coresim-test-inline-{:p}", &diags));
        fs::write(&dir, "START: ADDI x1 x0 3\n").unwrap();
        let program = Program::load(&dir, &mut diags).unwrap();
        let _ = fs::remove_file(&dir).ok();
        assert_eq!(program.labels.get("START"), Some(&0));
        assert_eq!(program.lines[0], "ADDI x1 x0 3");
    }
}
