//! IF stage (spec §4.4 "IF").

use crate::core::Core;
use crate::error::Diagnostic;
use crate::isa::instruction::{decode, Stage};
use crate::memory::MemoryHierarchy;
use crate::sim::loader::Program;

impl Core {
    pub(crate) fn stage_if(&mut self, program: &Program, memory: &mut MemoryHierarchy) {
        if self.branch_taken_flag {
            self.branch_taken_flag = false;
            return;
        }
        if self.if_slot.is_some() {
            // ID pushed a hazarded instruction back; it keeps IF from fetching.
            return;
        }
        if self.waiting_for_sync || (self.pc as usize) >= program.len() {
            return;
        }

        let pc = self.pc;
        let text = &program.lines[pc as usize];
        let mut instr = match decode(text) {
            Ok(instr) => instr,
            Err(_) => {
                self.diagnostics.push(Diagnostic::DecodeError { line: pc as usize, text: text.clone() });
                self.pc += 1;
                return;
            }
        };

        let stall = memory.fetch_instruction(self.cid, (pc as u64) * 4, self.current_cycle);
        self.stalls += stall;

        instr.fetch_pc = pc;
        instr.issue_cycle = self.current_cycle;
        instr.mark_stage(Stage::If, self.current_cycle);
        self.if_slot = Some(instr);
        self.pc += 1;
    }
}
