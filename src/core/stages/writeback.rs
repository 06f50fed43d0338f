//! WB stage (spec §4.4 "WB").

use crate::isa::instruction::Stage;
use crate::core::Core;

impl Core {
    pub(crate) fn stage_wb(&mut self) {
        let Some(mut instr) = self.mem_slot.take() else { return };

        if instr.opcode.writes_dest() {
            if let Some(dest) = instr.dest {
                self.registers.write(dest, instr.result as i32);
            }
        }

        instr.completed = true;
        instr.mark_stage(Stage::Wb, self.current_cycle);
        self.executed_instructions += 1;
    }
}
