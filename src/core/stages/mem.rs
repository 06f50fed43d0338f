//! MEM stage (spec §4.4 "MEM"): memory and scratchpad dispatch.

use crate::isa::instruction::Stage;
use crate::isa::Opcode;
use crate::core::Core;
use crate::memory::MemoryHierarchy;

impl Core {
    pub(crate) fn stage_mem(&mut self, memory: &mut MemoryHierarchy) {
        let Some(mut instr) = self.ex_slot.take() else { return };

        match instr.opcode {
            Opcode::Ld => {
                let addr = instr.mem_addr.unwrap_or(0) as u64 * 4;
                let (value, stall) = memory.load_data(self.cid, addr, self.current_cycle);
                instr.result = i64::from(value);
                self.charge_memory_stall(stall);
            }
            Opcode::Ldc2 | Opcode::Ldc3 | Opcode::Ldc4 => {
                // Restricted to CID == 0 as in the source (spec §9, kept as-written).
                if self.cid == 0 {
                    let source_core = match instr.opcode {
                        Opcode::Ldc2 => 1,
                        Opcode::Ldc3 => 2,
                        _ => 3,
                    };
                    let addr = instr.mem_addr.unwrap_or(0) as u64 * 4;
                    let (value, stall) = memory.load_data(source_core, addr, self.current_cycle);
                    instr.result = i64::from(value);
                    self.charge_memory_stall(stall);
                }
            }
            Opcode::Sw => {
                let addr = instr.mem_addr.unwrap_or(0) as u64 * 4;
                let value = instr.src1.map(|r| self.resolve_operand(r)).unwrap_or(0) as i32;
                let stall = memory.store_data(self.cid, addr, value, self.current_cycle);
                self.charge_memory_stall(stall);
            }
            Opcode::LwSpm => {
                let idx = (instr.effective_addr.unwrap_or(0) / 4).max(0) as usize;
                let (value, stall) = memory.read_spm(self.cid, idx);
                instr.result = i64::from(value);
                self.charge_memory_stall(stall);
            }
            Opcode::SwSpm => {
                let idx = (instr.effective_addr.unwrap_or(0) / 4).max(0) as usize;
                let stall = memory.write_spm(self.cid, idx, instr.resolved_src2 as i32);
                self.charge_memory_stall(stall);
            }
            _ => {}
        }

        instr.mark_stage(Stage::Mem, self.current_cycle);
        self.mem_slot = Some(instr);
    }

    fn charge_memory_stall(&mut self, stall: u64) {
        self.memory_stalls += stall;
        self.stalls += stall;
    }
}
