//! EX stage (spec §4.4 "EX"): ALU arithmetic, `ARR` bulk-init, and
//! scratchpad effective-address computation.

use crate::core::Core;
use crate::isa::instruction::Stage;
use crate::isa::Opcode;
use crate::memory::MemoryHierarchy;

impl Core {
    pub(crate) fn stage_ex(&mut self, memory: &mut MemoryHierarchy) {
        let Some(mut instr) = self.id_slot.take() else { return };

        match instr.opcode {
            Opcode::Add | Opcode::Sub | Opcode::Mul => {
                let a = instr.resolved_src1 as i32;
                let b = instr.resolved_src2 as i32;
                let r = match instr.opcode {
                    Opcode::Add => a.wrapping_add(b),
                    Opcode::Sub => a.wrapping_sub(b),
                    _ => a.wrapping_mul(b),
                };
                instr.result = i64::from(r);

                let latency = self.latency_for(instr.opcode);
                if latency > 1 && !self.forwarding {
                    self.stalls += latency - 1;
                }
            }
            Opcode::Addi => {
                let a = instr.resolved_src1 as i32;
                instr.result = i64::from(a.wrapping_add(instr.imm as i32));
            }
            Opcode::Arr => {
                memory.bulk_init_arr(instr.imm);
                for i in 0..instr.imm {
                    let core_idx = (i / 25) as usize;
                    let reg_idx = core_idx % 4;
                    let word = i % 25;
                    if reg_idx == self.cid && (0..32).contains(&word) {
                        self.registers.write(word as usize, (i + 1) as i32);
                    }
                }
            }
            Opcode::LwSpm => {
                let base = instr.src1.map(|r| self.resolve_operand(r)).unwrap_or(0);
                instr.effective_addr = Some(base + instr.offset);
            }
            Opcode::SwSpm => {
                let base = instr.src1.map(|r| self.resolve_operand(r)).unwrap_or(0);
                instr.resolved_src2 = instr.src2.map(|r| self.resolve_operand(r)).unwrap_or(0);
                instr.effective_addr = Some(base + instr.offset);
            }
            // LD/SW/LDC2-4 defer to MEM; BNE/BEQ/BLE/J/JAL/SYNC retire in ID.
            _ => {}
        }

        instr.mark_stage(Stage::Ex, self.current_cycle);
        self.ex_slot = Some(instr);
    }
}
