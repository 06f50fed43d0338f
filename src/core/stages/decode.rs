//! ID stage (spec §4.4 "ID"): hazard detection, forwarding eligibility,
//! branch/jump resolution, and `SYNC` rendezvous.

use crate::core::Core;
use crate::error::Diagnostic;
use crate::isa::instruction::{Instruction, Stage};
use crate::isa::Opcode;
use crate::sim::loader::Program;
use crate::sync::SyncBarrier;

impl Core {
    pub(crate) fn stage_id(&mut self, program: &Program, barrier: &mut SyncBarrier) {
        if self.waiting_for_sync {
            self.resume_from_sync(barrier);
            return;
        }

        let Some(mut instr) = self.if_slot.take() else { return };

        if self.has_hazard(&instr) {
            self.stalls += 1;
            self.if_slot = Some(instr);
            return;
        }

        match instr.opcode {
            Opcode::Bne | Opcode::Beq | Opcode::Ble => self.resolve_branch(instr, program),
            Opcode::J => self.resolve_jump(instr, program),
            Opcode::Jal => {
                let dest = instr.dest;
                let link = instr.fetch_pc;
                if let Some(d) = dest {
                    self.registers.write(d, link as i32);
                }
                self.resolve_jump(instr, program);
            }
            Opcode::Sync => self.start_sync(instr, barrier),
            _ => {
                if let Some(s1) = instr.src1 {
                    instr.resolved_src1 = self.resolve_operand(s1);
                }
                if let Some(s2) = instr.src2 {
                    instr.resolved_src2 = self.resolve_operand(s2);
                }
                if instr.opcode.writes_dest() {
                    if let Some(dest) = instr.dest {
                        let latency = self.latency_for(instr.opcode);
                        let stage_distance = if self.forwarding { 1 } else { 3 };
                        let ready_cycle = self.current_cycle + stage_distance + latency - 1;
                        let _ = self.register_status.insert(dest, ready_cycle);
                    }
                }
                instr.mark_stage(Stage::Id, self.current_cycle);
                self.id_slot = Some(instr);
            }
        }
    }

    /// Whether any source of `instr` is not yet ready this cycle (spec §4.4
    /// "Hazard rule").
    fn has_hazard(&self, instr: &Instruction) -> bool {
        for rs in [instr.src1, instr.src2].into_iter().flatten() {
            let Some(&ready_cycle) = self.register_status.get(&rs) else { continue };
            if ready_cycle > self.current_cycle {
                if self.forwarding {
                    if !self.is_forwardable(rs) {
                        return true;
                    }
                } else {
                    return true;
                }
            }
        }
        false
    }

    /// An EX producer bypasses only in the cycle its EX completes; a MEM
    /// producer is always forwardable (spec §4.4 "Forwarding").
    fn is_forwardable(&self, rs: usize) -> bool {
        if let Some(ex) = &self.ex_slot {
            if ex.dest == Some(rs) && ex.stage_complete_cycle[Stage::Ex as usize] == Some(self.current_cycle) {
                return true;
            }
        }
        if let Some(mem) = &self.mem_slot {
            if mem.dest == Some(rs) {
                return true;
            }
        }
        false
    }

    pub(crate) fn latency_for(&self, opcode: Opcode) -> u64 {
        match opcode {
            Opcode::Add => self.latencies.add,
            Opcode::Sub => self.latencies.sub,
            Opcode::Mul => self.latencies.mul,
            Opcode::Div => self.latencies.div,
            _ => 1,
        }
    }

    fn resolve_branch(&mut self, mut instr: Instruction, program: &Program) {
        let v1 = instr.src1.map(|r| self.resolve_operand(r)).unwrap_or(0);
        let v2 = instr.src2.map(|r| self.resolve_operand(r)).unwrap_or(0);
        let taken = match instr.opcode {
            Opcode::Bne => v1 != v2,
            Opcode::Beq => v1 == v2,
            Opcode::Ble => v1 <= v2,
            _ => unreachable!("resolve_branch only called for BNE/BEQ/BLE"),
        };
        if taken {
            self.resolve_jump(instr, program);
            return;
        }
        instr.completed = true;
        instr.mark_stage(Stage::Id, self.current_cycle);
        self.executed_instructions += 1;
    }

    /// Handles `J`, `JAL`, and taken conditional branches: retargets `pc`,
    /// clears the IF slot, and charges the 2-cycle flush penalty (spec §4.4).
    fn resolve_jump(&mut self, mut instr: Instruction, program: &Program) {
        match instr.label.as_ref().and_then(|label| program.labels.get(label)) {
            Some(&target) => {
                self.pc = target as i64;
                self.branch_taken_flag = true;
                self.stalls += 2;
            }
            None => {
                if let Some(label) = instr.label.clone() {
                    self.diagnostics.push(Diagnostic::UndefinedLabel { core: self.cid, label });
                }
            }
        }
        instr.completed = true;
        instr.mark_stage(Stage::Id, self.current_cycle);
        self.executed_instructions += 1;
    }

    fn start_sync(&mut self, mut instr: Instruction, barrier: &mut SyncBarrier) {
        let arrival = barrier.arrive();
        if arrival.released_by_me {
            instr.completed = true;
            instr.mark_stage(Stage::Id, self.current_cycle);
            self.executed_instructions += 1;
        } else {
            self.waiting_for_sync = true;
            self.my_barrier_gen = arrival.generation;
            self.sync_stalls += 1;
            self.id_slot = Some(instr);
        }
    }

    fn resume_from_sync(&mut self, barrier: &mut SyncBarrier) {
        if barrier.has_released(self.my_barrier_gen) {
            self.waiting_for_sync = false;
            if let Some(mut instr) = self.id_slot.take() {
                instr.completed = true;
                instr.mark_stage(Stage::Id, self.current_cycle);
                self.executed_instructions += 1;
            }
        } else {
            self.sync_stalls += 1;
        }
    }
}
