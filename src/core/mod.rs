//! Per-core five-stage in-order pipeline (spec §4.4).

pub mod register_file;
pub mod stages;

use std::collections::HashMap;

use crate::config::LatencyTable;
use crate::core::register_file::RegisterFile;
use crate::error::Diagnostic;
use crate::isa::Instruction;
use crate::memory::MemoryHierarchy;
use crate::sim::loader::Program;
use crate::sync::SyncBarrier;

/// One core's full pipeline state (spec §4.4 "State").
pub struct Core {
    pub cid: usize,
    pub pc: i64,
    pub registers: RegisterFile,
    pub forwarding: bool,
    pub latencies: LatencyTable,

    pub(crate) if_slot: Option<Instruction>,
    pub(crate) id_slot: Option<Instruction>,
    pub(crate) ex_slot: Option<Instruction>,
    pub(crate) mem_slot: Option<Instruction>,

    /// Register index to the cycle its in-flight producer's result becomes ready.
    pub(crate) register_status: HashMap<usize, u64>,

    pub current_cycle: u64,
    pub(crate) branch_taken_flag: bool,
    pub(crate) waiting_for_sync: bool,
    pub(crate) my_barrier_gen: u64,

    pub stalls: u64,
    pub memory_stalls: u64,
    pub sync_stalls: u64,
    pub executed_instructions: u64,

    /// Decode errors and undefined-label hits, drained by the simulator.
    pub diagnostics: Vec<Diagnostic>,
}

impl Core {
    pub fn new(cid: usize, forwarding: bool, latencies: LatencyTable) -> Self {
        Self {
            cid,
            pc: 0,
            registers: RegisterFile::new(),
            forwarding,
            latencies,
            if_slot: None,
            id_slot: None,
            ex_slot: None,
            mem_slot: None,
            register_status: HashMap::new(),
            current_cycle: 0,
            branch_taken_flag: false,
            waiting_for_sync: false,
            my_barrier_gen: 0,
            stalls: 0,
            memory_stalls: 0,
            sync_stalls: 0,
            executed_instructions: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Runs one global tick: WB, MEM, EX, ID, IF in that order, then
    /// advances `current_cycle` (spec §4.4 "One cycle").
    pub fn tick(&mut self, program: &Program, memory: &mut MemoryHierarchy, barrier: &mut SyncBarrier) {
        self.stage_wb();
        self.stage_mem(memory);
        self.stage_ex(memory);
        self.stage_id(program, barrier);
        self.stage_if(program, memory);
        self.current_cycle += 1;
    }

    /// A core is active while any stage slot is occupied, the PC still
    /// points inside the program, or it is blocked on a barrier.
    pub fn is_active(&self, program_len: usize) -> bool {
        self.if_slot.is_some()
            || self.id_slot.is_some()
            || self.ex_slot.is_some()
            || self.mem_slot.is_some()
            || (self.pc as usize) < program_len
            || self.waiting_for_sync
    }

    /// Resolves a source register to its current value: a same-cycle EX
    /// bypass, a MEM-stage bypass, or the register file (spec §4.4 ID,
    /// "using the ready values").
    pub(crate) fn resolve_operand(&self, reg: usize) -> i64 {
        if self.forwarding {
            if let Some(ex) = &self.ex_slot {
                if ex.dest == Some(reg) && ex.stage_complete_cycle[crate::isa::instruction::Stage::Ex as usize] == Some(self.current_cycle) {
                    return ex.result;
                }
            }
            if let Some(mem) = &self.mem_slot {
                if mem.dest == Some(reg) {
                    return mem.result;
                }
            }
        }
        i64::from(self.registers.read(reg))
    }
}
