//! Per-core and system-wide performance reports (spec §6 "Outputs").

use serde::Serialize;

use crate::core::Core;
use crate::memory::MemoryHierarchy;

/// Snapshot of one core's architectural state and counters after a run.
#[derive(Debug, Clone, Serialize)]
pub struct CoreReport {
    pub cid: usize,
    pub registers: [i32; 32],
    /// First 9 DRAM words, per spec §6 "DRAM head (9 words)".
    pub dram_head: [i32; 9],
    pub executed_instructions: u64,
    pub stalls: u64,
    pub memory_stalls: u64,
    pub sync_stalls: u64,
    pub cycles: u64,
    pub ipc: f64,
    pub l1i_miss_rate: f64,
    pub l1d_miss_rate: f64,
}

/// Aggregate report across all cores plus system-wide cache stats.
#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    pub cores: Vec<CoreReport>,
    pub total_cycles: u64,
    pub system_ipc: f64,
    pub l2_miss_rate: f64,
}

impl SystemReport {
    pub fn build(cores: &[Core], memory: &MemoryHierarchy) -> Self {
        let total_cycles = cores.iter().map(|c| c.current_cycle).max().unwrap_or(0);
        let total_executed: u64 = cores.iter().map(|c| c.executed_instructions).sum();
        let system_ipc = if total_cycles == 0 { 0.0 } else { total_executed as f64 / total_cycles as f64 };

        let reports = cores
            .iter()
            .map(|core| {
                let ipc = if core.current_cycle == 0 {
                    0.0
                } else {
                    core.executed_instructions as f64 / core.current_cycle as f64
                };
                CoreReport {
                    cid: core.cid,
                    registers: core.registers.snapshot(),
                    dram_head: memory.dram_head(core.cid),
                    executed_instructions: core.executed_instructions,
                    stalls: core.stalls,
                    memory_stalls: core.memory_stalls,
                    sync_stalls: core.sync_stalls,
                    cycles: core.current_cycle,
                    ipc,
                    l1i_miss_rate: memory.l1i_miss_rate(core.cid),
                    l1d_miss_rate: memory.l1d_miss_rate(core.cid),
                }
            })
            .collect();

        let l2_miss_rate =
            (0..cores.len()).map(|c| memory.l2_miss_rate(c)).sum::<f64>() / (cores.len().max(1) as f64);

        Self { cores: reports, total_cycles, system_ipc, l2_miss_rate }
    }

    /// Human-readable dump, in the spirit of a developer console report.
    pub fn print(&self) {
        for core in &self.cores {
            println!("=== core {} ===", core.cid);
            println!("  executed: {}  cycles: {}  ipc: {:.3}", core.executed_instructions, core.cycles, core.ipc);
            println!(
                "  stalls: {} (memory: {}, sync: {})",
                core.stalls, core.memory_stalls, core.sync_stalls
            );
            println!("  l1i miss rate: {:.3}  l1d miss rate: {:.3}", core.l1i_miss_rate, core.l1d_miss_rate);
            println!("  registers: {:?}", core.registers);
            println!("  dram[0..9]: {:?}", core.dram_head);
        }
        println!("=== system ===");
        println!("  total cycles: {}", self.total_cycles);
        println!("  system ipc: {:.3}", self.system_ipc);
        println!("  l2 miss rate: {:.3}", self.l2_miss_rate);
    }
}
