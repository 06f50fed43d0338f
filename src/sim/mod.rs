//! Top-level driver: owns every core, the memory hierarchy, the barrier,
//! and the loaded program; advances them in cycle-lockstep (spec §4
//! "Simulator", §5 "Concurrency & Resource Model").

pub mod loader;

use std::path::Path;

use crate::config::{CacheConfig, RuntimeConfig};
use crate::core::Core;
use crate::error::{Diagnostic, SimError};
use crate::memory::MemoryHierarchy;
use crate::sim::loader::Program;
use crate::stats::SystemReport;
use crate::sync::SyncBarrier;

pub struct Simulator {
    memory: MemoryHierarchy,
    barrier: SyncBarrier,
    cores: Vec<Core>,
    program: Program,
    cycle_limit: u64,
    diagnostics: Vec<Diagnostic>,
}

impl Simulator {
    /// Loads the program and cache config, validates `runtime`, and builds
    /// one core per `runtime.num_cores`.
    pub fn new(program_path: &Path, cache_config: &CacheConfig, runtime: &RuntimeConfig) -> Result<Self, SimError> {
        runtime.validate()?;

        let mut diagnostics = Vec::new();
        let program = Program::load(program_path, &mut diagnostics)?;

        let num_cores = runtime.num_cores as usize;
        let memory = MemoryHierarchy::new(cache_config, num_cores);
        let barrier = SyncBarrier::new(num_cores);
        let cores = (0..num_cores).map(|cid| Core::new(cid, runtime.forwarding, runtime.latencies)).collect();

        Ok(Self { memory, barrier, cores, program, cycle_limit: runtime.cycle_limit, diagnostics })
    }

    /// Runs every core to quiescence or until the cycle ceiling is hit,
    /// then returns the aggregated report (spec §4.4 "Termination").
    pub fn run(mut self) -> (SystemReport, Vec<Diagnostic>) {
        let mut cycle = 0u64;
        while cycle < self.cycle_limit {
            if self.cores.iter().all(|c| !c.is_active(self.program.len())) {
                break;
            }
            for core in &mut self.cores {
                core.tick(&self.program, &mut self.memory, &mut self.barrier);
            }
            cycle += 1;
        }

        if cycle >= self.cycle_limit && self.cores.iter().any(|c| c.is_active(self.program.len())) {
            self.diagnostics.push(Diagnostic::Livelock { cycle_limit: self.cycle_limit });
        }

        for core in &mut self.cores {
            self.diagnostics.append(&mut core.diagnostics);
        }
        for diag in &self.diagnostics {
            diag.log();
        }

        let report = SystemReport::build(&self.cores, &self.memory);
        (report, self.diagnostics)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::LatencyTable;
    use std::io::Write;

    fn write_program(text: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("coresim-sim-test-{:p}.txt", text));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    fn runtime(forwarding: bool) -> RuntimeConfig {
        RuntimeConfig { num_cores: 1, forwarding, latencies: LatencyTable::default(), cycle_limit: 10_000 }
    }

    #[test]
    fn back_to_back_dependence_with_forwarding_has_no_stalls() {
        let path = write_program("ADDI x1 x0 5\nADD x2 x1 x1\n");
        let sim = Simulator::new(&path, &CacheConfig::default(), &runtime(true)).unwrap();
        let (report, diags) = sim.run();
        let _ = std::fs::remove_file(&path).ok();
        assert!(diags.is_empty());
        let core = &report.cores[0];
        assert_eq!(core.registers[1], 5);
        assert_eq!(core.registers[2], 10);
        assert_eq!(core.cycles, 6);
        assert_eq!(core.stalls, 0);
    }

    #[test]
    fn back_to_back_dependence_without_forwarding_stalls() {
        let path = write_program("ADDI x1 x0 5\nADD x2 x1 x1\n");
        let sim = Simulator::new(&path, &CacheConfig::default(), &runtime(false)).unwrap();
        let (report, _diags) = sim.run();
        let _ = std::fs::remove_file(&path).ok();
        let core = &report.cores[0];
        assert_eq!(core.registers[2], 10);
        assert_eq!(core.stalls, 2);
    }

    #[test]
    fn branch_taken_skips_the_fallthrough_instruction() {
        let path = write_program("ADDI x1 x0 3\nADDI x2 x0 5\nBNE x1 x2 END\nADDI x3 x0 99\nEND:\nADDI x4 x0 7\n");
        let sim = Simulator::new(&path, &CacheConfig::default(), &runtime(true)).unwrap();
        let (report, _diags) = sim.run();
        let _ = std::fs::remove_file(&path).ok();
        let core = &report.cores[0];
        assert_eq!(core.registers[3], 0);
        assert_eq!(core.registers[4], 7);
    }

    #[test]
    fn forwarding_never_increases_total_cycles() {
        let path = write_program("ADDI x1 x0 5\nADD x2 x1 x1\nSUB x3 x2 x1\nMUL x4 x3 x2\n");
        let sim_on = Simulator::new(&path, &CacheConfig::default(), &runtime(true)).unwrap();
        let (on, _) = sim_on.run();
        let sim_off = Simulator::new(&path, &CacheConfig::default(), &runtime(false)).unwrap();
        let (off, _) = sim_off.run();
        let _ = std::fs::remove_file(&path).ok();
        assert!(on.total_cycles <= off.total_cycles);
    }

    #[test]
    fn arr_bulk_init_lays_out_dram_across_cores() {
        let path = write_program("ARR 100\n");
        let mut rt = runtime(true);
        rt.num_cores = 4;
        let sim = Simulator::new(&path, &CacheConfig::default(), &rt).unwrap();
        let (report, _) = sim.run();
        let _ = std::fs::remove_file(&path).ok();
        for core in &report.cores {
            for i in 0..9 {
                assert_eq!(core.dram_head[i], (25 * core.cid + i + 1) as i32);
            }
        }
    }

    #[test]
    fn two_cores_rendezvous_at_sync() {
        let path = write_program("ADDI x1 x0 1\nSYNC\nADDI x2 x0 2\n");
        let mut rt = runtime(true);
        rt.num_cores = 2;
        let sim = Simulator::new(&path, &CacheConfig::default(), &rt).unwrap();
        let (report, _) = sim.run();
        let _ = std::fs::remove_file(&path).ok();
        for core in &report.cores {
            assert_eq!(core.registers[2], 2);
        }
    }
}
