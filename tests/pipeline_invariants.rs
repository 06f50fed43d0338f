//! End-to-end invariants and cache-miss-chain scenario (spec §8).

use std::io::Write;

use coresim::config::{CacheConfig, LatencyTable, ReplacementPolicy, RuntimeConfig};
use coresim::Simulator;

fn write_program(text: &str, tag: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("coresim-itest-{tag}.txt"));
    let mut f = std::fs::File::create(&path).expect("create temp program");
    f.write_all(text.as_bytes()).expect("write temp program");
    path
}

fn default_runtime() -> RuntimeConfig {
    RuntimeConfig { num_cores: 1, forwarding: true, latencies: LatencyTable::default(), cycle_limit: 10_000 }
}

#[test]
fn stage_timestamps_are_monotonically_increasing() {
    let path = write_program(
        "ADDI x1 x0 1\nADDI x2 x0 2\nADD x3 x1 x2\nSW x3 0\nLD x4 0\n",
        "monotonic",
    );
    let sim = Simulator::new(&path, &CacheConfig::default(), &default_runtime()).expect("sim");
    let (report, _diags) = sim.run();
    let _ = std::fs::remove_file(&path).ok();

    // Every reported core finished with sane, non-decreasing counters; the
    // per-instruction stage_complete_cycle check lives at the unit level
    // (Instruction is discarded after WB, so here we assert on the
    // observable proxy: cycles executed is never negative progress).
    for core in &report.cores {
        assert!(core.cycles > 0);
        assert!(core.executed_instructions > 0);
    }
}

#[test]
fn executed_instructions_equals_retired_count() {
    let path = write_program("ADDI x1 x0 3\nADDI x2 x0 5\nBNE x1 x2 END\nADDI x3 x0 99\nEND:\nADDI x4 x0 7\n", "retired");
    let sim = Simulator::new(&path, &CacheConfig::default(), &default_runtime()).expect("sim");
    let (report, _diags) = sim.run();
    let _ = std::fs::remove_file(&path).ok();

    // 4 instructions retire on the taken-branch path (ADDI, ADDI, BNE, ADDI@END).
    assert_eq!(report.cores[0].executed_instructions, 4);
}

#[test]
fn cache_miss_chain_charges_additive_stalls() {
    let path = write_program("LD x1 0\nLD x2 4\nLD x3 8\nLD x4 12\n", "miss-chain");
    let config = CacheConfig {
        l1i_size: 4096,
        l1d_size: 64,
        l2_size: 16384,
        block_size: 16,
        l1i_associativity: 2,
        l1d_associativity: 1,
        l2_associativity: 4,
        l1_latency: 1,
        l2_latency: 10,
        memory_latency: 100,
        spm_size: 400,
        replacement_policy: ReplacementPolicy::Lru,
    };
    let sim = Simulator::new(&path, &config, &default_runtime()).expect("sim");
    let (report, _diags) = sim.run();
    let _ = std::fs::remove_file(&path).ok();

    // Four LDs to word addresses 0,4,8,12 -> byte addresses 0,16,32,48,
    // each in its own 16-byte block (spec §8 S4): every access misses L1D
    // and L2, each charging 1 + 10 + 100 = 111 stall cycles.
    assert_eq!(report.cores[0].memory_stalls, 444);
}

#[test]
fn write_allocate_installs_the_block_in_l1d_and_l2() {
    // L1D is direct-mapped with 4 sets (64B / 16B blocks). Word addresses
    // 0 and 16 (byte addresses 0 and 64) land in the same set with
    // different tags, so the second SW evicts address 0's L1D line
    // before the re-read forces a fetch from L2.
    let path = write_program("ADDI x1 x0 42\nSW x1 0\nSW x0 16\nLD x2 0\n", "write-alloc");
    let config = CacheConfig {
        l1i_size: 4096,
        l1d_size: 64,
        l2_size: 16384,
        block_size: 16,
        l1i_associativity: 2,
        l1d_associativity: 1,
        l2_associativity: 4,
        l1_latency: 1,
        l2_latency: 10,
        memory_latency: 100,
        spm_size: 400,
        replacement_policy: ReplacementPolicy::Lru,
    };
    let sim = Simulator::new(&path, &config, &default_runtime()).expect("sim");
    let (report, _diags) = sim.run();
    let _ = std::fs::remove_file(&path).ok();

    // The re-read misses L1D (evicted) and must come back correct from L2,
    // which write-allocate is required to have patched with the same word
    // (spec §4.1 "Write-allocate").
    assert_eq!(report.cores[0].registers[2], 42);
}

#[test]
fn barrier_blocks_the_faster_core_until_the_slower_one_arrives() {
    let path = write_program(
        "ADDI x1 x0 1\nSYNC\nADDI x2 x0 2\n",
        "barrier-fast",
    );
    let mut runtime = default_runtime();
    runtime.num_cores = 2;
    let sim = Simulator::new(&path, &CacheConfig::default(), &runtime).expect("sim");
    let (report, _diags) = sim.run();
    let _ = std::fs::remove_file(&path).ok();

    for core in &report.cores {
        assert_eq!(core.registers[2], 2);
    }
}
