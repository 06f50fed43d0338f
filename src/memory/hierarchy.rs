//! Three-level memory hierarchy, one private instance per core (spec §4.1,
//! §9 "no cache coherence" — independent hierarchies, not shared state).

use crate::config::CacheConfig;
use crate::memory::cache::Cache;

/// DRAM size per core, in words (spec §3 "Main memory").
pub const DRAM_WORDS: usize = 1024;

struct CoreMemory {
    l1i: Cache,
    l1d: Cache,
    l2: Cache,
    dram: Vec<i32>,
    spm: Vec<i32>,
}

/// Owns every core's private cache/DRAM/SPM state and serves fetch/load/
/// store/SPM requests, charging additive stall cycles down the hierarchy.
pub struct MemoryHierarchy {
    cores: Vec<CoreMemory>,
    l1_latency: u64,
    l2_latency: u64,
    memory_latency: u64,
}

impl MemoryHierarchy {
    pub fn new(config: &CacheConfig, num_cores: usize) -> Self {
        let cores = (0..num_cores)
            .map(|_| CoreMemory {
                l1i: Cache::new(config.l1i_size, config.block_size, config.l1i_associativity, config.replacement_policy),
                l1d: Cache::new(config.l1d_size, config.block_size, config.l1d_associativity, config.replacement_policy),
                l2: Cache::new(config.l2_size, config.block_size, config.l2_associativity, config.replacement_policy),
                dram: vec![0; DRAM_WORDS],
                spm: vec![0; (config.spm_size / 4).max(1)],
            })
            .collect();

        Self {
            cores,
            l1_latency: config.l1_latency,
            l2_latency: config.l2_latency,
            memory_latency: config.memory_latency,
        }
    }

    fn dram_block(&self, core: usize, addr: u64, block_size: usize) -> Vec<i32> {
        let words_per_block = block_size / 4;
        let base_word = (addr as usize / 4 / words_per_block) * words_per_block;
        let mem = &self.cores[core].dram;
        (0..words_per_block).map(|i| mem.get(base_word + i).copied().unwrap_or(0)).collect()
    }

    /// Fetches the instruction word at byte address `addr` through L1I/L2,
    /// returning the stall cycles charged (spec §4.1 additive composition).
    /// The instruction content itself lives in the program table, not here;
    /// this models fetch timing only.
    pub fn fetch_instruction(&mut self, core: usize, addr: u64, cycle: u64) -> u64 {
        if self.cores[core].l1i.read(addr, cycle).is_some() {
            return self.l1_latency;
        }
        let block_size = self.cores[core].l1i.block_size();
        if let Some(block) = self.cores[core].l2.read_block(addr, cycle) {
            self.cores[core].l1i.allocate(addr, &block, cycle);
            return self.l1_latency + self.l2_latency;
        }
        let block = self.dram_block(core, addr, block_size);
        self.cores[core].l2.allocate(addr, &block, cycle);
        self.cores[core].l1i.allocate(addr, &block, cycle);
        self.l1_latency + self.l2_latency + self.memory_latency
    }

    /// Loads a data word through L1D/L2/DRAM. Returns `(value, stall_cycles)`.
    pub fn load_data(&mut self, core: usize, addr: u64, cycle: u64) -> (i32, u64) {
        if let Some(v) = self.cores[core].l1d.read(addr, cycle) {
            return (v, self.l1_latency);
        }
        let block_size = self.cores[core].l1d.block_size();
        if let Some(block) = self.cores[core].l2.read_block(addr, cycle) {
            self.cores[core].l1d.allocate(addr, &block, cycle);
            let v = self.cores[core].l1d.read(addr, cycle).unwrap_or(0);
            return (v, self.l1_latency + self.l2_latency);
        }
        let block = self.dram_block(core, addr, block_size);
        self.cores[core].l2.allocate(addr, &block, cycle);
        self.cores[core].l1d.allocate(addr, &block, cycle);
        let v = self.cores[core].l1d.read(addr, cycle).unwrap_or(0);
        (v, self.l1_latency + self.l2_latency + self.memory_latency)
    }

    /// Stores a data word, write-allocating on miss at every level it
    /// misses (spec §4.1): the block is fetched/filled, then the word is
    /// spliced into it, so both L1D and L2 hold the updated value on the
    /// next read (spec §4.1 "Write-allocate"). Returns the stall cycles.
    pub fn store_data(&mut self, core: usize, addr: u64, word: i32, cycle: u64) -> u64 {
        if self.cores[core].l1d.write(addr, word, cycle) {
            self.write_through_dram(core, addr, word);
            return self.l1_latency;
        }

        let block_size = self.cores[core].l1d.block_size();
        let stall = if let Some(block) = self.cores[core].l2.read_block(addr, cycle) {
            self.cores[core].l1d.allocate(addr, &block, cycle);
            let _ = self.cores[core].l1d.write(addr, word, cycle);
            let _ = self.cores[core].l2.write(addr, word, cycle);
            self.l1_latency + self.l2_latency
        } else {
            let mut block = self.dram_block(core, addr, block_size);
            let offset = (addr as usize % block_size) / 4;
            if let Some(slot) = block.get_mut(offset) {
                *slot = word;
            }
            self.cores[core].l2.allocate(addr, &block, cycle);
            self.cores[core].l1d.allocate(addr, &block, cycle);
            self.l1_latency + self.l2_latency + self.memory_latency
        };
        self.write_through_dram(core, addr, word);
        stall
    }

    fn write_through_dram(&mut self, core: usize, addr: u64, word: i32) {
        let word_idx = addr as usize / 4;
        if let Some(slot) = self.cores[core].dram.get_mut(word_idx) {
            *slot = word;
        }
    }

    /// Reads the scratchpad at word index `idx`, charging L1 latency
    /// (spec §4.1: SPM bypasses the cache hierarchy but is timed like L1).
    pub fn read_spm(&self, core: usize, idx: usize) -> (i32, u64) {
        let v = self.cores[core].spm.get(idx).copied().unwrap_or(0);
        (v, self.l1_latency)
    }

    /// Writes the scratchpad at word index `idx`.
    pub fn write_spm(&mut self, core: usize, idx: usize, word: i32) -> u64 {
        if let Some(slot) = self.cores[core].spm.get_mut(idx) {
            *slot = word;
        }
        self.l1_latency
    }

    /// `ARR imm`'s data-layout fan-out (spec §4.4 EX, §8 S6): for
    /// `i` in `0..imm`, `dram[i / 25][i % 25] := i + 1`, distributed
    /// round-robin across whichever cores exist. `ARR` is the one
    /// instruction whose side effect crosses core boundaries, which is why
    /// it goes through the hierarchy (the only state actually shared
    /// across cores) rather than through a core's own register/memory API.
    pub fn bulk_init_arr(&mut self, imm: i64) {
        let num_cores = self.cores.len();
        for i in 0..imm {
            let core_idx = (i / 25) as usize % num_cores.max(1);
            let word = (i % 25) as usize;
            if let Some(slot) = self.cores[core_idx].dram.get_mut(word) {
                *slot = (i + 1) as i32;
            }
        }
    }

    pub fn l1i_miss_rate(&self, core: usize) -> f64 {
        self.cores[core].l1i.miss_rate()
    }
    pub fn l1d_miss_rate(&self, core: usize) -> f64 {
        self.cores[core].l1d.miss_rate()
    }
    pub fn l2_miss_rate(&self, core: usize) -> f64 {
        self.cores[core].l2.miss_rate()
    }
    pub fn l1i_accesses(&self, core: usize) -> u64 {
        self.cores[core].l1i.hits + self.cores[core].l1i.misses
    }
    pub fn l1d_accesses(&self, core: usize) -> u64 {
        self.cores[core].l1d.hits + self.cores[core].l1d.misses
    }

    /// The first 9 DRAM words of `core` (spec §6 "DRAM head (9 words)").
    pub fn dram_head(&self, core: usize) -> [i32; 9] {
        let mut head = [0i32; 9];
        let dram = &self.cores[core].dram;
        for (slot, word) in head.iter_mut().zip(dram.iter()) {
            *slot = *word;
        }
        head
    }

    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }
}
