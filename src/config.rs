//! Cache configuration loading.
//!
//! Mirrors the original tool's `CacheConfig`: a flat `KEY VALUE` text file
//! with sane defaults for any key left unspecified. Unknown keys are
//! ignored; a recognized key with an unparsable value falls back to its
//! default and logs a warning rather than aborting the run (spec §7's
//! "skip and record" philosophy applied to configuration, not just
//! instructions).

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::SimError;

/// Cache block victim-selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Evict the way with the oldest `last_used_cycle`.
    #[default]
    Lru,
    /// Evict a uniformly random way.
    Random,
}

impl FromStr for ReplacementPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(ReplacementPolicy::Lru),
            "RANDOM" => Ok(ReplacementPolicy::Random),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Lru => write!(f, "LRU"),
            ReplacementPolicy::Random => write!(f, "RANDOM"),
        }
    }
}

/// Cache-hierarchy geometry and latencies, loaded from a config file or defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// L1 instruction cache size, bytes.
    pub l1i_size: usize,
    /// L1 data cache size, bytes.
    pub l1d_size: usize,
    /// Unified L2 cache size, bytes.
    pub l2_size: usize,
    /// Cache block size, bytes, shared by all three caches.
    pub block_size: usize,
    /// L1I associativity (ways per set).
    pub l1i_associativity: usize,
    /// L1D associativity.
    pub l1d_associativity: usize,
    /// L2 associativity.
    pub l2_associativity: usize,
    /// L1 hit latency, cycles.
    pub l1_latency: u64,
    /// L2 hit latency, cycles (additive on top of L1 latency).
    pub l2_latency: u64,
    /// DRAM latency, cycles (additive on top of L1 + L2 latency).
    pub memory_latency: u64,
    /// Per-core scratchpad size, bytes.
    pub spm_size: usize,
    /// Victim-selection policy shared by all three caches.
    pub replacement_policy: ReplacementPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1i_size: 4096,
            l1d_size: 4096,
            l2_size: 16384,
            block_size: 64,
            l1i_associativity: 2,
            l1d_associativity: 2,
            l2_associativity: 4,
            l1_latency: 1,
            l2_latency: 10,
            memory_latency: 100,
            spm_size: 400,
            replacement_policy: ReplacementPolicy::Lru,
        }
    }
}

impl CacheConfig {
    /// Loads a `KEY VALUE` configuration file, defaulting anything absent
    /// or malformed. Fails only if the file cannot be opened.
    pub fn load_from_file(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let Some(key) = parts.next() else { continue };
            let Some(value) = parts.next() else { continue };
            config.apply(key, value);
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) {
        macro_rules! set_usize {
            ($field:ident) => {
                match value.parse::<usize>() {
                    Ok(v) => self.$field = v,
                    Err(_) => tracing::warn!(key, value, "unparsable config value, keeping default"),
                }
            };
        }
        macro_rules! set_u64 {
            ($field:ident) => {
                match value.parse::<u64>() {
                    Ok(v) => self.$field = v,
                    Err(_) => tracing::warn!(key, value, "unparsable config value, keeping default"),
                }
            };
        }

        match key {
            "L1I_SIZE" => set_usize!(l1i_size),
            "L1D_SIZE" => set_usize!(l1d_size),
            "L2_SIZE" => set_usize!(l2_size),
            "BLOCK_SIZE" => set_usize!(block_size),
            "L1I_ASSOCIATIVITY" => set_usize!(l1i_associativity),
            "L1D_ASSOCIATIVITY" => set_usize!(l1d_associativity),
            "L2_ASSOCIATIVITY" => set_usize!(l2_associativity),
            "L1_LATENCY" => set_u64!(l1_latency),
            "L2_LATENCY" => set_u64!(l2_latency),
            "MEMORY_LATENCY" => set_u64!(memory_latency),
            "SPM_SIZE" => set_usize!(spm_size),
            "REPLACEMENT_POLICY" => match value.parse::<ReplacementPolicy>() {
                Ok(p) => self.replacement_policy = p,
                Err(()) => tracing::warn!(key, value, "unknown replacement policy, keeping default"),
            },
            _ => {} // unknown keys are ignored per spec
        }
    }
}

/// Per-op functional-unit latencies, cycles. `DIV` is reserved: the table
/// carries an entry for it but no opcode currently executes as `DIV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyTable {
    /// ADD latency, cycles.
    pub add: u64,
    /// SUB latency, cycles.
    pub sub: u64,
    /// MUL latency, cycles.
    pub mul: u64,
    /// DIV latency, cycles (reserved, unused by any decoded opcode).
    pub div: u64,
}

impl Default for LatencyTable {
    fn default() -> Self {
        Self { add: 1, sub: 1, mul: 1, div: 1 }
    }
}

/// Top-level runtime parameters (spec §6 "Runtime parameters").
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Number of active cores, 1..=4.
    pub num_cores: u32,
    /// Whether EX/MEM forwarding is enabled.
    pub forwarding: bool,
    /// Per-op ALU latencies.
    pub latencies: LatencyTable,
    /// Safety bound against livelock from malformed programs.
    pub cycle_limit: u64,
}

impl RuntimeConfig {
    /// Validates `num_cores` is within the supported 1..=4 range.
    pub fn validate(&self) -> Result<(), SimError> {
        if (1..=4).contains(&self.num_cores) {
            Ok(())
        } else {
            Err(SimError::InvalidCoreCount(self.num_cores))
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_cores: 4,
            forwarding: true,
            latencies: LatencyTable::default(),
            cycle_limit: 10_000,
        }
    }
}
