//! Layered, validated configuration for a simulation run.
//!
//! Mirrors the teacher's `defaults` module + per-struct fallible-constructor
//! pattern: each sub-config validates its own invariants at construction and
//! returns a [`ConfigError`] rather than panicking, so the CLI can surface a
//! human-readable message instead of a stack trace.

use crate::address::MappingType;
use crate::error::ConfigError;
use crate::policy::CacheReplacementPolicy;

/// Default configuration constants, named after the CLI flags they back.
pub mod defaults {
    /// Default cycle cap (`-c`/`--cycles`).
    pub const CYCLES: u64 = 100_000;
    /// Largest cycle cap accepted without `--lcycles`.
    pub const CYCLE_CAP_NORMAL_MAX: u64 = i32::MAX as u64;
    /// Largest cycle cap accepted with `--lcycles`.
    pub const CYCLE_CAP_EXTENDED_MAX: u64 = u32::MAX as u64;
    /// Default cacheline size in bytes.
    pub const CACHELINE_SIZE: u32 = 64;
    /// Default number of cachelines.
    pub const NUM_CACHELINES: u32 = 256;
    /// Default cache latency in cycles.
    pub const CACHE_LATENCY: u32 = 2;
    /// Default memory latency in cycles.
    pub const MEMORY_LATENCY: u32 = 100;
    /// Bus width of a memory-read beat, in bytes; also the minimum cacheline size.
    pub const RAM_READ_BUS_BYTES: u32 = 16;
    /// Write buffer depth, chosen by fair dice roll.
    pub const WRITE_BUFFER_CAPACITY: usize = 4;
}

/// Cache geometry and timing, independent of replacement policy.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Number of cachelines. `0` means the cache is disabled (bypass mode).
    pub num_cachelines: u32,
    /// Bytes per cacheline; must be a positive multiple of 16.
    pub cacheline_size: u32,
    /// Cycles the cache takes to resolve hit/miss before any RAM traffic.
    pub cache_latency: u32,
    /// Direct-mapped or fully-associative.
    pub mapping: MappingType,
    /// Replacement policy; only consulted for fully-associative caches.
    pub policy: CacheReplacementPolicy,
    /// Whether the cache path is used at all (`--use-cache=n` bypasses it).
    pub use_cache: bool,
}

impl CacheConfig {
    /// Validates and constructs a cache configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCachelineSize`] if `cacheline_size` is
    /// zero or not a multiple of [`defaults::RAM_READ_BUS_BYTES`], or
    /// [`ConfigError::NotPositive`] if `cache_latency` is zero while the
    /// cache is in use.
    pub fn new(
        num_cachelines: u32,
        cacheline_size: u32,
        cache_latency: u32,
        mapping: MappingType,
        policy: CacheReplacementPolicy,
        use_cache: bool,
    ) -> Result<Self, ConfigError> {
        if cacheline_size == 0 || cacheline_size % defaults::RAM_READ_BUS_BYTES != 0 {
            return Err(ConfigError::InvalidCachelineSize(cacheline_size));
        }
        if use_cache && num_cachelines == 0 {
            return Err(ConfigError::NotPositive {
                field: "cachelines",
                min: 1,
                value: 0,
            });
        }
        if use_cache && cache_latency == 0 {
            return Err(ConfigError::NotPositive {
                field: "cache-latency",
                min: 1,
                value: 0,
            });
        }
        Ok(Self {
            num_cachelines,
            cacheline_size,
            cache_latency,
            mapping,
            policy,
            use_cache,
        })
    }

    /// Whether this configuration actually consults a replacement policy.
    ///
    /// Only fully-associative caches do; a direct-mapped cache has exactly
    /// one candidate slot per index and never needs to choose a victim.
    pub fn uses_policy(&self) -> bool {
        self.use_cache && self.mapping == MappingType::FullyAssociative
    }
}

/// Write buffer sizing and read-ordering strictness.
#[derive(Debug, Clone, Copy)]
pub struct WriteBufferConfig {
    /// Maximum number of pending writes the buffer holds at once.
    pub capacity: usize,
    /// When `true`, a read never bypasses a non-empty buffer, even absent an
    /// address conflict — strict sequential consistency at main memory, at
    /// the cost of read latency. Corresponds to the source's compile-time
    /// `STRICT_RAM_READ_AFTER_WRITES` flag, modeled here as a runtime field.
    pub strict_ram_read_after_writes: bool,
}

impl Default for WriteBufferConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::WRITE_BUFFER_CAPACITY,
            strict_ram_read_after_writes: false,
        }
    }
}

/// Backing memory timing.
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    /// Fixed per-request latency in cycles.
    pub latency: u32,
}

impl MemoryConfig {
    /// Validates and constructs a memory configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] if `latency` is zero.
    pub fn new(latency: u32) -> Result<Self, ConfigError> {
        if latency == 0 {
            return Err(ConfigError::NotPositive {
                field: "memory-latency",
                min: 1,
                value: 0,
            });
        }
        Ok(Self { latency })
    }
}

/// Top-level, fully-validated configuration for one simulation run.
///
/// Built from parsed CLI arguments by the `cachesim-cli` crate; this crate
/// never parses CLI flags itself, only validates the resulting values.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Cycle cap; the driver halts and reports `cycles = u64::MAX` if exceeded.
    pub cycles: u64,
    /// Cache geometry and timing.
    pub cache: CacheConfig,
    /// Write buffer sizing and strictness.
    pub write_buffer: WriteBufferConfig,
    /// Backing memory timing.
    pub memory: MemoryConfig,
    /// Path to an optional waveform/activity trace sink.
    pub waveform_trace: Option<std::path::PathBuf>,
    /// Whether to print the multi-section extended report instead of a summary line.
    pub extended: bool,
}

impl SimConfig {
    /// Validates cross-field invariants that don't belong to a single sub-config.
    ///
    /// Memory latency lower than cache latency is unusual but not invalid —
    /// callers should log a warning (see `cachesim-cli`) rather than reject it.
    pub fn memory_latency_below_cache_latency(&self) -> bool {
        self.cache.use_cache && self.memory.latency < self.cache.cache_latency
    }

    /// Validates the cycle cap against the `--lcycles` ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CycleCapRequiresLCycles`] if `cycles` exceeds
    /// [`defaults::CYCLE_CAP_NORMAL_MAX`] without `lcycles`, or
    /// [`ConfigError::CycleCapTooLarge`] if it exceeds
    /// [`defaults::CYCLE_CAP_EXTENDED_MAX`] even with it.
    pub fn validate_cycle_cap(cycles: u64, lcycles: bool) -> Result<u64, ConfigError> {
        if cycles > defaults::CYCLE_CAP_EXTENDED_MAX {
            return Err(ConfigError::CycleCapTooLarge(cycles));
        }
        if !lcycles && cycles > defaults::CYCLE_CAP_NORMAL_MAX {
            return Err(ConfigError::CycleCapRequiresLCycles(cycles));
        }
        Ok(cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_multiple_of_16_cacheline_size() {
        let err = CacheConfig::new(
            256,
            17,
            2,
            MappingType::FullyAssociative,
            CacheReplacementPolicy::Lru,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCachelineSize(17)));
    }

    #[test]
    fn rejects_zero_cachelines_when_cache_in_use() {
        let err = CacheConfig::new(
            0,
            64,
            2,
            MappingType::Direct,
            CacheReplacementPolicy::Lru,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "cachelines", .. }));
    }

    #[test]
    fn allows_zero_cachelines_when_bypassing_cache() {
        let cfg = CacheConfig::new(
            0,
            64,
            2,
            MappingType::Direct,
            CacheReplacementPolicy::Lru,
            false,
        )
        .unwrap();
        assert_eq!(cfg.num_cachelines, 0);
    }

    #[test]
    fn cycle_cap_requires_lcycles_past_i32_max() {
        let err = SimConfig::validate_cycle_cap(defaults::CYCLE_CAP_NORMAL_MAX + 1, false).unwrap_err();
        assert!(matches!(err, ConfigError::CycleCapRequiresLCycles(_)));
        assert!(SimConfig::validate_cycle_cap(defaults::CYCLE_CAP_NORMAL_MAX + 1, true).is_ok());
    }

    #[test]
    fn cycle_cap_rejects_past_u32_max_even_with_lcycles() {
        let err = SimConfig::validate_cycle_cap(defaults::CYCLE_CAP_EXTENDED_MAX + 1, true).unwrap_err();
        assert!(matches!(err, ConfigError::CycleCapTooLarge(_)));
    }
}
