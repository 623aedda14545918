//! Driver/Harness: the top-level cycle loop tying cache, write buffer, and
//! memory together and producing a final [`ResultRecord`].
//!
//! Mirrors the source's CPU-model test harness: it presents requests to the
//! cache one at a time, accumulates the cycles each takes, and halts early if
//! a configured cycle cap is reached.

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::config::SimConfig;
use crate::memory::Memory;
use crate::request::Request;
use crate::write_buffer::WriteBuffer;

/// Final outcome of running a trace to completion (or to its cycle cap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    /// Total cycles elapsed. `u64::MAX` if the trace did not complete within the cap.
    pub cycles: u64,
    /// Total misses observed (always 0 when the cache is bypassed).
    pub misses: u64,
    /// Total hits observed (always 0 when the cache is bypassed).
    pub hits: u64,
    /// Estimated primitive gate count for the configured cache (0 when bypassed).
    pub primitive_gate_count: u64,
}

/// Owns the cache/write-buffer/memory stack for one simulation run.
#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    cache: Option<Cache>,
    write_buffer: WriteBuffer,
    memory: Memory,
}

impl Simulator {
    /// Builds a simulator from a validated configuration.
    ///
    /// Logs a warning (never an error) if memory latency is configured lower
    /// than cache latency — physically unusual, but not something the
    /// simulator refuses to model.
    pub fn new(config: SimConfig) -> Self {
        if config.memory_latency_below_cache_latency() {
            warn!(
                memory_latency = config.memory.latency,
                cache_latency = config.cache.cache_latency,
                "memory latency is lower than cache latency"
            );
        }
        let cache = config.cache.use_cache.then(|| Cache::new(config.cache));
        let write_buffer = WriteBuffer::new(
            config.write_buffer.capacity,
            config.write_buffer.strict_ram_read_after_writes,
        );
        let memory = Memory::new(config.memory.latency);
        Self {
            config,
            cache,
            write_buffer,
            memory,
        }
    }

    /// Services one request directly against memory, bypassing the cache
    /// entirely. Used when `use_cache` is `false`.
    fn handle_bypass(&mut self, request: Request) -> u64 {
        let cycles = 1 + u64::from(self.memory.latency());
        if request.we {
            self.memory.write_word(request.addr, request.data);
        } else {
            let _ = self.memory.read_word(request.addr);
        }
        cycles
    }

    /// Runs every request in `trace` to completion, or until the configured
    /// cycle cap is reached.
    ///
    /// # Errors
    ///
    /// Propagates any [`crate::error::SimulationFault`] surfaced by the cache
    /// — these indicate an internal precondition violation, never bad input.
    pub fn run(&mut self, trace: &[Request]) -> Result<ResultRecord, crate::error::SimulationFault> {
        let mut cycles: u64 = 0;
        let mut completed = 0usize;

        for request in trace {
            let request_cycles = match &mut self.cache {
                Some(cache) => {
                    let (request_cycles, _) = cache.handle_request(&mut self.memory, &mut self.write_buffer, *request)?;
                    request_cycles
                }
                None => self.handle_bypass(*request),
            };

            if cycles.saturating_add(request_cycles) > self.config.cycles {
                warn!(
                    requests_completed = completed,
                    total_requests = trace.len(),
                    "cycle cap reached before trace completed"
                );
                return Ok(ResultRecord {
                    cycles: u64::MAX,
                    misses: self.misses(),
                    hits: self.hits(),
                    primitive_gate_count: self.gate_count(),
                });
            }
            cycles += request_cycles;
            completed += 1;
        }

        info!(cycles, hits = self.hits(), misses = self.misses(), "trace completed");
        Ok(ResultRecord {
            cycles,
            misses: self.misses(),
            hits: self.hits(),
            primitive_gate_count: self.gate_count(),
        })
    }

    fn hits(&self) -> u64 {
        self.cache.as_ref().map_or(0, Cache::hits)
    }

    fn misses(&self) -> u64 {
        self.cache.as_ref().map_or(0, Cache::misses)
    }

    fn gate_count(&self) -> u64 {
        self.cache.as_ref().map_or(0, Cache::gate_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MappingType;
    use crate::config::{CacheConfig, MemoryConfig, WriteBufferConfig};
    use crate::policy::CacheReplacementPolicy;

    fn config(cycles: u64, use_cache: bool) -> SimConfig {
        SimConfig {
            cycles,
            cache: CacheConfig::new(16, 64, 2, MappingType::FullyAssociative, CacheReplacementPolicy::Lru, use_cache)
                .unwrap(),
            write_buffer: WriteBufferConfig::default(),
            memory: MemoryConfig::new(10).unwrap(),
            waveform_trace: None,
            extended: false,
        }
    }

    #[test]
    fn runs_a_short_trace_to_completion() {
        let mut sim = Simulator::new(config(1_000_000, true));
        let trace = vec![
            Request { addr: 0, data: 42, we: true },
            Request { addr: 0, data: 0, we: false },
        ];
        let result = sim.run(&trace).unwrap();
        assert_ne!(result.cycles, u64::MAX);
        assert_eq!(result.misses, 1);
        assert_eq!(result.hits, 1);
        assert!(result.primitive_gate_count > 0);
    }

    #[test]
    fn halts_at_cycle_cap() {
        let mut sim = Simulator::new(config(5, true));
        let trace = vec![Request { addr: 0, data: 1, we: true }; 100];
        let result = sim.run(&trace).unwrap();
        assert_eq!(result.cycles, u64::MAX);
    }

    #[test]
    fn bypass_mode_reports_zero_hits_misses_and_gates() {
        let mut sim = Simulator::new(config(1_000_000, false));
        let trace = vec![
            Request { addr: 0, data: 7, we: true },
            Request { addr: 0, data: 0, we: false },
        ];
        let result = sim.run(&trace).unwrap();
        assert_eq!(result.hits, 0);
        assert_eq!(result.misses, 0);
        assert_eq!(result.primitive_gate_count, 0);
    }
}
