//! Cacheline replacement policies for fully-associative caches.
//!
//! Direct-mapped caches never consult a policy — each address has exactly
//! one slot, so there is nothing to choose between. The three variants here
//! are dispatched through a closed `enum` rather than a trait object: the
//! concrete policy is fixed at cache construction time from the configured
//! [`CacheReplacementPolicy`](crate::config::CacheReplacementPolicy), so
//! dynamic dispatch would only add an indirection with no corresponding
//! flexibility.

mod fifo;
mod lru;
mod random;

use crate::error::SimulationFault;
pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use random::RandomPolicy;

/// Which replacement policy a fully-associative cache uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheReplacementPolicy {
    /// Evict the least-recently-used line.
    #[default]
    Lru,
    /// Evict the oldest still-resident line.
    Fifo,
    /// Evict a uniformly random line.
    Random,
}

/// Victim-selection state for a fully-associative cache.
///
/// Each variant implements the shared contract `log_use`/`pop`/`gate_cost`;
/// callers invoke these through the enum rather than through a trait, since
/// the policy never changes type after construction.
#[derive(Debug, Clone)]
pub enum ReplacementPolicy {
    /// Least-recently-used eviction.
    Lru(LruPolicy),
    /// First-in-first-out eviction.
    Fifo(FifoPolicy),
    /// Uniform-random eviction.
    Random(RandomPolicy),
}

impl ReplacementPolicy {
    /// Constructs a fresh policy state for `size` cacheline slots.
    pub fn new(kind: CacheReplacementPolicy, size: usize) -> Self {
        match kind {
            CacheReplacementPolicy::Lru => Self::Lru(LruPolicy::new()),
            CacheReplacementPolicy::Fifo => Self::Fifo(FifoPolicy::new(size)),
            CacheReplacementPolicy::Random => Self::Random(RandomPolicy::new(size)),
        }
    }

    /// Records a use of cacheline `index` (hit or fill). A no-op for Random.
    pub fn log_use(&mut self, index: usize) {
        match self {
            Self::Lru(p) => p.log_use(index),
            Self::Fifo(p) => p.log_use(index),
            Self::Random(p) => p.log_use(index),
        }
    }

    /// Selects and removes a victim index.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationFault::PolicyPopFromEmpty`] for LRU/FIFO when no
    /// entries have been logged; Random never fails here since it carries no
    /// tracked state (its precondition — that the cache is full — is the
    /// caller's responsibility).
    pub fn pop(&mut self) -> Result<usize, SimulationFault> {
        match self {
            Self::Lru(p) => p.pop(),
            Self::Fifo(p) => p.pop(),
            Self::Random(p) => Ok(p.pop()),
        }
    }

    /// Approximate primitive gate cost of this policy's hardware, used in the
    /// cache's overall gate-count estimate.
    pub fn gate_cost(&self, size: u64) -> u64 {
        match self {
            Self::Lru(p) => p.gate_cost(size),
            Self::Fifo(p) => p.gate_cost(size),
            Self::Random(p) => p.gate_cost(size),
        }
    }
}
