//! Error taxonomy for the cache simulator.
//!
//! Errors fall into four families:
//! 1. **Config.** Invalid or contradictory CLI/config values.
//! 2. **TraceFormat.** Malformed trace records.
//! 3. **Resource.** Problems with the trace file itself.
//! 4. **SimulationFault.** Precondition violations inside the simulator; these
//!    indicate a bug and must never occur on valid configurations and traces.

use thiserror::Error;

/// Top-level error type returned by configuration, trace parsing, and simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or contradictory configuration value.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed trace record.
    #[error("trace format error: {0}")]
    TraceFormat(#[from] TraceFormatError),

    /// Problem with the trace file as a resource.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Precondition violation inside the simulator. Indicates a bug.
    #[error("simulation fault: {0}")]
    Simulation(#[from] SimulationFault),
}

/// Invalid or contradictory configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Cacheline size must be a positive multiple of 16.
    #[error("cacheline size {0} must be a positive multiple of 16")]
    InvalidCachelineSize(u32),

    /// A numeric argument that must be positive was zero or negative.
    #[error("{field} must be >= {min}, got {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum accepted value.
        min: u64,
        /// Value actually supplied.
        value: u64,
    },

    /// Cycle cap exceeds `i32::MAX` without `--lcycles`.
    #[error("cycle cap {0} exceeds {max} without --lcycles", max = i32::MAX)]
    CycleCapRequiresLCycles(u64),

    /// Cycle cap exceeds `u32::MAX` even with `--lcycles`.
    #[error("cycle cap {0} exceeds {max}", max = u32::MAX)]
    CycleCapTooLarge(u64),
}

/// Malformed trace record.
#[derive(Debug, Error)]
pub enum TraceFormatError {
    /// A record is missing required fields.
    #[error("line {line}: missing field(s)")]
    MissingField {
        /// 1-based line number in the trace file.
        line: usize,
    },

    /// The operation character is neither `W`/`w` nor `R`/`r`.
    #[error("line {line}: unknown operation character '{op}'")]
    UnknownOperation {
        /// 1-based line number in the trace file.
        line: usize,
        /// The offending character.
        op: char,
    },

    /// A read record (`R`/`r`) carried a data field, which is not permitted.
    #[error("line {line}: read record must not carry a data field")]
    UnexpectedData {
        /// 1-based line number in the trace file.
        line: usize,
    },

    /// An address or data field did not parse as an integer.
    #[error("line {line}: malformed integer field")]
    MalformedInteger {
        /// 1-based line number in the trace file.
        line: usize,
    },
}

/// Problem with the trace file as a filesystem resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The trace file does not exist or could not be opened.
    #[error("trace file {0:?} could not be opened: {1}")]
    NotFound(std::path::PathBuf, std::io::Error),

    /// The trace path does not end in `.csv`.
    #[error("trace file {0:?} must have a .csv extension")]
    WrongExtension(std::path::PathBuf),

    /// The trace path is not a regular file.
    #[error("trace file {0:?} is not a regular file")]
    NotRegularFile(std::path::PathBuf),

    /// The trace file is empty.
    #[error("trace file {0:?} is empty")]
    Empty(std::path::PathBuf),
}

/// Precondition violation inside the simulator. Indicates a bug, not bad input.
#[derive(Debug, Error)]
pub enum SimulationFault {
    /// A replacement policy was popped while empty.
    #[error("popped a replacement policy with no tracked entries")]
    PolicyPopFromEmpty,

    /// A byte offset fell outside the bounds of a cacheline.
    #[error("byte offset {offset} out of bounds for cacheline of size {size}")]
    OffsetOutOfBounds {
        /// Offset that was requested.
        offset: u32,
        /// Size of the cacheline in bytes.
        size: u32,
    },

    /// A ring buffer was pushed to while full.
    #[error("pushed to a full ring buffer of capacity {0}")]
    RingBufferFull(usize),

    /// A ring buffer was popped while empty.
    #[error("popped an empty ring buffer")]
    RingBufferEmpty,
}
