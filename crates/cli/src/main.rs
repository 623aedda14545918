//! Command-line driver for the cache simulator.
//!
//! Parses CLI flags with `clap`'s derive macros, validates and loads a CSV
//! trace, runs the simulator, and reports either a one-line summary or a
//! multi-section extended report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use cachesim_core::address::MappingType;
use cachesim_core::config::{defaults, CacheConfig, MemoryConfig, SimConfig, WriteBufferConfig};
use cachesim_core::error::{ResourceError, SimError};
use cachesim_core::policy::CacheReplacementPolicy;
use cachesim_core::simulator::{ResultRecord, Simulator};
use cachesim_core::trace;

/// Cycle-accurate simulator for a single-level CPU data cache.
#[derive(Debug, Parser)]
#[command(name = "cachesim", version, about)]
struct Cli {
    /// Path to the trace file. Accepted as either the first or last positional argument.
    trace: PathBuf,

    /// Cycle cap; N >= 1, <= 2^31-1 unless `--lcycles`.
    #[arg(short = 'c', long, default_value_t = defaults::CYCLES)]
    cycles: u64,

    /// Extends the cycle cap to 2^32-1.
    #[arg(long)]
    lcycles: bool,

    /// Select direct mapping.
    #[arg(long)]
    directmapped: bool,

    /// Select fully associative mapping (default).
    #[arg(long)]
    fullassociative: bool,

    /// Cacheline size in bytes; must be a positive multiple of 16.
    #[arg(long, default_value_t = defaults::CACHELINE_SIZE)]
    cacheline_size: u32,

    /// Number of cachelines; 0 disables the cache.
    #[arg(long, default_value_t = defaults::NUM_CACHELINES)]
    cachelines: u32,

    /// Cache latency in cycles.
    #[arg(long, default_value_t = defaults::CACHE_LATENCY)]
    cache_latency: u32,

    /// Memory latency in cycles.
    #[arg(long, default_value_t = defaults::MEMORY_LATENCY)]
    memory_latency: u32,

    /// Use LRU replacement (default).
    #[arg(long)]
    lru: bool,

    /// Use FIFO replacement.
    #[arg(long)]
    fifo: bool,

    /// Use random replacement.
    #[arg(long)]
    random: bool,

    /// Bypass the cache when set to `n`.
    #[arg(long = "use-cache", default_value = "Y")]
    use_cache: String,

    /// Emit a per-cycle activity log to this path.
    #[arg(long = "tf")]
    waveform_trace: Option<PathBuf>,

    /// Use the extended, multi-section report instead of a one-line summary.
    #[arg(long)]
    extended: bool,
}

impl Cli {
    fn mapping(&self) -> MappingType {
        if self.directmapped && self.fullassociative {
            warn!("both --directmapped and --fullassociative given; keeping the default");
            return MappingType::default();
        }
        if self.directmapped {
            MappingType::Direct
        } else {
            MappingType::FullyAssociative
        }
    }

    fn policy(&self) -> CacheReplacementPolicy {
        let chosen = [self.lru, self.fifo, self.random].iter().filter(|b| **b).count();
        if chosen > 1 {
            warn!("more than one replacement policy flag given; keeping the default");
            return CacheReplacementPolicy::default();
        }
        if self.fifo {
            CacheReplacementPolicy::Fifo
        } else if self.random {
            CacheReplacementPolicy::Random
        } else {
            CacheReplacementPolicy::Lru
        }
    }

    fn use_cache(&self) -> bool {
        !matches!(self.use_cache.as_str(), "n" | "N" | "no" | "false")
    }

    fn into_config(self) -> Result<SimConfig, SimError> {
        let mapping = self.mapping();
        let policy = self.policy();
        let mut use_cache = self.use_cache();

        if mapping == MappingType::Direct && (self.lru || self.fifo || self.random) {
            warn!("replacement policy flag given for a direct-mapped cache; it will be ignored");
        }

        if self.cachelines == 0 && use_cache {
            warn!("--cachelines must be at least 1; disabling the cache (use-cache=n)");
            use_cache = false;
        }

        let cycles = SimConfig::validate_cycle_cap(self.cycles, self.lcycles)?;
        let cache = CacheConfig::new(
            self.cachelines,
            self.cacheline_size,
            self.cache_latency,
            mapping,
            policy,
            use_cache,
        )?;
        let memory = MemoryConfig::new(self.memory_latency)?;

        Ok(SimConfig {
            cycles,
            cache,
            write_buffer: WriteBufferConfig::default(),
            memory,
            waveform_trace: self.waveform_trace,
            extended: self.extended,
        })
    }
}

/// Validates the trace path and loads its contents (section 2.2 heuristic):
/// must end in `.csv`, be a regular file, and be non-empty.
fn load_trace(path: &Path) -> Result<String, SimError> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return Err(ResourceError::WrongExtension(path.to_path_buf()).into());
    }
    let metadata = fs::metadata(path).map_err(|e| ResourceError::NotFound(path.to_path_buf(), e))?;
    if !metadata.is_file() {
        return Err(ResourceError::NotRegularFile(path.to_path_buf()).into());
    }
    if metadata.len() == 0 {
        return Err(ResourceError::Empty(path.to_path_buf()).into());
    }
    fs::read_to_string(path).map_err(|e| ResourceError::NotFound(path.to_path_buf(), e).into())
}

fn print_summary(result: ResultRecord) {
    println!(
        "cycles={} hits={} misses={} gates={}",
        result.cycles, result.hits, result.misses, result.primitive_gate_count
    );
}

fn print_extended(result: ResultRecord) {
    println!("==========================================================");
    println!("CACHE SIMULATION RESULT");
    println!("==========================================================");
    println!(
        "cycles                 {}",
        if result.cycles == u64::MAX {
            "did not complete (cycle cap reached)".to_string()
        } else {
            result.cycles.to_string()
        }
    );
    println!("----------------------------------------------------------");
    println!("HIT/MISS");
    let total = result.hits + result.misses;
    let hit_rate = if total > 0 {
        100.0 * (result.hits as f64 / total as f64)
    } else {
        0.0
    };
    println!("  accesses              {total}");
    println!("  hits                  {}", result.hits);
    println!("  misses                {}", result.misses);
    println!("  hit_rate              {hit_rate:.2}%");
    println!("----------------------------------------------------------");
    println!("HARDWARE COST");
    println!("  primitive_gate_count  {}", result.primitive_gate_count);
    println!("==========================================================");
}

fn run() -> Result<ResultRecord, SimError> {
    let cli = Cli::parse();
    let trace_path = cli.trace.clone();
    let extended = cli.extended;
    let config = cli.into_config()?;

    let contents = load_trace(&trace_path)?;
    let requests = trace::parse(&contents)?;

    let mut simulator = Simulator::new(config);
    let result = simulator.run(&requests)?;

    if extended {
        print_extended(result);
    } else {
        print_summary(result);
    }
    Ok(result)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_trace(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn rejects_wrong_extension() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"W,0,1\n").unwrap();
        let err = load_trace(file.path()).unwrap_err();
        assert!(matches!(err, SimError::Resource(ResourceError::WrongExtension(_))));
    }

    #[test]
    fn rejects_empty_file() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let err = load_trace(file.path()).unwrap_err();
        assert!(matches!(err, SimError::Resource(ResourceError::Empty(_))));
    }

    #[test]
    fn rejects_missing_file() {
        let err = load_trace(Path::new("/nonexistent/path/does-not-exist.csv")).unwrap_err();
        assert!(matches!(err, SimError::Resource(ResourceError::NotFound(_, _))));
    }

    #[test]
    fn loads_a_well_formed_trace() {
        let file = write_trace("W,0,1\nR,0\n");
        let contents = load_trace(file.path()).unwrap();
        let requests = trace::parse(&contents).unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn mapping_flag_conflict_keeps_default() {
        let cli = Cli {
            trace: PathBuf::from("t.csv"),
            cycles: defaults::CYCLES,
            lcycles: false,
            directmapped: true,
            fullassociative: true,
            cacheline_size: defaults::CACHELINE_SIZE,
            cachelines: defaults::NUM_CACHELINES,
            cache_latency: defaults::CACHE_LATENCY,
            memory_latency: defaults::MEMORY_LATENCY,
            lru: false,
            fifo: false,
            random: false,
            use_cache: "Y".to_string(),
            waveform_trace: None,
            extended: false,
        };
        assert_eq!(cli.mapping(), MappingType::default());
    }

    #[test]
    fn use_cache_n_disables_cache() {
        let cli = Cli {
            trace: PathBuf::from("t.csv"),
            cycles: defaults::CYCLES,
            lcycles: false,
            directmapped: false,
            fullassociative: false,
            cacheline_size: defaults::CACHELINE_SIZE,
            cachelines: defaults::NUM_CACHELINES,
            cache_latency: defaults::CACHE_LATENCY,
            memory_latency: defaults::MEMORY_LATENCY,
            lru: false,
            fifo: false,
            random: false,
            use_cache: "n".to_string(),
            waveform_trace: None,
            extended: false,
        };
        assert!(!cli.use_cache());
    }

    #[test]
    fn zero_cachelines_disables_cache_instead_of_erroring() {
        let cli = Cli {
            trace: PathBuf::from("t.csv"),
            cycles: defaults::CYCLES,
            lcycles: false,
            directmapped: false,
            fullassociative: false,
            cacheline_size: defaults::CACHELINE_SIZE,
            cachelines: 0,
            cache_latency: defaults::CACHE_LATENCY,
            memory_latency: defaults::MEMORY_LATENCY,
            lru: false,
            fifo: false,
            random: false,
            use_cache: "Y".to_string(),
            waveform_trace: None,
            extended: false,
        };
        let config = cli.into_config().unwrap();
        assert!(!config.cache.use_cache);
    }
}
