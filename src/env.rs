//! Prover environment: resource limits, the error taxonomy, and the
//! per-run mutable context threaded through the core.
//!
//! There is no global state; every long-running operation receives the
//! environment (or at least its `Limits`) and polls the deadline at
//! explicit checkpoints.

use crate::fol::{Interner, Kbo};
use crate::statistics::Statistics;
use std::fmt;
use std::time::{Duration, Instant};

/// Error taxonomy of the prover core.
///
/// Only the two budget errors are caught inside the saturation loop; the
/// rest surface to the top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The wall-clock deadline passed
    TimeLimitExceeded,
    /// The in-process memory budget was exhausted
    MemoryLimitExceeded,
    /// Malformed input or unknown option
    UserError(String),
    /// Internal misuse of a component interface
    InvalidOperation(String),
}

impl fmt::Display for ProverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProverError::TimeLimitExceeded => write!(f, "time limit exceeded"),
            ProverError::MemoryLimitExceeded => write!(f, "memory limit exceeded"),
            ProverError::UserError(msg) => write!(f, "user error: {}", msg),
            ProverError::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for ProverError {}

pub type ProverResult<T> = Result<T, ProverError>;

/// Current process RSS in MB. None when unavailable (non-Linux).
pub fn process_memory_mb() -> Option<usize> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let rss_pages: usize = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(rss_pages * 4096 / (1024 * 1024))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Wall-clock and memory budgets shared by all core components.
#[derive(Debug, Clone)]
pub struct Limits {
    start: Instant,
    time_limit: Option<Duration>,
    memory_limit_mb: Option<usize>,
    baseline_rss_mb: usize,
}

impl Limits {
    pub fn new(time_limit: Option<Duration>, memory_limit_mb: Option<usize>) -> Self {
        Limits {
            start: Instant::now(),
            time_limit,
            memory_limit_mb,
            baseline_rss_mb: process_memory_mb().unwrap_or(0),
        }
    }

    /// Unlimited budgets (used by tests)
    pub fn none() -> Self {
        Limits::new(None, None)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_deciseconds(&self) -> u64 {
        self.start.elapsed().as_millis() as u64 / 100
    }

    /// Fail with `TimeLimitExceeded` when the deadline has passed.
    pub fn check_time(&self) -> ProverResult<()> {
        if let Some(limit) = self.time_limit {
            if self.start.elapsed() > limit {
                return Err(ProverError::TimeLimitExceeded);
            }
        }
        Ok(())
    }

    /// Fail with `MemoryLimitExceeded` when the RSS budget is exhausted.
    pub fn check_memory(&self) -> ProverResult<()> {
        if let Some(limit) = self.memory_limit_mb {
            if let Some(rss) = process_memory_mb() {
                if rss.saturating_sub(self.baseline_rss_mb) >= limit {
                    return Err(ProverError::MemoryLimitExceeded);
                }
            }
        }
        Ok(())
    }

    /// Raise the memory budget by a small amount so that result reporting
    /// can still allocate after a memory-limit stop.
    pub fn raise_memory_limit(&mut self, extra_mb: usize) {
        if let Some(limit) = self.memory_limit_mb.as_mut() {
            *limit += extra_mb;
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::none()
    }
}

/// Mutable per-run context passed explicitly to all core operations.
pub struct Env {
    pub interner: Interner,
    pub kbo: Kbo,
    pub limits: Limits,
    pub statistics: Statistics,
    rng_state: u64,
    rename_counter: usize,
}

impl Env {
    pub fn new(interner: Interner, limits: Limits, random_seed: u64) -> Self {
        Env {
            interner,
            kbo: Kbo::default(),
            limits,
            statistics: Statistics::default(),
            rng_state: random_seed.max(1),
            rename_counter: 0,
        }
    }

    /// A tag never handed out before, for renaming clause variables apart.
    pub fn fresh_rename_tag(&mut self) -> usize {
        self.rename_counter += 1;
        self.rename_counter
    }

    /// Next pseudo-random value in [0, 1). Linear congruential, seeded from
    /// the CLI so runs are reproducible.
    pub fn next_random(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng_state >> 33) as f64 / (1u64 << 31) as f64
    }
}
