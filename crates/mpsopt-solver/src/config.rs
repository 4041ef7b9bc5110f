use std::collections::BTreeMap;
use std::str::FromStr;

use crate::SolverError;

/// LP algorithm selection passed through to the backend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    PrimalSimplex,
    DualSimplex,
    InteriorPoint,
    NetworkSimplex,
    Concurrent,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::PrimalSimplex => "primal",
            Algorithm::DualSimplex => "dual",
            Algorithm::InteriorPoint => "ipm",
            Algorithm::NetworkSimplex => "ns",
            Algorithm::Concurrent => "concurrent",
        }
    }
}

impl FromStr for Algorithm {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primal" | "ps" => Ok(Algorithm::PrimalSimplex),
            "dual" | "ds" => Ok(Algorithm::DualSimplex),
            "ipm" | "interiorpoint" => Ok(Algorithm::InteriorPoint),
            "ns" | "network" => Ok(Algorithm::NetworkSimplex),
            "concurrent" => Ok(Algorithm::Concurrent),
            _ => Err(SolverError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// How the backend should partition the problem into blocks
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompMethod {
    /// Blocks come from the constraints' own block labels
    User,
    /// Blocks are found by connected components
    Concomp,
    /// Backend chooses
    Auto,
}

impl DecompMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DecompMethod::User => "user",
            DecompMethod::Concomp => "concomp",
            DecompMethod::Auto => "auto",
        }
    }
}

impl FromStr for DecompMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(DecompMethod::User),
            "concomp" => Ok(DecompMethod::Concomp),
            "auto" => Ok(DecompMethod::Auto),
            _ => Err(SolverError::UnknownDecompMethod(s.to_string())),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DecompConfig {
    pub method: DecompMethod,
    /// Name of an already uploaded block table, if any
    pub blocks: Option<String>,
}

impl DecompConfig {
    pub fn new(method: DecompMethod) -> Self {
        Self { method, blocks: None }
    }

    pub fn uses_user_blocks(&self) -> bool {
        self.method == DecompMethod::User
    }
}

/// Options recognized by solver backends.
///
/// Every field is optional; `None` leaves the backend default in place.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverConfig {
    pub algorithm: Option<Algorithm>,
    /// Time limit in seconds
    pub max_time: Option<f64>,
    pub decomp: Option<DecompConfig>,
    pub presolve: Option<bool>,
    /// Iteration log frequency
    pub log_freq: Option<u32>,
    /// Objective to optimize when the backend holds several
    pub objective: Option<String>,
    /// Backend-specific options passed through verbatim
    pub extra: BTreeMap<String, String>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn with_max_time(mut self, seconds: f64) -> Self {
        self.max_time = Some(seconds);
        self
    }

    pub fn with_decomp(mut self, decomp: DecompConfig) -> Self {
        self.decomp = Some(decomp);
        self
    }

    pub fn with_presolve(mut self, enabled: bool) -> Self {
        self.presolve = Some(enabled);
        self
    }

    pub fn with_log_freq(mut self, every: u32) -> Self {
        self.log_freq = Some(every);
        self
    }

    pub fn with_objective(mut self, name: impl Into<String>) -> Self {
        self.objective = Some(name.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn uses_user_blocks(&self) -> bool {
        self.decomp.as_ref().is_some_and(DecompConfig::uses_user_blocks)
    }

    /// Check if no option has been set
    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none()
            && self.max_time.is_none()
            && self.decomp.is_none()
            && self.presolve.is_none()
            && self.log_freq.is_none()
            && self.objective.is_none()
            && self.extra.is_empty()
    }
}
