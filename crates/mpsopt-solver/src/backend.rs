use std::fmt;
use std::str::FromStr;

use crate::{MpsFrame, Solution, SolverConfig, SolverError};

/// Optimization direction of the objective
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

impl ObjectiveSense {
    /// The label written into the ROWS section
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectiveSense::Minimize => "MIN",
            ObjectiveSense::Maximize => "MAX",
        }
    }
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectiveSense {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MIN" | "MINIMIZE" => Ok(ObjectiveSense::Minimize),
            "MAX" | "MAXIMIZE" => Ok(ObjectiveSense::Maximize),
            _ => Err(SolverError::UnknownSense(s.to_string())),
        }
    }
}

/// Which solver entry point a problem needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Every variable is continuous
    Lp,
    /// At least one integer or binary variable
    Milp,
}

/// Everything a backend needs for one solve call
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub model_name: &'a str,
    pub frame: &'a MpsFrame,
    pub kind: ProblemKind,
    pub sense: ObjectiveSense,
    pub config: &'a SolverConfig,
    /// `(row name, block)` pairs when user-defined decomposition is requested
    pub user_blocks: Option<&'a [(String, u32)]>,
}

/// A remote or local solver that consumes an MPS frame.
///
/// Implementations must not panic on connectivity or solver failures; every
/// failure is reported through [`Solution::status`].
pub trait SolverBackend {
    fn solve(&mut self, request: &SolveRequest<'_>) -> Solution;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &mut B {
    fn solve(&mut self, request: &SolveRequest<'_>) -> Solution {
        (**self).solve(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sense_labels() {
        assert_eq!(ObjectiveSense::Minimize.as_str(), "MIN");
        assert_eq!(ObjectiveSense::Maximize.to_string(), "MAX");
        assert_eq!(ObjectiveSense::default(), ObjectiveSense::Minimize);
    }

    #[test]
    fn test_sense_parse() {
        assert_eq!("max".parse::<ObjectiveSense>(), Ok(ObjectiveSense::Maximize));
        assert_eq!("Minimize".parse::<ObjectiveSense>(), Ok(ObjectiveSense::Minimize));
        assert!(matches!(
            "up".parse::<ObjectiveSense>(),
            Err(SolverError::UnknownSense(_))
        ));
    }
}
