mod backend;
mod config;
mod error;
mod frame;
mod solution;

pub use backend::{ObjectiveSense, ProblemKind, SolveRequest, SolverBackend};
pub use config::{Algorithm, DecompConfig, DecompMethod, SolverConfig};
pub use error::SolverError;
pub use frame::{Field, MpsFrame, MpsRow, SECTIONS};
pub use solution::{DualRow, PrimalRow, Solution, SolutionStatus};
