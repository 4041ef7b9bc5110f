use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("Unknown objective sense: {0} (expected MIN or MAX)")]
    UnknownSense(String),
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Unknown decomposition method: {0}")]
    UnknownDecompMethod(String),
}
