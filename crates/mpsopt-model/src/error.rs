use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Name already in use: {0}")]
    NameCollision(String),
    #[error("Invalid group specification: {0}")]
    InvalidGroupSpec(String),
    #[error("Variable {variable} is not a term of constraint {constraint}")]
    UnknownVariable { variable: String, constraint: String },
    #[error("Variable {0} has no value; solve the model first")]
    UnboundVariable(String),
    #[error("Unknown constraint: {0}")]
    UnknownConstraint(String),
    #[error("Variable {0} is not part of the model")]
    VariableNotInModel(String),
    #[error("Invalid bounds for {name}: lower ({lower}) > upper ({upper})")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Division of expression {0} by zero")]
    DivisionByZero(String),
    #[error("Invalid model document: {0}")]
    InvalidDocument(String),
}
