//! Algebraic modeling of linear and mixed-integer programs, encoded to MPS.
//!
//! Variables, constraints and objectives are built against a shared
//! [`NameRegistry`], composed with ordinary arithmetic, collected in a
//! [`Model`] and encoded with [`Model::to_frame`].
//!
//! ```
//! use mpsopt_model::{Model, NameRegistry, ObjectiveSense, VariableSpec};
//!
//! let registry = NameRegistry::new();
//! let mut m = Model::new(&registry, Some("plan")).unwrap();
//! let x = m.add_variable(VariableSpec::new("x").integer().upper(5.0)).unwrap();
//! let y = m.add_variable(VariableSpec::new("y").upper(10.0)).unwrap();
//! m.add_constraint((&x + &y).geq(3.0), Some("c1")).unwrap();
//! m.set_objective(4.0 * &x - 5.0 * &y, ObjectiveSense::Maximize, Some("obj")).unwrap();
//! let frame = m.to_frame();
//! assert_eq!(frame.section("RHS").len(), 1);
//! ```

mod constraint;
#[cfg(feature = "serde")]
mod document;
mod encoder;
mod error;
mod expression;
pub mod index;
mod model;
mod registry;
mod variable;

pub use constraint::{Constraint, ConstraintGroup, ConstraintRef, Direction};
#[cfg(feature = "serde")]
pub use document::{Bound, ConstraintDoc, GroupDoc, ModelDocument, NamedBound, ObjectiveDoc, VariableDoc};
pub use error::ModelError;
pub use expression::{EvalPolicy, Expression, VarRef};
pub use index::{IndexKey, IndexPattern, IndexSource, IndexValue};
pub use model::{Entity, Model, VariableInput};
pub use registry::{NameKind, NameRegistry};
pub use variable::{BoundSpec, Variable, VariableGroup, VariableGroupSpec, VariableKind, VariableSpec};

pub use mpsopt_solver::{
    Algorithm, DecompConfig, DecompMethod, DualRow, Field, MpsFrame, MpsRow, ObjectiveSense, PrimalRow, ProblemKind,
    Solution, SolutionStatus, SolveRequest, SolverBackend, SolverConfig,
};
