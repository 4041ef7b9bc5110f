use std::fmt;

/// The result returned by a solver backend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Raw status text reported by the backend, if any
    pub message: Option<String>,
    /// Objective value at the returned point
    pub objective_value: f64,
    /// Primal values in backend order
    pub primal: Vec<PrimalRow>,
    /// Row activities and duals in backend order
    pub dual: Vec<DualRow>,
    /// Wall-clock seconds spent inside the backend
    pub solve_time: Option<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// A feasible but not proven optimal solution was found (e.g. time limit)
    Feasible,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The backend could not tell infeasible from unbounded
    InfeasibleOrUnbounded,
    /// Connectivity failure, malformed input, or any other backend error
    Error,
}

impl SolutionStatus {
    /// Parse a backend status string; anything unrecognized is an error status
    pub fn from_backend(status: &str) -> Self {
        let upper = status.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INFEASIBLE_OR_UNBOUNDED" | "INF_OR_UNB" => SolutionStatus::InfeasibleOrUnbounded,
            "INFEASIBLE" => SolutionStatus::Infeasible,
            "UNBOUNDED" => SolutionStatus::Unbounded,
            s if s.starts_with("OPTIMAL") => SolutionStatus::Optimal,
            "FEASIBLE" | "CONDITIONAL_OPTIMAL" | "TIME_LIM_SOL" | "NODE_LIM_SOL" | "SOLUTION_LIM" => {
                SolutionStatus::Feasible
            }
            _ => SolutionStatus::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Feasible => "FEASIBLE",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::InfeasibleOrUnbounded => "INFEASIBLE_OR_UNBOUNDED",
            SolutionStatus::Error => "ERROR",
        }
    }

    /// Whether the solution carries usable primal values
    pub fn is_ok(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }

    pub fn is_optimal(self) -> bool {
        self == SolutionStatus::Optimal
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One primal table row
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PrimalRow {
    /// Variable name
    pub variable: String,
    /// Value in the solution
    pub value: f64,
}

/// One dual table row
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DualRow {
    /// Row (constraint) name
    pub row: String,
    /// Dual value (shadow price)
    pub value: f64,
    /// Row activity at the solution
    pub activity: f64,
    /// Lower end of the right-hand side range
    pub lower_rhs: Option<f64>,
    /// Upper end of the right-hand side range
    pub upper_rhs: Option<f64>,
}

impl Solution {
    pub fn new(status: SolutionStatus, objective_value: f64) -> Self {
        Self {
            status,
            message: None,
            objective_value,
            primal: Vec::new(),
            dual: Vec::new(),
            solve_time: None,
        }
    }

    pub fn optimal(objective_value: f64, primal: Vec<PrimalRow>, dual: Vec<DualRow>) -> Self {
        Self {
            primal,
            dual,
            ..Self::new(SolutionStatus::Optimal, objective_value)
        }
    }

    pub fn infeasible() -> Self {
        Self::new(SolutionStatus::Infeasible, f64::INFINITY)
    }

    pub fn unbounded() -> Self {
        Self::new(SolutionStatus::Unbounded, f64::NEG_INFINITY)
    }

    /// A failed call, e.g. the backend was unreachable or rejected the frame
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(SolutionStatus::Error, f64::NAN)
        }
    }

    pub fn with_solve_time(mut self, seconds: f64) -> Self {
        self.solve_time = Some(seconds);
        self
    }

    /// Primal value reported for a variable
    pub fn primal_value(&self, variable: &str) -> Option<f64> {
        self.primal.iter().find(|r| r.variable == variable).map(|r| r.value)
    }

    /// Dual row reported for a constraint
    pub fn dual_row(&self, row: &str) -> Option<&DualRow> {
        self.dual.iter().find(|r| r.row == row)
    }
}

impl PrimalRow {
    pub fn new(variable: impl Into<String>, value: f64) -> Self {
        Self {
            variable: variable.into(),
            value,
        }
    }
}

impl DualRow {
    pub fn new(row: impl Into<String>, value: f64, activity: f64) -> Self {
        Self {
            row: row.into(),
            value,
            activity,
            lower_rhs: None,
            upper_rhs: None,
        }
    }

    pub fn with_rhs_range(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_rhs = lower;
        self.upper_rhs = upper;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_status_parsing() {
        assert_eq!(SolutionStatus::from_backend("OPTIMAL"), SolutionStatus::Optimal);
        assert_eq!(SolutionStatus::from_backend("optimal_rgap"), SolutionStatus::Optimal);
        assert_eq!(SolutionStatus::from_backend("INFEASIBLE"), SolutionStatus::Infeasible);
        assert_eq!(SolutionStatus::from_backend("UNBOUNDED"), SolutionStatus::Unbounded);
        assert_eq!(
            SolutionStatus::from_backend("INFEASIBLE_OR_UNBOUNDED"),
            SolutionStatus::InfeasibleOrUnbounded
        );
        assert_eq!(SolutionStatus::from_backend("TIME_LIM_SOL"), SolutionStatus::Feasible);
        assert_eq!(SolutionStatus::from_backend("connection refused"), SolutionStatus::Error);
    }

    #[test]
    fn test_ok_statuses() {
        assert!(SolutionStatus::Optimal.is_ok());
        assert!(SolutionStatus::Feasible.is_ok());
        assert!(!SolutionStatus::Feasible.is_optimal());
        assert!(!SolutionStatus::Infeasible.is_ok());
        assert!(!SolutionStatus::Error.is_ok());
    }

    #[test]
    fn test_lookup_rows() {
        let solution = Solution::optimal(
            42.0,
            vec![PrimalRow::new("x", 2.0), PrimalRow::new("y", 0.0)],
            vec![DualRow::new("c1", 1.5, 3.0).with_rhs_range(Some(3.0), None)],
        );
        assert_eq!(solution.primal_value("x"), Some(2.0));
        assert_eq!(solution.primal_value("z"), None);
        let row = solution.dual_row("c1").unwrap();
        assert_eq!(row.activity, 3.0);
        assert_eq!(row.lower_rhs, Some(3.0));
    }

    #[test]
    fn test_failed_solution_carries_message() {
        let solution = Solution::failed("server unreachable").with_solve_time(0.5);
        assert_eq!(solution.status, SolutionStatus::Error);
        assert_eq!(solution.message.as_deref(), Some("server unreachable"));
        assert_eq!(solution.solve_time, Some(0.5));
        assert!(solution.primal.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_solution_json_round_trip() {
        let solution = Solution::optimal(
            12.5,
            vec![PrimalRow { variable: "x".to_string(), value: 2.5 }],
            vec![DualRow {
                row: "c1".to_string(),
                value: -1.0,
                activity: 3.0,
                lower_rhs: Some(3.0),
                upper_rhs: None,
            }],
        );
        let json = serde_json::to_string(&solution).unwrap();
        assert!(json.contains("\"Optimal\""));
        let back: Solution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, solution);
    }
}
