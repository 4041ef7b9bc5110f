//! The model: owner of variables, constraints and the objective.
//!
//! Variables and constraints live in name-keyed arenas. Constraint bodies
//! refer to variables by name and every variable keeps the names of the
//! constraints it appears in, so there are no ownership cycles.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;
use mpsopt_solver::{
    DualRow, ObjectiveSense, PrimalRow, ProblemKind, Solution, SolutionStatus, SolveRequest, SolverBackend,
    SolverConfig,
};

use crate::index::{IndexKey, IndexSource};
use crate::{
    BoundSpec, Constraint, ConstraintGroup, ConstraintRef, EvalPolicy, Expression, ModelError, NameKind, NameRegistry,
    VarRef, Variable, VariableGroup, VariableGroupSpec, VariableKind, VariableSpec,
};

/// Anything [`Model::include`] can absorb
#[derive(Debug, Clone)]
pub enum Entity {
    Variable(Variable),
    VariableGroup(VariableGroup),
    Constraint(Constraint),
    ConstraintGroup(ConstraintGroup),
    /// Entities are copied in and the objective and sense are adopted
    Model(Box<Model>),
}

impl From<Variable> for Entity {
    fn from(var: Variable) -> Self {
        Entity::Variable(var)
    }
}

impl From<VariableGroup> for Entity {
    fn from(group: VariableGroup) -> Self {
        Entity::VariableGroup(group)
    }
}

impl From<Constraint> for Entity {
    fn from(c: Constraint) -> Self {
        Entity::Constraint(c)
    }
}

impl From<ConstraintGroup> for Entity {
    fn from(group: ConstraintGroup) -> Self {
        Entity::ConstraintGroup(group)
    }
}

impl From<Model> for Entity {
    fn from(model: Model) -> Self {
        Entity::Model(Box::new(model))
    }
}

/// Argument of [`Model::add_variable`]: a built variable or its parameters
#[derive(Debug, Clone)]
pub enum VariableInput {
    Existing(Variable),
    New(VariableSpec),
}

impl From<Variable> for VariableInput {
    fn from(var: Variable) -> Self {
        VariableInput::Existing(var)
    }
}

impl From<VariableSpec> for VariableInput {
    fn from(spec: VariableSpec) -> Self {
        VariableInput::New(spec)
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    registry: NameRegistry,
    name: String,
    sense: ObjectiveSense,
    variables: IndexMap<String, Variable>,
    constraints: IndexMap<String, Constraint>,
    objective: Expression,
    eval_policy: EvalPolicy,
    /// variable name -> constraints added before the variable itself
    pending_refs: HashMap<String, Vec<String>>,
    solution: Option<Solution>,
}

impl Model {
    /// Create an empty model with a registered name
    pub fn new(registry: &NameRegistry, name: Option<&str>) -> Result<Self, ModelError> {
        let name = registry.claim(name, NameKind::Model)?;
        tracing::debug!(
            component = "model",
            operation = "new",
            model = %name,
            "Initialized model {}",
            name
        );
        Ok(Self {
            registry: registry.clone(),
            name,
            sense: ObjectiveSense::default(),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            objective: Expression::new(),
            eval_policy: EvalPolicy::default(),
            pending_refs: HashMap::new(),
            solution: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    pub fn eval_policy(&self) -> EvalPolicy {
        self.eval_policy
    }

    pub fn with_eval_policy(mut self, policy: EvalPolicy) -> Self {
        self.eval_policy = policy;
        self
    }

    pub fn set_eval_policy(&mut self, policy: EvalPolicy) {
        self.eval_policy = policy;
    }

    /// Variables in insertion order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Constraints in insertion order
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut Constraint> {
        self.constraints.get_mut(name)
    }

    /// Add a built variable as-is, or build one from a spec and add it
    pub fn add_variable(&mut self, input: impl Into<VariableInput>) -> Result<VarRef, ModelError> {
        let var = match input.into() {
            VariableInput::New(spec) => Variable::new(&self.registry, spec)?,
            VariableInput::Existing(var) => var,
        };
        Ok(self.insert_variable(var))
    }

    /// Build a variable group over `sources` and add every member
    pub fn add_variables(
        &mut self,
        sources: &[IndexSource],
        spec: VariableGroupSpec,
    ) -> Result<VariableGroup, ModelError> {
        let group = VariableGroup::new(&self.registry, sources, spec)?;
        self.add_variable_group(group.clone());
        Ok(group)
    }

    pub fn add_variable_group(&mut self, group: VariableGroup) {
        for var in group.into_members() {
            self.insert_variable(var);
        }
    }

    fn insert_variable(&mut self, mut var: Variable) -> VarRef {
        let var_ref = var.var_ref();
        if self.variables.contains_key(var.name()) {
            tracing::debug!(
                component = "model",
                operation = "add_variable",
                variable = %var.name(),
                "Variable {} is already in model {}; skipped",
                var.name(),
                self.name
            );
            return var_ref;
        }
        let foreign: Vec<String> = var
            .constraint_refs()
            .filter(|c| !self.constraints.contains_key(*c))
            .map(str::to_string)
            .collect();
        for c in &foreign {
            var.untag(c);
        }
        if let Some(pending) = self.pending_refs.remove(var.name()) {
            for c in &pending {
                var.tag(c);
            }
        }
        self.variables.insert(var.name().to_string(), var);
        var_ref
    }

    /// Add a constraint, naming it `name` or generating a name if it has none.
    ///
    /// Returns `Ok(None)` for a degenerate row, which is dropped.
    pub fn add_constraint(
        &mut self,
        mut constraint: Constraint,
        name: Option<&str>,
    ) -> Result<Option<ConstraintRef>, ModelError> {
        if constraint.is_degenerate() {
            tracing::debug!(
                component = "model",
                operation = "add_constraint",
                "Dropped degenerate constraint {}",
                constraint
            );
            return Ok(None);
        }
        let name = match (name, constraint.name()) {
            (None, Some(existing)) => existing.to_string(),
            (Some(requested), Some(existing)) if requested == existing => existing.to_string(),
            (requested, _) => self.registry.claim(requested, NameKind::Constraint)?,
        };
        constraint.set_registered_name(name.clone());
        Ok(Some(self.insert_constraint(name, constraint)))
    }

    /// Add one constraint per item, named `name[0]`, `name[1]`, ... in iteration order
    pub fn add_constraints<I>(&mut self, constraints: I, name: Option<&str>) -> Result<ConstraintGroup, ModelError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let group = ConstraintGroup::from_iter(&self.registry, name, constraints)?;
        self.add_constraint_group(group.clone());
        Ok(group)
    }

    /// Add one constraint per `(index, constraint)` pair, named `name[index]`
    pub fn add_indexed_constraints<I, K>(
        &mut self,
        constraints: I,
        name: Option<&str>,
    ) -> Result<ConstraintGroup, ModelError>
    where
        I: IntoIterator<Item = (K, Constraint)>,
        K: Into<IndexKey>,
    {
        let group = ConstraintGroup::from_indexed(&self.registry, name, constraints)?;
        self.add_constraint_group(group.clone());
        Ok(group)
    }

    /// Add every member of a group; degenerate rows never enter a group
    pub fn add_constraint_group(&mut self, group: ConstraintGroup) {
        for c in group.into_members() {
            if let Some(name) = c.name().map(str::to_string) {
                self.insert_constraint(name, c);
            }
        }
    }

    fn insert_constraint(&mut self, name: String, constraint: Constraint) -> ConstraintRef {
        if self.constraints.contains_key(&name) {
            tracing::debug!(
                component = "model",
                operation = "add_constraint",
                constraint = %name,
                "Constraint {} is already in model {}; skipped",
                name,
                self.name
            );
            return ConstraintRef::new(name);
        }
        for var in constraint.body().variable_names() {
            match self.variables.get_mut(var) {
                Some(v) => v.tag(&name),
                None => self
                    .pending_refs
                    .entry(var.to_string())
                    .or_default()
                    .push(name.clone()),
            }
        }
        self.constraints.insert(name.clone(), constraint);
        ConstraintRef::new(name)
    }

    /// Absorb variables, constraints, groups or whole models.
    ///
    /// Entities whose name is already in this model are skipped.
    pub fn include<I>(&mut self, entities: I) -> Result<(), ModelError>
    where
        I: IntoIterator,
        I::Item: Into<Entity>,
    {
        for entity in entities {
            match entity.into() {
                Entity::Variable(var) => {
                    self.insert_variable(var);
                }
                Entity::VariableGroup(group) => self.add_variable_group(group),
                Entity::Constraint(c) => {
                    self.add_constraint(c, None)?;
                }
                Entity::ConstraintGroup(group) => self.add_constraint_group(group),
                Entity::Model(other) => self.include_model(*other),
            }
        }
        Ok(())
    }

    fn include_model(&mut self, other: Model) {
        tracing::debug!(
            component = "model",
            operation = "include",
            model = %self.name,
            source = %other.name,
            "Including model {} into {}",
            other.name,
            self.name
        );
        for (_, var) in other.variables {
            self.insert_variable(var);
        }
        for (name, c) in other.constraints {
            self.insert_constraint(name, c);
        }
        self.objective = other.objective;
        self.sense = other.sense;
    }

    /// Replace the objective.
    ///
    /// The objective keeps `name`, else the expression's own name, else a
    /// generated `obj<n>`.
    pub fn set_objective(
        &mut self,
        expression: impl Into<Expression>,
        sense: ObjectiveSense,
        name: Option<&str>,
    ) -> Result<&Expression, ModelError> {
        let mut objective = expression.into();
        let current = self.objective.name().map(str::to_string);
        let name = match (name, objective.name()) {
            (Some(requested), _) if current.as_deref() == Some(requested) => requested.to_string(),
            (Some(requested), Some(existing)) if requested == existing => existing.to_string(),
            (Some(requested), _) => self.registry.claim(Some(requested), NameKind::Objective)?,
            (None, Some(existing)) => existing.to_string(),
            (None, None) => self.registry.claim(None, NameKind::Objective)?,
        };
        objective.set_registered_name(name);
        self.objective = objective;
        self.sense = sense;
        Ok(&self.objective)
    }

    /// Objective coefficient of `var`, 0 if it is not an objective term
    pub fn get_variable_coef(&self, var: &str) -> Result<f64, ModelError> {
        if !self.variables.contains_key(var) {
            return Err(ModelError::VariableNotInModel(var.to_string()));
        }
        Ok(self.objective.coefficient(var).unwrap_or(0.0))
    }

    /// Set the coefficient of `var` in constraint `con`, adding the term if needed
    pub fn set_coef(&mut self, var: &str, con: &str, value: f64) -> Result<(), ModelError> {
        let Some(variable) = self.variables.get_mut(var) else {
            return Err(ModelError::VariableNotInModel(var.to_string()));
        };
        let constraint = self
            .constraints
            .get_mut(con)
            .ok_or_else(|| ModelError::UnknownConstraint(con.to_string()))?;
        constraint.body_mut().set_term(var, value);
        variable.tag(con);
        Ok(())
    }

    pub fn set_bounds(&mut self, var: &str, lower: Option<f64>, upper: Option<f64>) -> Result<(), ModelError> {
        self.variables
            .get_mut(var)
            .ok_or_else(|| ModelError::VariableNotInModel(var.to_string()))?
            .set_bounds(lower, upper)
    }

    /// Set bounds on every member of an included group; [`BoundSpec::Default`] keeps the current bound
    pub fn set_group_bounds(
        &mut self,
        group: &VariableGroup,
        lower: impl Into<BoundSpec>,
        upper: impl Into<BoundSpec>,
    ) -> Result<(), ModelError> {
        let (lower, upper) = (lower.into(), upper.into());
        let mut updates = Vec::with_capacity(group.len());
        for (key, var) in group.iter() {
            if !self.variables.contains_key(var.name()) {
                return Err(ModelError::VariableNotInModel(var.name().to_string()));
            }
            let lo = lower.resolve(group.name(), key)?;
            let hi = upper.resolve(group.name(), key)?;
            updates.push((var, lo, hi));
        }
        for (var, lo, hi) in updates {
            self.set_bounds(var.name(), lo, hi)?;
        }
        Ok(())
    }

    pub fn remove_constraint(&mut self, name: &str) -> Result<Constraint, ModelError> {
        let constraint = self
            .constraints
            .shift_remove(name)
            .ok_or_else(|| ModelError::UnknownConstraint(name.to_string()))?;
        for var in constraint.body().variable_names() {
            if let Some(v) = self.variables.get_mut(var) {
                v.untag(name);
            }
            if let Some(pending) = self.pending_refs.get_mut(var) {
                pending.retain(|c| c != name);
            }
        }
        Ok(constraint)
    }

    /// Remove a variable and strip its terms from the objective and its constraints
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable, ModelError> {
        let var = self
            .variables
            .shift_remove(name)
            .ok_or_else(|| ModelError::VariableNotInModel(name.to_string()))?;
        for con in var.constraint_refs() {
            if let Some(c) = self.constraints.get_mut(con) {
                c.body_mut().remove_term(name);
            }
        }
        self.objective.remove_term(name);
        Ok(var)
    }

    /// Evaluate an expression against the cached variable values
    pub fn evaluate(&self, expression: &Expression) -> Result<f64, ModelError> {
        expression.get_value(|name| self.variables.get(name).and_then(Variable::value), self.eval_policy)
    }

    pub fn objective_value(&self) -> Result<f64, ModelError> {
        self.evaluate(&self.objective)
    }

    /// Row activity of a constraint; see [`Constraint::get_value`]
    pub fn constraint_value(&self, name: &str, include_constant: bool) -> Result<f64, ModelError> {
        let constraint = self
            .constraints
            .get(name)
            .ok_or_else(|| ModelError::UnknownConstraint(name.to_string()))?;
        constraint.get_value(
            |var| self.variables.get(var).and_then(Variable::value),
            self.eval_policy,
            include_constant,
        )
    }

    /// `(row, block)` for every constraint carrying a decomposition block
    pub fn user_blocks(&self) -> Vec<(String, u32)> {
        self.constraints
            .iter()
            .filter_map(|(name, c)| c.block().map(|b| (name.clone(), b)))
            .collect()
    }

    pub fn problem_kind(&self) -> ProblemKind {
        if self.variables.values().any(|v| v.kind() != VariableKind::Continuous) {
            ProblemKind::Milp
        } else {
            ProblemKind::Lp
        }
    }

    /// Encode, hand the frame to `backend` once, and record the result.
    ///
    /// Variable values are only updated when the status carries a usable
    /// solution. Backend failures come back as a status, never as an error.
    pub fn solve<B>(&mut self, backend: &mut B, config: &SolverConfig) -> SolutionStatus
    where
        B: SolverBackend + ?Sized,
    {
        let frame = self.to_frame();
        let blocks = config.uses_user_blocks().then(|| self.user_blocks());
        let request = SolveRequest {
            model_name: &self.name,
            frame: &frame,
            kind: self.problem_kind(),
            sense: self.sense,
            config,
            user_blocks: blocks.as_deref(),
        };
        tracing::debug!(
            component = "model",
            operation = "solve",
            model = %self.name,
            kind = ?request.kind,
            rows = frame.len(),
            "Submitting model {} to solver",
            self.name
        );

        let started = Instant::now();
        let mut solution = backend.solve(&request);
        let elapsed = started.elapsed().as_secs_f64();
        if solution.solve_time.is_none() {
            solution.solve_time = Some(elapsed);
        }

        let status = solution.status;
        if status.is_ok() {
            tracing::info!(
                component = "model",
                operation = "solve",
                status = %status,
                objective = solution.objective_value,
                elapsed_secs = elapsed,
                "Solved model {} with status {} in {:.3}s",
                self.name,
                status,
                elapsed
            );
            self.apply_solution(&solution);
        } else {
            tracing::warn!(
                component = "model",
                operation = "solve",
                status = %status,
                message = solution.message.as_deref().unwrap_or(""),
                "Solve of model {} ended with status {}",
                self.name,
                status
            );
        }
        self.solution = Some(solution);
        status
    }

    /// Copy primal values onto the model's variables; rows naming unknown variables are ignored
    pub fn apply_solution(&mut self, solution: &Solution) {
        for row in &solution.primal {
            match self.variables.get_mut(&row.variable) {
                Some(var) => var.set_value(Some(row.value)),
                None => tracing::debug!(
                    component = "model",
                    operation = "apply_solution",
                    variable = %row.variable,
                    "Ignoring value for variable {} not in model {}",
                    row.variable,
                    self.name
                ),
            }
        }
    }

    /// Result of the last solve, whatever its status
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn status(&self) -> Option<SolutionStatus> {
        self.solution.as_ref().map(|s| s.status)
    }

    pub fn primal_solution(&self) -> &[PrimalRow] {
        self.solution.as_ref().map(|s| s.primal.as_slice()).unwrap_or(&[])
    }

    pub fn dual_solution(&self) -> &[DualRow] {
        self.solution.as_ref().map(|s| s.dual.as_slice()).unwrap_or(&[])
    }

    pub fn solve_time(&self) -> Option<f64> {
        self.solution.as_ref().and_then(|s| s.solve_time)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: [")?;
        writeln!(f, "  Name: {}", self.name)?;
        writeln!(f, "  Objective: {} [{}]", self.sense, self.objective)?;
        writeln!(f, "  Variables ({}): [", self.variables.len())?;
        for var in self.variables.values() {
            writeln!(f, "    {}", var)?;
        }
        writeln!(f, "  ]")?;
        writeln!(f, "  Constraints ({}): [", self.constraints.len())?;
        for c in self.constraints.values() {
            writeln!(f, "    {}", c)?;
        }
        writeln!(f, "  ]")?;
        write!(f, "]")
    }
}
