//! Linear constraints and index-keyed constraint groups.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::index::IndexKey;
use crate::{EvalPolicy, Expression, ModelError, NameKind, NameRegistry};

/// Relational direction of a row
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Le,
    Ge,
    Eq,
}

impl Direction {
    /// MPS ROWS code
    pub fn code(self) -> &'static str {
        match self {
            Direction::Le => "L",
            Direction::Ge => "G",
            Direction::Eq => "E",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Direction::Le => "<=",
            Direction::Ge => ">=",
            Direction::Eq => "==",
        }
    }
}

impl FromStr for Direction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "<=" => Ok(Direction::Le),
            "G" | ">=" => Ok(Direction::Ge),
            "E" | "==" | "=" => Ok(Direction::Eq),
            other => Err(ModelError::InvalidDocument(format!("unknown constraint direction: {}", other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Name-keyed handle to a constraint in a model
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintRef(String);

impl ConstraintRef {
    pub fn new(name: impl Into<String>) -> Self {
        ConstraintRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `body <dir> rhs`, stored as a body whose constant is `-rhs`.
///
/// A nonzero `range` turns an equality row into `rhs <= terms <= rhs + range`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: Option<String>,
    body: Expression,
    direction: Direction,
    range: f64,
    block: Option<u32>,
}

impl Constraint {
    pub fn new(body: Expression, direction: Direction, range: f64) -> Self {
        Self {
            name: None,
            body: body.copy(),
            direction,
            range,
            block: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_registered_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn body(&self) -> &Expression {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut Expression {
        &mut self.body
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn rhs(&self) -> f64 {
        -self.body.constant()
    }

    pub fn set_rhs(&mut self, rhs: f64) {
        self.body.set_constant(-rhs);
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn set_range(&mut self, range: f64) {
        self.range = range;
    }

    /// Decomposition block label
    pub fn block(&self) -> Option<u32> {
        self.block
    }

    pub fn set_block(&mut self, block: Option<u32>) {
        self.block = block;
    }

    pub fn with_block(mut self, block: u32) -> Self {
        self.block = Some(block);
        self
    }

    /// Change the coefficient of an existing term
    pub fn update_var_coef(&mut self, var: &str, value: f64) -> Result<(), ModelError> {
        match self.body.coefficient_mut(var) {
            Some(coef) => {
                *coef = value;
                Ok(())
            }
            None => Err(ModelError::UnknownVariable {
                variable: var.to_string(),
                constraint: self.name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
            }),
        }
    }

    /// A row that can never be satisfied by its own constant: `L` with
    /// constant exactly `-inf`, or `G` with constant exactly `+inf`.
    pub fn is_degenerate(&self) -> bool {
        let constant = self.body.constant();
        match self.direction {
            Direction::Le => constant == f64::NEG_INFINITY,
            Direction::Ge => constant == f64::INFINITY,
            Direction::Eq => false,
        }
    }

    /// Row activity; with `include_constant` the result is `activity - rhs`
    pub fn get_value<F>(&self, lookup: F, policy: EvalPolicy, include_constant: bool) -> Result<f64, ModelError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = self.body.get_value(lookup, policy)?;
        if include_constant {
            Ok(value)
        } else {
            Ok(value - self.body.constant())
        }
    }

    /// The body as an expression, with or without its constant
    pub fn expression(&self, include_rhs: bool) -> Expression {
        let mut e = self.body.copy();
        if !include_rhs {
            e.set_constant(0.0);
        }
        e
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rhs = self.rhs();
        write!(f, "{} {} ", self.expression(false), self.direction)?;
        if self.range == 0.0 {
            write!(f, "{}", rhs)
        } else {
            write!(f, "[{}, {}]", rhs, rhs + self.range)
        }
    }
}

/// Constraints sharing a name prefix, one per index in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup {
    name: String,
    members: IndexMap<IndexKey, Constraint>,
}

impl ConstraintGroup {
    /// Members are keyed by position: `name[0]`, `name[1]`, ...
    pub fn from_iter<I>(registry: &NameRegistry, name: Option<&str>, constraints: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        Self::from_indexed(
            registry,
            name,
            constraints.into_iter().enumerate().map(|(i, c)| (IndexKey::from(i), c)),
        )
    }

    /// Members keyed by the supplied index, in iteration order.
    ///
    /// `constraints` is consumed exactly once. Degenerate members are
    /// dropped and their names are never registered. Nothing is registered
    /// unless every member name is free and every key is distinct.
    pub fn from_indexed<I, K>(registry: &NameRegistry, name: Option<&str>, constraints: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, Constraint)>,
        K: Into<IndexKey>,
    {
        let name = registry.resolve(name, NameKind::Constraint)?;
        let mut members = IndexMap::new();
        let mut names = HashSet::new();
        for (key, mut c) in constraints {
            let key = key.into();
            let member = key.member_name(&name);
            if members.contains_key(&key) {
                return Err(ModelError::InvalidGroupSpec(format!(
                    "duplicate index [{}] in constraint group {}",
                    key, name
                )));
            }
            if registry.contains(&member) || !names.insert(member.clone()) {
                return Err(ModelError::NameCollision(member));
            }
            if c.is_degenerate() {
                tracing::debug!(
                    component = "model",
                    operation = "add_constraint",
                    constraint = %member,
                    "Dropped degenerate constraint {}",
                    member
                );
                continue;
            }
            c.name = Some(member);
            members.insert(key, c);
        }

        registry.register(&name, NameKind::Constraint)?;
        for c in members.values() {
            if let Some(member) = c.name() {
                registry.register(member, NameKind::Constraint)?;
            }
        }
        Ok(Self { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: impl Into<IndexKey>) -> Option<ConstraintRef> {
        self.members
            .get(&key.into())
            .and_then(Constraint::name)
            .map(ConstraintRef::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, &Constraint)> {
        self.members.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.members.keys()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member bodies keyed by index
    pub fn expressions(&self, include_rhs: bool) -> Vec<(IndexKey, Expression)> {
        self.members
            .iter()
            .map(|(k, c)| (k.clone(), c.expression(include_rhs)))
            .collect()
    }

    pub(crate) fn into_members(self) -> impl Iterator<Item = Constraint> {
        self.members.into_values()
    }
}

impl fmt::Display for ConstraintGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Constraint Group ({}) [", self.name)?;
        for (key, c) in &self.members {
            writeln!(f, "  [{}: {}]", key, c)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VarRef;

    fn x() -> VarRef {
        VarRef::new("x")
    }

    fn y() -> VarRef {
        VarRef::new("y")
    }

    #[test]
    fn test_rhs_is_negated_constant() {
        let mut c = (3.0 * &x() - 5.0 * &y()).leq(10.0);
        assert_eq!(c.rhs(), 10.0);
        assert_eq!(c.body().constant(), -10.0);
        c.set_rhs(5.0);
        assert_eq!(c.to_string(), "3 * x - 5 * y <= 5");
    }

    #[test]
    fn test_update_var_coef() {
        let mut c = (3.0 * &x() - 5.0 * &y()).leq(10.0);
        c.update_var_coef("x", -1.0).unwrap();
        assert_eq!(c.body().coefficient("x"), Some(-1.0));
        assert_eq!(
            c.update_var_coef("z", 2.0),
            Err(ModelError::UnknownVariable {
                variable: "z".to_string(),
                constraint: "<unnamed>".to_string(),
            })
        );
    }

    #[test]
    fn test_degenerate_rows() {
        assert!(Expression::from(&x()).leq(f64::INFINITY).is_degenerate());
        assert!(Expression::from(&x()).geq(f64::NEG_INFINITY).is_degenerate());
        assert!(!Expression::from(&x()).leq(-1e30).is_degenerate());
        assert!(!Expression::from(&x()).equals(f64::INFINITY).is_degenerate());
    }

    #[test]
    fn test_ranged_display() {
        let c = (&x() - &y()).between(4.0, 10.0);
        assert_eq!(c.to_string(), "x - y == [4, 10]");
    }

    #[test]
    fn test_get_value_with_and_without_constant() {
        let c = (&x() + &y()).leq(5.0);
        let lookup = |name: &str| if name == "x" { Some(2.0) } else { Some(4.0) };
        assert_eq!(c.get_value(lookup, EvalPolicy::Lenient, false), Ok(6.0));
        assert_eq!(c.get_value(lookup, EvalPolicy::Lenient, true), Ok(1.0));
    }

    #[test]
    fn test_group_positions_follow_iteration_order() {
        let registry = NameRegistry::new();
        let order = [2, 0, 1];
        let group = ConstraintGroup::from_iter(
            &registry,
            Some("c"),
            order.iter().map(|i| Expression::from(&VarRef::new(format!("u[{}]", i))).leq(5.0)),
        )
        .unwrap();
        let names: Vec<&str> = group.iter().filter_map(|(_, c)| c.name()).collect();
        assert_eq!(names, vec!["c[0]", "c[1]", "c[2]"]);
        assert_eq!(group.get(0).map(|r| r.name().to_string()), Some("c[0]".to_string()));
        assert!(group.iter().next().unwrap().1.body().contains("u[2]"));
        assert!(registry.contains("c[2]"));
    }

    #[test]
    fn test_group_rejects_duplicate_keys() {
        let registry = NameRegistry::new();
        let result = ConstraintGroup::from_indexed(
            &registry,
            Some("cap"),
            vec![("a", Expression::from(&x()).leq(1.0)), ("a", Expression::from(&y()).leq(2.0))],
        );
        assert!(matches!(result, Err(ModelError::InvalidGroupSpec(_))));
        assert!(!registry.contains("cap"));
    }

    #[test]
    fn test_group_expressions() {
        let registry = NameRegistry::new();
        let group =
            ConstraintGroup::from_indexed(&registry, Some("d"), vec![("w", (&x() + 2.0).leq(5.0))]).unwrap();
        let with_rhs = group.expressions(true);
        let without = group.expressions(false);
        assert_eq!(with_rhs[0].1.constant(), -3.0);
        assert_eq!(without[0].1.constant(), 0.0);
    }
}
