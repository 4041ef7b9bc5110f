//! Decision variables and index-keyed variable groups.

use std::collections::HashMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::index::{self, IndexKey, IndexPattern, IndexSource};
use crate::{Expression, ModelError, NameKind, NameRegistry, VarRef};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableKind {
    #[default]
    Continuous,
    Integer,
    Binary,
}

impl VariableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableKind::Continuous => "CONT",
            VariableKind::Integer => "INT",
            VariableKind::Binary => "BIN",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters for a single [`Variable`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableSpec {
    pub name: Option<String>,
    pub kind: VariableKind,
    /// `None` means the default lower bound 0
    pub lower: Option<f64>,
    /// `None` means no upper bound
    pub upper: Option<f64>,
    pub init: Option<f64>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Name is generated on construction
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: VariableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn integer(self) -> Self {
        self.kind(VariableKind::Integer)
    }

    pub fn binary(self) -> Self {
        self.kind(VariableKind::Binary)
    }

    pub fn lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    pub fn upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    pub fn bounds(self, lower: f64, upper: f64) -> Self {
        self.lower(lower).upper(upper)
    }

    /// `(-inf, +inf)`
    pub fn free(self) -> Self {
        self.bounds(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn init(mut self, init: f64) -> Self {
        self.init = Some(init);
        self
    }
}

/// A named scalar decision variable.
///
/// Constraints refer to a variable by name only; `constraint_refs` is the
/// reverse index, in the order the constraints were added to the model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    lower: f64,
    upper: f64,
    init: Option<f64>,
    value: Option<f64>,
    constraint_refs: IndexSet<String>,
}

impl Variable {
    /// Create a variable and register its name
    pub fn new(registry: &NameRegistry, spec: VariableSpec) -> Result<Self, ModelError> {
        let name = registry.resolve(spec.name.as_deref(), NameKind::Variable)?;
        let (lower, upper) = resolve_bounds(
            &name,
            spec.kind,
            spec.lower.unwrap_or(0.0),
            spec.upper.unwrap_or(f64::INFINITY),
        )?;
        registry.register(&name, NameKind::Variable)?;
        Ok(Self {
            name,
            kind: spec.kind,
            lower,
            upper,
            init: spec.init,
            value: None,
            constraint_refs: IndexSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_ref(&self) -> VarRef {
        VarRef::new(self.name.clone())
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Changing to binary clamps the bounds into `[0, 1]`
    pub fn set_kind(&mut self, kind: VariableKind) {
        self.kind = kind;
        if kind == VariableKind::Binary {
            self.lower = self.lower.max(0.0);
            self.upper = self.upper.min(1.0);
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Replace the given bounds; `None` keeps the current one
    pub fn set_bounds(&mut self, lower: Option<f64>, upper: Option<f64>) -> Result<(), ModelError> {
        let (lower, upper) = resolve_bounds(
            &self.name,
            self.kind,
            lower.unwrap_or(self.lower),
            upper.unwrap_or(self.upper),
        )?;
        self.lower = lower;
        self.upper = upper;
        Ok(())
    }

    pub fn init(&self) -> Option<f64> {
        self.init
    }

    pub fn set_init(&mut self, init: Option<f64>) {
        self.init = init;
    }

    /// Cached value from the last successful solve
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: Option<f64>) {
        self.value = value;
    }

    /// Names of the constraints this variable appears in
    pub fn constraint_refs(&self) -> impl Iterator<Item = &str> {
        self.constraint_refs.iter().map(String::as_str)
    }

    pub(crate) fn tag(&mut self, constraint: &str) {
        self.constraint_refs.insert(constraint.to_string());
    }

    pub(crate) fn untag(&mut self, constraint: &str) {
        self.constraint_refs.shift_remove(constraint);
    }

    pub fn is_integer(&self) -> bool {
        self.kind == VariableKind::Integer
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn resolve_bounds(name: &str, kind: VariableKind, lower: f64, upper: f64) -> Result<(f64, f64), ModelError> {
    let (lower, upper) = match kind {
        VariableKind::Binary => (lower.max(0.0), upper.min(1.0)),
        _ => (lower, upper),
    };
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(ModelError::InvalidBounds {
            name: name.to_string(),
            lower,
            upper,
        });
    }
    Ok((lower, upper))
}

/// A bound for every member of a group
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundSpec {
    /// Lower 0, upper unbounded
    #[default]
    Default,
    Scalar(f64),
    /// One value per index; every generated index must be covered
    PerIndex(HashMap<IndexKey, f64>),
}

impl BoundSpec {
    pub fn per_index<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<IndexKey>,
    {
        BoundSpec::PerIndex(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub(crate) fn resolve(&self, group: &str, key: &IndexKey) -> Result<Option<f64>, ModelError> {
        match self {
            BoundSpec::Default => Ok(None),
            BoundSpec::Scalar(v) => Ok(Some(*v)),
            BoundSpec::PerIndex(values) => values.get(key).copied().map(Some).ok_or_else(|| {
                ModelError::InvalidGroupSpec(format!("no bound for index [{}] of group {}", key, group))
            }),
        }
    }
}

impl From<f64> for BoundSpec {
    fn from(value: f64) -> Self {
        BoundSpec::Scalar(value)
    }
}

impl From<HashMap<IndexKey, f64>> for BoundSpec {
    fn from(values: HashMap<IndexKey, f64>) -> Self {
        BoundSpec::PerIndex(values)
    }
}

/// Construction parameters for a [`VariableGroup`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableGroupSpec {
    pub name: Option<String>,
    pub kind: VariableKind,
    pub lower: BoundSpec,
    pub upper: BoundSpec,
    pub init: Option<f64>,
}

impl VariableGroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: VariableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn integer(self) -> Self {
        self.kind(VariableKind::Integer)
    }

    pub fn binary(self) -> Self {
        self.kind(VariableKind::Binary)
    }

    pub fn lower(mut self, lower: impl Into<BoundSpec>) -> Self {
        self.lower = lower.into();
        self
    }

    pub fn upper(mut self, upper: impl Into<BoundSpec>) -> Self {
        self.upper = upper.into();
        self
    }

    pub fn init(mut self, init: f64) -> Self {
        self.init = Some(init);
        self
    }
}

/// Variables sharing a name prefix, one per index tuple
#[derive(Debug, Clone, PartialEq)]
pub struct VariableGroup {
    name: String,
    members: IndexMap<IndexKey, Variable>,
}

impl VariableGroup {
    /// One variable per tuple of the Cartesian product of `sources`, named `name[i,j,...]`.
    ///
    /// Nothing is registered unless every member can be built.
    pub fn new(registry: &NameRegistry, sources: &[IndexSource], spec: VariableGroupSpec) -> Result<Self, ModelError> {
        if sources.is_empty() {
            return Err(ModelError::InvalidGroupSpec(
                "a variable group needs at least one index source".to_string(),
            ));
        }
        let name = registry.resolve(spec.name.as_deref(), NameKind::Variable)?;

        let mut planned = Vec::new();
        for key in index::product(sources) {
            let member = key.member_name(&name);
            if registry.contains(&member) {
                return Err(ModelError::NameCollision(member));
            }
            let lower = spec.lower.resolve(&name, &key)?.unwrap_or(0.0);
            let upper = spec.upper.resolve(&name, &key)?.unwrap_or(f64::INFINITY);
            let (lower, upper) = resolve_bounds(&member, spec.kind, lower, upper)?;
            planned.push((key, member, lower, upper));
        }

        registry.register(&name, NameKind::Variable)?;
        let mut members = IndexMap::with_capacity(planned.len());
        for (key, member, lower, upper) in planned {
            registry.register(&member, NameKind::Variable)?;
            let var = Variable {
                name: member,
                kind: spec.kind,
                lower,
                upper,
                init: spec.init,
                value: None,
                constraint_refs: IndexSet::new(),
            };
            members.insert(key, var);
        }
        Ok(Self { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: impl Into<IndexKey>) -> Option<VarRef> {
        self.members.get(&key.into()).map(Variable::var_ref)
    }

    /// Members in generation order
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, VarRef)> {
        self.members.iter().map(|(k, v)| (k, v.var_ref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &IndexKey> {
        self.members.keys()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members whose index matches `pattern`, in generation order
    pub fn select(&self, pattern: &[IndexPattern]) -> Vec<VarRef> {
        self.members
            .iter()
            .filter(|(k, _)| index::matches(k, pattern))
            .map(|(_, v)| v.var_ref())
            .collect()
    }

    /// Sum of the members matching `pattern`
    pub fn sum(&self, pattern: &[IndexPattern]) -> Expression {
        Expression::sum(self.select(pattern))
    }

    pub fn sum_all(&self) -> Expression {
        Expression::sum(self.members.values())
    }

    /// Dot product with per-index coefficients; every key must be a member
    pub fn mult<I, K>(&self, coefficients: I) -> Result<Expression, ModelError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<IndexKey>,
    {
        let mut terms = Vec::new();
        for (key, coef) in coefficients {
            let key = key.into();
            let var = self.members.get(&key).ok_or_else(|| {
                ModelError::InvalidGroupSpec(format!("group {} has no member [{}]", self.name, key))
            })?;
            terms.push((var.name().to_string(), coef));
        }
        Ok(Expression::from_terms(terms, 0.0))
    }

    pub(crate) fn into_members(self) -> impl Iterator<Item = Variable> {
        self.members.into_values()
    }
}

impl fmt::Display for VariableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variable Group ({}) [", self.name)?;
        for (key, var) in &self.members {
            writeln!(f, "  [{}: {}]", key, var)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let registry = NameRegistry::new();
        let x = Variable::new(&registry, VariableSpec::new("x")).unwrap();
        assert_eq!(x.lower(), 0.0);
        assert_eq!(x.upper(), f64::INFINITY);
        assert_eq!(x.kind(), VariableKind::Continuous);
        assert!(x.value().is_none());
        assert!(registry.contains("x"));
    }

    #[test]
    fn test_binary_bounds_are_clamped() {
        let registry = NameRegistry::new();
        let b = Variable::new(&registry, VariableSpec::new("b").binary().bounds(-3.0, 7.0)).unwrap();
        assert_eq!((b.lower(), b.upper()), (0.0, 1.0));
    }

    #[test]
    fn test_unnamed_variable_gets_generated_name() {
        let registry = NameRegistry::new();
        let a = Variable::new(&registry, VariableSpec::unnamed()).unwrap();
        let b = Variable::new(&registry, VariableSpec::unnamed()).unwrap();
        assert_eq!(a.name(), "x1");
        assert_eq!(b.name(), "x2");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let registry = NameRegistry::new();
        Variable::new(&registry, VariableSpec::new("x")).unwrap();
        assert_eq!(
            Variable::new(&registry, VariableSpec::new("x")),
            Err(ModelError::NameCollision("x".to_string()))
        );
    }

    #[test]
    fn test_set_bounds_keeps_omitted_side() {
        let registry = NameRegistry::new();
        let mut x = Variable::new(&registry, VariableSpec::new("x").bounds(0.0, 20.0)).unwrap();
        x.set_bounds(Some(5.0), None).unwrap();
        assert_eq!((x.lower(), x.upper()), (5.0, 20.0));
        assert!(x.set_bounds(Some(30.0), None).is_err());
        assert_eq!(x.lower(), 5.0);
    }

    #[test]
    fn test_group_members_and_names() {
        let registry = NameRegistry::new();
        let z = VariableGroup::new(
            &registry,
            &[IndexSource::count(2), IndexSource::from(vec!["a", "b"])],
            VariableGroupSpec::new("z").upper(10.0),
        )
        .unwrap();
        assert_eq!(z.len(), 4);
        assert_eq!(z.get((1, "a")), Some(VarRef::new("z[1,a]")));
        assert!(registry.contains("z"));
        assert!(registry.contains("z[0,b]"));
        assert!(z.variables().all(|v| v.upper() == 10.0));
    }

    #[test]
    fn test_group_per_index_bounds_must_cover() {
        let registry = NameRegistry::new();
        let lower = BoundSpec::per_index([(0, 1.0), (1, 2.0)]);
        let err = VariableGroup::new(
            &registry,
            &[IndexSource::count(3)],
            VariableGroupSpec::new("u").lower(lower),
        );
        assert!(matches!(err, Err(ModelError::InvalidGroupSpec(_))));
        assert!(!registry.contains("u"));
        assert!(!registry.contains("u[0]"));
    }

    #[test]
    fn test_group_needs_sources() {
        let registry = NameRegistry::new();
        assert!(matches!(
            VariableGroup::new(&registry, &[], VariableGroupSpec::new("v")),
            Err(ModelError::InvalidGroupSpec(_))
        ));
    }

    #[test]
    fn test_group_sum_and_mult() {
        let registry = NameRegistry::new();
        let y = VariableGroup::new(
            &registry,
            &[IndexSource::count(2), IndexSource::from(vec!["a", "b"])],
            VariableGroupSpec::new("y"),
        )
        .unwrap();
        let s = y.sum(&[IndexPattern::Any, IndexPattern::is("a")]);
        assert_eq!(s.to_string(), "y[0,a] + y[1,a]");
        assert_eq!(y.sum_all().len(), 4);

        let m = y.mult([((0, "a"), 2.0), ((1, "b"), 5.0)]).unwrap();
        assert_eq!(m.coefficient("y[1,b]"), Some(5.0));
        assert!(y.mult([((3, "a"), 1.0)]).is_err());
    }
}
