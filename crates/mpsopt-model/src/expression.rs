//! Linear expressions over named variables.
//!
//! Terms are keyed by variable name, never by object identity: two
//! expressions mentioning `x` refer to the same column no matter how each
//! obtained its handle.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use indexmap::IndexMap;

use crate::{Constraint, Direction, ModelError, NameKind, NameRegistry, Variable};

/// Name-keyed handle to a variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarRef(String);

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        VarRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How value queries treat variables that were never given a solution value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalPolicy {
    /// Unsolved variables read as 0.0
    #[default]
    Lenient,
    /// Unsolved variables are an [`ModelError::UnboundVariable`] error
    Strict,
}

/// `Σ coef * var + constant`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    name: Option<String>,
    terms: IndexMap<String, f64>,
    constant: f64,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_constant(constant: f64) -> Self {
        Self {
            constant,
            ..Self::default()
        }
    }

    /// Single term `coef * var`
    pub fn term(var: &VarRef, coef: f64) -> Self {
        let mut e = Self::new();
        e.terms.insert(var.name().to_string(), coef);
        e
    }

    /// Build from `(variable, coefficient)` pairs plus a constant; repeated variables add up
    pub fn from_terms<I, S>(terms: I, constant: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut e = Self::from_constant(constant);
        for (name, coef) in terms {
            *e.terms.entry(name.into()).or_insert(0.0) += coef;
        }
        e
    }

    /// Sum of any number of expressions
    pub fn sum<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expression>,
    {
        items
            .into_iter()
            .fold(Expression::new(), |acc, item| acc.combine(item.into(), 1.0))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Register `name` (or a generated one) and attach it
    pub fn set_name(&mut self, registry: &NameRegistry, name: Option<&str>) -> Result<&str, ModelError> {
        let name = registry.claim(name, NameKind::Expression)?;
        Ok(self.name.insert(name))
    }

    pub fn with_name(mut self, registry: &NameRegistry, name: Option<&str>) -> Result<Self, ModelError> {
        self.set_name(registry, name)?;
        Ok(self)
    }

    pub(crate) fn set_registered_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub(crate) fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    /// Coefficient of `var`, if it is a term
    pub fn coefficient(&self, var: &str) -> Option<f64> {
        self.terms.get(var).copied()
    }

    pub(crate) fn coefficient_mut(&mut self, var: &str) -> Option<&mut f64> {
        self.terms.get_mut(var)
    }

    pub(crate) fn set_term(&mut self, var: &str, coef: f64) {
        self.terms.insert(var.to_string(), coef);
    }

    pub fn contains(&self, var: &str) -> bool {
        self.terms.contains_key(var)
    }

    /// Variable terms in insertion order
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// No variable terms (the constant may still be nonzero)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub(crate) fn remove_term(&mut self, var: &str) -> Option<f64> {
        self.terms.shift_remove(var)
    }

    /// Drop terms whose coefficient is exactly zero
    pub fn prune_zeros(&mut self) {
        self.terms.retain(|_, c| *c != 0.0);
    }

    /// Unnamed copy
    pub fn copy(&self) -> Self {
        Self {
            name: None,
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }

    pub fn add(&self, other: &Expression) -> Self {
        self.copy().combine(other.copy(), 1.0)
    }

    pub fn subtract(&self, other: &Expression) -> Self {
        self.copy().combine(other.copy(), -1.0)
    }

    /// Multiply every term and the constant by `k`
    pub fn scale(&self, k: f64) -> Self {
        if k == 0.0 {
            return Self::new();
        }
        Self {
            name: None,
            terms: self.terms.iter().map(|(n, c)| (n.clone(), c * k)).collect(),
            constant: self.constant * k,
        }
    }

    /// Divide every term and the constant by `k`, rejecting a zero divisor
    pub fn checked_divide(&self, k: f64) -> Result<Self, ModelError> {
        if k == 0.0 {
            return Err(ModelError::DivisionByZero(self.to_string()));
        }
        Ok(self.scale(1.0 / k))
    }

    /// Divide every term and the constant by `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero, like integer division. Use
    /// [`checked_divide`](Self::checked_divide) for a fallible version.
    pub fn divide(&self, k: f64) -> Self {
        assert!(k != 0.0, "attempt to divide expression {} by zero", self);
        self.scale(1.0 / k)
    }

    fn combine(mut self, other: Expression, sign: f64) -> Self {
        self.name = None;
        for (var, coef) in other.terms {
            *self.terms.entry(var).or_insert(0.0) += sign * coef;
        }
        self.constant += sign * other.constant;
        self
    }

    /// Evaluate with `lookup` giving each variable's cached solution value.
    ///
    /// `lookup` returns `None` for a variable that has no value yet; `policy`
    /// decides whether that reads as 0.0 or fails.
    pub fn get_value<F>(&self, lookup: F, policy: EvalPolicy) -> Result<f64, ModelError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut total = self.constant;
        for (var, coef) in &self.terms {
            let value = match (lookup(var), policy) {
                (Some(v), _) => v,
                (None, EvalPolicy::Lenient) => 0.0,
                (None, EvalPolicy::Strict) => return Err(ModelError::UnboundVariable(var.clone())),
            };
            total += coef * value;
        }
        Ok(total)
    }

    /// Normalize `self - rhs` into a constraint body
    fn relate(&self, rhs: Expression, direction: Direction) -> Constraint {
        Constraint::new(self.copy().combine(rhs, -1.0), direction, 0.0)
    }

    /// `self <= rhs`
    pub fn leq(&self, rhs: impl Into<Expression>) -> Constraint {
        self.relate(rhs.into(), Direction::Le)
    }

    /// `self >= rhs`
    pub fn geq(&self, rhs: impl Into<Expression>) -> Constraint {
        self.relate(rhs.into(), Direction::Ge)
    }

    /// `self == rhs`
    pub fn equals(&self, rhs: impl Into<Expression>) -> Constraint {
        self.relate(rhs.into(), Direction::Eq)
    }

    /// Ranged row `lo <= self <= hi`, encoded as an equality plus a range
    pub fn between(&self, lo: f64, hi: f64) -> Constraint {
        let mut body = self.copy();
        body.constant -= lo.min(hi);
        Constraint::new(body, Direction::Eq, (hi - lo).abs())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, coef) in self.terms.iter().filter(|(_, c)| **c != 0.0) {
            write_signed(f, *coef, first)?;
            let magnitude = coef.abs();
            if magnitude == 1.0 {
                write!(f, "{}", var)?;
            } else {
                write!(f, "{} * {}", magnitude, var)?;
            }
            first = false;
        }
        if self.constant != 0.0 || first {
            write_signed(f, self.constant, first)?;
            write!(f, "{}", self.constant.abs())?;
        }
        Ok(())
    }
}

/// Write the sign separator for a term
pub(crate) fn write_signed(f: &mut fmt::Formatter<'_>, value: f64, first: bool) -> fmt::Result {
    match (first, value.is_sign_negative()) {
        (true, true) => write!(f, "-"),
        (true, false) => Ok(()),
        (false, true) => write!(f, " - "),
        (false, false) => write!(f, " + "),
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::from_constant(value)
    }
}

impl From<VarRef> for Expression {
    fn from(var: VarRef) -> Self {
        Expression::term(&var, 1.0)
    }
}

impl From<&VarRef> for Expression {
    fn from(var: &VarRef) -> Self {
        Expression::term(var, 1.0)
    }
}

impl From<&Variable> for Expression {
    fn from(var: &Variable) -> Self {
        Expression::term(&var.var_ref(), 1.0)
    }
}

impl From<&Expression> for Expression {
    fn from(e: &Expression) -> Self {
        e.copy()
    }
}

impl<T: Into<Expression>> Sum<T> for Expression {
    fn sum<I: Iterator<Item = T>>(iter: I) -> Self {
        Expression::sum(iter)
    }
}

macro_rules! impl_linear_ops {
    ($($lhs:ty),*) => {$(
        impl<T: Into<Expression>> Add<T> for $lhs {
            type Output = Expression;

            fn add(self, rhs: T) -> Expression {
                Expression::from(self).combine(rhs.into(), 1.0)
            }
        }

        impl<T: Into<Expression>> Sub<T> for $lhs {
            type Output = Expression;

            fn sub(self, rhs: T) -> Expression {
                Expression::from(self).combine(rhs.into(), -1.0)
            }
        }

        impl Mul<f64> for $lhs {
            type Output = Expression;

            fn mul(self, rhs: f64) -> Expression {
                Expression::from(self).scale(rhs)
            }
        }

        impl Div<f64> for $lhs {
            type Output = Expression;

            fn div(self, rhs: f64) -> Expression {
                Expression::from(self).divide(rhs)
            }
        }

        impl Neg for $lhs {
            type Output = Expression;

            fn neg(self) -> Expression {
                Expression::from(self).scale(-1.0)
            }
        }

        impl Mul<$lhs> for f64 {
            type Output = Expression;

            fn mul(self, rhs: $lhs) -> Expression {
                Expression::from(rhs).scale(self)
            }
        }

        impl Add<$lhs> for f64 {
            type Output = Expression;

            fn add(self, rhs: $lhs) -> Expression {
                Expression::from(self).combine(Expression::from(rhs), 1.0)
            }
        }

        impl Sub<$lhs> for f64 {
            type Output = Expression;

            fn sub(self, rhs: $lhs) -> Expression {
                Expression::from(self).combine(Expression::from(rhs), -1.0)
            }
        }
    )*};
}

impl_linear_ops!(Expression, &Expression, VarRef, &VarRef, &Variable);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn x() -> VarRef {
        VarRef::new("x")
    }

    fn y() -> VarRef {
        VarRef::new("y")
    }

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_operators_merge_by_name() {
        let e = 3.0 * &x() + 2.0 * &y() - &x() + 4.0;
        assert_eq!(e.coefficient("x"), Some(2.0));
        assert_eq!(e.coefficient("y"), Some(2.0));
        assert_eq!(e.constant(), 4.0);
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn test_independent_handles_compose() {
        let a = Expression::from(VarRef::new("sales")) * 5.0;
        let b = Expression::term(&VarRef::new("sales"), -2.0);
        let e = a + b;
        assert_eq!(e.len(), 1);
        assert_eq!(e.coefficient("sales"), Some(3.0));
    }

    #[test]
    fn test_scale_includes_constant() {
        let e = (&x() + 2.0).scale(3.0);
        assert_eq!(e.coefficient("x"), Some(3.0));
        assert_eq!(e.constant(), 6.0);
        assert!(e.scale(0.0).is_empty());
        assert_eq!((e / 3.0).constant(), 2.0);
    }

    #[test]
    fn test_checked_divide_rejects_zero() {
        let e = 4.0 * &x() + 2.0;
        let half = e.checked_divide(2.0).unwrap();
        assert_eq!(half.coefficient("x"), Some(2.0));
        assert_eq!(half.constant(), 1.0);
        assert_eq!(
            e.checked_divide(0.0),
            Err(ModelError::DivisionByZero("4 * x + 2".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "by zero")]
    fn test_divide_by_zero_panics() {
        let _ = Expression::from(x()) / 0.0;
    }

    #[test]
    fn test_add_then_subtract_is_identity() {
        let a = 2.5 * &x() - 1.5 * &y() + 7.0;
        let b = -4.0 * &x() + 0.25 * &VarRef::new("z") - 3.0;
        let round_trip = (a.clone() + &b) - &b;
        let vals = values(&[("x", 1.3), ("y", -2.0), ("z", 8.0)]);
        let lookup = |name: &str| vals.get(name).copied();
        let expected = a.get_value(lookup, EvalPolicy::Lenient).unwrap();
        let actual = round_trip.get_value(lookup, EvalPolicy::Lenient).unwrap();
        assert!((expected - actual).abs() < 1e-9);
    }

    #[test]
    fn test_get_value_policies() {
        let e = 2.0 * &x() + &y() + 1.0;
        let vals = values(&[("x", 3.0)]);
        let lookup = |name: &str| vals.get(name).copied();
        assert_eq!(e.get_value(lookup, EvalPolicy::Lenient), Ok(7.0));
        assert_eq!(
            e.get_value(lookup, EvalPolicy::Strict),
            Err(ModelError::UnboundVariable("y".to_string()))
        );
    }

    #[test]
    fn test_comparison_normalizes_to_one_side() {
        let c = (&x() + 2.0).geq(&y() + 5.0);
        assert_eq!(c.direction(), Direction::Ge);
        assert_eq!(c.body().coefficient("x"), Some(1.0));
        assert_eq!(c.body().coefficient("y"), Some(-1.0));
        assert_eq!(c.rhs(), 3.0);
    }

    #[test]
    fn test_between_builds_range() {
        let c = (&x() - &y()).between(10.0, 4.0);
        assert_eq!(c.direction(), Direction::Eq);
        assert_eq!(c.rhs(), 4.0);
        assert_eq!(c.range(), 6.0);
    }

    #[test]
    fn test_sum_and_display() {
        let e: Expression = [x(), y(), x()].into_iter().sum();
        assert_eq!(e.to_string(), "2 * x + y");
        let f = -1.0 * &x() + 3.0 * &y() - 5.0;
        assert_eq!(f.to_string(), "-x + 3 * y - 5");
        assert_eq!(Expression::new().to_string(), "0");
    }

    #[test]
    fn test_set_name_registers() {
        let registry = NameRegistry::new();
        let mut e = Expression::from(&x());
        assert_eq!(e.set_name(&registry, Some("profit")).unwrap(), "profit");
        assert!(registry.contains("profit"));
        assert!(e.copy().name().is_none());
        assert!((e.clone() + 1.0).name().is_none());
    }
}
