//! JSON model documents.
//!
//! A document lists variables, variable groups, constraints and the
//! objective by name. Infinite bounds are written as the strings `"inf"`
//! and `"-inf"` since JSON has no infinity.

use indexmap::IndexMap;
use mpsopt_solver::ObjectiveSense;
use serde::{Deserialize, Serialize};

use crate::index::{IndexSource, IndexValue};
use crate::{
    Constraint, Direction, Expression, Model, ModelError, NameRegistry, VariableGroupSpec, VariableKind,
    VariableSpec,
};

/// A bound or right-hand side value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Named(NamedBound),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NamedBound {
    #[serde(rename = "inf", alias = "Infinity", alias = "+inf")]
    Infinity,
    #[serde(rename = "-inf", alias = "-Infinity")]
    NegInfinity,
}

impl Bound {
    pub fn value(self) -> f64 {
        match self {
            Bound::Number(v) => v,
            Bound::Named(NamedBound::Infinity) => f64::INFINITY,
            Bound::Named(NamedBound::NegInfinity) => f64::NEG_INFINITY,
        }
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        if value == f64::INFINITY {
            Bound::Named(NamedBound::Infinity)
        } else if value == f64::NEG_INFINITY {
            Bound::Named(NamedBound::NegInfinity)
        } else {
            Bound::Number(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDoc {
    pub name: String,
    #[serde(default)]
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<f64>,
}

/// A variable group over the Cartesian product of `indices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDoc {
    pub name: String,
    pub indices: Vec<Vec<IndexValue>>,
    #[serde(default)]
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub terms: IndexMap<String, f64>,
    /// `<=`, `>=`, `==` or the MPS codes `L`, `G`, `E`
    pub direction: String,
    pub rhs: Bound,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub range: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `MIN` or `MAX`
    #[serde(default = "default_sense")]
    pub sense: String,
    pub terms: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub constant: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupDoc>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<ObjectiveDoc>,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

fn default_sense() -> String {
    ObjectiveSense::default().as_str().to_string()
}

fn invalid(message: impl ToString) -> ModelError {
    ModelError::InvalidDocument(message.to_string())
}

impl ModelDocument {
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        serde_json::from_str(text).map_err(invalid)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(invalid)
    }

    /// Describe an existing model; groups are flattened into variables
    pub fn from_model(model: &Model) -> Self {
        let variables = model
            .variables()
            .map(|v| VariableDoc {
                name: v.name().to_string(),
                kind: v.kind(),
                lower: (v.lower() != 0.0).then(|| Bound::from(v.lower())),
                upper: (v.upper() != f64::INFINITY).then(|| Bound::from(v.upper())),
                init: v.init(),
            })
            .collect();
        let constraints = model
            .constraints()
            .map(|c| ConstraintDoc {
                name: c.name().map(str::to_string),
                terms: c.body().terms().map(|(k, v)| (k.to_string(), v)).collect(),
                direction: c.direction().symbol().to_string(),
                rhs: Bound::from(c.rhs()),
                range: c.range(),
                block: c.block(),
            })
            .collect();
        let objective = model.objective();
        let objective = (objective.name().is_some() || !objective.is_empty()).then(|| ObjectiveDoc {
            name: objective.name().map(str::to_string),
            sense: model.sense().as_str().to_string(),
            terms: objective.terms().map(|(k, v)| (k.to_string(), v)).collect(),
            constant: objective.constant(),
        });
        Self {
            name: Some(model.name().to_string()),
            variables,
            groups: Vec::new(),
            constraints,
            objective,
        }
    }

    /// Build a model; every referenced variable must be declared
    pub fn build(&self, registry: &NameRegistry) -> Result<Model, ModelError> {
        let mut model = Model::new(registry, self.name.as_deref())?;
        for v in &self.variables {
            let mut spec = VariableSpec::new(v.name.as_str()).kind(v.kind);
            spec.lower = v.lower.map(Bound::value);
            spec.upper = v.upper.map(Bound::value);
            spec.init = v.init;
            model.add_variable(spec)?;
        }
        for g in &self.groups {
            let sources: Vec<IndexSource> = g.indices.iter().map(|values| IndexSource::new(values.clone())).collect();
            let mut spec = VariableGroupSpec::new(g.name.as_str()).kind(g.kind);
            if let Some(lower) = g.lower {
                spec = spec.lower(lower.value());
            }
            if let Some(upper) = g.upper {
                spec = spec.upper(upper.value());
            }
            model.add_variables(&sources, spec)?;
        }
        for c in &self.constraints {
            let body = declared_terms(&model, &c.terms, 0.0)?;
            let direction: Direction = c.direction.parse()?;
            let mut constraint = Constraint::new(body, direction, c.range);
            constraint.set_rhs(c.rhs.value());
            constraint.set_block(c.block);
            model.add_constraint(constraint, c.name.as_deref())?;
        }
        if let Some(objective) = &self.objective {
            let sense: ObjectiveSense = objective.sense.parse().map_err(invalid)?;
            let expression = declared_terms(&model, &objective.terms, objective.constant)?;
            model.set_objective(expression, sense, objective.name.as_deref())?;
        }
        tracing::debug!(
            component = "document",
            operation = "build",
            model = %model.name(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "Built model {} from document",
            model.name()
        );
        Ok(model)
    }
}

fn declared_terms(model: &Model, terms: &IndexMap<String, f64>, constant: f64) -> Result<Expression, ModelError> {
    if let Some(unknown) = terms.keys().find(|name| model.get_variable(name).is_none()) {
        return Err(ModelError::VariableNotInModel(unknown.clone()));
    }
    Ok(Expression::from_terms(
        terms.iter().map(|(name, coef)| (name.clone(), *coef)),
        constant,
    ))
}
