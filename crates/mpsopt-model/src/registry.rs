//! Unique names for models and their entities.
//!
//! A [`NameRegistry`] is shared by every model, variable, constraint and
//! objective built in one session. Names are never released, so a name used
//! once stays taken even after the entity carrying it is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ModelError;

/// What a registered name belongs to; also selects the prefix of generated names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Model,
    Variable,
    Constraint,
    Objective,
    Expression,
}

impl NameKind {
    pub fn prefix(self) -> &'static str {
        match self {
            NameKind::Model => "model",
            NameKind::Variable => "x",
            NameKind::Constraint => "c",
            NameKind::Objective => "obj",
            NameKind::Expression => "expr",
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    names: HashMap<String, NameKind>,
    counters: HashMap<NameKind, usize>,
}

/// Shared handle to a session's name table.
///
/// Cloning the handle shares the table. Not thread safe.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, failing if it is already taken
    pub fn register(&self, name: &str, kind: NameKind) -> Result<(), ModelError> {
        let mut state = self.state.borrow_mut();
        if state.names.contains_key(name) {
            return Err(ModelError::NameCollision(name.to_string()));
        }
        state.names.insert(name.to_string(), kind);
        Ok(())
    }

    /// Return `candidate` if it is usable and free, otherwise a fresh
    /// `<prefix><counter>` name. Does not register the result.
    pub fn check_name(&self, candidate: Option<&str>, kind: NameKind) -> String {
        if let Some(name) = candidate.map(sanitize).filter(|n| !n.is_empty()) {
            if !self.contains(&name) {
                return name;
            }
        }
        self.generate(kind)
    }

    /// Resolve and register the name for a new entity.
    ///
    /// An explicit name must be free; a missing or blank one is generated.
    pub fn claim(&self, candidate: Option<&str>, kind: NameKind) -> Result<String, ModelError> {
        let name = self.resolve(candidate, kind)?;
        self.register(&name, kind)?;
        Ok(name)
    }

    /// The name [`claim`](Self::claim) would register, without registering it
    pub fn resolve(&self, candidate: Option<&str>, kind: NameKind) -> Result<String, ModelError> {
        match candidate.map(sanitize).filter(|n| !n.is_empty()) {
            Some(name) if self.contains(&name) => Err(ModelError::NameCollision(name)),
            Some(name) => Ok(name),
            None => Ok(self.generate(kind)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.borrow().names.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<NameKind> {
        self.state.borrow().names.get(name).copied()
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().names.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.borrow().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().names.is_empty()
    }

    fn generate(&self, kind: NameKind) -> String {
        let mut state = self.state.borrow_mut();
        loop {
            let counter = state.counters.entry(kind).or_insert(0);
            *counter += 1;
            let name = format!("{}{}", kind.prefix(), counter);
            if !state.names.contains_key(&name) {
                return name;
            }
        }
    }
}

/// MPS free format splits on whitespace, so names may not contain any
fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
