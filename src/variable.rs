//! Typed, named storage cells and the stores that own them.

use crate::error::{Error, Result};
use crate::value::{CompareOperator, SetOperator, Value, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Owned by one flowchart; only its own steps can reach it.
    Local,
    /// Shared by every flowchart in the engine.
    Global,
}

/// A reference to a variable by scope and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarRef {
    pub scope: Scope,
    pub key: String,
}

impl VarRef {
    pub fn local(key: impl Into<String>) -> Self {
        Self {
            scope: Scope::Local,
            key: key.into(),
        }
    }

    pub fn global(key: impl Into<String>) -> Self {
        Self {
            scope: Scope::Global,
            key: key.into(),
        }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Local => f.write_str(&self.key),
            Scope::Global => write!(f, "global.{}", self.key),
        }
    }
}

/// A typed, named, mutable storage cell.
///
/// The kind is fixed at declaration; every write is checked against it.
/// A list variable also fixes the kind of its elements, taken from the
/// first element unless given with [`Variable::with_element`]. An empty
/// list declared without one accepts any element.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    key: String,
    scope: Scope,
    value: Value,
    start_value: Value,
    element: Option<ValueKind>,
}

impl Variable {
    pub fn new(key: impl Into<String>, scope: Scope, value: Value) -> Self {
        let element = match &value {
            Value::List(items) => items.first().map(Value::kind),
            _ => None,
        };
        Self {
            key: key.into(),
            scope,
            start_value: value.clone(),
            value,
            element,
        }
    }

    /// Fix the element kind of a list variable.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if the variable is not a list or already
    /// holds an element of another kind.
    pub fn with_element(mut self, element: ValueKind) -> Result<Self> {
        self.check_kind(ValueKind::List)?;
        self.element = Some(element);
        self.check_value(&self.value)?;
        Ok(self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn kind(&self) -> ValueKind {
        self.start_value.kind()
    }

    /// Kind of the elements of a list variable.
    pub fn element_kind(&self) -> Option<ValueKind> {
        self.element
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the value. The new value must have the declared kind.
    pub fn set(&mut self, value: Value) -> Result<()> {
        self.check_value(&value)?;
        self.value = value;
        Ok(())
    }

    pub fn apply(&mut self, op: SetOperator, operand: &Value) -> Result<()> {
        self.check_value(operand)?;
        self.value = self.value.apply(op, operand)?;
        Ok(())
    }

    /// Element `index` of a list variable.
    pub fn item(&self, index: i64) -> Result<&Value> {
        self.value.get_item(index)
    }

    pub fn set_item(&mut self, index: i64, item: Value) -> Result<()> {
        self.check_element(item.kind())?;
        self.value.set_item(index, item)
    }

    pub fn push_item(&mut self, item: Value) -> Result<()> {
        self.check_element(item.kind())?;
        self.value.push_item(item)
    }

    /// Number of elements of a list variable.
    pub fn item_count(&self) -> Result<usize> {
        self.value.len()
    }

    pub fn evaluate(&self, op: CompareOperator, operand: &Value) -> Result<bool> {
        self.check_kind(operand.kind())?;
        self.value.evaluate(op, operand)
    }

    /// Restore the value the variable was declared with.
    pub fn reset(&mut self) {
        self.value = self.start_value.clone();
    }

    /// Check that `value` could be stored here: same kind and, for a
    /// list, elements of the declared element kind.
    pub fn check_value(&self, value: &Value) -> Result<()> {
        self.check_kind(value.kind())?;
        if let Value::List(items) = value {
            for item in items {
                self.check_element(item.kind())?;
            }
        }
        Ok(())
    }

    fn check_element(&self, found: ValueKind) -> Result<()> {
        match self.element {
            Some(expected) if expected != found => Err(Error::TypeMismatch {
                key: self.key.clone(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    fn check_kind(&self, found: ValueKind) -> Result<()> {
        if found == self.kind() {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                key: self.key.clone(),
                expected: self.kind(),
                found,
            })
        }
    }
}

/// Declaration-ordered set of variables sharing one scope.
#[derive(Debug, Clone)]
pub struct VariableStore {
    scope: Scope,
    variables: IndexMap<String, Variable>,
}

impl VariableStore {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            variables: IndexMap::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Declare a new variable. Keys are unique within a store.
    ///
    /// # Errors
    ///
    /// [`Error::Duplicate`] for a taken key, [`Error::TypeMismatch`] for a
    /// list whose elements do not share one kind.
    pub fn declare(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        let variable = Variable::new(key.clone(), self.scope, value);
        self.insert(variable)
    }

    /// Declare a list variable whose elements are all `element` values.
    pub fn declare_list(
        &mut self,
        key: impl Into<String>,
        element: ValueKind,
        items: Vec<Value>,
    ) -> Result<()> {
        let key = key.into();
        let variable = Variable::new(key, self.scope, Value::List(items)).with_element(element)?;
        self.insert(variable)
    }

    fn insert(&mut self, variable: Variable) -> Result<()> {
        if self.variables.contains_key(variable.key()) {
            return Err(Error::Duplicate(variable.key));
        }
        variable.check_value(variable.value())?;
        self.variables.insert(variable.key.clone(), variable);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<&Variable> {
        self.variables
            .get(key)
            .ok_or_else(|| Error::Lookup(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Variable> {
        self.variables
            .get_mut(key)
            .ok_or_else(|| Error::Lookup(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn reset_all(&mut self) {
        for variable in self.variables.values_mut() {
            variable.reset();
        }
    }
}

/// The variables visible to one running step: its flowchart's locals plus
/// the engine-wide globals.
pub struct Vars<'a> {
    local: &'a mut VariableStore,
    global: &'a mut VariableStore,
}

impl<'a> Vars<'a> {
    pub fn new(local: &'a mut VariableStore, global: &'a mut VariableStore) -> Self {
        Self { local, global }
    }

    pub fn variable(&self, var: &VarRef) -> Result<&Variable> {
        match var.scope {
            Scope::Local => self.local.get(&var.key),
            Scope::Global => self.global.get(&var.key),
        }
    }

    pub fn variable_mut(&mut self, var: &VarRef) -> Result<&mut Variable> {
        match var.scope {
            Scope::Local => self.local.get_mut(&var.key),
            Scope::Global => self.global.get_mut(&var.key),
        }
    }

    pub fn value(&self, var: &VarRef) -> Result<&Value> {
        Ok(self.variable(var)?.value())
    }

    pub fn assign(&mut self, var: &VarRef, value: Value) -> Result<()> {
        self.variable_mut(var)?.set(value)
    }

    /// Put every variable of `scope` back to its declared value.
    pub fn reset(&mut self, scope: Scope) {
        match scope {
            Scope::Local => self.local.reset_all(),
            Scope::Global => self.global.reset_all(),
        }
    }

    /// Find a variable by bare key, locals first.
    pub fn find(&self, key: &str) -> Option<&Variable> {
        self.local.get(key).or_else(|_| self.global.get(key)).ok()
    }
}
