//! The owning container for local variables and named sequences.

use crate::binding::AuthoringScope;
use crate::error::{Error, Result};
use crate::sequence::{Sequence, SequenceId};
use crate::step::{Placement, Step};
use crate::value::Value;
use crate::variable::{Scope, VarRef, VariableStore};
use indexmap::IndexMap;

#[derive(Debug)]
pub struct Flowchart {
    name: String,
    pub(crate) variables: VariableStore,
    pub(crate) sequences: IndexMap<String, Sequence>,
}

impl Flowchart {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: VariableStore::new(Scope::Local),
            sequences: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn declare(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.variables.declare(key, value)
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> Result<()> {
        if self.sequences.contains_key(sequence.name()) {
            return Err(Error::Duplicate(format!("{}:{}", self.name, sequence.name())));
        }
        self.sequences.insert(sequence.name().to_string(), sequence);
        Ok(())
    }

    /// Append a step to a sequence and run its authoring hook.
    ///
    /// Returns the index the step was placed at.
    pub fn add_step(&mut self, sequence: &str, step: Box<dyn Step>) -> Result<usize> {
        let target = self
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| Error::SequenceNotFound(SequenceId::new(&self.name, sequence)))?;
        let index = target.push(step);
        let placement = Placement {
            flowchart: &self.name,
            sequence,
            index,
        };
        if let Some(step) = target.step_mut(index) {
            step.on_added(&placement);
        }
        Ok(index)
    }

    pub fn sequence(&self, name: &str) -> Result<&Sequence> {
        self.sequences
            .get(name)
            .ok_or_else(|| Error::SequenceNotFound(SequenceId::new(&self.name, name)))
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn id(&self, sequence: &str) -> SequenceId {
        SequenceId::new(&self.name, sequence)
    }

    /// The declarations visible to steps authored in this flowchart.
    pub fn scope<'a>(&'a self, globals: &'a VariableStore) -> AuthoringScope<'a> {
        AuthoringScope::new(&self.variables, globals)
    }

    pub fn is_running(&self) -> bool {
        self.sequences.values().any(Sequence::is_running)
    }

    /// Every step bound to `var`, as `(sequence, index)`.
    pub fn find_references(&self, var: &VarRef) -> Vec<(String, usize)> {
        let mut found = Vec::new();
        for sequence in self.sequences.values() {
            for (index, step) in sequence.steps().enumerate() {
                if step.references(var) {
                    found.push((sequence.name().to_string(), index));
                }
            }
        }
        found
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.sequences
            .values()
            .flat_map(|s| {
                s.diagnostics()
                    .into_iter()
                    .map(move |d| format!("{}:{}: {d}", self.name, s.name()))
            })
            .collect()
    }
}
