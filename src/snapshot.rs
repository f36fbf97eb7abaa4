//! Execution-state capture and restore.
//!
//! A snapshot names variable values and sequence bookkeeping: run count,
//! active and previous pointer, and the position of every loop in flight. Restoring never enters a step: it only
//! re-establishes bookkeeping. Use [`Engine::resume`] to continue a
//! restored run.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::sequence::SequenceId;
use crate::value::Value;
use crate::variable::VariableStore;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    #[serde(default)]
    pub globals: IndexMap<String, Value>,
    #[serde(default)]
    pub flowcharts: IndexMap<String, FlowchartSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowchartSnapshot {
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    #[serde(default)]
    pub sequences: IndexMap<String, SequenceSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub run_count: u64,
    #[serde(default)]
    pub active: Option<usize>,
    #[serde(default)]
    pub previous: Option<usize>,
    /// Loop opener index to the position of its current pass.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loops: BTreeMap<usize, usize>,
}

impl ExecutionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn capture_store(store: &VariableStore) -> IndexMap<String, Value> {
    store
        .iter()
        .map(|v| (v.key().to_string(), v.value().clone()))
        .collect()
}

fn check_store(store: &VariableStore, values: &IndexMap<String, Value>) -> Result<()> {
    for (key, value) in values {
        store.get(key)?.check_value(value)?;
    }
    Ok(())
}

fn check_pointer(pointer: Option<usize>, len: usize) -> Result<()> {
    match pointer {
        Some(index) if index >= len => Err(Error::Index {
            index: index as i64,
            len,
        }),
        _ => Ok(()),
    }
}

impl Engine {
    /// Capture every variable and every sequence's bookkeeping.
    pub fn snapshot(&self) -> ExecutionSnapshot {
        let flowcharts = self
            .flowcharts
            .values()
            .map(|fc| {
                let sequences = fc
                    .sequences()
                    .map(|s| {
                        let state = SequenceSnapshot {
                            run_count: s.run_count(),
                            active: s.active_pointer(),
                            previous: s.previous_pointer(),
                            loops: s.cursor.loops.clone(),
                        };
                        (s.name().to_string(), state)
                    })
                    .collect();
                let state = FlowchartSnapshot {
                    variables: capture_store(fc.variables()),
                    sequences,
                };
                (fc.name().to_string(), state)
            })
            .collect();
        ExecutionSnapshot {
            globals: capture_store(&self.globals),
            flowcharts,
        }
    }

    /// Apply a snapshot.
    ///
    /// Every named item is validated first; on any error nothing is
    /// changed. Items the snapshot does not name are left untouched.
    /// Restored sequences drop their pending completions and delayed
    /// entries, so completions issued before the restore become stale.
    pub fn restore(&mut self, snapshot: &ExecutionSnapshot) -> Result<()> {
        check_store(&self.globals, &snapshot.globals)?;
        for (name, state) in &snapshot.flowcharts {
            let flowchart = self.flowchart(name)?;
            check_store(flowchart.variables(), &state.variables)?;
            for (sequence, pointers) in &state.sequences {
                let len = self.sequence(&SequenceId::new(name, sequence))?.len();
                check_pointer(pointers.active, len)?;
                check_pointer(pointers.previous, len)?;
                for &opener in pointers.loops.keys() {
                    check_pointer(Some(opener), len)?;
                }
            }
        }

        // Validated: nothing below can fail.
        for (key, value) in &snapshot.globals {
            if let Ok(variable) = self.globals.get_mut(key) {
                variable.set(value.clone())?;
            }
        }
        for (name, state) in &snapshot.flowcharts {
            let Ok(flowchart) = self.flowchart_mut(name) else {
                continue;
            };
            for (key, value) in &state.variables {
                flowchart.variables.get_mut(key)?.set(value.clone())?;
            }
            for (sequence, pointers) in &state.sequences {
                let Some(target) = flowchart.sequences.get_mut(sequence) else {
                    continue;
                };
                let cursor = &mut target.cursor;
                cursor.run_count = pointers.run_count;
                cursor.active = pointers.active;
                cursor.previous = pointers.previous;
                cursor.loops = pointers.loops.clone();
                cursor.waiting = None;
            }
        }
        debug!(
            globals = snapshot.globals.len(),
            flowcharts = snapshot.flowcharts.len(),
            "snapshot restored"
        );
        Ok(())
    }
}
