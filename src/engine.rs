//! The sequencing engine.
//!
//! All work goes through one FIFO queue that is drained iteratively: a
//! `begin`, the entry of the next step, or the delivery of a completion.
//! Public operations enqueue their work and drain the queue before they
//! return, so between calls every running sequence is either waiting on a
//! [`Completion`], waiting on a delayed entry, or restored and idle.

use crate::binding::AuthoringScope;
use crate::effect::{Effect, PendingEntry};
use crate::error::{Error, Result};
use crate::flowchart::Flowchart;
use crate::priority::PriorityDepth;
use crate::sequence::{Program, Sequence, SequenceId, Waiting};
use crate::step::{Completion, Context, Flow, Request, Resume, Step};
use crate::value::Value;
use crate::variable::{Scope, VarRef, VariableStore, Vars};
use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::{debug, error, warn};

enum Work {
    Begin {
        target: SequenceId,
        start: usize,
        on_finish: Option<Completion>,
    },
    Enter {
        sequence: SequenceId,
        index: usize,
    },
    Complete {
        completion: Completion,
        resume: Resume,
    },
}

/// Owns every flowchart, the global variables and the priority depth.
pub struct Engine {
    pub(crate) flowcharts: IndexMap<String, Flowchart>,
    pub(crate) globals: VariableStore,
    priority: PriorityDepth,
    work: VecDeque<Work>,
    effects: Vec<Effect>,
    next_ticket: u64,
    failures: Vec<Error>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            flowcharts: IndexMap::new(),
            globals: VariableStore::new(Scope::Global),
            priority: PriorityDepth::new(),
            work: VecDeque::new(),
            effects: Vec::new(),
            next_ticket: 1,
            failures: Vec::new(),
        }
    }

    pub fn declare_global(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.globals.declare(key, value)
    }

    pub fn globals(&self) -> &VariableStore {
        &self.globals
    }

    pub fn add_flowchart(&mut self, flowchart: Flowchart) -> Result<()> {
        if self.flowcharts.contains_key(flowchart.name()) {
            return Err(Error::Duplicate(flowchart.name().to_string()));
        }
        self.flowcharts
            .insert(flowchart.name().to_string(), flowchart);
        Ok(())
    }

    pub fn flowchart(&self, name: &str) -> Result<&Flowchart> {
        self.flowcharts
            .get(name)
            .ok_or_else(|| Error::FlowchartNotFound(name.to_string()))
    }

    pub fn flowchart_mut(&mut self, name: &str) -> Result<&mut Flowchart> {
        self.flowcharts
            .get_mut(name)
            .ok_or_else(|| Error::FlowchartNotFound(name.to_string()))
    }

    pub fn flowcharts(&self) -> impl Iterator<Item = &Flowchart> {
        self.flowcharts.values()
    }

    /// Declarations visible to steps authored in `flowchart`.
    pub fn scope(&self, flowchart: &str) -> Result<AuthoringScope<'_>> {
        Ok(self.flowchart(flowchart)?.scope(&self.globals))
    }

    /// Append an authored step to a sequence.
    pub fn add_step(&mut self, id: &SequenceId, step: Box<dyn Step>) -> Result<usize> {
        self.flowchart_mut(&id.flowchart)?
            .add_step(&id.sequence, step)
    }

    pub fn sequence(&self, id: &SequenceId) -> Result<&Sequence> {
        self.flowchart(&id.flowchart)?
            .sequences
            .get(&id.sequence)
            .ok_or_else(|| Error::SequenceNotFound(id.clone()))
    }

    fn sequence_mut(&mut self, id: &SequenceId) -> Result<&mut Sequence> {
        self.flowchart_mut(&id.flowchart)?
            .sequences
            .get_mut(&id.sequence)
            .ok_or_else(|| Error::SequenceNotFound(id.clone()))
    }

    pub fn run_count(&self, id: &SequenceId) -> Result<u64> {
        Ok(self.sequence(id)?.run_count())
    }

    pub fn active_pointer(&self, id: &SequenceId) -> Result<Option<usize>> {
        Ok(self.sequence(id)?.active_pointer())
    }

    pub fn is_running(&self, id: &SequenceId) -> Result<bool> {
        Ok(self.sequence(id)?.is_running())
    }

    /// Current value of a variable as seen from `flowchart`.
    pub fn value(&self, flowchart: &str, var: &VarRef) -> Result<&Value> {
        let store = match var.scope {
            Scope::Local => &self.flowchart(flowchart)?.variables,
            Scope::Global => &self.globals,
        };
        Ok(store.get(&var.key)?.value())
    }

    /// Type-checked write from the host.
    pub fn set_value(&mut self, flowchart: &str, var: &VarRef, value: Value) -> Result<()> {
        let store = match var.scope {
            Scope::Local => &mut self.flowchart_mut(flowchart)?.variables,
            Scope::Global => &mut self.globals,
        };
        store.get_mut(&var.key)?.set(value)
    }

    /// Every step in any flowchart bound to `var`. Local references only
    /// match inside `flowchart`.
    pub fn find_references(&self, flowchart: &str, var: &VarRef) -> Vec<(SequenceId, usize)> {
        self.flowcharts
            .values()
            .filter(|fc| var.scope == Scope::Global || fc.name() == flowchart)
            .flat_map(|fc| {
                fc.find_references(var)
                    .into_iter()
                    .map(|(sequence, index)| (fc.id(&sequence), index))
            })
            .collect()
    }

    pub fn priority(&self) -> &PriorityDepth {
        &self.priority
    }

    pub fn priority_mut(&mut self) -> &mut PriorityDepth {
        &mut self.priority
    }

    /// Take every effect emitted since the last call.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// Start a sequence from its first step.
    pub fn begin(&mut self, id: &SequenceId) -> Result<()> {
        self.begin_at(id, 0)
    }

    /// Start a sequence from `start`. A start past the last step counts as
    /// a run that halts immediately.
    ///
    /// # Errors
    ///
    /// [`Error::SequenceBusy`] if the sequence already has an active step,
    /// or the first error raised by any step entered before the queue
    /// drained.
    pub fn begin_at(&mut self, id: &SequenceId, start: usize) -> Result<()> {
        if self.sequence(id)?.is_running() {
            return Err(Error::SequenceBusy(id.clone()));
        }
        self.work.push_back(Work::Begin {
            target: id.clone(),
            start,
            on_finish: None,
        });
        self.run()
    }

    /// Deliver a suspended step's completion.
    ///
    /// Returns `Ok(false)` if the completion is stale: its sequence was
    /// halted, restored, or has moved on.
    pub fn complete(&mut self, completion: Completion, resume: Resume) -> Result<bool> {
        let live = self
            .sequence(&completion.sequence)
            .is_ok_and(|s| s.cursor.matches_step(&completion));
        if !live {
            warn!(
                sequence = %completion.sequence,
                index = completion.index,
                "stale completion ignored"
            );
            return Ok(false);
        }
        self.work.push_back(Work::Complete { completion, resume });
        self.run()?;
        Ok(true)
    }

    /// Enter a step whose entry was deferred by the step delay.
    pub fn enter_due(&mut self, entry: PendingEntry) -> Result<bool> {
        let sequence = match self.sequence_mut(&entry.sequence) {
            Ok(sequence) if sequence.cursor.matches_entry(&entry) => sequence,
            _ => {
                debug!(sequence = %entry.sequence, index = entry.index, "stale entry ignored");
                return Ok(false);
            }
        };
        sequence.cursor.waiting = None;
        self.work.push_back(Work::Enter {
            sequence: entry.sequence,
            index: entry.index,
        });
        self.run()?;
        Ok(true)
    }

    /// Stop a sequence. Halting an idle sequence does nothing.
    pub fn halt(&mut self, id: &SequenceId) -> Result<()> {
        if !self.sequence(id)?.is_running() {
            return Ok(());
        }
        self.stop(id, true)?;
        self.run()
    }

    /// Re-enter the active step of a restored sequence.
    ///
    /// The run count is not touched: this continues the run the snapshot
    /// was taken in.
    pub fn resume(&mut self, id: &SequenceId) -> Result<()> {
        let sequence = self.sequence(id)?;
        let Some(index) = sequence.active_pointer() else {
            return Err(Error::NothingToResume(id.clone()));
        };
        if sequence.is_waiting() {
            return Err(Error::SequenceBusy(id.clone()));
        }
        self.work.push_back(Work::Enter {
            sequence: id.clone(),
            index,
        });
        self.run()
    }

    fn issue_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn run(&mut self) -> Result<()> {
        while let Some(work) = self.work.pop_front() {
            let result = match work {
                Work::Begin {
                    target,
                    start,
                    on_finish,
                } => self.start(&target, start, on_finish),
                Work::Enter { sequence, index } => self.enter(&sequence, index),
                Work::Complete { completion, resume } => self.resolve(completion, resume),
            };
            if let Err(err) = result {
                self.failures.push(err);
            }
        }

        let mut failures = self.failures.drain(..);
        let first = failures.next();
        for later in failures {
            error!(%later, "additional failure while draining");
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&mut self, id: &SequenceId, start: usize, on_finish: Option<Completion>) -> Result<()> {
        let busy = match self.sequence(id) {
            Ok(sequence) => sequence.is_running(),
            Err(err) => {
                self.release(on_finish);
                return Err(err);
            }
        };
        if busy {
            warn!(sequence = %id, "sequence is already executing, begin ignored");
            self.release(on_finish);
            return Ok(());
        }

        let sequence = self.sequence_mut(id)?;
        let cursor = &mut sequence.cursor;
        cursor.run_count += 1;
        cursor.active = None;
        cursor.previous = None;
        cursor.waiting = None;
        cursor.loops.clear();
        cursor.waiters.extend(on_finish);
        debug!(sequence = %id, run = cursor.run_count, start, "begin");
        self.goto(id, start)
    }

    /// Move the pointer to `target` and queue (or defer) its entry.
    fn goto(&mut self, id: &SequenceId, target: usize) -> Result<()> {
        let sequence = self.sequence_mut(id)?;
        if target >= sequence.len() {
            debug!(sequence = %id, target, "ran past the last step");
            return self.stop(id, false);
        }
        let cursor = &mut sequence.cursor;
        cursor.previous = cursor.active.replace(target);
        cursor.waiting = None;

        let Some(delay) = sequence.step_delay() else {
            self.work.push_back(Work::Enter {
                sequence: id.clone(),
                index: target,
            });
            return Ok(());
        };
        let ticket = self.issue_ticket();
        self.sequence_mut(id)?.cursor.waiting = Some(Waiting::Entry(ticket));
        self.effects.push(Effect::Delay {
            delay,
            entry: PendingEntry {
                sequence: id.clone(),
                index: target,
                ticket,
            },
        });
        Ok(())
    }

    fn enter(&mut self, id: &SequenceId, index: usize) -> Result<()> {
        let Self {
            flowcharts,
            globals,
            effects,
            next_ticket,
            ..
        } = self;
        let Flowchart {
            variables,
            sequences,
            ..
        } = flowcharts
            .get_mut(&id.flowchart)
            .ok_or_else(|| Error::FlowchartNotFound(id.flowchart.clone()))?;
        let sequence = sequences
            .get_mut(&id.sequence)
            .ok_or_else(|| Error::SequenceNotFound(id.clone()))?;
        if sequence.cursor.active != Some(index) || sequence.cursor.waiting.is_some() {
            debug!(sequence = %id, index, "stale entry skipped");
            return Ok(());
        }
        let previous = sequence.cursor.previous;
        let loop_position = sequence.cursor.loops.get(&index).copied();

        // The step list is moved out for the duration of the entry so the
        // step can read sibling run counts while it is borrowed mutably.
        let mut program = std::mem::take(&mut sequence.program);
        let (outcome, requests, loop_position) = {
            let Program { steps, layout } = &mut program;
            match steps.get_mut(index) {
                Some(step) => {
                    debug!(sequence = %id, index, step = step.name(), "enter");
                    let mut ctx = Context {
                        sequence: id,
                        index,
                        previous,
                        layout: &*layout,
                        vars: Vars::new(&mut *variables, &mut *globals),
                        siblings: &*sequences,
                        effects: &mut *effects,
                        next_ticket: &mut *next_ticket,
                        requests: Vec::new(),
                        loop_position,
                    };
                    let outcome = step.enter(&mut ctx);
                    (outcome, ctx.requests, ctx.loop_position)
                }
                None => (Ok(Flow::Halt), Vec::new(), None),
            }
        };
        if let Some(sequence) = sequences.get_mut(&id.sequence) {
            sequence.program = program;
            match loop_position {
                Some(position) => sequence.cursor.loops.insert(index, position),
                None => sequence.cursor.loops.remove(&index),
            };
        }

        // Requests take effect before the step's own flow, so a called
        // sequence is already running when its caller halts or moves on.
        for request in requests {
            match request {
                Request::Begin {
                    target,
                    start,
                    on_finish,
                } => {
                    if let Err(err) = self.start(&target, start, on_finish) {
                        self.failures.push(err);
                    }
                }
                Request::RaisePriority => self.priority.increase(),
                Request::LowerPriority => self.priority.decrease(),
            }
        }

        match outcome {
            Ok(Flow::Continue) => self.goto(id, index + 1),
            Ok(Flow::Jump(target)) => {
                debug!(sequence = %id, from = index, to = target, "jump");
                self.goto(id, target)
            }
            Ok(Flow::Halt) => self.stop(id, false),
            Ok(Flow::Suspend(suspension)) => {
                debug!(sequence = %id, index, ticket = suspension.ticket, "suspended");
                self.sequence_mut(id)?.cursor.waiting = Some(Waiting::Step(suspension.ticket));
                Ok(())
            }
            Err(err) => {
                error!(sequence = %id, index, %err, "step failed, halting sequence");
                self.stop(id, false)?;
                Err(err)
            }
        }
    }

    fn resolve(&mut self, completion: Completion, resume: Resume) -> Result<()> {
        let sequence = self.sequence_mut(&completion.sequence)?;
        if !sequence.cursor.matches_step(&completion) {
            debug!(sequence = %completion.sequence, "completion no longer live");
            return Ok(());
        }
        sequence.cursor.waiting = None;
        let id = completion.sequence;
        match resume {
            Resume::Continue => self.goto(&id, completion.index + 1),
            Resume::Jump(target) => self.goto(&id, target),
            Resume::Halt => self.stop(&id, false),
        }
    }

    /// Halt `id`: clear the pointer, release `call ... wait` callers and
    /// report the sequence (and possibly its flowchart) finished.
    fn stop(&mut self, id: &SequenceId, notify_step: bool) -> Result<()> {
        let sequence = self.sequence_mut(id)?;
        let active = sequence.cursor.active.take();
        sequence.cursor.waiting = None;
        sequence.cursor.loops.clear();
        let waiters = std::mem::take(&mut sequence.cursor.waiters);
        if notify_step {
            if let Some(step) = active.and_then(|i| sequence.step_mut(i)) {
                step.on_stop();
            }
        }
        debug!(sequence = %id, run = sequence.run_count(), "halted");

        for waiter in waiters {
            self.release(Some(waiter));
        }
        self.effects.push(Effect::Finished {
            sequence: id.clone(),
        });
        if !self.flowchart(&id.flowchart)?.is_running() {
            self.effects.push(Effect::Idle {
                flowchart: id.flowchart.clone(),
            });
        }
        Ok(())
    }

    fn release(&mut self, waiter: Option<Completion>) {
        if let Some(completion) = waiter {
            self.work.push_back(Work::Complete {
                completion,
                resume: Resume::Continue,
            });
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("flowcharts", &self.flowcharts)
            .field("globals", &self.globals)
            .field("priority", &self.priority)
            .field("pending_effects", &self.effects.len())
            .finish()
    }
}
