//! The [`Step`] trait and the [`Context`] a step receives when it is entered.

use crate::binding::AuthoringScope;
use crate::effect::Effect;
use crate::error::Result;
use crate::sequence::{Layout, Sequence, SequenceId};
use crate::variable::Vars;
use indexmap::IndexMap;
use std::time::Duration;

/// What a step asks the engine to do once its entry action returns.
#[derive(Debug)]
pub enum Flow {
    /// Advance to the next step in index order.
    Continue,
    /// Advance to an explicit index. An index past the end halts.
    Jump(usize),
    /// Stop the owning sequence.
    Halt,
    /// The step is waiting for an external event. The matching
    /// [`Completion`] was handed out by [`Context::suspend`].
    Suspend(Suspension),
}

/// How a suspended step finishes, delivered through [`Completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Continue,
    Jump(usize),
    Halt,
}

/// Proof that a completion callback exists for a suspended step.
///
/// Only [`Context::suspend`] creates one, always paired with its
/// [`Completion`].
#[derive(Debug)]
pub struct Suspension {
    pub(crate) ticket: u64,
}

/// The one-shot callback that resumes a suspended step.
///
/// Not `Clone`: handing it to [`Engine::complete`](crate::Engine::complete)
/// consumes it, so a step can be resumed at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct Completion {
    pub(crate) sequence: SequenceId,
    pub(crate) index: usize,
    pub(crate) ticket: u64,
}

impl Completion {
    pub fn sequence(&self) -> &SequenceId {
        &self.sequence
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Structural part a step plays in block pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Plain,
    /// Opens a conditional block (`if`).
    Condition,
    /// Continues a conditional chain with another test.
    ElseIf,
    /// Final branch of a conditional chain.
    Else,
    /// Opens a loop block.
    Loop,
    /// Closes the innermost open block.
    End,
}

/// Where a step was placed, handed to [`Step::on_added`].
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub flowchart: &'a str,
    pub sequence: &'a str,
    pub index: usize,
}

pub(crate) enum Request {
    Begin {
        target: SequenceId,
        start: usize,
        on_finish: Option<Completion>,
    },
    RaisePriority,
    LowerPriority,
}

/// Execution context passed to [`Step::enter`].
///
/// Gives the step its variables, its position and block pairing, and the
/// means to suspend, emit effects or start other sequences.
pub struct Context<'a> {
    pub(crate) sequence: &'a SequenceId,
    pub(crate) index: usize,
    pub(crate) previous: Option<usize>,
    pub(crate) layout: &'a Layout,
    pub(crate) vars: Vars<'a>,
    pub(crate) siblings: &'a IndexMap<String, Sequence>,
    pub(crate) effects: &'a mut Vec<Effect>,
    pub(crate) next_ticket: &'a mut u64,
    pub(crate) requests: Vec<Request>,
    /// This step's loop position, written back to the sequence after entry.
    pub(crate) loop_position: Option<usize>,
}

impl<'a> Context<'a> {
    pub fn sequence_id(&self) -> &SequenceId {
        self.sequence
    }

    /// Index of the step being entered.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the step that was active just before this entry.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn vars(&self) -> &Vars<'a> {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars<'a> {
        &mut self.vars
    }

    /// The `end` paired with this step, if it opens or continues a block.
    pub fn block_end(&self) -> Option<usize> {
        self.layout.block_end(self.index)
    }

    /// The next `elseif`/`else`/`end` in this step's conditional chain.
    pub fn next_branch(&self) -> Option<usize> {
        self.layout.next_branch(self.index)
    }

    /// The step that opened the block this step belongs to.
    pub fn opener(&self) -> Option<usize> {
        self.layout.opener(self.index)
    }

    /// The `end` of the innermost loop enclosing this step.
    pub fn loop_end(&self) -> Option<usize> {
        self.layout.loop_end(self.index)
    }

    /// The position this loop step recorded on its last pass of the
    /// current run, if any.
    pub fn loop_position(&self) -> Option<usize> {
        self.loop_position
    }

    /// Record this loop step's position. It is kept with the sequence's
    /// state, so snapshots capture it; `None` forgets it.
    pub fn set_loop_position(&mut self, position: Option<usize>) {
        self.loop_position = position;
    }

    pub fn role_at(&self, index: usize) -> Option<Role> {
        self.layout.role(index)
    }

    /// Whether `index` is a member of the same conditional chain as this step.
    pub fn in_same_chain(&self, index: usize) -> bool {
        self.layout.same_chain(self.index, index)
    }

    /// Run count of a sequence in the same flowchart.
    pub fn run_count_of(&self, sequence: &str) -> Option<u64> {
        self.siblings.get(sequence).map(Sequence::run_count)
    }

    pub fn run_count(&self) -> u64 {
        self.run_count_of(&self.sequence.sequence).unwrap_or(0)
    }

    /// Pass text to the host's output channel.
    pub fn emit(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::Output {
            sequence: self.sequence.clone(),
            text: text.into(),
        });
    }

    /// Register a completion callback for this entry.
    ///
    /// Return the [`Suspension`] from [`Step::enter`] and hand the
    /// [`Completion`] to whatever external event will finish the step.
    pub fn suspend(&mut self) -> (Suspension, Completion) {
        let ticket = *self.next_ticket;
        *self.next_ticket += 1;
        let completion = Completion {
            sequence: self.sequence.clone(),
            index: self.index,
            ticket,
        };
        (Suspension { ticket }, completion)
    }

    /// Suspend until a host timer fires after `delay`.
    pub fn wait(&mut self, delay: Duration) -> Flow {
        let (suspension, completion) = self.suspend();
        self.effects.push(Effect::Timer { delay, completion });
        Flow::Suspend(suspension)
    }

    /// Suspend until the host resolves the named external request.
    pub fn request(&mut self, name: impl Into<String>) -> Flow {
        let (suspension, completion) = self.suspend();
        self.effects.push(Effect::Request {
            name: name.into(),
            completion,
        });
        Flow::Suspend(suspension)
    }

    /// Start another sequence once this entry returns.
    pub fn begin(&mut self, target: SequenceId, start: usize) {
        self.requests.push(Request::Begin {
            target,
            start,
            on_finish: None,
        });
    }

    /// Start another sequence and suspend until it halts.
    pub fn begin_and_wait(&mut self, target: SequenceId, start: usize) -> Flow {
        let (suspension, completion) = self.suspend();
        self.requests.push(Request::Begin {
            target,
            start,
            on_finish: Some(completion),
        });
        Flow::Suspend(suspension)
    }

    pub fn raise_priority(&mut self) {
        self.requests.push(Request::RaisePriority);
    }

    pub fn lower_priority(&mut self) {
        self.requests.push(Request::LowerPriority);
    }
}

/// One executable step of a sequence.
///
/// To add a step type:
///
/// 1. Define `pub const NAME: &'static str` on the struct: the script
///    keyword used by the parser.
/// 2. Re-export the struct from `src/steps/mod.rs`.
/// 3. Add `(MyStep::NAME, MyStep::parse_boxed)` to the `REGISTRY` in
///    [`crate::parser`].
///
/// [`enter`](Self::enter) must lead to exactly one advance: return
/// `Continue`, `Jump` or `Halt` directly, or return `Suspend` and later
/// deliver the paired [`Completion`] exactly once.
pub trait Step: 'static {
    /// The step keyword, normally `Self::NAME`.
    fn name(&self) -> &'static str;

    /// Parse this step from the text following its keyword. Variable names
    /// are bound, and kind-checked, against `scope`.
    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Parse and box this step. Used as the function-pointer type stored in
    /// the step registry.
    fn parse_boxed(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Box<dyn Step>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args, scope)?))
    }

    /// The entry action.
    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow>;

    /// Short human-readable description for tooling.
    fn summary(&self) -> String;

    /// Why the step cannot do its job as configured, if it cannot.
    fn error(&self) -> Option<String> {
        None
    }

    /// Whether any parameter of this step is bound to `var`.
    fn references(&self, _var: &crate::variable::VarRef) -> bool {
        false
    }

    fn role(&self) -> Role {
        Role::Plain
    }

    /// Called once when the step is added to a sequence while authoring.
    fn on_added(&mut self, _placement: &Placement<'_>) {}

    /// Called when the owning sequence is halted while this step is active.
    fn on_stop(&mut self) {}
}
