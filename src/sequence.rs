//! Sequences: ordered step lists with their own execution pointer.

use crate::effect::PendingEntry;
use crate::step::{Completion, Role, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Fully qualified sequence name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId {
    pub flowchart: String,
    pub sequence: String,
}

impl SequenceId {
    pub fn new(flowchart: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            flowchart: flowchart.into(),
            sequence: sequence.into(),
        }
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.flowchart, self.sequence)
    }
}

/// Block pairing computed from the role of every step.
///
/// Built once per change to the step list; never consulted for anything
/// but structure.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    roles: Vec<Role>,
    /// For openers and branch markers: the closing `end`.
    end: Vec<Option<usize>>,
    /// For `if`/`elseif`: the next member of the chain.
    next_branch: Vec<Option<usize>>,
    /// For branch markers and `end`: the step that opened the block.
    opener: Vec<Option<usize>>,
    /// Innermost loop opener enclosing each step.
    enclosing_loop: Vec<Option<usize>>,
    indent: Vec<usize>,
    problems: Vec<String>,
}

struct OpenBlock {
    opener: usize,
    members: Vec<usize>,
    closed_by_else: bool,
}

impl Layout {
    pub fn new(roles: Vec<Role>) -> Self {
        let n = roles.len();
        let mut layout = Layout {
            end: vec![None; n],
            next_branch: vec![None; n],
            opener: vec![None; n],
            enclosing_loop: vec![None; n],
            indent: vec![0; n],
            problems: Vec::new(),
            roles,
        };
        let mut stack: Vec<OpenBlock> = Vec::new();

        for i in 0..n {
            layout.enclosing_loop[i] = stack
                .iter()
                .rev()
                .find(|block| layout.roles[block.opener] == Role::Loop)
                .map(|block| block.opener);
            layout.indent[i] = stack.len();

            match layout.roles[i] {
                Role::Plain => {}
                Role::Condition | Role::Loop => stack.push(OpenBlock {
                    opener: i,
                    members: vec![i],
                    closed_by_else: false,
                }),
                role @ (Role::ElseIf | Role::Else) => {
                    let keyword = if role == Role::Else { "else" } else { "elseif" };
                    let Some(block) = stack
                        .last_mut()
                        .filter(|b| layout.roles[b.opener] == Role::Condition && !b.closed_by_else)
                    else {
                        layout.problems.push(format!("step {i}: `{keyword}` without a matching `if`"));
                        continue;
                    };
                    if let Some(&last) = block.members.last() {
                        layout.next_branch[last] = Some(i);
                    }
                    block.members.push(i);
                    block.closed_by_else = role == Role::Else;
                    layout.opener[i] = Some(block.opener);
                    layout.indent[i] -= 1;
                }
                Role::End => {
                    let Some(block) = stack.pop() else {
                        layout.problems.push(format!("step {i}: `end` without an open block"));
                        continue;
                    };
                    for &member in &block.members {
                        layout.end[member] = Some(i);
                    }
                    if let Some(&last) = block.members.last() {
                        if layout.roles[last] != Role::Loop {
                            layout.next_branch[last] = Some(i);
                        }
                    }
                    layout.opener[i] = Some(block.opener);
                    layout.indent[i] -= 1;
                }
            }
        }

        for block in stack {
            layout
                .problems
                .push(format!("step {}: block is never closed by `end`", block.opener));
        }
        layout
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role(&self, index: usize) -> Option<Role> {
        self.roles.get(index).copied()
    }

    pub fn block_end(&self, index: usize) -> Option<usize> {
        self.end.get(index).copied().flatten()
    }

    pub fn next_branch(&self, index: usize) -> Option<usize> {
        self.next_branch.get(index).copied().flatten()
    }

    pub fn opener(&self, index: usize) -> Option<usize> {
        self.opener.get(index).copied().flatten()
    }

    /// The `end` of the innermost loop enclosing `index`.
    pub fn loop_end(&self, index: usize) -> Option<usize> {
        let opener = self.enclosing_loop.get(index).copied().flatten()?;
        self.block_end(opener)
    }

    pub fn indent(&self, index: usize) -> usize {
        self.indent.get(index).copied().unwrap_or(0)
    }

    /// Whether `a` and `b` belong to the same `if` chain (including its `end`).
    pub fn same_chain(&self, a: usize, b: usize) -> bool {
        match (self.chain_of(a), self.chain_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn chain_of(&self, index: usize) -> Option<usize> {
        match self.role(index)? {
            Role::Condition => Some(index),
            Role::ElseIf | Role::Else | Role::End => {
                let opener = self.opener(index)?;
                (self.role(opener) == Some(Role::Condition)).then_some(opener)
            }
            _ => None,
        }
    }

    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

/// Steps plus the layout derived from them.
#[derive(Default)]
pub(crate) struct Program {
    pub(crate) steps: Vec<Box<dyn Step>>,
    pub(crate) layout: Layout,
}

pub(crate) enum Waiting {
    /// The active step returned `Suspend` with this ticket.
    Step(u64),
    /// The active step's entry is deferred by the step delay.
    Entry(u64),
}

#[derive(Default)]
pub(crate) struct Cursor {
    pub(crate) active: Option<usize>,
    pub(crate) previous: Option<usize>,
    pub(crate) run_count: u64,
    pub(crate) waiting: Option<Waiting>,
    /// Loop opener index to the position of its current pass.
    pub(crate) loops: BTreeMap<usize, usize>,
    /// Callers suspended in `call ... wait` on this sequence.
    pub(crate) waiters: Vec<Completion>,
}

impl Cursor {
    pub(crate) fn matches_step(&self, completion: &Completion) -> bool {
        self.active == Some(completion.index)
            && matches!(self.waiting, Some(Waiting::Step(t)) if t == completion.ticket)
    }

    pub(crate) fn matches_entry(&self, entry: &PendingEntry) -> bool {
        self.active == Some(entry.index)
            && matches!(self.waiting, Some(Waiting::Entry(t)) if t == entry.ticket)
    }
}

/// An ordered list of steps executed one at a time.
///
/// The step list is fixed once authoring is done; at run time only the
/// active pointer, the previous pointer and the run count move.
pub struct Sequence {
    name: String,
    step_delay: Option<Duration>,
    pub(crate) program: Program,
    pub(crate) cursor: Cursor,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_delay: None,
            program: Program::default(),
            cursor: Cursor::default(),
        }
    }

    /// Defer every step entry by `delay`.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay).filter(|d| !d.is_zero());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_delay(&self) -> Option<Duration> {
        self.step_delay
    }

    pub(crate) fn push(&mut self, step: Box<dyn Step>) -> usize {
        self.program.steps.push(step);
        let roles = self.program.steps.iter().map(|s| s.role()).collect();
        self.program.layout = Layout::new(roles);
        self.program.steps.len() - 1
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> Option<&mut Box<dyn Step>> {
        self.program.steps.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.program.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&dyn Step> {
        self.program.steps.get(index).map(|s| s.as_ref())
    }

    pub fn steps(&self) -> impl Iterator<Item = &dyn Step> {
        self.program.steps.iter().map(|s| s.as_ref())
    }

    pub fn layout(&self) -> &Layout {
        &self.program.layout
    }

    pub fn run_count(&self) -> u64 {
        self.cursor.run_count
    }

    pub fn active_pointer(&self) -> Option<usize> {
        self.cursor.active
    }

    pub fn previous_pointer(&self) -> Option<usize> {
        self.cursor.previous
    }

    pub fn is_running(&self) -> bool {
        self.cursor.active.is_some()
    }

    /// Whether the active step is waiting on a completion or a delayed entry.
    pub fn is_waiting(&self) -> bool {
        self.cursor.waiting.is_some()
    }

    /// Authoring problems: unpaired blocks and misconfigured steps.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut found: Vec<String> = self.program.layout.problems().to_vec();
        for (i, step) in self.program.steps.iter().enumerate() {
            if let Some(err) = step.error() {
                found.push(format!("step {i} ({}): {err}", step.name()));
            }
        }
        found
    }

    /// Indented one-line summary per step.
    pub fn listing(&self) -> Vec<String> {
        self.program
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let pad = "  ".repeat(self.program.layout.indent(i));
                format!("{i:>3} {pad}{}", step.summary())
            })
            .collect()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("name", &self.name)
            .field("steps", &self.program.steps.len())
            .field("active", &self.cursor.active)
            .field("previous", &self.cursor.previous)
            .field("run_count", &self.cursor.run_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Role::*;

    #[test]
    fn test_if_chain_pairing() {
        // 0 if, 1 body, 2 elseif, 3 body, 4 else, 5 body, 6 end
        let layout = Layout::new(vec![Condition, Plain, ElseIf, Plain, Else, Plain, End]);
        assert!(layout.problems().is_empty());
        assert_eq!(layout.next_branch(0), Some(2));
        assert_eq!(layout.next_branch(2), Some(4));
        assert_eq!(layout.next_branch(4), Some(6));
        for member in [0, 2, 4] {
            assert_eq!(layout.block_end(member), Some(6));
        }
        assert_eq!(layout.opener(6), Some(0));
        assert!(layout.same_chain(0, 4));
        assert!(layout.same_chain(2, 6));
        assert!(!layout.same_chain(1, 2));
        assert_eq!(layout.indent(1), 1);
        assert_eq!(layout.indent(4), 0);
    }

    #[test]
    fn test_nested_loops() {
        // 0 while, 1 foreach, 2 break, 3 end, 4 break, 5 end
        let layout = Layout::new(vec![Loop, Loop, Plain, End, Plain, End]);
        assert_eq!(layout.block_end(0), Some(5));
        assert_eq!(layout.block_end(1), Some(3));
        assert_eq!(layout.loop_end(2), Some(3));
        assert_eq!(layout.loop_end(4), Some(5));
        assert_eq!(layout.loop_end(0), None);
        assert_eq!(layout.opener(3), Some(1));
        assert!(!layout.same_chain(0, 5));
    }

    #[test]
    fn test_unpaired_blocks_are_reported() {
        let layout = Layout::new(vec![End, Condition, Else, Else, Plain]);
        assert_eq!(layout.problems().len(), 3);
        assert_eq!(layout.block_end(1), None);

        let layout = Layout::new(vec![Loop, Else, End]);
        assert_eq!(layout.problems().len(), 1);
        assert_eq!(layout.block_end(0), Some(2));
    }
}
