//! Effects the engine hands to its host.
//!
//! The engine never sleeps, reads input or prints. Anything that happens
//! outside a single synchronous turn is described by an [`Effect`] and left
//! for the host to carry out; timers and requests come back through
//! [`Engine::complete`](crate::Engine::complete), delayed entries through
//! [`Engine::enter_due`](crate::Engine::enter_due).

use crate::sequence::SequenceId;
use crate::step::Completion;
use std::time::Duration;

#[derive(Debug)]
pub enum Effect {
    /// A step is waiting on a timer. Complete it once `delay` has elapsed.
    Timer {
        delay: Duration,
        completion: Completion,
    },
    /// The pointer already moved to the next step; enter it once `delay`
    /// has elapsed.
    Delay { delay: Duration, entry: PendingEntry },
    /// Text for the host's output channel.
    Output { sequence: SequenceId, text: String },
    /// A step is waiting on a named external event.
    Request { name: String, completion: Completion },
    /// A sequence halted.
    Finished { sequence: SequenceId },
    /// No sequence of this flowchart is running any more.
    Idle { flowchart: String },
}

/// A step entry deferred by a per-sequence step delay.
///
/// One-shot, like [`Completion`].
#[derive(Debug, PartialEq, Eq)]
pub struct PendingEntry {
    pub(crate) sequence: SequenceId,
    pub(crate) index: usize,
    pub(crate) ticket: u64,
}

impl PendingEntry {
    pub fn sequence(&self) -> &SequenceId {
        &self.sequence
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
