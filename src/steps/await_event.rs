//! [`Await`] step: suspends until the host resolves a named event.
//!
//! Script syntax: `await "door_opened"`
//!
//! The host receives an [`Effect::Request`](crate::Effect::Request) carrying
//! the event name and the completion. How the event resolves decides how
//! the sequence goes on: it may continue, jump or halt.

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::parser::parse_quoted_string;
use crate::step::{Context, Flow, Step};
use tracing::debug;

pub struct Await {
    pub event: String,
}

impl Await {
    pub const NAME: &'static str = "await";

    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
        }
    }
}

impl Step for Await {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        Ok(ctx.request(self.event.clone()))
    }

    fn summary(&self) -> String {
        format!("await {:?}", self.event)
    }

    fn error(&self) -> Option<String> {
        self.event
            .is_empty()
            .then(|| "no event name given".to_string())
    }

    fn on_stop(&mut self) {
        debug!(event = %self.event, "await abandoned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::step::Resume;
    use crate::steps::harness::{main_id, outputs, run};

    #[test]
    fn test_request_resolved_with_jump() {
        let mut engine = run("await \"choice\"\nlog \"skipped\"\nlog \"chosen\"\n");
        let completion = match engine.drain_effects().pop() {
            Some(Effect::Request { name, completion }) => {
                assert_eq!(name, "choice");
                completion
            }
            other => panic!("unexpected effect: {other:?}"),
        };
        assert!(engine.complete(completion, Resume::Jump(2)).unwrap());
        assert_eq!(outputs(&engine.drain_effects()), vec!["chosen"]);
    }

    #[test]
    fn test_halt_makes_completion_stale() {
        let mut engine = run("await \"never\"\nlog \"unreachable\"\n");
        let Some(Effect::Request { completion, .. }) = engine.drain_effects().pop() else {
            panic!("expected a request");
        };
        engine.halt(&main_id()).unwrap();
        assert!(!engine.complete(completion, Resume::Continue).unwrap());
        assert!(outputs(&engine.drain_effects()).is_empty());
    }
}
