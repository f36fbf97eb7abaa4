//! [`PriorityShift`] step: moves the engine's priority depth.
//!
//! Script syntax: `priority up` or `priority down`

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::step::{Context, Flow, Step};
use anyhow::anyhow;

pub struct PriorityShift {
    pub raise: bool,
}

impl PriorityShift {
    pub const NAME: &'static str = "priority";
}

impl Step for PriorityShift {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        match args.trim() {
            "up" => Ok(Self { raise: true }),
            "down" => Ok(Self { raise: false }),
            other => Err(anyhow!("Expected `up` or `down`, got: {}", other)),
        }
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        if self.raise {
            ctx.raise_priority();
        } else {
            ctx.lower_priority();
        }
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        let direction = if self.raise { "up" } else { "down" };
        format!("priority {direction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::PriorityEvent;
    use crate::steps::harness::main_id;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_parse() {
        let store = crate::VariableStore::new(crate::Scope::Local);
        let scope = AuthoringScope::new(&store, &store);
        assert!(PriorityShift::parse("up", &scope).unwrap().raise);
        assert!(!PriorityShift::parse(" down ", &scope).unwrap().raise);
        assert!(PriorityShift::parse("sideways", &scope).is_err());
    }

    #[test]
    fn test_steps_drive_priority_listeners() {
        let mut engine = crate::Engine::from(
            crate::parse_str("priority up\npriority up\npriority down\npriority down\n").unwrap(),
        );
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        engine
            .priority_mut()
            .subscribe(move |event| sink.borrow_mut().push(event));
        engine.begin(&main_id()).unwrap();

        let events = events.borrow();
        assert_eq!(events.first(), Some(&PriorityEvent::Start));
        assert_eq!(events.last(), Some(&PriorityEvent::End));
        assert_eq!(events.len(), 6);
        assert_eq!(engine.priority().depth(), 0);
    }
}
