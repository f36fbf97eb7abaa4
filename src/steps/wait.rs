//! [`Wait`] step: suspends the sequence on a host timer.
//!
//! Script syntax: `wait 500ms`, `wait 1.5s`, `wait 200ms..400ms` or
//! `wait delay` where `delay` is a float variable holding seconds.

use crate::binding::{AuthoringScope, Binding};
use crate::error::Result;
use crate::parser::{is_identifier, parse_duration};
use crate::step::{Context, Flow, Step};
use crate::variable::VarRef;
use rand::Rng;
use std::time::Duration;

/// How long a [`Wait`] lasts.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitFor {
    Fixed(Duration),
    /// Uniformly random between the two bounds, inclusive.
    Between(Duration, Duration),
    /// Seconds read from a binding at entry; negative values wait zero.
    Seconds(Binding<f64>),
}

pub struct Wait {
    pub duration: WaitFor,
}

impl Wait {
    pub const NAME: &'static str = "wait";

    pub fn new(duration: Duration) -> Self {
        Self {
            duration: WaitFor::Fixed(duration),
        }
    }

    fn resolve(&self, ctx: &Context<'_>) -> Duration {
        match &self.duration {
            WaitFor::Fixed(duration) => *duration,
            WaitFor::Between(min, max) => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(ms as u64)
            }
            WaitFor::Seconds(seconds) => {
                Duration::try_from_secs_f64(seconds.get(ctx.vars())).unwrap_or(Duration::ZERO)
            }
        }
    }
}

impl Step for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let args = args.trim();
        let duration = if let Some((min, max)) = args.split_once("..") {
            let (min, max) = (parse_duration(min)?, parse_duration(max)?);
            if min > max {
                return Err(anyhow::anyhow!("Wait range is reversed: {}", args));
            }
            WaitFor::Between(min, max)
        } else if is_identifier(args) {
            WaitFor::Seconds(scope.bind(args, 0.0)?)
        } else {
            WaitFor::Fixed(parse_duration(args)?)
        };
        Ok(Self { duration })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let duration = self.resolve(ctx);
        Ok(ctx.wait(duration))
    }

    fn summary(&self) -> String {
        match &self.duration {
            WaitFor::Fixed(d) => format!("wait {}ms", d.as_millis()),
            WaitFor::Between(min, max) => {
                format!("wait {}ms..{}ms", min.as_millis(), max.as_millis())
            }
            WaitFor::Seconds(seconds) => format!("wait {} seconds", seconds.describe()),
        }
    }

    fn references(&self, var: &VarRef) -> bool {
        matches!(&self.duration, WaitFor::Seconds(seconds) if seconds.references(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::step::Resume;
    use crate::steps::harness::{main_id, outputs, run};
    use crate::value::Value;
    use crate::variable::{Scope, VariableStore};

    fn parse(args: &str) -> anyhow::Result<Wait> {
        let mut locals = VariableStore::new(Scope::Local);
        locals.declare("delay", Value::Float(0.25)).unwrap();
        locals.declare("count", Value::Integer(1)).unwrap();
        let globals = VariableStore::new(Scope::Global);
        Wait::parse(args, &AuthoringScope::new(&locals, &globals))
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(
            parse("1s").unwrap().duration,
            WaitFor::Fixed(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(
            parse("500ms").unwrap().duration,
            WaitFor::Fixed(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(
            parse("1.5s").unwrap().duration,
            WaitFor::Fixed(Duration::from_secs_f64(1.5))
        );
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse("100ms..1s").unwrap().duration,
            WaitFor::Between(Duration::from_millis(100), Duration::from_secs(1))
        );
        assert!(parse("2s..1s").is_err());
    }

    #[test]
    fn test_parse_variable() {
        let wait = parse("delay").unwrap();
        assert!(wait.references(&VarRef::local("delay")));
        assert_eq!(wait.summary(), "wait delay seconds");
        assert!(parse("count").is_err());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse("5minutes").is_err());
    }

    #[test]
    fn test_suspends_until_timer_completes() {
        let mut engine = run("wait 250ms\nlog \"after\"\n");
        let mut effects = engine.drain_effects();
        assert_eq!(effects.len(), 1);
        let Some(Effect::Timer { delay, completion }) = effects.pop() else {
            panic!("expected a timer effect");
        };
        assert_eq!(delay, Duration::from_millis(250));
        assert_eq!(engine.active_pointer(&main_id()).unwrap(), Some(0));

        assert!(engine.complete(completion, Resume::Continue).unwrap());
        assert_eq!(outputs(&engine.drain_effects()), vec!["after"]);
        assert!(!engine.is_running(&main_id()).unwrap());
    }

    #[test]
    fn test_variable_delay_is_read_at_entry() {
        let mut engine = run("var delay = 0.5\nwait delay\n");
        match engine.drain_effects().first() {
            Some(Effect::Timer { delay, .. }) => assert_eq!(*delay, Duration::from_millis(500)),
            other => panic!("unexpected effect: {other:?}"),
        }
    }
}
