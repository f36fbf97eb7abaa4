//! [`Reset`] step: puts variables back to their declared values.
//!
//! Script syntax: `reset` for the flowchart's own variables,
//! `reset global` for the globals.

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::step::{Context, Flow, Step};
use crate::variable::Scope;
use anyhow::anyhow;
use tracing::debug;

pub struct Reset {
    pub scope: Scope,
}

impl Reset {
    pub const NAME: &'static str = "reset";
}

impl Step for Reset {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let scope = match args.trim() {
            "" => Scope::Local,
            "global" => Scope::Global,
            other => return Err(anyhow!("Expected `reset` or `reset global`, got: {}", other)),
        };
        Ok(Self { scope })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        debug!(sequence = %ctx.sequence_id(), scope = ?self.scope, "resetting variables");
        ctx.vars_mut().reset(self.scope);
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        match self.scope {
            Scope::Local => "reset".to_string(),
            Scope::Global => "reset global".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::harness::{local, run};
    use crate::value::Value;
    use crate::variable::VarRef;

    #[test]
    fn test_reset_locals_only() {
        let engine = run(
            "global score = 1\nvar hp = 3\nvar names = [\"a\"]\n\
             set hp = 0\nset global.score = 9\npush names \"b\"\nreset\n",
        );
        assert_eq!(local(&engine, "hp"), Value::Integer(3));
        assert_eq!(local(&engine, "names"), Value::List(vec![Value::String("a".into())]));
        assert_eq!(
            engine.value("main", &VarRef::global("score")).unwrap(),
            &Value::Integer(9)
        );
    }

    #[test]
    fn test_reset_global() {
        let engine = run("global score = 1\nvar hp = 3\nset hp = 0\nset global.score = 9\nreset global\n");
        assert_eq!(local(&engine, "hp"), Value::Integer(0));
        assert_eq!(
            engine.value("main", &VarRef::global("score")).unwrap(),
            &Value::Integer(1)
        );
    }

    #[test]
    fn test_parse() {
        let locals = crate::variable::VariableStore::new(Scope::Local);
        let globals = crate::variable::VariableStore::new(Scope::Global);
        let scope = AuthoringScope::new(&locals, &globals);
        assert_eq!(Reset::parse("", &scope).unwrap().scope, Scope::Local);
        assert_eq!(Reset::parse(" global ", &scope).unwrap().summary(), "reset global");
        assert!(Reset::parse("everything", &scope).is_err());
    }
}
