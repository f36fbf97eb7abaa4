//! [`Log`] step: writes a line to the host's output channel.
//!
//! Script syntax: `log "Score: {$score}"` or just `log`
//!
//! `{$name}` is replaced with the current value of the variable `name`
//! (locals first, `{$global.name}` for a global). Unknown names are left
//! as written. With no text the step logs where it sits, as recorded when
//! it was added to its sequence.

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::parser::parse_quoted_string;
use crate::step::{Context, Flow, Placement, Step};
use crate::variable::{Scope, VarRef, Vars};

pub struct Log {
    pub text: Option<String>,
    location: String,
}

impl Log {
    pub const NAME: &'static str = "log";

    /// Create a `Log` step with fixed text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            location: String::new(),
        }
    }

    fn message(&self) -> &str {
        self.text.as_deref().unwrap_or(&self.location)
    }
}

/// Replace every `{$name}` in `text` with the variable's value.
pub fn substitute(text: &str, vars: &Vars<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("{$") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &after[..close];
        let value = match name.strip_prefix("global.") {
            Some(key) => vars.value(&VarRef::global(key)).ok(),
            None => vars.find(name).map(|v| v.value()),
        };
        match value {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[open..open + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

impl Step for Log {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let args = args.trim();
        let text = if args.is_empty() {
            None
        } else {
            Some(parse_quoted_string(args)?)
        };
        Ok(Self {
            text,
            location: String::new(),
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let line = substitute(self.message(), ctx.vars());
        ctx.emit(line);
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        format!("log {:?}", self.message())
    }

    fn references(&self, var: &VarRef) -> bool {
        let Some(text) = &self.text else {
            return false;
        };
        let token = match var.scope {
            Scope::Local => format!("{{${}}}", var.key),
            Scope::Global => format!("{{$global.{}}}", var.key),
        };
        text.contains(&token)
            || (var.scope == Scope::Global && text.contains(&format!("{{${}}}", var.key)))
    }

    fn on_added(&mut self, placement: &Placement<'_>) {
        self.location = format!(
            "{}:{} step {}",
            placement.flowchart, placement.sequence, placement.index
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::harness::outputs;
    use crate::value::Value;
    use crate::variable::VariableStore;

    #[test]
    fn test_parse() {
        let store = VariableStore::new(Scope::Local);
        let scope = AuthoringScope::new(&store, &store);
        let step = Log::parse(r#""hello world""#, &scope).unwrap();
        assert_eq!(step.text.as_deref(), Some("hello world"));
        assert!(Log::parse("", &scope).unwrap().text.is_none());
    }

    #[test]
    fn test_parse_unclosed_quote() {
        let store = VariableStore::new(Scope::Local);
        let scope = AuthoringScope::new(&store, &store);
        assert!(Log::parse(r#""unclosed"#, &scope).is_err());
    }

    #[test]
    fn test_substitute() {
        let mut local = VariableStore::new(Scope::Local);
        let mut global = VariableStore::new(Scope::Global);
        local.declare("hp", Value::Integer(7)).unwrap();
        global.declare("hp", Value::Integer(100)).unwrap();
        global.declare("name", Value::String("ada".into())).unwrap();
        let vars = Vars::new(&mut local, &mut global);

        assert_eq!(
            substitute("{$name} has {$hp}/{$global.hp}", &vars),
            "ada has 7/100"
        );
        assert_eq!(substitute("{$ghost} stays", &vars), "{$ghost} stays");
        assert_eq!(substitute("open {$hp", &vars), "open {$hp");
        assert_eq!(substitute("no tokens", &vars), "no tokens");
    }

    #[test]
    fn test_references() {
        let step = Log::new("{$hp} and {$global.name}");
        assert!(step.references(&VarRef::local("hp")));
        assert!(step.references(&VarRef::global("name")));
        assert!(!step.references(&VarRef::local("name")));
    }

    #[test]
    fn test_default_text_is_location() {
        let mut engine = crate::Engine::from(crate::parse_str("sequence intro\nlog\n").unwrap());
        engine.begin(&crate::SequenceId::new("main", "intro")).unwrap();
        assert_eq!(outputs(&engine.drain_effects()), vec!["main:intro step 0"]);
    }
}
