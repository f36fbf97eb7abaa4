//! [`End`] step: closes the innermost open `if`, `while` or `foreach`.
//!
//! Script syntax: `end`

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::step::{Context, Flow, Role, Step};
use anyhow::anyhow;

/// Block terminator. The end of a loop jumps back to its opener, which
/// sees this index as its previous pointer and treats the entry as a
/// re-entry.
pub struct End;

impl End {
    pub const NAME: &'static str = "end";
}

impl Step for End {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("`end` takes no arguments"));
        }
        Ok(Self)
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        match ctx.opener() {
            Some(opener) if ctx.role_at(opener) == Some(Role::Loop) => Ok(Flow::Jump(opener)),
            _ => Ok(Flow::Continue),
        }
    }

    fn summary(&self) -> String {
        "end".to_string()
    }

    fn role(&self) -> Role {
        Role::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{Scope, VariableStore};

    #[test]
    fn test_parse() {
        let store = VariableStore::new(Scope::Local);
        let scope = AuthoringScope::new(&store, &store);
        assert!(End::parse("", &scope).is_ok());
        assert!(End::parse("  ", &scope).is_ok());
        assert!(End::parse("if", &scope).is_err());
    }
}
