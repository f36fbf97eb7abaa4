//! [`Stop`] step: halts the sequence it belongs to.
//!
//! Script syntax: `stop`

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::step::{Context, Flow, Step};
use anyhow::anyhow;

pub struct Stop;

impl Stop {
    pub const NAME: &'static str = "stop";
}

impl Step for Stop {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("`stop` takes no arguments"));
        }
        Ok(Self)
    }

    fn enter(&mut self, _ctx: &mut Context<'_>) -> Result<Flow> {
        Ok(Flow::Halt)
    }

    fn summary(&self) -> String {
        "stop".to_string()
    }
}
