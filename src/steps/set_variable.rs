//! [`SetVariable`] step: applies an operator to a variable.
//!
//! Script syntax: `set score += 10`, `set flag =! other_flag`,
//! `set global.name = "ada"`

use crate::binding::{AuthoringScope, Binding};
use crate::error::{Error, Result};
use crate::parser::{parse_list_operand, parse_operand, split_word};
use crate::step::{Context, Flow, Step};
use crate::value::{SetOperator, Value, ValueKind};
use crate::variable::VarRef;
use anyhow::anyhow;
use tracing::warn;

/// Applies `operator` with `operand` to the target variable.
pub struct SetVariable {
    pub target: Option<VarRef>,
    pub kind: ValueKind,
    pub operator: SetOperator,
    pub operand: Binding<Value>,
}

impl SetVariable {
    pub const NAME: &'static str = "set";

    pub fn new(target: VarRef, kind: ValueKind, operator: SetOperator, operand: Binding<Value>) -> Self {
        Self {
            target: Some(target),
            kind,
            operator,
            operand,
        }
    }
}

impl Step for SetVariable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (name, rest) = split_word(args);
        let (symbol, operand) = split_word(rest);
        if name.is_empty() {
            return Err(anyhow!("Expected a variable name"));
        }
        let operator = SetOperator::from_symbol(symbol)
            .ok_or_else(|| anyhow!("Unknown set operator: {}", symbol))?;
        let (target, kind) = scope.resolve(name)?;
        let operand = if kind == ValueKind::List {
            let (_, element) = scope.resolve_list(name)?;
            parse_list_operand(operand, element, scope)?
        } else {
            parse_operand(operand, kind, scope)?
        };
        Ok(Self {
            target: Some(target),
            kind,
            operator,
            operand,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let Some(target) = &self.target else {
            return Ok(Flow::Continue);
        };
        let operand = self.operand.get(ctx.vars());
        match ctx.vars_mut().variable_mut(target) {
            Ok(variable) => variable.apply(self.operator, &operand)?,
            Err(Error::Lookup(key)) => warn!(%key, "set target missing, skipped"),
            Err(err) => return Err(err),
        }
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        match &self.target {
            Some(target) => format!("set {target} {} {}", self.operator, self.operand.describe()),
            None => "set <none>".to_string(),
        }
    }

    fn error(&self) -> Option<String> {
        if self.target.is_none() {
            return Some("no variable selected".to_string());
        }
        (!self.kind.supports_set(self.operator)).then(|| {
            format!("`{}` is not supported by {} variables", self.operator, self.kind)
        })
    }

    fn references(&self, var: &VarRef) -> bool {
        self.target.as_ref() == Some(var) || self.operand.references(var)
    }
}
