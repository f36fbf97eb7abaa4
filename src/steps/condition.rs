//! Conditional chain: [`If`], [`ElseIf`] and [`Else`], closed by
//! [`End`](super::End).
//!
//! Script syntax:
//!
//! ```text
//! if score >= 10
//!   log "high"
//! elseif score >= 5
//!   log "medium"
//! else
//!   log "low"
//! end
//! ```
//!
//! A failing test skips to the next branch of the chain. An `elseif` is
//! entered there and tests; an `else` or `end` is stepped over. A branch
//! marker reached by falling out of a taken body jumps past the `end`.

use crate::binding::{AuthoringScope, Binding};
use crate::error::{Error, Result};
use crate::parser::{parse_operand, split_word};
use crate::step::{Context, Flow, Role, Step};
use crate::value::{CompareOperator, Value, ValueKind};
use crate::variable::{VarRef, Vars};
use anyhow::anyhow;
use tracing::warn;

/// `<variable> <operator> <operand>`, shared by `if`, `elseif` and `while`.
pub struct Comparison {
    pub subject: Option<VarRef>,
    pub kind: ValueKind,
    pub operator: CompareOperator,
    pub operand: Binding<Value>,
}

impl Comparison {
    pub fn new(subject: VarRef, kind: ValueKind, operator: CompareOperator, operand: Binding<Value>) -> Self {
        Self {
            subject: Some(subject),
            kind,
            operator,
            operand,
        }
    }

    pub fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (name, rest) = split_word(args);
        let (symbol, operand) = split_word(rest);
        if name.is_empty() {
            return Err(anyhow!("Expected a variable to compare"));
        }
        let operator = CompareOperator::from_symbol(symbol)
            .ok_or_else(|| anyhow!("Unknown comparison operator: {}", symbol))?;
        let (subject, kind) = scope.resolve(name)?;
        Ok(Self {
            subject: Some(subject),
            kind,
            operator,
            operand: parse_operand(operand, kind, scope)?,
        })
    }

    /// A missing subject variable tests false.
    pub fn evaluate(&self, vars: &Vars<'_>) -> Result<bool> {
        let Some(subject) = &self.subject else {
            return Ok(false);
        };
        let operand = self.operand.get(vars);
        match vars.variable(subject) {
            Ok(variable) => variable.evaluate(self.operator, &operand),
            Err(Error::Lookup(key)) => {
                warn!(%key, "condition subject missing, treated as false");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub fn describe(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{subject} {} {}", self.operator, self.operand.describe()),
            None => "<none>".to_string(),
        }
    }

    pub fn error(&self) -> Option<String> {
        if self.subject.is_none() {
            return Some("no variable selected".to_string());
        }
        (!self.kind.supports_compare(self.operator)).then(|| {
            format!("`{}` is not supported by {} variables", self.operator, self.kind)
        })
    }

    pub fn references(&self, var: &VarRef) -> bool {
        self.subject.as_ref() == Some(var) || self.operand.references(var)
    }
}

/// Where a failed test in a chain goes next.
fn next_branch_target(ctx: &Context<'_>, end: usize) -> usize {
    match ctx.next_branch() {
        Some(branch) if ctx.role_at(branch) == Some(Role::ElseIf) => branch,
        Some(branch) => branch + 1,
        None => end + 1,
    }
}

/// Shared by `if` and a tested `elseif`.
fn branch(test: &Comparison, ctx: &Context<'_>, end: usize) -> Result<Flow> {
    if !test.evaluate(ctx.vars())? {
        return Ok(Flow::Jump(next_branch_target(ctx, end)));
    }
    // An empty body would fall straight into the next branch marker.
    if ctx.next_branch() == Some(ctx.index() + 1) {
        return Ok(Flow::Jump(end + 1));
    }
    Ok(Flow::Continue)
}

pub struct If {
    pub test: Comparison,
}

impl If {
    pub const NAME: &'static str = "if";
}

impl Step for If {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            test: Comparison::parse(args, scope)?,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        match ctx.block_end() {
            Some(end) => branch(&self.test, ctx, end),
            None => Ok(Flow::Continue),
        }
    }

    fn summary(&self) -> String {
        format!("if {}", self.test.describe())
    }

    fn error(&self) -> Option<String> {
        self.test.error()
    }

    fn references(&self, var: &VarRef) -> bool {
        self.test.references(var)
    }

    fn role(&self) -> Role {
        Role::Condition
    }
}

pub struct ElseIf {
    pub test: Comparison,
}

impl ElseIf {
    pub const NAME: &'static str = "elseif";
}

impl Step for ElseIf {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            test: Comparison::parse(args, scope)?,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let Some(end) = ctx.block_end() else {
            return Ok(Flow::Continue);
        };
        // Only a failed test earlier in the same chain lands here to test.
        let tested = ctx
            .previous()
            .is_some_and(|p| p < ctx.index() && ctx.in_same_chain(p));
        if tested {
            branch(&self.test, ctx, end)
        } else {
            Ok(Flow::Jump(end + 1))
        }
    }

    fn summary(&self) -> String {
        format!("elseif {}", self.test.describe())
    }

    fn error(&self) -> Option<String> {
        self.test.error()
    }

    fn references(&self, var: &VarRef) -> bool {
        self.test.references(var)
    }

    fn role(&self) -> Role {
        Role::ElseIf
    }
}

/// Final branch. Entered only by falling out of a taken body, so it
/// always leaves the chain.
pub struct Else;

impl Else {
    pub const NAME: &'static str = "else";
}

impl Step for Else {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("`else` takes no arguments"));
        }
        Ok(Self)
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        match ctx.block_end() {
            Some(end) => Ok(Flow::Jump(end + 1)),
            None => Ok(Flow::Continue),
        }
    }

    fn summary(&self) -> String {
        "else".to_string()
    }

    fn role(&self) -> Role {
        Role::Else
    }
}
