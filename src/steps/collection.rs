//! List element steps: [`GetItem`], [`SetItem`], [`PushItem`] and
//! [`CountItems`].
//!
//! Script syntax:
//!
//! ```text
//! item cur = inventory[slot]
//! put inventory[0] = "lamp"
//! push inventory "rope"
//! count total = inventory
//! ```
//!
//! Element kinds are checked when the step is parsed. An index outside the
//! list fails the step with [`Error::Index`].

use crate::binding::{AuthoringScope, Binding};
use crate::error::{Error, Result};
use crate::parser::{is_identifier, parse_operand, split_word};
use crate::step::{Context, Flow, Step};
use crate::value::{Value, ValueKind};
use crate::variable::VarRef;
use anyhow::anyhow;
use tracing::warn;

/// Split `name[index]` into the list name and the index text.
fn split_element(text: &str) -> anyhow::Result<(&str, &str)> {
    let text = text.trim();
    text.strip_suffix(']')
        .and_then(|t| t.split_once('['))
        .map(|(list, index)| (list.trim(), index.trim()))
        .filter(|(list, index)| is_identifier(list) && !index.is_empty())
        .ok_or_else(|| anyhow!("Expected `<list>[<index>]`: {}", text))
}

/// An integer literal or an integer variable.
fn parse_index(text: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Binding<i64>> {
    if is_identifier(text) {
        return Ok(scope.bind(text, 0_i64)?);
    }
    let index = text
        .parse()
        .map_err(|_| anyhow!("Invalid index: {}", text))?;
    Ok(Binding::literal(index))
}

/// Resolve a list variable that has a known element kind.
fn resolve_list(name: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<(VarRef, ValueKind)> {
    match scope.resolve_list(name)? {
        (var, Some(element)) => Ok((var, element)),
        (_, None) => Err(anyhow!(
            "`{}` has no element kind, declare it as `list<kind>`",
            name
        )),
    }
}

fn check_element(list: &str, element: ValueKind, var: &str, kind: ValueKind) -> anyhow::Result<()> {
    if element != kind {
        return Err(anyhow!(
            "`{}` holds {} values but `{}` is {}",
            list,
            element,
            var,
            kind
        ));
    }
    Ok(())
}

/// Copies element `index` of `list` into `target`.
pub struct GetItem {
    pub target: VarRef,
    pub list: VarRef,
    pub index: Binding<i64>,
}

impl GetItem {
    pub const NAME: &'static str = "item";
}

impl Step for GetItem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (target, source) = args
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected `item <var> = <list>[<index>]`"))?;
        let target = target.trim();
        let (target_ref, kind) = scope.resolve(target)?;
        let (list_name, index) = split_element(source)?;
        let (list, element) = resolve_list(list_name, scope)?;
        check_element(list_name, element, target, kind)?;
        Ok(Self {
            target: target_ref,
            list,
            index: parse_index(index, scope)?,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let index = self.index.get(ctx.vars());
        let item = ctx.vars().variable(&self.list)?.item(index)?.clone();
        ctx.vars_mut().assign(&self.target, item)?;
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        format!("item {} = {}[{}]", self.target, self.list, self.index.describe())
    }

    fn references(&self, var: &VarRef) -> bool {
        &self.target == var || &self.list == var || self.index.references(var)
    }
}

/// Replaces element `index` of `list`.
pub struct SetItem {
    pub list: VarRef,
    pub index: Binding<i64>,
    pub value: Binding<Value>,
}

impl SetItem {
    pub const NAME: &'static str = "put";
}

impl Step for SetItem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (slot, operand) = args
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected `put <list>[<index>] = <value>`"))?;
        let (list_name, index) = split_element(slot)?;
        let (list, element) = resolve_list(list_name, scope)?;
        Ok(Self {
            list,
            index: parse_index(index, scope)?,
            value: parse_operand(operand, element, scope)?,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let index = self.index.get(ctx.vars());
        let value = self.value.get(ctx.vars());
        ctx.vars_mut()
            .variable_mut(&self.list)?
            .set_item(index, value)?;
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        format!(
            "put {}[{}] = {}",
            self.list,
            self.index.describe(),
            self.value.describe()
        )
    }

    fn references(&self, var: &VarRef) -> bool {
        &self.list == var || self.index.references(var) || self.value.references(var)
    }
}

/// Appends a value to `list`.
pub struct PushItem {
    pub list: VarRef,
    pub value: Binding<Value>,
}

impl PushItem {
    pub const NAME: &'static str = "push";
}

impl Step for PushItem {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (list_name, operand) = split_word(args);
        if operand.is_empty() {
            return Err(anyhow!("Expected `push <list> <value>`"));
        }
        let (list, element) = resolve_list(list_name, scope)?;
        Ok(Self {
            list,
            value: parse_operand(operand, element, scope)?,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let value = self.value.get(ctx.vars());
        ctx.vars_mut().variable_mut(&self.list)?.push_item(value)?;
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        format!("push {} {}", self.list, self.value.describe())
    }

    fn references(&self, var: &VarRef) -> bool {
        &self.list == var || self.value.references(var)
    }
}

/// Stores the length of `list` in an integer variable.
pub struct CountItems {
    pub target: Binding<i64>,
    pub list: VarRef,
}

impl CountItems {
    pub const NAME: &'static str = "count";
}

impl Step for CountItems {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (target, list) = args
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected `count <var> = <list>`"))?;
        let (list, _) = scope.resolve_list(list.trim())?;
        Ok(Self {
            target: scope.bind(target.trim(), 0_i64)?,
            list,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let count = match ctx.vars().variable(&self.list) {
            Ok(list) => list.item_count()?,
            Err(Error::Lookup(key)) => {
                warn!(%key, "count source missing, counted as empty");
                0
            }
            Err(err) => return Err(err),
        };
        self.target.set(ctx.vars_mut(), count as i64)?;
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        format!("count {} = {}", self.target.describe(), self.list)
    }

    fn references(&self, var: &VarRef) -> bool {
        self.target.references(var) || &self.list == var
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::harness::{local, outputs, run};
    use crate::variable::{Scope, VariableStore};

    fn stores() -> (VariableStore, VariableStore) {
        let mut local = VariableStore::new(Scope::Local);
        local
            .declare("names", Value::List(vec![Value::String("ada".into())]))
            .unwrap();
        local.declare("name", Value::String(String::new())).unwrap();
        local.declare("n", Value::Integer(0)).unwrap();
        local.declare("flag", Value::Boolean(false)).unwrap();
        local.declare("loose", Value::List(Vec::new())).unwrap();
        (local, VariableStore::new(Scope::Global))
    }

    #[test]
    fn test_parse_checks_element_kind() {
        let (local, global) = stores();
        let scope = AuthoringScope::new(&local, &global);
        assert!(GetItem::parse("name = names[n]", &scope).is_ok());
        assert!(GetItem::parse("n = names[0]", &scope).is_err());
        assert!(GetItem::parse("name = names[flag]", &scope).is_err());
        assert!(GetItem::parse("name = loose[0]", &scope).is_err());
        assert!(SetItem::parse("names[0] = \"bob\"", &scope).is_ok());
        assert!(SetItem::parse("names[0] = 4", &scope).is_err());
        assert!(PushItem::parse("names name", &scope).is_ok());
        assert!(PushItem::parse("names flag", &scope).is_err());
        assert!(PushItem::parse("name \"x\"", &scope).is_err());
        assert!(CountItems::parse("n = names", &scope).is_ok());
        assert!(CountItems::parse("name = names", &scope).is_err());
    }

    #[test]
    fn test_parse_element_syntax() {
        let (local, global) = stores();
        let scope = AuthoringScope::new(&local, &global);
        assert!(GetItem::parse("name = names", &scope).is_err());
        assert!(GetItem::parse("name = names[]", &scope).is_err());
        assert!(GetItem::parse("name = names[1.5]", &scope).is_err());
        let step = GetItem::parse("name = names[ n ]", &scope).unwrap();
        assert_eq!(step.summary(), "item name = names[n]");
        assert!(step.references(&VarRef::local("n")));
    }

    #[test]
    fn test_list_steps_through_engine() {
        let mut engine = run(
            "var xs = [1, 2]\nvar x = 0\nvar n = 0\n\
             push xs 3\nput xs[0] = 10\nitem x = xs[2]\ncount n = xs\n\
             log \"{$x} {$n} {$xs}\"\n",
        );
        assert_eq!(local(&engine, "x"), Value::Integer(3));
        assert_eq!(local(&engine, "n"), Value::Integer(3));
        assert_eq!(
            local(&engine, "xs"),
            Value::List(vec![Value::Integer(10), Value::Integer(2), Value::Integer(3)])
        );
        assert_eq!(outputs(&engine.drain_effects()).len(), 1);
    }

    #[test]
    fn test_negative_index_fails() {
        let mut engine = crate::Engine::from(
            crate::parse_str("var xs = [1]\nvar i = -1\nput xs[i] = 5\n").unwrap(),
        );
        let result = engine.begin(&crate::steps::harness::main_id());
        assert!(matches!(result, Err(Error::Index { index: -1, len: 1 })));
        assert_eq!(local(&engine, "xs"), Value::List(vec![Value::Integer(1)]));
    }
}
