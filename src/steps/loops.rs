//! Loop steps: [`While`], [`ForEach`] and [`Break`].
//!
//! Script syntax:
//!
//! ```text
//! while tries < 3
//!   set tries += 1
//! end
//!
//! foreach item in inventory index slot
//!   log "{$slot}: {$item}"
//! end
//! ```
//!
//! Each pass returns through the loop's `end`, which jumps back to the
//! opener. The opener tells a re-entry from a fresh entry by comparing its
//! sequence's previous pointer with its own `end` index. A `foreach` keeps
//! its position in the sequence's loop state, never in the step itself.

use crate::binding::{AuthoringScope, Binding};
use crate::error::{Error, Result};
use crate::parser::{is_identifier, parse_list_literal, split_word};
use crate::step::{Context, Flow, Role, Step};
use crate::steps::Comparison;
use crate::value::Value;
use crate::variable::VarRef;
use anyhow::{Context as _, anyhow};
use tracing::warn;

/// Pre-test loop.
pub struct While {
    pub test: Comparison,
}

impl While {
    pub const NAME: &'static str = "while";
}

impl Step for While {
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
        if self.test.evaluate(ctx.vars())? {
            Ok(Flow::Continue)
        } else {
            Ok(Flow::Jump(end + 1))
        }
    }

    fn summary(&self) -> String {
        format!("while {}", self.test.describe())
    }

    fn error(&self) -> Option<String> {
        self.test.error()
    }

    fn references(&self, var: &VarRef) -> bool {
        self.test.references(var)
    }

    fn role(&self) -> Role {
        Role::Loop
    }
}

/// Iterates a list, binding each element to `element`.
///
/// The element variable must have the list's element kind; this is checked
/// when the step is parsed. A bound `index` variable receives the position
/// of each pass.
pub struct ForEach {
    pub element: Option<VarRef>,
    pub collection: Binding<Vec<Value>>,
    pub index: Binding<i64>,
}

impl ForEach {
    pub const NAME: &'static str = "foreach";
}

impl Step for ForEach {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (element, rest) = split_word(args);
        let (keyword, rest) = split_word(rest);
        if element.is_empty() || keyword != "in" {
            return Err(anyhow!("Expected `foreach <element> in <list> [index <var>]`"));
        }
        let (source, index) = match rest.rsplit_once(" index ") {
            Some((source, index)) => (source.trim(), Some(index.trim())),
            None => (rest.trim(), None),
        };

        let (element, element_kind) = scope.resolve(element)?;
        let collection = if is_identifier(source) {
            let (_, items) = scope.resolve_list(source)?;
            match items {
                Some(kind) if kind == element_kind => {}
                Some(kind) => {
                    return Err(anyhow!(
                        "`{}` holds {} values but `{}` is {}",
                        source,
                        kind,
                        element,
                        element_kind
                    ));
                }
                None => {
                    return Err(anyhow!(
                        "`{}` has no element kind, declare it as `list<kind>`",
                        source
                    ));
                }
            }
            scope.bind(source, Vec::new())?
        } else {
            let items = parse_list_literal(source, Some(element_kind))
                .with_context(|| format!("Invalid list for `{}`: {}", element, source))?;
            Binding::literal(items)
        };
        let index = match index {
            Some(name) => scope.bind(name, 0_i64)?,
            None => Binding::literal(0),
        };
        Ok(Self {
            element: Some(element),
            collection,
            index,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let Some(end) = ctx.block_end() else {
            return Ok(Flow::Continue);
        };
        let Self {
            element,
            collection,
            index,
        } = self;
        let Some(element) = element else {
            return Ok(Flow::Continue);
        };

        let position = match ctx.loop_position() {
            Some(last) if ctx.previous() == Some(end) => last + 1,
            _ => 0,
        };
        let items = collection.get(ctx.vars());
        let Some(item) = items.get(position).cloned() else {
            ctx.set_loop_position(None);
            return Ok(Flow::Jump(end + 1));
        };

        match ctx.vars_mut().assign(element, item) {
            Ok(()) => {}
            Err(Error::Lookup(key)) => warn!(%key, "foreach element variable missing"),
            Err(err) => return Err(err),
        }
        ctx.set_loop_position(Some(position));
        if index.is_bound() {
            index.set(ctx.vars_mut(), position as i64)?;
        }
        Ok(Flow::Continue)
    }

    fn summary(&self) -> String {
        let element = self
            .element
            .as_ref()
            .map_or_else(|| "<none>".to_string(), VarRef::to_string);
        let mut text = format!("foreach {element} in {}", self.collection.describe());
        if self.index.is_bound() {
            text.push_str(&format!(" index {}", self.index.describe()));
        }
        text
    }

    fn error(&self) -> Option<String> {
        self.element
            .is_none()
            .then(|| "no element variable selected".to_string())
    }

    fn references(&self, var: &VarRef) -> bool {
        self.element.as_ref() == Some(var)
            || self.collection.references(var)
            || self.index.references(var)
    }

    fn role(&self) -> Role {
        Role::Loop
    }
}

/// Leaves the innermost enclosing loop.
pub struct Break;

impl Break {
    pub const NAME: &'static str = "break";
}

impl Step for Break {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("`break` takes no arguments"));
        }
        Ok(Self)
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        match ctx.loop_end() {
            Some(end) => Ok(Flow::Jump(end + 1)),
            None => {
                warn!(sequence = %ctx.sequence_id(), index = ctx.index(), "break outside a loop");
                Ok(Flow::Continue)
            }
        }
    }

    fn summary(&self) -> String {
        "break".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::harness::{local, outputs, run};

    #[test]
    fn test_while_counts_up() {
        let engine = run("var n = 0\nwhile n < 4\n  set n += 1\nend\n");
        assert_eq!(local(&engine, "n"), Value::Integer(4));
    }

    #[test]
    fn test_while_false_skips_body() {
        let engine = run("var n = 10\nvar hit = false\nwhile n < 4\n  set hit = true\nend\n");
        assert_eq!(local(&engine, "hit"), Value::Boolean(false));
    }

    #[test]
    fn test_foreach_binds_element_and_index() {
        let mut engine = run(
            "var items = [10, 20, 30]\nvar cur = 0\nvar i = 0\n\
             foreach cur in items index i\n  log \"{$i}={$cur}\"\nend\nlog \"done\"\n",
        );
        assert_eq!(
            outputs(&engine.drain_effects()),
            vec!["0=10", "1=20", "2=30", "done"]
        );
        assert_eq!(local(&engine, "i"), Value::Integer(2));
    }

    #[test]
    fn test_foreach_over_literal_without_index() {
        let mut engine = run(
            "var word = \"\"\nforeach word in [\"a\", \"b\"]\n  log \"{$word}\"\nend\n",
        );
        assert_eq!(outputs(&engine.drain_effects()), vec!["a", "b"]);
    }

    #[test]
    fn test_foreach_runs_fresh_each_time() {
        let script = "var cur = 0\nvar total = 0\nforeach cur in [1, 2]\n  set total += cur\nend\n";
        let mut engine = run(script);
        assert_eq!(local(&engine, "total"), Value::Integer(3));
        engine.begin(&crate::steps::harness::main_id()).unwrap();
        assert_eq!(local(&engine, "total"), Value::Integer(6));
    }

    #[test]
    fn test_break_leaves_innermost_loop() {
        let engine = run(
            "var outer = 0\nvar inner = 0\n\
             while outer < 3\n  set outer += 1\n  while inner < 100\n    set inner += 1\n    break\n  end\nend\n",
        );
        assert_eq!(local(&engine, "outer"), Value::Integer(3));
        assert_eq!(local(&engine, "inner"), Value::Integer(3));
    }

    #[test]
    fn test_parse_foreach_errors() {
        let engine = crate::Engine::from(crate::parse_str("var cur = 0\nvar n = 1\n").unwrap());
        let scope = engine.scope("main").unwrap();
        assert!(ForEach::parse("cur of [1]", &scope).is_err());
        assert!(ForEach::parse("cur in n", &scope).is_err());
        assert!(ForEach::parse("cur in 5", &scope).is_err());
        let step = ForEach::parse("cur in [1, 2] index n", &scope).unwrap();
        assert_eq!(step.summary(), "foreach cur in [1, 2] index n");
    }

    #[test]
    fn test_foreach_element_kind_is_checked_when_parsed() {
        let err = crate::parse_str("var cur = 0
foreach cur in [\"a\", \"b\"]
end
").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(crate::parse_str("var cur = 0.0
var xs = [1.5, 2]
foreach cur in xs
end
").is_ok());
        assert!(crate::parse_str("var cur = 0
var xs = [1.5, 2]
foreach cur in xs
end
").is_err());
        assert!(crate::parse_str("var cur = \"\"
var xs: list<string> = []
foreach cur in xs
end
").is_ok());
    }

    #[test]
    fn test_foreach_widens_integers_for_float_element() {
        let mut engine = run(
            "var cur = 0.0
var xs = [1.5, 2]
var total = 0.0
             foreach cur in xs
  set total += cur
end
foreach cur in [1, 2]
  set total += cur
end
",
        );
        assert_eq!(local(&engine, "total"), Value::Float(6.5));
        assert!(outputs(&engine.drain_effects()).is_empty());
    }

    #[test]
    fn test_foreach_position_is_sequence_state() {
        let mut engine = run(
            "var cur = 0
foreach cur in [1, 2, 3]
  wait 1s
end
",
        );
        let id = crate::steps::harness::main_id();
        assert_eq!(engine.sequence(&id).unwrap().cursor.loops.get(&0), Some(&0));
        engine.halt(&id).unwrap();
        assert!(engine.sequence(&id).unwrap().cursor.loops.is_empty());
        assert_eq!(local(&engine, "cur"), Value::Integer(1));
    }
}
