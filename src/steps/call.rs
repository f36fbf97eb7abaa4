//! [`Call`] step: starts another sequence.
//!
//! Script syntax: `call greet`, `call intro.greet at 2 wait`
//!
//! The optional `at` index is where the target starts. The trailing mode
//! decides what happens to the caller:
//!
//! - `stop` (default): the caller halts.
//! - `continue`: the caller carries on immediately.
//! - `wait`: the caller suspends until the target halts.
//!
//! Calling the caller's own sequence is a jump to the start index and does
//! not count as a new run.

use crate::binding::AuthoringScope;
use crate::error::Result;
use crate::parser::{is_identifier, split_word};
use crate::sequence::SequenceId;
use crate::step::{Context, Flow, Step};
use anyhow::{Context as _, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallMode {
    #[default]
    Stop,
    Continue,
    Wait,
}

impl CallMode {
    fn keyword(self) -> &'static str {
        match self {
            CallMode::Stop => "stop",
            CallMode::Continue => "continue",
            CallMode::Wait => "wait",
        }
    }
}

/// Target named in a call, resolved against the caller's flowchart when
/// no flowchart is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub flowchart: Option<String>,
    pub sequence: String,
}

impl CallTarget {
    fn resolve(&self, caller: &SequenceId) -> SequenceId {
        SequenceId::new(
            self.flowchart.as_deref().unwrap_or(&caller.flowchart),
            &self.sequence,
        )
    }
}

pub struct Call {
    pub target: Option<CallTarget>,
    pub start: usize,
    pub mode: CallMode,
}

impl Call {
    pub const NAME: &'static str = "call";

    pub fn new(sequence: impl Into<String>, mode: CallMode) -> Self {
        Self {
            target: Some(CallTarget {
                flowchart: None,
                sequence: sequence.into(),
            }),
            start: 0,
            mode,
        }
    }
}

impl Step for Call {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
        let (name, mut rest) = split_word(args);
        let target = match name.split_once('.') {
            Some((flowchart, sequence)) => CallTarget {
                flowchart: Some(flowchart.to_string()),
                sequence: sequence.to_string(),
            },
            None => CallTarget {
                flowchart: None,
                sequence: name.to_string(),
            },
        };
        let names = [target.flowchart.as_deref(), Some(target.sequence.as_str())];
        if names.into_iter().flatten().any(|n| !is_identifier(n)) {
            return Err(anyhow!("Invalid call target: {}", name));
        }

        let mut start = 0;
        let mut mode = CallMode::default();
        while !rest.is_empty() {
            let (word, tail) = split_word(rest);
            match word {
                "at" => {
                    let (index, tail) = split_word(tail);
                    start = index
                        .parse()
                        .with_context(|| format!("Invalid start index: {}", index))?;
                    rest = tail;
                    continue;
                }
                "stop" => mode = CallMode::Stop,
                "continue" => mode = CallMode::Continue,
                "wait" => mode = CallMode::Wait,
                other => return Err(anyhow!("Unexpected call argument: {}", other)),
            }
            rest = tail;
        }

        Ok(Self {
            target: Some(target),
            start,
            mode,
        })
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> Result<Flow> {
        let Some(target) = &self.target else {
            return Ok(Flow::Continue);
        };
        let id = target.resolve(ctx.sequence_id());
        if &id == ctx.sequence_id() {
            return Ok(Flow::Jump(self.start));
        }
        match self.mode {
            CallMode::Stop => {
                ctx.begin(id, self.start);
                Ok(Flow::Halt)
            }
            CallMode::Continue => {
                ctx.begin(id, self.start);
                Ok(Flow::Continue)
            }
            CallMode::Wait => Ok(ctx.begin_and_wait(id, self.start)),
        }
    }

    fn summary(&self) -> String {
        let Some(target) = &self.target else {
            return "call <none>".to_string();
        };
        let mut text = match &target.flowchart {
            Some(flowchart) => format!("call {flowchart}.{}", target.sequence),
            None => format!("call {}", target.sequence),
        };
        if self.start > 0 {
            text.push_str(&format!(" at {}", self.start));
        }
        text.push(' ');
        text.push_str(self.mode.keyword());
        text
    }

    fn error(&self) -> Option<String> {
        self.target
            .is_none()
            .then(|| "no target sequence selected".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::steps::harness::{local, main_id, outputs, run};
    use crate::value::Value;
    use crate::variable::{Scope, VariableStore};

    fn parse(args: &str) -> anyhow::Result<Call> {
        let store = VariableStore::new(Scope::Local);
        Call::parse(args, &AuthoringScope::new(&store, &store))
    }

    #[test]
    fn test_parse_defaults() {
        let call = parse("greet").unwrap();
        assert_eq!(call.mode, CallMode::Stop);
        assert_eq!(call.start, 0);
        assert_eq!(call.summary(), "call greet stop");
    }

    #[test]
    fn test_parse_full() {
        let call = parse("intro.greet at 2 wait").unwrap();
        assert_eq!(
            call.target,
            Some(CallTarget {
                flowchart: Some("intro".into()),
                sequence: "greet".into()
            })
        );
        assert_eq!(call.start, 2);
        assert_eq!(call.mode, CallMode::Wait);
        assert_eq!(call.summary(), "call intro.greet at 2 wait");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse("").is_err());
        assert!(parse("greet at").is_err());
        assert!(parse("greet later").is_err());
        assert!(parse("a.b.c").is_err());
    }

    #[test]
    fn test_wait_mode_resumes_after_callee() {
        let mut engine = run(
            "sequence main\ncall helper wait\nlog \"back\"\n\
             sequence helper\nlog \"helping\"\n",
        );
        assert_eq!(outputs(&engine.drain_effects()), vec!["helping", "back"]);
        assert!(!engine.is_running(&main_id()).unwrap());
    }

    #[test]
    fn test_stop_mode_halts_caller() {
        let mut engine = run(
            "var x = 0\nsequence main\ncall helper\nset x = 99\n\
             sequence helper\nset x += 1\n",
        );
        assert_eq!(local(&engine, "x"), Value::Integer(1));
        let finished: Vec<_> = engine
            .drain_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Finished { sequence } => Some(sequence.sequence),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec!["main", "helper"]);
    }

    #[test]
    fn test_call_own_sequence_jumps() {
        let engine = run(
            "var n = 0\nsequence main\nset n += 1\nif n < 3\n  call main\nend\n",
        );
        assert_eq!(local(&engine, "n"), Value::Integer(3));
        assert_eq!(engine.run_count(&main_id()).unwrap(), 1);
    }
}
