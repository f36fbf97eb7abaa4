//! # Stepflow
//!
//! A command-sequencing engine for scripted, suspendable flows.
//!
//! A [`Flowchart`] owns typed variables and named [`Sequence`]s. A sequence
//! is an ordered list of [`Step`]s executed one at a time: each step may
//! branch, loop, start other sequences, or suspend across an arbitrary
//! external delay (a timer, a user choice, an animation). Execution state is
//! small and explicit, so it can be captured with [`Engine::snapshot`] and
//! put back with [`Engine::restore`] mid-run.
//!
//! The [`Engine`] itself never blocks. Anything that takes time is handed to
//! the host as an [`Effect`]; the host answers with
//! [`Engine::complete`] or [`Engine::enter_due`]. The [`driver`] module
//! provides a tokio host that does this for you.
//!
//! ## Quick start
//!
//! ```no_run
//! use stepflow::{Engine, SequenceId, parse_str};
//! use stepflow::driver::Runner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let script = r#"
//! var n = 0
//! while n < 3
//!   set n += 1
//!   log "tick {$n}"
//!   wait 200ms
//! end
//! "#;
//!
//!     let mut engine = Engine::from(parse_str(script)?);
//!     let mut runner = Runner::new();
//!     runner.start(&mut engine, &SequenceId::new("main", "main")).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Driving the engine by hand
//!
//! ```
//! use stepflow::{Effect, Engine, Resume, SequenceId, Value, VarRef, parse_str};
//!
//! let mut engine = Engine::from(parse_str("var x = 1\nwait 1s\nset x = 2\n").unwrap());
//! let main = SequenceId::new("main", "main");
//! engine.begin(&main).unwrap();
//!
//! // The sequence is parked on the wait step until the timer is completed.
//! let Some(Effect::Timer { completion, .. }) = engine.drain_effects().pop() else {
//!     unreachable!()
//! };
//! assert_eq!(engine.active_pointer(&main).unwrap(), Some(0));
//! engine.complete(completion, Resume::Continue).unwrap();
//! assert_eq!(engine.value("main", &VarRef::local("x")).unwrap(), &Value::Integer(2));
//! ```
//!
//! ## Script syntax
//!
//! | Line | Description |
//! |------|-------------|
//! | `flowchart intro` | Start a flowchart; following `var` and `sequence` lines belong to it |
//! | `sequence main [pause 100ms]` | Start a sequence, optionally delaying every step entry |
//! | `var n: integer = 0` | Declare a flowchart variable (the type may be inferred) |
//! | `var xs: list<string> = []` | Declare a list; elements share one kind, inferred from a non-empty literal |
//! | `global score = 0.0` | Declare a global variable |
//! | `set n += 1` | Apply `=`, `=!`, `+=`, `-=`, `*=` or `/=` |
//! | `if n > 2` / `elseif ...` / `else` / `end` | Conditional chain |
//! | `while n < 10` ... `end` | Pre-test loop |
//! | `foreach item in list [index i]` ... `end` | Iterate a list |
//! | `break` | Leave the innermost loop |
//! | `item x = xs[i]` / `put xs[i] = 5` | Read or replace one list element |
//! | `push xs 5` / `count n = xs` | Append to a list, or store its length |
//! | `reset` / `reset global` | Put the flowchart's (or the global) variables back to their declared values |
//! | `call [flowchart.]sequence [at 2] [stop\|continue\|wait]` | Start another sequence |
//! | `wait 500ms` / `wait 1s..2s` / `wait delay` | Suspend on a timer |
//! | `log "text {$n}"` | Write to the output channel |
//! | `await "event"` | Suspend until the host resolves an event |
//! | `priority up` / `priority down` | Move the priority depth |
//! | `stop` | Halt the sequence |
//! | `# comment` | Full-line or inline comment |
//!
//! ## Implementing a custom step
//!
//! ```
//! use stepflow::{AuthoringScope, Context, Flow, Step};
//!
//! pub struct Beep;
//!
//! impl Beep {
//!     pub const NAME: &'static str = "beep";
//! }
//!
//! impl Step for Beep {
//!     fn name(&self) -> &'static str { Self::NAME }
//!
//!     fn parse(_args: &str, _scope: &AuthoringScope<'_>) -> anyhow::Result<Self> {
//!         Ok(Self)
//!     }
//!
//!     fn enter(&mut self, ctx: &mut Context<'_>) -> stepflow::Result<Flow> {
//!         ctx.emit("\x07");
//!         Ok(Flow::Continue)
//!     }
//!
//!     fn summary(&self) -> String { "beep".to_string() }
//! }
//! ```

pub mod binding;
pub mod driver;
pub mod effect;
pub mod engine;
pub mod error;
pub mod flowchart;
pub mod parser;
pub mod priority;
pub mod sequence;
pub mod snapshot;
pub mod step;
pub mod steps;
pub mod value;
pub mod variable;

pub use binding::{AuthoringScope, Binding, BindingValue};
pub use effect::{Effect, PendingEntry};
pub use engine::Engine;
pub use error::{Error, Result};
pub use flowchart::Flowchart;
pub use parser::{Script, parse_file, parse_str};
pub use priority::{ListenerId, PriorityDepth, PriorityEvent};
pub use sequence::{Layout, Sequence, SequenceId};
pub use snapshot::{ExecutionSnapshot, FlowchartSnapshot, SequenceSnapshot};
pub use step::{Completion, Context, Flow, Placement, Resume, Role, Step, Suspension};
pub use value::{Color, CompareOperator, SetOperator, Value, ValueKind, Vec2, Vec3};
pub use variable::{Scope, VarRef, Variable, VariableStore, Vars};
