mod await_event;
mod call;
mod collection;
mod condition;
mod end;
mod log;
mod loops;
mod priority_shift;
mod reset;
mod set_variable;
mod stop;
mod wait;

pub use await_event::Await;
pub use call::{Call, CallMode};
pub use collection::{CountItems, GetItem, PushItem, SetItem};
pub use condition::{Comparison, Else, ElseIf, If};
pub use end::End;
pub use log::Log;
pub use loops::{Break, ForEach, While};
pub use priority_shift::PriorityShift;
pub use reset::Reset;
pub use set_variable::SetVariable;
pub use stop::Stop;
pub use wait::Wait;

#[cfg(test)]
pub(crate) mod harness {
    use crate::effect::Effect;
    use crate::engine::Engine;
    use crate::parser::parse_str;
    use crate::sequence::SequenceId;
    use crate::value::Value;
    use crate::variable::VarRef;

    pub fn main_id() -> SequenceId {
        SequenceId::new("main", "main")
    }

    /// Parse `script` and begin `main:main`.
    pub fn run(script: &str) -> Engine {
        let mut engine = Engine::from(parse_str(script).unwrap());
        engine.begin(&main_id()).unwrap();
        engine
    }

    pub fn local(engine: &Engine, key: &str) -> Value {
        engine.value("main", &VarRef::local(key)).unwrap().clone()
    }

    pub fn outputs(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Output { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}
