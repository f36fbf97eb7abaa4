//! A tokio host for the [`Engine`].
//!
//! [`Runner`] drains the engine's effects and carries them out: timers and
//! step delays become sleeping tasks in a [`JoinSet`], output goes to an
//! output handler, and external events are resolved by a
//! [`RequestHandler`]. Timers keep firing while a request is outstanding.
//! A failing sequence is logged and the others keep running; the first
//! failure is returned once nothing is left to wait for.

use crate::effect::{Effect, PendingEntry};
use crate::engine::Engine;
use crate::sequence::SequenceId;
use crate::step::{Completion, Resume};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

type OutputHandler = Arc<dyn Fn(&SequenceId, &str) + Send + Sync>;

/// Resolves `await` steps.
#[async_trait(?Send)]
pub trait RequestHandler {
    /// Decide how the step waiting on `name` goes on.
    async fn handle(&mut self, sequence: &SequenceId, name: &str) -> Resume;
}

/// Resolves every request with [`Resume::Continue`].
pub struct ContinueAll;

#[async_trait(?Send)]
impl RequestHandler for ContinueAll {
    async fn handle(&mut self, _sequence: &SequenceId, _name: &str) -> Resume {
        Resume::Continue
    }
}

/// Prompts on stderr and reads one line of stdin per request.
///
/// An empty line continues, `stop` halts, and a number jumps to that step.
/// End of input continues.
pub struct StdinRequests {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinRequests {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinRequests {
    fn default() -> Self {
        Self::new()
    }
}

/// Map one line of input to a [`Resume`].
pub fn parse_resume(line: &str) -> Option<Resume> {
    match line.trim() {
        "" | "continue" => Some(Resume::Continue),
        "stop" | "halt" => Some(Resume::Halt),
        other => other.parse().ok().map(Resume::Jump),
    }
}

#[async_trait(?Send)]
impl RequestHandler for StdinRequests {
    async fn handle(&mut self, sequence: &SequenceId, name: &str) -> Resume {
        loop {
            eprint!("[{sequence}] {name} > ");
            let _ = std::io::stderr().flush();
            match self.lines.next_line().await {
                Ok(Some(line)) => match parse_resume(&line) {
                    Some(resume) => return resume,
                    None => eprintln!("expected an empty line, `stop` or a step index"),
                },
                Ok(None) | Err(_) => return Resume::Continue,
            }
        }
    }
}

enum Due {
    Timer(Completion),
    Entry(PendingEntry),
}

/// Services an engine's effects until nothing is pending.
pub struct Runner {
    output: OutputHandler,
    requests: Box<dyn RequestHandler>,
    timers: JoinSet<Due>,
    pending: VecDeque<(String, Completion)>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// A runner that prints output lines to stdout and continues every
    /// external request.
    pub fn new() -> Self {
        Self::with_output(|_, text| {
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "{text}");
            let _ = stdout.flush();
        })
    }

    /// A runner that passes output lines to `handler`.
    pub fn with_output(handler: impl Fn(&SequenceId, &str) + Send + Sync + 'static) -> Self {
        Runner {
            output: Arc::new(handler),
            requests: Box::new(ContinueAll),
            timers: JoinSet::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn with_requests(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.requests = Box::new(handler);
        self
    }

    /// Begin `id` and run until nothing is pending.
    pub async fn start(&mut self, engine: &mut Engine, id: &SequenceId) -> Result<()> {
        engine
            .begin(id)
            .with_context(|| format!("Failed to begin sequence {id}"))?;
        self.run(engine).await
    }

    /// Resume a restored sequence and run until nothing is pending.
    pub async fn resume(&mut self, engine: &mut Engine, id: &SequenceId) -> Result<()> {
        engine
            .resume(id)
            .with_context(|| format!("Failed to resume sequence {id}"))?;
        self.run(engine).await
    }

    /// Service effects until no timer, delayed entry or request is left.
    ///
    /// # Errors
    ///
    /// The first error any sequence raised while running. Other sequences
    /// are still driven to completion.
    pub async fn run(&mut self, engine: &mut Engine) -> Result<()> {
        let Runner {
            output,
            requests,
            timers,
            pending,
        } = self;
        let mut first_error = None;

        loop {
            dispatch(engine, output, timers, pending);

            if let Some((name, completion)) = pending.pop_front() {
                let sequence = completion.sequence().clone();
                let resume = {
                    let mut request = requests.handle(&sequence, &name);
                    loop {
                        tokio::select! {
                            resume = &mut request => break resume,
                            Some(joined) = timers.join_next() => {
                                record(service(engine, joined), &mut first_error);
                                dispatch(engine, output, timers, pending);
                            }
                        }
                    }
                };
                debug!(%name, ?resume, "request resolved");
                let result = engine.complete(completion, resume).map(drop);
                record(result.map_err(Into::into), &mut first_error);
                continue;
            }

            match timers.join_next().await {
                Some(joined) => record(service(engine, joined), &mut first_error),
                None => break,
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn dispatch(
    engine: &mut Engine,
    output: &OutputHandler,
    timers: &mut JoinSet<Due>,
    pending: &mut VecDeque<(String, Completion)>,
) {
    for effect in engine.drain_effects() {
        match effect {
            Effect::Timer { delay, completion } => {
                timers.spawn(async move {
                    tokio::time::sleep(delay).await;
                    Due::Timer(completion)
                });
            }
            Effect::Delay { delay, entry } => {
                timers.spawn(async move {
                    tokio::time::sleep(delay).await;
                    Due::Entry(entry)
                });
            }
            Effect::Output { sequence, text } => output(&sequence, &text),
            Effect::Request { name, completion } => pending.push_back((name, completion)),
            Effect::Finished { sequence } => debug!(%sequence, "sequence finished"),
            Effect::Idle { flowchart } => info!(%flowchart, "flowchart idle"),
        }
    }
}

fn service(engine: &mut Engine, joined: std::result::Result<Due, JoinError>) -> Result<()> {
    match joined {
        Ok(Due::Timer(completion)) => engine.complete(completion, Resume::Continue).map(drop)?,
        Ok(Due::Entry(entry)) => engine.enter_due(entry).map(drop)?,
        Err(err) => return Err(err).context("Timer task failed"),
    }
    Ok(())
}

/// Log a failure and keep the first one.
fn record(result: Result<()>, first: &mut Option<anyhow::Error>) {
    if let Err(err) = result {
        error!(error = %format!("{err:#}"), "sequence failed, servicing the rest");
        first.get_or_insert(err);
    }
}
