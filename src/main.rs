use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use stepflow::driver::{Runner, StdinRequests};
use stepflow::{Engine, ExecutionSnapshot, SequenceId, parse_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stepflow",
    about = "Run a stepflow script, optionally resuming from a saved snapshot",
    version
)]
struct Args {
    /// Path to the script file
    #[arg(short, long)]
    script: PathBuf,

    /// Flowchart holding the sequence to start
    #[arg(short, long, default_value = stepflow::parser::DEFAULT_NAME)]
    flowchart: String,

    /// Sequence to start
    #[arg(long, default_value = stepflow::parser::DEFAULT_NAME)]
    sequence: String,

    /// Restore execution state from this snapshot before running
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Write the final execution state to this file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Do not print `log` output
    #[arg(long)]
    quiet: bool,

    /// Continue every `await` step instead of prompting on stdin
    #[arg(long)]
    no_input: bool,

    /// Print the parsed sequences and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,stepflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let script = parse_file(&args.script)
        .with_context(|| format!("Failed to parse script file: {}", args.script.display()))?;
    let mut engine = Engine::from(script);

    if args.list {
        for flowchart in engine.flowcharts() {
            for sequence in flowchart.sequences() {
                println!("{}:{}", flowchart.name(), sequence.name());
                for line in sequence.listing() {
                    println!("  {line}");
                }
            }
        }
        return Ok(());
    }

    let id = SequenceId::new(args.flowchart, args.sequence);
    let mut runner = if args.quiet {
        Runner::with_output(|_, _| {})
    } else {
        Runner::new()
    };
    if !args.no_input {
        runner = runner.with_requests(StdinRequests::new());
    }

    let resumed = match &args.restore {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
            let snapshot = ExecutionSnapshot::from_json(&text)?;
            engine
                .restore(&snapshot)
                .context("Snapshot does not match the script")?;
            engine.active_pointer(&id)?.is_some()
        }
        None => false,
    };

    if resumed {
        runner.resume(&mut engine, &id).await?;
    } else {
        runner.start(&mut engine, &id).await?;
    }

    if let Some(path) = &args.save {
        let json = engine.snapshot().to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    }

    Ok(())
}
