//! CLI for Strand: chat with an agent described in a TOML file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, Session};
use crate::agent_loop::{RunItem, RunMode};
use crate::config::StrandConfig;
use crate::error::StrandError;
use crate::types::{Item, ReasoningEffort};

/// Strand conversation engine CLI
#[derive(Parser, Debug)]
#[command(name = "strand", version, about = "Chat with a tool-calling agent")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat with an agent
    Run(RunArgs),
}

/// Arguments for `strand run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent description (TOML)
    pub agent: PathBuf,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Turn ceiling per message
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Token budget for history sent with each request
    #[arg(long)]
    pub max_input_tokens: Option<usize>,

    /// Wait for whole responses instead of streaming
    #[arg(long)]
    pub no_stream: bool,
}

/// Agent description as written in TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentFile {
    pub name: Option<String>,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl AgentFile {
    pub fn load(path: &Path) -> Result<Self, StrandError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, StrandError> {
        toml::from_str(raw)
            .map_err(|e| StrandError::Configuration(format!("invalid agent file: {e}")))
    }

    pub fn into_agent(self) -> Result<Agent, StrandError> {
        let mut builder = Agent::builder();
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some(instructions) = self.instructions {
            builder = builder.instructions(instructions);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(effort) = self.reasoning_effort {
            builder = builder.reasoning_effort(effort);
        }
        builder.build()
    }
}

/// Install the log subscriber for the binary.
pub fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "strand=debug",
        _ => "strand=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Line-based chat loop. Ctrl-C cancels the turn in flight; EOF exits.
pub async fn run_chat(args: RunArgs) -> Result<(), StrandError> {
    let agent = AgentFile::load(&args.agent)?.into_agent()?;
    let config = StrandConfig::load()?;

    let mut builder = Session::builder(Arc::new(agent)).with_config(config);
    if let Some(model) = args.model {
        builder = builder.with_model(model);
    }
    if let Some(max_turns) = args.max_turns {
        builder = builder.with_max_turns(max_turns);
    }
    if let Some(budget) = args.max_input_tokens {
        builder = builder.with_max_input_tokens(budget);
    }
    let mut session = builder.build()?;
    let mode = if args.no_stream {
        RunMode::Buffered
    } else {
        RunMode::Streaming
    };

    eprintln!(
        "Chatting with {} ({}). Ctrl-D to quit.",
        session.agent().name(),
        session.model()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        session.push_user(line);
        session.reset_turns();

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let result = render_run(&mut session, mode, cancel).await;
        watcher.abort();

        match result {
            Ok(()) => {}
            Err(StrandError::Canceled) => eprintln!("\n[canceled]"),
            Err(e) if e.category().session_usable() => eprintln!("\n[error] {e}"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn render_run(
    session: &mut Session,
    mode: RunMode,
    cancel: CancellationToken,
) -> Result<(), StrandError> {
    let mut run = session.run_with(mode, cancel);
    let mut streamed_text = false;
    while let Some(next) = run.next().await {
        match next? {
            RunItem::Event(event) => {
                if let Some(delta) = event.text_delta() {
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                    streamed_text = true;
                }
            }
            RunItem::Item(item) => render_item(&item, &mut streamed_text),
        }
    }
    Ok(())
}

fn render_item(item: &Item, streamed_text: &mut bool) {
    match item {
        Item::Message(_) => {
            if let Some(refusal) = item.refusal_text() {
                println!("[refused] {refusal}");
            } else if *streamed_text {
                println!();
            } else if let Some(text) = item.text() {
                println!("{text}");
            }
            *streamed_text = false;
        }
        Item::FunctionCall(call) => eprintln!("  -> {}({})", call.name, call.arguments),
        Item::FunctionCallOutput(output) => eprintln!("  <- {}", truncate(&output.output, 200)),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
