//! Relay CLI: chat with an OpenAI-compatible model that can call MCP tools.

mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use relay_api::OpenAiClient;
use relay_config::{CliOverrides, RelayConfig};
use relay_core::{Conversation, ConversationConfig, ConversationEvent};
use relay_mcp::McpManager;
use relay_permissions::{PermissionEngine, PromptHandler};
use relay_trace::{Trace, TraceStore};
use relay_types::{RelayError, Usage, truncate_str};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Tool output longer than this is cut short on the terminal.
const MAX_SHOWN_OUTPUT_BYTES: usize = 200;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Chat with an OpenAI-compatible model that drives MCP tool servers"
)]
struct Cli {
    /// MCP server config file (JSON `mcpServers` or TOML `[servers.*]`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat model name
    #[arg(short, long)]
    model: Option<String>,

    /// Custom OpenAI-compatible endpoint (overrides OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// API key (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Display model reasoning when the endpoint returns it
    #[arg(long)]
    show_reasoning: bool,

    /// Directory for conversation traces
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Do not save a trace on exit
    #[arg(long)]
    no_trace: bool,

    /// Continue the conversation from the most recent trace
    #[arg(long)]
    resume: bool,

    /// Send a single prompt and print the response (non-interactive)
    #[arg(short, long)]
    print: Option<String>,

    /// Approve every tool call without asking
    #[arg(long)]
    yes: bool,

    /// Maximum tool-call rounds per user turn
    #[arg(long)]
    max_tool_rounds: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = RelayConfig::load(CliOverrides {
        api_key: cli.api_key.clone(),
        base_url: cli.base_url.clone(),
        model: cli.model.clone(),
        max_tool_rounds: cli.max_tool_rounds,
        show_reasoning: cli.show_reasoning,
        trace_dir: cli.trace_dir.clone(),
        mcp_config: cli.config.clone(),
    })
    .context("Failed to load configuration")?;

    let model = OpenAiClient::new(&config.api_key, &config.base_url)
        .context("Failed to create model client")?;

    let manager = Arc::new(McpManager::start(&config.mcp).await);
    report_servers(&manager);

    let permissions = if cli.yes {
        PermissionEngine::auto_approve()
    } else {
        // Print mode never blocks on stdin; unapproved calls are denied.
        let handler: Option<Arc<dyn PromptHandler>> = match cli.print {
            Some(_) => None,
            None => Some(Arc::new(prompt::TerminalPromptHandler)),
        };
        PermissionEngine::new(config.permission_rules.clone(), handler)
    };

    let conversation = Conversation::new(
        Arc::new(model),
        manager.clone(),
        Arc::new(permissions),
        ConversationConfig {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            max_tool_rounds: config.max_tool_rounds,
            show_reasoning: config.show_reasoning,
        },
    );

    let outcome = run(&cli, &config, conversation, &manager).await;
    manager.shutdown().await;
    tracing::debug!("Tool servers stopped");
    outcome
}

/// Run the session, then save the trace whether or not the session failed.
async fn run(
    cli: &Cli,
    config: &RelayConfig,
    mut conversation: Conversation,
    manager: &McpManager,
) -> Result<()> {
    if cli.resume {
        resume_latest(&mut conversation, config).await?;
    }

    let outcome = match &cli.print {
        Some(prompt) => print_once(&mut conversation, prompt).await,
        None => repl(&mut conversation, config, manager).await,
    };

    if !cli.no_trace {
        save_trace(&conversation, config).await;
    }
    outcome
}

async fn resume_latest(conversation: &mut Conversation, config: &RelayConfig) -> Result<()> {
    let store = TraceStore::new(&config.trace_dir)
        .await
        .context("Failed to open trace directory")?;
    match store.latest().await.context("Failed to load latest trace")? {
        Some(trace) => {
            let turns = trace.messages.len();
            conversation
                .resume(trace.messages)
                .context("Latest trace is not a valid conversation")?;
            eprintln!("Resumed trace {} ({turns} turns)", trace.id);
        }
        None => eprintln!("No trace to resume in {}", config.trace_dir.display()),
    }
    Ok(())
}

async fn save_trace(conversation: &Conversation, config: &RelayConfig) {
    let trace = Trace::new(
        conversation.id(),
        config.model.clone(),
        conversation.history().messages().to_vec(),
        conversation.tool_definitions(),
    );
    let saved = match TraceStore::new(&config.trace_dir).await {
        Ok(store) => store.save(&trace).await,
        Err(e) => Err(e),
    };
    match saved {
        Ok(Some(path)) => eprintln!("Conversation trace saved to: {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: failed to save trace: {e}"),
    }
}

async fn print_once(conversation: &mut Conversation, prompt: &str) -> Result<()> {
    let usage = send(conversation, prompt).await?;
    print_usage(&usage);
    Ok(())
}

async fn repl(
    conversation: &mut Conversation,
    config: &RelayConfig,
    manager: &McpManager,
) -> Result<()> {
    let stdin = io::stdin();
    let mut total = Usage::default();

    eprintln!(
        "relay v{} (model: {}, tools: {})",
        env!("CARGO_PKG_VERSION"),
        config.model,
        manager.tools().len()
    );
    eprintln!("Type your message. 'exit', 'quit' or Ctrl+D to leave, /help for commands.\n");

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            eprintln!();
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match handle_command(input, manager).await {
            Some(Command::Quit) => break,
            Some(Command::Handled) => continue,
            None => {}
        }

        match send(conversation, input).await {
            Ok(usage) => total.add(&usage),
            Err(e) => match e.downcast_ref::<RelayError>() {
                // The model call failed; the session can go on.
                Some(RelayError::Api(_)) => eprintln!("\nError: {e:#}"),
                _ => return Err(e),
            },
        }
        println!();
    }

    print_usage(&total);
    Ok(())
}

enum Command {
    Quit,
    Handled,
}

async fn handle_command(input: &str, manager: &McpManager) -> Option<Command> {
    match input {
        "exit" | "quit" | "/exit" | "/quit" => Some(Command::Quit),
        "/help" => {
            print_help();
            Some(Command::Handled)
        }
        "/tools" => {
            print_tools(manager);
            Some(Command::Handled)
        }
        "/reload" => {
            manager.reload().await;
            eprintln!("Reloaded: {} tools", manager.tools().len());
            report_conflicts(manager);
            Some(Command::Handled)
        }
        _ if input.starts_with('/') => {
            eprintln!("Unknown command: {input}. Type /help for available commands.");
            Some(Command::Handled)
        }
        _ => None,
    }
}

/// Run one user turn, streaming events to the terminal.
async fn send(conversation: &mut Conversation, input: &str) -> Result<Usage> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = conversation
        .send(input, |event| match event {
            ConversationEvent::Reasoning(text) => {
                let _ = writeln!(io::stderr(), "\x1b[2m{text}\x1b[0m");
            }
            ConversationEvent::Text(text) => {
                let _ = writeln!(out, "{text}");
                let _ = out.flush();
            }
            ConversationEvent::ToolRequested {
                name, arguments, ..
            } => {
                let _ = writeln!(out, "  [tool: {name} {arguments}]");
            }
            ConversationEvent::ToolFinished {
                name,
                output,
                is_error,
                ..
            } => {
                let shown = shorten(&output);
                if is_error {
                    let _ = writeln!(out, "  [tool {name} error: {shown}]");
                } else {
                    let _ = writeln!(out, "  [tool {name} done: {shown}]");
                }
            }
            ConversationEvent::ToolRejected { name, reason, .. } => {
                let _ = writeln!(out, "  [tool {name} rejected: {reason}]");
            }
            ConversationEvent::RoundLimitReached { rounds } => {
                let _ = writeln!(
                    io::stderr(),
                    "Stopped after {rounds} tool-call rounds (raise with --max-tool-rounds)"
                );
            }
            ConversationEvent::Usage(_) | ConversationEvent::Done => {}
        })
        .await?;

    Ok(summary.usage)
}

fn shorten(output: &str) -> String {
    let flat = output.replace('\n', " ");
    if flat.len() > MAX_SHOWN_OUTPUT_BYTES {
        format!("{}...", truncate_str(&flat, MAX_SHOWN_OUTPUT_BYTES))
    } else {
        flat
    }
}

fn report_servers(manager: &McpManager) {
    for (server, count) in manager.server_summary() {
        eprintln!("Tool server '{server}': {count} tools");
    }
    report_conflicts(manager);
}

fn report_conflicts(manager: &McpManager) {
    for conflict in manager.conflicts() {
        eprintln!(
            "Warning: tool name '{}' is exposed by {} and {}; keeping {}",
            conflict.name, conflict.kept, conflict.dropped, conflict.kept
        );
    }
}

fn print_tools(manager: &McpManager) {
    let tools = manager.tools();
    if tools.is_empty() {
        eprintln!("No tools available.");
        return;
    }
    eprintln!("Available tools:");
    for tool in &tools {
        eprintln!(
            "  {:<32} [{}] {}",
            tool.exposed_name(),
            tool.descriptor.server,
            truncate_str(&tool.definition.function.description, 80)
        );
    }
}

fn print_usage(usage: &Usage) {
    eprintln!(
        "Tokens: prompt {}, completion {}, total {}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    );
}

fn print_help() {
    eprintln!("Available commands:");
    eprintln!("  /help    Show this help");
    eprintln!("  /tools   List exposed tools and their servers");
    eprintln!("  /reload  Rediscover tools on every server");
    eprintln!("  exit     Save the trace and quit (also: quit, /exit, /quit, Ctrl+D)");
}
