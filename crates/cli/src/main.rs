mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use runtime::{AnthropicBackend, AnyBackend, GeminiBackend, Session, ToolHost};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{Config, ModelConfig, Provider};
use error::Result;

const CONFIG_FILE: &str = "switchboard.toml";
const DEFAULT_LOG_FILTER: &str = "switchboard=info,runtime=info,mcp=info";

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Route LLM tool calls across several MCP servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file [default: ./switchboard.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so they stay out of the conversation on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Every secret is checked before any server starts.
    let lookup = |var: &str| std::env::var(var).ok();
    let api_key = config.api_key_with(lookup)?;
    let servers = config.server_configs_with(lookup)?;

    let backend = build_backend(&config.model, api_key);
    println!("switchboard v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {backend}");

    let tools = connect(&config, servers).await?;
    let mut session = Session::new(backend, tools)
        .with_settings(config.dispatch.settings())
        .with_history(config.dispatch.history);

    let result = chat_loop(&mut session).await;
    session.shutdown().await;
    result
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None if Path::new(CONFIG_FILE).exists() => Config::load(CONFIG_FILE)?,
        None => Config::default(),
    };
    Ok(config)
}

fn build_backend(model: &ModelConfig, api_key: String) -> AnyBackend {
    let generation = model.generation();
    match model.provider {
        Provider::Gemini => GeminiBackend::builder(api_key, &generation.model)
            .config(generation)
            .build()
            .into(),
        Provider::Anthropic => AnthropicBackend::builder(api_key, &generation.model)
            .config(generation)
            .build()
            .into(),
    }
}

/// Start each server in turn and register its tools.
///
/// Servers already connected are shut down if a later one fails.
async fn connect(config: &Config, servers: Vec<mcp::ServerConfig>) -> Result<ToolHost<mcp::Server>> {
    let tools = ToolHost::new(config.dispatch.invocation())
        .with_resolution(config.dispatch.resolution)
        .connect_all(servers, |server| async move {
            let name = server.name.clone();
            println!("Starting and connecting to {name} server...");
            let spawned = mcp::Server::spawn(server).await.map_err(|e| {
                runtime::Error::ProviderConnection {
                    provider: name.clone(),
                    reason: e.to_string(),
                }
            });
            if spawned.is_ok() {
                println!("Connected to {name} server.");
            }
            spawned
        })
        .await?;

    let names: Vec<&str> = tools.specs().iter().map(|spec| spec.name.as_str()).collect();
    println!("\nConnected to all servers with tools: {names:?}");
    Ok(tools)
}

async fn chat_loop(session: &mut Session<AnyBackend, mcp::Server>) -> Result<()> {
    println!("\nSwitchboard started! Type 'quit' to exit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\nQuery: ");
        stdout.flush()?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line)?;
        let query = match parse_input(&line, read == 0) {
            Input::Quit => break,
            Input::Skip => continue,
            Input::Query(query) => query,
        };

        match session.process_query(query).await {
            Ok(answer) => println!("\n{answer}"),
            Err(e) => {
                error!(error = %e, "query failed");
                eprintln!("\nError: {e}");
            }
        }
    }

    info!("session ended");
    Ok(())
}

/// One line read by the REPL.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Query(&'a str),
    Skip,
    Quit,
}

/// End of input and `quit` (any case) both end the session.
fn parse_input(line: &str, eof: bool) -> Input<'_> {
    if eof {
        return Input::Quit;
    }
    let query = line.trim();
    if query.is_empty() {
        Input::Skip
    } else if query.eq_ignore_ascii_case("quit") {
        Input::Quit
    } else {
        Input::Query(query)
    }
}
