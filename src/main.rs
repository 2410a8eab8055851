//! Command-line front end for the completion adapter.
//!
//! `start` spawns an analysis server for a file and prints its port; the
//! query commands address a running server by port and print JSON results
//! to stdout. Logs go to stderr, filtered by `RUST_LOG`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use omnibridge::client::AnalysisClient;
use omnibridge::completer::{CsCompleter, RequestData};
use omnibridge::config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omnibridge", version, about = "Completion-engine adapter for an OmniSharp analysis server")]
struct Cli {
    /// Path to a JSON config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start an analysis server for the given source file and print its port
    Start {
        /// Source file to find the solution for
        file: PathBuf,

        /// Seconds to wait for the server to become ready
        #[arg(long, default_value_t = 30)]
        wait_secs: u64,
    },

    /// Request completions at a position (0-based line and column)
    Complete {
        file: PathBuf,
        line: u32,
        column: u32,

        /// Port of a running analysis server
        #[arg(long)]
        port: u16,
    },

    /// Resolve the definition of the symbol at a position (0-based)
    GotoDefinition {
        file: PathBuf,
        line: u32,
        column: u32,

        /// Port of a running analysis server
        #[arg(long)]
        port: u16,
    },

    /// Check whether a server is alive
    Status {
        #[arg(long)]
        port: u16,
    },

    /// Ask a running server to shut down
    Stop {
        #[arg(long)]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        CliCommand::Start { file, wait_secs } => {
            let request = read_request(&file, 0, 0)?;
            let mut completer = CsCompleter::new(config);
            let port = completer
                .start_server(&request)
                .map_err(anyhow::Error::msg)?;

            if !completer.wait_until_ready(Duration::from_secs(wait_secs)) {
                anyhow::bail!(
                    "analysis server on port {} did not become ready within {}s",
                    port,
                    wait_secs
                );
            }
            println!("{}", port);
            eprintln!("{}", completer.debug_info());

            // The server outlives this invocation; later commands address
            // it by port.
            completer.detach_server();
        }

        CliCommand::Complete {
            file,
            line,
            column,
            port,
        } => {
            let request = read_request(&file, line, column)?;
            let mut completer = CsCompleter::new(config);
            completer.attach_server(port);
            let candidates = completer
                .compute_candidates(&request)
                .map_err(anyhow::Error::msg)?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }

        CliCommand::GotoDefinition {
            file,
            line,
            column,
            port,
        } => {
            let request = read_request(&file, line, column)?;
            let mut completer = CsCompleter::new(config);
            completer.attach_server(port);
            let location = completer
                .go_to_definition(&request)
                .map_err(anyhow::Error::msg)?;
            println!("{}", serde_json::to_string_pretty(&location)?);
        }

        CliCommand::Status { port } => {
            let client = AnalysisClient::new(port, config.request_timeout());
            let alive = client.check_alive().unwrap_or(false);
            println!("{}", if alive { "running" } else { "not running" });
        }

        CliCommand::Stop { port } => {
            let client = AnalysisClient::new(port, config.request_timeout());
            client.stop_server().map_err(anyhow::Error::msg)?;
            println!("stopped");
        }
    }

    Ok(())
}

fn read_request(file: &PathBuf, line: u32, column: u32) -> anyhow::Result<RequestData> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(RequestData {
        filepath: file.clone(),
        line_num: line,
        column_num: column,
        contents,
    })
}
