//! The completion-engine adapter surface.
//!
//! `CsCompleter` owns the configuration and (at most) one connection to an
//! analysis server. Editor requests are translated into HTTP queries
//! against that server; user commands cover the server lifecycle and the
//! go-to-definition family.

use crate::client::{AnalysisClient, RequestParams};
use crate::config::Config;
use crate::server::AnalysisServer;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Filetypes this completer handles.
pub const SUPPORTED_FILETYPES: &[&str] = &["cs"];

/// User commands understood by [`CsCompleter::handle_command`].
pub const USER_COMMANDS: &[&str] = &[
    "StartServer",
    "StopServer",
    "RestartServer",
    "ServerRunning",
    "GoToDefinition",
    "GoToDeclaration",
    "GoToDefinitionElseDeclaration",
];

/// An editor request: which file, where the cursor is (0-based), and the
/// full current buffer contents (unsaved changes included).
#[derive(Debug, Clone)]
pub struct RequestData {
    pub filepath: PathBuf,
    pub line_num: u32,
    pub column_num: u32,
    pub contents: String,
}

/// A completion candidate handed back to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    /// Text inserted into the buffer when the candidate is accepted.
    pub insertion_text: String,
    /// Text shown in the completion menu.
    pub menu_text: String,
    /// Longer description (signature, docs) for the preview window.
    pub detailed_info: Option<String>,
}

/// Result of a successful go-to-definition query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoToResponse {
    pub filepath: PathBuf,
    /// 1-based line of the definition.
    pub line: u32,
    /// 1-based column of the definition.
    pub column: u32,
}

/// Outcome of a user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    ServerStarted { port: u16 },
    ServerStopped,
    ServerRestarted { port: u16 },
    ServerRunning(bool),
    Location(GoToResponse),
}

/// How the completer is connected to an analysis server: a subprocess it
/// spawned itself, or an externally started server addressed by port.
enum ServerConnection {
    Spawned(AnalysisServer),
    Attached { port: u16 },
}

impl ServerConnection {
    fn port(&self) -> u16 {
        match self {
            ServerConnection::Spawned(server) => server.port(),
            ServerConnection::Attached { port } => *port,
        }
    }
}

/// A completer that uses an OmniSharp-style analysis server as its engine.
pub struct CsCompleter {
    config: Config,
    connection: Option<ServerConnection>,
}

impl CsCompleter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The port of the connected server, if any.
    pub fn server_port(&self) -> Option<u16> {
        self.connection.as_ref().map(|c| c.port())
    }

    /// Connect to an analysis server that was started elsewhere.
    pub fn attach_server(&mut self, port: u16) {
        tracing::info!("Attaching to analysis server on port {}", port);
        self.connection = Some(ServerConnection::Attached { port });
    }

    /// Called when a file is ready to parse: starts the server if
    /// auto-start is enabled and none is connected yet.
    pub fn on_file_ready_to_parse(&mut self, request: &RequestData) -> Result<(), String> {
        if self.connection.is_none() && self.config.auto_start {
            self.start_server(request)?;
        }
        Ok(())
    }

    /// Start the analysis server for the request's file. A no-op when a
    /// server is already connected.
    pub fn start_server(&mut self, request: &RequestData) -> Result<u16, String> {
        if let Some(connection) = &self.connection {
            tracing::debug!(
                "Analysis server already connected on port {}",
                connection.port()
            );
            return Ok(connection.port());
        }

        let server = AnalysisServer::start(&self.config, &request.filepath)?;
        let port = server.port();
        self.connection = Some(ServerConnection::Spawned(server));
        Ok(port)
    }

    /// Disconnect from the server without stopping it, leaving the process
    /// running for other clients. Returns the port it was reachable on.
    pub fn detach_server(&mut self) -> Option<u16> {
        let connection = self.connection.take()?;
        let port = connection.port();
        tracing::info!("Detaching from analysis server on port {}", port);
        // A spawned child keeps running; std's Child does not kill on drop.
        Some(port)
    }

    /// Stop the connected server, if any: ask it to shut down over HTTP,
    /// then reap the subprocess if we spawned it.
    pub fn stop_server(&mut self) {
        let Some(connection) = self.connection.take() else {
            tracing::debug!("No analysis server to stop");
            return;
        };

        tracing::info!("Stopping analysis server on port {}", connection.port());
        let client = self.client_for(connection.port());
        if let Err(e) = client.stop_server() {
            tracing::warn!("Stop request failed: {}", e);
        }
        if let ServerConnection::Spawned(server) = connection {
            server.reap();
        }
    }

    /// Stop (if running) and start again.
    pub fn restart_server(&mut self, request: &RequestData) -> Result<u16, String> {
        if self.server_is_running() {
            self.stop_server();
        } else if let Some(ServerConnection::Spawned(server)) = self.connection.take() {
            // Dead server: nothing to ask over HTTP, just reap the child
            server.reap();
        }
        self.start_server(request)
    }

    /// Check if our analysis server is running.
    pub fn server_is_running(&self) -> bool {
        match &self.connection {
            Some(connection) => self
                .client_for(connection.port())
                .check_alive()
                .unwrap_or(false),
            None => false,
        }
    }

    /// Block until the connected server answers its liveness check, or
    /// `timeout` elapses. Returns whether it became ready.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        match &self.connection {
            Some(connection) => self.client_for(connection.port()).wait_until_alive(timeout),
            None => false,
        }
    }

    /// Compute completion candidates for the request position.
    pub fn compute_candidates(
        &self,
        request: &RequestData,
    ) -> Result<Vec<CompletionCandidate>, String> {
        let client = self.client()?;
        let entries = client.completions(&default_parameters(request))?;
        Ok(entries
            .into_iter()
            .map(|entry| CompletionCandidate {
                insertion_text: entry.completion_text,
                menu_text: entry.display_text,
                detailed_info: entry.description,
            })
            .collect())
    }

    /// Jump to the definition of the identifier under the cursor.
    pub fn go_to_definition(&self, request: &RequestData) -> Result<GoToResponse, String> {
        let client = self.client()?;
        let definition = client.goto_definition(&default_parameters(request))?;
        match definition.file_name {
            Some(file_name) => Ok(GoToResponse {
                filepath: PathBuf::from(file_name),
                line: definition.line.unwrap_or(1),
                column: definition.column.unwrap_or(1),
            }),
            None => Err("can't jump to definition".to_string()),
        }
    }

    /// Dispatch a user command. An empty or unknown command is an error
    /// listing the available commands.
    pub fn handle_command(
        &mut self,
        arguments: &[String],
        request: &RequestData,
    ) -> Result<CommandResponse, String> {
        let command = arguments.first().ok_or_else(commands_help_message)?;

        match command.as_str() {
            "StartServer" => {
                let port = self.start_server(request)?;
                Ok(CommandResponse::ServerStarted { port })
            }
            "StopServer" => {
                self.stop_server();
                Ok(CommandResponse::ServerStopped)
            }
            "RestartServer" => {
                let port = self.restart_server(request)?;
                Ok(CommandResponse::ServerRestarted { port })
            }
            "ServerRunning" => Ok(CommandResponse::ServerRunning(self.server_is_running())),
            "GoToDefinition" | "GoToDeclaration" | "GoToDefinitionElseDeclaration" => {
                self.go_to_definition(request).map(CommandResponse::Location)
            }
            _ => Err(commands_help_message()),
        }
    }

    /// Human-readable state of the server for debugging.
    pub fn debug_info(&self) -> String {
        match &self.connection {
            Some(ServerConnection::Spawned(server)) if self.server_is_running() => format!(
                "Server running at: {}\nLogfiles:\n{}\n{}",
                server.location(),
                server.stdout_log().display(),
                server.stderr_log().display()
            ),
            Some(ServerConnection::Attached { port }) if self.server_is_running() => {
                format!("Server running at: http://localhost:{} (attached)", port)
            }
            _ => "Server is not running".to_string(),
        }
    }

    /// Stop the server on shutdown if auto-start owns it.
    pub fn shutdown(&mut self) {
        if self.config.auto_start && self.server_is_running() {
            self.stop_server();
        }
    }

    fn client(&self) -> Result<AnalysisClient, String> {
        match &self.connection {
            Some(connection) => Ok(self.client_for(connection.port())),
            None => Err("analysis server is not running".to_string()),
        }
    }

    fn client_for(&self, port: u16) -> AnalysisClient {
        AnalysisClient::new(port, self.config.request_timeout())
    }
}

impl Drop for CsCompleter {
    fn drop(&mut self) {
        self.shutdown();
        // A spawned child that never became ready (or stopped answering)
        // still gets reaped; detach_server is the way to leave it running.
        if let Some(ServerConnection::Spawned(server)) = self.connection.take() {
            server.reap();
        }
    }
}

/// The common request parameters: 1-based position, filename, and the full
/// buffer contents.
fn default_parameters(request: &RequestData) -> RequestParams {
    RequestParams {
        line: request.line_num + 1,
        column: request.column_num + 1,
        filename: request.filepath.to_string_lossy().into_owned(),
        buffer: request.contents.clone(),
    }
}

fn commands_help_message() -> String {
    format!("supported commands: {}", USER_COMMANDS.join(", "))
}
