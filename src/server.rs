//! Analysis-server process lifecycle.
//!
//! One subprocess, one port: the server is launched bound to a freshly
//! allocated localhost port with its stdout/stderr redirected to log files,
//! and reaped after it is asked to stop over HTTP.

use crate::config::Config;
use crate::solution;
use std::fs::File;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// How long to wait for the server process to exit after `/stopserver`
/// before killing it.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Allocate an unused localhost port by binding port 0 and reading back the
/// assigned port. The listener is dropped before the server starts, so the
/// port is free again when the server binds it.
pub fn unused_localhost_port() -> Result<u16, String> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| format!("failed to allocate a local port: {}", e))?;
    let port = listener
        .local_addr()
        .map_err(|e| format!("failed to read allocated port: {}", e))?
        .port();
    Ok(port)
}

/// A running analysis-server subprocess.
#[derive(Debug)]
pub struct AnalysisServer {
    port: u16,
    child: Child,
    solution_path: PathBuf,
    stdout_log: PathBuf,
    stderr_log: PathBuf,
}

impl AnalysisServer {
    /// Locate the solution file for `source_file` and launch the analysis
    /// server for it on a free port.
    pub fn start(config: &Config, source_file: &Path) -> Result<Self, String> {
        let port = unused_localhost_port()?;

        let solution_path = solution::locate_solution_file(source_file)
            .map_err(|e| format!("error starting analysis server: {}", e))?;

        let server_exe = config.resolved_server_path()?;

        let sln_name = solution_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stdout_log = config
            .log_dir
            .join(format!("omnisharp_{}_{}_stdout.log", port, sln_name));
        let stderr_log = config
            .log_dir
            .join(format!("omnisharp_{}_{}_stderr.log", port, sln_name));

        let stdout_file = File::create(&stdout_log)
            .map_err(|e| format!("failed to create log file {}: {}", stdout_log.display(), e))?;
        let stderr_file = File::create(&stderr_log)
            .map_err(|e| format!("failed to create log file {}: {}", stderr_log.display(), e))?;

        let mut cmd = if config.use_mono {
            let mut cmd = Command::new("mono");
            cmd.arg(&server_exe);
            cmd
        } else {
            Command::new(&server_exe)
        };
        cmd.arg("-p")
            .arg(port.to_string())
            .arg("-s")
            .arg(&solution_path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file));

        tracing::info!(
            "Starting analysis server for {} on port {}",
            solution_path.display(),
            port
        );
        tracing::debug!("Server logs: {} / {}", stdout_log.display(), stderr_log.display());

        let child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn analysis server: {}", e))?;

        Ok(Self {
            port,
            child,
            solution_path,
            stdout_log,
            stderr_log,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the running server.
    pub fn location(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn solution_path(&self) -> &Path {
        &self.solution_path
    }

    pub fn stdout_log(&self) -> &Path {
        &self.stdout_log
    }

    pub fn stderr_log(&self) -> &Path {
        &self.stderr_log
    }

    /// Reap the subprocess after it has been asked to stop: wait briefly
    /// for a clean exit, then kill it if it ignores the request.
    pub fn reap(mut self) {
        let deadline = std::time::Instant::now() + REAP_TIMEOUT;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!("Analysis server on port {} exited: {}", self.port, status);
                    return;
                }
                Ok(None) => {
                    if std::time::Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(REAP_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Failed to poll analysis server process: {}", e);
                    return;
                }
            }
        }

        tracing::warn!(
            "Analysis server on port {} did not exit after stop request, killing it",
            self.port
        );
        if let Err(e) = self.child.kill() {
            tracing::warn!("Failed to kill analysis server: {}", e);
        }
        let _ = self.child.wait();
    }
}
