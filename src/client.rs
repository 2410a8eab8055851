//! HTTP/JSON client for the analysis server.
//!
//! The wire format is dictated by the server: requests are POSTs with
//! URL-form-encoded parameters, responses are JSON with PascalCase keys.
//! Endpoints used: `/autocomplete`, `/gotodefinition`, `/checkalivestatus`
//! and `/stopserver`.

use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// One completion entry as returned by `/autocomplete`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionEntry {
    pub completion_text: String,
    pub display_text: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response from `/gotodefinition`. A null `FileName` means the server has
/// no known definition for the symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefinitionResponse {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

/// Common request parameters sent with every position query.
///
/// `line` and `column` are 1-based, as the server expects; `buffer` is the
/// full current contents of the edited file, unsaved changes included.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub line: u32,
    pub column: u32,
    pub filename: String,
    pub buffer: String,
}

impl RequestParams {
    fn to_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("line", self.line.to_string()),
            ("column", self.column.to_string()),
            ("buffer", self.buffer.clone()),
            ("filename", self.filename.clone()),
        ]
    }
}

/// Blocking HTTP client bound to one running analysis server.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    port: u16,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the server this client talks to.
    pub fn location(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Ask the server for completions at the given position.
    ///
    /// The server answers with a JSON array, or `null` when it has nothing
    /// to offer; `null` is treated as an empty list.
    pub fn completions(&self, params: &RequestParams) -> Result<Vec<CompletionEntry>, String> {
        let body = self.get_response("/autocomplete", &params.to_form())?;
        let entries: Option<Vec<CompletionEntry>> = serde_json::from_str(&body)
            .map_err(|e| format!("failed to parse completion response: {}", e))?;
        Ok(entries.unwrap_or_default())
    }

    /// Ask the server where the symbol at the given position is defined.
    pub fn goto_definition(&self, params: &RequestParams) -> Result<DefinitionResponse, String> {
        let body = self.get_response("/gotodefinition", &params.to_form())?;
        serde_json::from_str(&body)
            .map_err(|e| format!("failed to parse definition response: {}", e))
    }

    /// Liveness check. Any transport or HTTP error counts as not alive.
    pub fn check_alive(&self) -> Result<bool, String> {
        let body = self.get_response("/checkalivestatus", &[])?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| format!("failed to parse alive status: {}", e))?;
        Ok(!matches!(value, Value::Null | Value::Bool(false)))
    }

    /// Poll `/checkalivestatus` until the server answers or `timeout`
    /// elapses. Returns whether the server became ready.
    pub fn wait_until_alive(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.check_alive().unwrap_or(false) {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    /// Ask the server to shut itself down.
    pub fn stop_server(&self) -> Result<(), String> {
        self.get_response("/stopserver", &[]).map(|_| ())
    }

    /// Handle communication with the server: POST form-encoded parameters
    /// to `handler` and return the raw response body.
    fn get_response(
        &self,
        handler: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, String> {
        let target = format!("{}{}", self.location(), handler);
        tracing::debug!("POST {} ({} params)", target, params.len());

        let form: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = ureq::post(&target)
            .timeout(self.timeout)
            .send_form(&form)
            .map_err(|e| {
                tracing::debug!("HTTP request to {} failed: {}", target, e);
                format!("HTTP request to {} failed: {}", target, e)
            })?;

        response
            .into_string()
            .map_err(|e| format!("failed to read response body: {}", e))
    }
}
