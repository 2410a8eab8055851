//! Completion-engine adapter for an OmniSharp-style analysis server.
//!
//! The adapter:
//! - Locates the `.sln` solution file for a source file by searching
//!   upwards in the file tree
//! - Launches the analysis server bound to a free localhost port, with its
//!   output redirected to log files
//! - Forwards editor requests (completions, go-to-definition) to the
//!   server over a simple HTTP/JSON protocol

pub mod client;
pub mod completer;
pub mod config;
pub mod server;
pub mod solution;

pub use completer::{CompletionCandidate, CsCompleter, GoToResponse, RequestData};
pub use config::Config;
