//! Top-level error type for the crate.
//!
//! Per the error-handling design, almost nothing in the core is fatal:
//! parse failures are swallowed, queue overflows are counted, and
//! control-plane protocol errors are serialized back to the client. This
//! type only covers the few genuinely fatal paths — batch I/O setup and
//! engine construction/wiring failures.

use std::io;
use std::net::AddrParseError;

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum NetlabError {
    /// Failed to read the configuration directory itself (not an
    /// individual device file, which is handled per spec.md's File-IO
    /// rule by synthesizing an error record instead).
    #[error("failed to read configuration directory {path}: {source}")]
    ConfigDir {
        /// Directory that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The simulation engine could not bind its control-plane listener.
    #[error("failed to bind control-plane listener: {0}")]
    ControlPlaneBind(#[source] io::Error),

    /// Generic I/O failure surfaced from a fatal path (report writing,
    /// settings loading).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Settings file failed to parse as TOML.
    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// Failed to serialize a report or topology export to JSON.
    #[error("failed to serialize to JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An address supplied to the control plane could not be parsed.
    #[error("invalid address: {0}")]
    Addr(#[from] AddrParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetlabError>;
