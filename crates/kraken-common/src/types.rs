//! Domain enums shared across the Kraken workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KrakenError, Result};

/// Execution mode of a test, selecting which runner variant it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Plain shell command.
    Shell,
    /// HTTP request issued via `curl`.
    Http,
    /// gRPC call issued via `grpcurl`.
    Grpc,
    /// Pytest invocation.
    Pytest,
    /// Command executed inside a running container via `docker exec`.
    Docker,
}

impl TestMode {
    /// Canonical name of the runner variant this mode selects, used in
    /// mismatch diagnostics.
    #[must_use]
    pub const fn runner_variant_name(self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Http => "http",
            Self::Grpc => "grpc",
            Self::Pytest => "pytest",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runner_variant_name())
    }
}

impl FromStr for TestMode {
    type Err = KrakenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shell" => Ok(Self::Shell),
            "http" => Ok(Self::Http),
            "grpc" => Ok(Self::Grpc),
            "pytest" => Ok(Self::Pytest),
            "docker" => Ok(Self::Docker),
            other => Err(KrakenError::Configuration {
                message: format!("unsupported test mode: \"{other}\""),
            }),
        }
    }
}

/// HTTP method used by the HTTP runner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET.
    #[default]
    #[serde(alias = "get")]
    Get,
    /// HTTP POST.
    #[serde(alias = "post")]
    Post,
    /// HTTP PUT.
    #[serde(alias = "put")]
    Put,
    /// HTTP DELETE.
    #[serde(alias = "delete")]
    Delete,
    /// HTTP PATCH.
    #[serde(alias = "patch")]
    Patch,
}

impl HttpMethod {
    /// Whether a request body is meaningful for this method.
    ///
    /// GET and DELETE requests never carry a `-d` payload in the generated
    /// `curl` command, even when a payload is declared.
    #[must_use]
    pub const fn takes_payload(self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }

    /// Uppercase method name as passed to `curl -X`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
