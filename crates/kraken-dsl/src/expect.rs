//! Mode-aware expectation descriptors.
//!
//! An [`Expect`] describes what a test asserts after its runner command has
//! executed. Its `mode` is kept in lockstep with the owning test's mode and
//! is never settable to a mismatched value from outside the crate.

use kraken_common::error::{KrakenError, Result};
use kraken_common::types::TestMode;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectDecl {
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    response: Option<String>,
}

/// Expectation attached to a test.
///
/// All assertion fields are optional; which ones are meaningful depends on
/// the mode (exit code and stdout for process-like runners, status code
/// and response body for http/grpc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expect {
    mode: TestMode,
    /// Expected process exit code.
    pub exit_code: Option<i32>,
    /// Expected substring of captured stdout.
    pub stdout: Option<String>,
    /// Expected HTTP/gRPC status code.
    pub status_code: Option<u16>,
    /// Expected substring of the response body.
    pub response: Option<String>,
}

impl Expect {
    /// An empty expectation for the given mode.
    #[must_use]
    pub const fn empty(mode: TestMode) -> Self {
        Self {
            mode,
            exit_code: None,
            stdout: None,
            status_code: None,
            response: None,
        }
    }

    /// Builds an expectation from an optional declaration map, forcing
    /// `mode` to the owning test's mode regardless of the map's contents.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if the map contains unknown or
    /// ill-typed fields.
    pub fn from_value(mode: TestMode, config: Option<Value>) -> Result<Self> {
        let Some(config) = config else {
            return Ok(Self::empty(mode));
        };
        let decl: ExpectDecl =
            serde_yaml::from_value(config).map_err(|e| KrakenError::Schema {
                entity: format!("{mode} expect"),
                message: e.to_string(),
            })?;
        Ok(Self {
            mode,
            exit_code: decl.exit_code,
            stdout: decl.stdout,
            status_code: decl.status_code,
            response: decl.response,
        })
    }

    /// The mode this expectation is bound to.
    #[must_use]
    pub const fn mode(&self) -> TestMode {
        self.mode
    }

    /// Updates the bound mode. Only the owning test may call this, on a
    /// mode change, so the back-reference can never drift independently.
    pub(crate) const fn set_mode(&mut self, mode: TestMode) {
        self.mode = mode;
    }

    /// Serializes the assertion fields back into a declaration map. The
    /// mode is omitted; it is re-injected by the owning test on decode.
    pub(crate) fn to_value(&self) -> Result<Value> {
        let decl = ExpectDecl {
            exit_code: self.exit_code,
            stdout: self.stdout.clone(),
            status_code: self.status_code,
            response: self.response.clone(),
        };
        serde_yaml::to_value(&decl).map_err(|e| KrakenError::Schema {
            entity: format!("{} expect", self.mode),
            message: e.to_string(),
        })
    }
}
