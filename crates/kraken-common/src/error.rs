//! Unified error types for the Kraken workspace.
//!
//! Every failure is reported to the immediate caller with enough context
//! (entity name, field name, expected vs. actual) to act on; nothing is
//! retried internally, and no error ever produces a partially-built entity.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum KrakenError {
    /// A declaration map has the wrong shape: unknown field, missing
    /// required field, or a value of the wrong type.
    #[error("invalid declaration for {entity}: {message}")]
    Schema {
        /// Name of the entity whose declaration failed to decode.
        entity: String,
        /// Decoder message describing the offending field or shape.
        message: String,
    },

    /// A test's runner variant is inconsistent with its declared mode.
    #[error("test \"{test}\": runner variant mismatch, expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the test owning the runner.
        test: String,
        /// Variant required by the test's mode.
        expected: &'static str,
        /// Variant actually present.
        actual: &'static str,
    },

    /// A configuration value is invalid (unsupported mode, duplicate name).
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required field is absent when materializing a command string.
    #[error("cannot build {runner} command: {message}")]
    CommandBuild {
        /// Runner variant that was asked for a command.
        runner: &'static str,
        /// Which required field is missing.
        message: String,
    },

    /// A graph edge references an entity that does not exist.
    #[error("{kind} \"{name}\" referenced by \"{referrer}\" is not defined")]
    DanglingReference {
        /// Expected kind of the missing entity.
        kind: &'static str,
        /// Name of the missing entity.
        name: String,
        /// Entity whose edge contains the reference.
        referrer: String,
    },

    /// The requested edge relation contains a cycle.
    #[error("cyclic dependency detected: {}", members.join(" -> "))]
    Cycle {
        /// Sorted names of the entities forming one cycle.
        members: Vec<String>,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, KrakenError>;
