//! CI-platform adapter seam.
//!
//! External CI platforms (Jenkins, GitLab, ...) are consumed only as an
//! opaque pipeline-status lookup. Concrete HTTP adapters live outside
//! this workspace; here is the trait they implement and an in-memory
//! implementation for tests and dry runs.

use std::collections::HashMap;

use kraken_common::error::{KrakenError, Result};
use serde::{Deserialize, Serialize};

/// Coarse pipeline state, normalized across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Queued, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Success,
    /// Finished with a failure.
    Failed,
    /// The platform reported something unmappable.
    Unknown,
}

/// Status of one external pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Platform-side pipeline identifier.
    pub pipeline_id: String,
    /// Normalized state.
    pub state: PipelineState,
    /// Raw platform payload, kept for diagnostics.
    pub raw: serde_json::Value,
}

/// Lookup seam towards a CI platform.
pub trait CiAdapter {
    /// Fetches the current status of a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when the pipeline is unknown or the platform
    /// cannot be reached.
    fn get_pipeline_status(&self, pipeline_id: &str) -> Result<PipelineStatus>;
}

/// In-memory adapter serving preloaded statuses.
#[derive(Debug, Default)]
pub struct StaticStatuses {
    statuses: HashMap<String, PipelineStatus>,
}

impl StaticStatuses {
    /// An adapter with no pipelines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a status under its pipeline id.
    pub fn insert(&mut self, status: PipelineStatus) {
        let _ = self.statuses.insert(status.pipeline_id.clone(), status);
    }
}

impl CiAdapter for StaticStatuses {
    fn get_pipeline_status(&self, pipeline_id: &str) -> Result<PipelineStatus> {
        self.statuses
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| KrakenError::Configuration {
                message: format!("unknown pipeline id: \"{pipeline_id}\""),
            })
    }
}
