//! Scheduler configuration

use crate::error::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reservation scheme used by the coordinator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineVariant {
    /// Single commit round, min-wins read and write tables
    #[default]
    Aria,
    /// Two commit rounds, write-only reservation plus max-wins commit table
    WriteBased,
}

impl fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineVariant::Aria => write!(f, "aria"),
            EngineVariant::WriteBased => write!(f, "write_based"),
        }
    }
}

/// Scheduler configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker threads
    pub worker_count: usize,
    /// Reservation scheme
    pub variant: EngineVariant,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            variant: EngineVariant::Aria,
        }
    }
}

impl SchedulerConfig {
    /// Reject configurations a coordinator cannot run with
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.worker_count == 0 {
            return Err(SchedulerError::InvalidWorkerCount(self.worker_count));
        }
        Ok(())
    }
}
