//! Merge configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::EquivalenceConfidence;
use crate::validation::InputLimits;

/// Tunables for [`Merger`](super::Merger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Groups with at least this many members raise an advisory.
    pub oversized_group_threshold: usize,
    /// Minimum confidence for a `same_as` edge to join its endpoints.
    pub equivalence_threshold: EquivalenceConfidence,
    pub limits: InputLimits,
    /// Number of worker threads. 1 runs everything on the calling thread.
    pub workers: usize,
    /// Maximum queued jobs in the worker pool.
    pub queue_capacity: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            oversized_group_threshold: 10,
            equivalence_threshold: EquivalenceConfidence::Definite,
            limits: InputLimits::default(),
            workers: 1,
            queue_capacity: 1024,
        }
    }
}

impl MergeConfig {
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn with_equivalence_threshold(mut self, threshold: EquivalenceConfidence) -> Self {
        self.equivalence_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_oversized_group_threshold(mut self, threshold: usize) -> Self {
        self.oversized_group_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rejects configurations the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for zero thresholds, worker counts, queue sizes
    /// or limits.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.oversized_group_threshold == 0 {
            return Err(ConfigError::ZeroValue {
                field: "oversized_group_threshold",
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroValue { field: "workers" });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "queue_capacity",
            });
        }
        self.limits.validate()
    }
}
