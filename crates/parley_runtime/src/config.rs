//! Configuration for the command engine.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`CommandEngine`](crate::CommandEngine).
///
/// Controls the worker runtime, pool sizes, and conversation limits.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Threads in the worker runtime used by worker commands.
    pub worker_threads: usize,

    /// Idle argument collections kept for reuse.
    pub argument_pool_capacity: usize,

    /// Idle runners kept per command.
    pub runner_pool_capacity: usize,

    /// How long a worker task may run before a warning is logged.
    pub slow_task_threshold: Duration,

    /// Open conversations kept before the oldest is abandoned.
    pub max_conversations: usize,

    /// Log lines naming unknown commands at info level.
    pub log_unknown_commands: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            argument_pool_capacity: 64,
            runner_pool_capacity: 8,
            slow_task_threshold: Duration::from_secs(5),
            max_conversations: 256,
            log_unknown_commands: false,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for local development: small pools, a short
    /// slow-task threshold, and unknown commands logged.
    #[must_use]
    pub fn development() -> Self {
        Self {
            worker_threads: 1,
            argument_pool_capacity: 16,
            runner_pool_capacity: 2,
            slow_task_threshold: Duration::from_millis(500),
            max_conversations: 16,
            log_unknown_commands: true,
        }
    }

    /// Creates a configuration for a dedicated server console with many
    /// concurrent invokers.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            worker_threads: 4,
            argument_pool_capacity: 256,
            runner_pool_capacity: 32,
            slow_task_threshold: Duration::from_secs(10),
            max_conversations: 4096,
            log_unknown_commands: false,
        }
    }

    /// Builder method to set the worker thread count (at least one is used).
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Builder method to set the argument pool capacity.
    #[must_use]
    pub fn with_argument_pool_capacity(mut self, capacity: usize) -> Self {
        self.argument_pool_capacity = capacity;
        self
    }

    /// Builder method to set the per-command runner pool capacity.
    #[must_use]
    pub fn with_runner_pool_capacity(mut self, capacity: usize) -> Self {
        self.runner_pool_capacity = capacity;
        self
    }

    /// Builder method to set the slow-task threshold.
    #[must_use]
    pub fn with_slow_task_threshold(mut self, threshold: Duration) -> Self {
        self.slow_task_threshold = threshold;
        self
    }

    /// Builder method to set the conversation limit.
    #[must_use]
    pub fn with_max_conversations(mut self, max: usize) -> Self {
        self.max_conversations = max;
        self
    }

    /// Builder method to enable/disable logging of unknown commands.
    #[must_use]
    pub fn with_log_unknown_commands(mut self, log: bool) -> Self {
        self.log_unknown_commands = log;
        self
    }
}
