//! Configuration for the string decoder

use crate::{DecoderError, Result};
use encstr_formats::RecordLimits;
use encstr_formats::record::RECORD_HEADER_SIZE;
use serde::{Deserialize, Serialize};

/// Where string table loads run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLoadPolicy {
    /// Queue the load on the background worker ahead of decode tasks
    #[default]
    Worker,
    /// Run the load synchronously inside the `decode` call that triggers it.
    ///
    /// For hosts whose content store may only be touched from the caller's
    /// thread.
    Caller,
}

/// Configuration for the string decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Where table loads run
    pub table_load: TableLoadPolicy,

    /// Smallest record size accepted while parsing resource files
    pub min_entry_size: u16,

    /// Largest record size accepted while parsing resource files
    pub max_entry_size: u16,

    /// Name given to the background worker thread
    pub worker_thread_name: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        let limits = RecordLimits::default();
        Self {
            table_load: TableLoadPolicy::Worker,
            min_entry_size: limits.min_entry_size,
            max_entry_size: limits.max_entry_size,
            worker_thread_name: "encstr-decode".to_string(),
        }
    }
}

impl DecoderConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set where table loads run
    #[must_use]
    pub const fn with_table_load(mut self, policy: TableLoadPolicy) -> Self {
        self.table_load = policy;
        self
    }

    /// Set the largest accepted record size
    #[must_use]
    pub const fn with_max_entry_size(mut self, size: u16) -> Self {
        self.max_entry_size = size;
        self
    }

    /// Set the worker thread name
    #[must_use]
    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    /// Record size limits for resource parsing
    pub const fn record_limits(&self) -> RecordLimits {
        RecordLimits {
            min_entry_size: self.min_entry_size,
            max_entry_size: self.max_entry_size,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if (self.min_entry_size as usize) < RECORD_HEADER_SIZE {
            return Err(DecoderError::Config(format!(
                "min_entry_size {} is smaller than the {RECORD_HEADER_SIZE}-byte record header",
                self.min_entry_size
            )));
        }
        if self.min_entry_size > self.max_entry_size {
            return Err(DecoderError::Config(format!(
                "min_entry_size {} exceeds max_entry_size {}",
                self.min_entry_size, self.max_entry_size
            )));
        }
        if self.worker_thread_name.is_empty() {
            return Err(DecoderError::Config(
                "worker_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
