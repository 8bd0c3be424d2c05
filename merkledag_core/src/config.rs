//! DAG building configuration.

use crate::chunking::BLOCK_SIZE;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// When a directory object is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirWrites {
    /// Assemble the whole directory in memory and write it once.
    #[default]
    Final,
    /// Also write the partially assembled directory after every child.
    ///
    /// The intermediate snapshots are unreferenced; only the final hash is
    /// returned. Kept for stores that expect this write pattern.
    Incremental,
}

impl DirWrites {
    /// Returns the string representation (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            DirWrites::Final => "final",
            DirWrites::Incremental => "incremental",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "final" => Ok(DirWrites::Final),
            "incremental" => Ok(DirWrites::Incremental),
            _ => Err(Error::invalid_config(format!("Unknown dir_writes: {}", s))),
        }
    }
}

/// Parameters for [`crate::Dag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Files of at least this many bytes are split into blocks of this size.
    pub block_size: usize,
    /// Directory write pattern.
    pub dir_writes: DirWrites,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            dir_writes: DirWrites::Final,
        }
    }
}

impl DagConfig {
    /// Parse `key=value` lines; blank lines and `#` comments are skipped and
    /// unset keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| Error::invalid_config(format!("Expected key=value: {}", line)))?;
            let value = value.trim();

            match key.trim() {
                "block_size" => {
                    config.block_size = value.parse().map_err(|_| {
                        Error::invalid_config(format!("Invalid block_size: {}", value))
                    })?;
                }
                "dir_writes" => config.dir_writes = DirWrites::parse(value)?,
                other => {
                    return Err(Error::invalid_config(format!("Unknown key: {}", other)));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the values can be used to build a DAG.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_config("block_size must be non-zero"));
        }
        // Blob data lengths are encoded as u32.
        if self.block_size > u32::MAX as usize {
            return Err(Error::invalid_config(format!(
                "block_size {} exceeds {}",
                self.block_size,
                u32::MAX
            )));
        }
        Ok(())
    }
}
