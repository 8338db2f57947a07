pub mod schema;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::store::schema::{migrate, FeatureRecord};

/// Whole-file JSON store of tracked feature gates.
///
/// The lifecycle is load once, compute a full replacement set, write once.
/// Nothing mutates the file in between, and the write lands via a temp file
/// and rename so other processes never observe a partial store.
pub struct FeatureStore {
    path: PathBuf,
}

impl FeatureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full record set, upgrading legacy-shaped records in memory.
    /// A record matching neither shape, or a duplicated key, is fatal: the
    /// caller must not reach the write-back step with a corrupt set.
    pub fn load(&self) -> Result<Vec<FeatureRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "feature store not found, starting empty");
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading feature store: {}", self.path.display()))?;
        let raw: Vec<Value> = serde_json::from_str(&data).with_context(|| {
            format!("feature store is not a JSON array: {}", self.path.display())
        })?;

        let mut records = Vec::with_capacity(raw.len());
        for value in raw {
            records.push(migrate(value)?);
        }

        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.key.as_str()) {
                bail!("duplicate key in feature store: {}", record.key);
            }
        }
        Ok(records)
    }

    /// Replaces the store with `records` atomically.
    pub fn save(&self, records: &[FeatureRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed creating store directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)
            .with_context(|| format!("failed writing staged store: {}", staging.display()))?;
        fs::rename(&staging, &self.path).with_context(|| {
            format!("failed replacing feature store: {}", self.path.display())
        })?;
        Ok(())
    }
}
