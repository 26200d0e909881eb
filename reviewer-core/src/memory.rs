// reviewer-core/src/memory.rs

//! Key/value notes kept for the lifetime of the server.
//!
//! Entries marked persistent are also written to a JSON file and reloaded at
//! start-up, so they survive restarts.

use crate::errors::ToolError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub const MAX_ENTRIES: usize = 1000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub value: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub persistent: bool,
}

type Entries = BTreeMap<String, MemoryEntry>;

#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
    file: Option<PathBuf>,
    capacity: usize,
}

impl MemoryStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            file: None,
            capacity: MAX_ENTRIES,
        }
    }

    /// A store backed by `path`, preloaded with the entries saved there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = Entries::new();
        if path.is_file() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read memory file: {:?}", path))?;
            if !content.trim().is_empty() {
                entries = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse memory file: {:?}", path))?;
            }
            for entry in entries.values_mut() {
                entry.persistent = true;
            }
            info!(count = entries.len(), "Loaded persistent memory entries from {:?}", path);
        }
        Ok(Self {
            entries: Mutex::new(entries),
            file: Some(path),
            capacity: MAX_ENTRIES,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries stay consistent even if a holder panicked mid-call.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, entries: &Entries) -> Result<(), ToolError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let persistent: Entries = entries
            .iter()
            .filter(|(_, e)| e.persistent)
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        write_json(path, &persistent)
            .map_err(|e| ToolError::Memory(format!("Failed to save memory file: {:#}", e)))?;
        debug!(count = persistent.len(), "Saved persistent memory entries to {:?}", path);
        Ok(())
    }

    pub fn set(&self, key: &str, value: &str, tags: Vec<String>, persist: bool) -> Result<(), ToolError> {
        let mut entries = self.lock();
        if entries.len() >= self.capacity && !entries.contains_key(key) {
            return Err(ToolError::Memory(format!(
                "Storage limit reached ({} entries). Delete some entries first.",
                self.capacity
            )));
        }
        let entry = MemoryEntry {
            value: value.to_string(),
            created: Utc::now(),
            tags,
            persistent: persist,
        };
        let previous = entries.insert(key.to_string(), entry);
        let was_persistent = previous.as_ref().map(|e| e.persistent).unwrap_or(false);
        if persist || was_persistent {
            if let Err(e) = self.save(&entries) {
                match previous {
                    Some(old) => entries.insert(key.to_string(), old),
                    None => entries.remove(key),
                };
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<MemoryEntry> {
        self.lock().get(key).cloned()
    }

    /// Sorted keys, limited to entries carrying any of `tags` when given.
    pub fn keys(&self, tags: &[String]) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, e)| tags.is_empty() || tags.iter().any(|t| e.tags.contains(t)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns whether the key existed.
    pub fn delete(&self, key: &str) -> Result<bool, ToolError> {
        let mut entries = self.lock();
        match entries.remove(key) {
            Some(entry) => {
                if entry.persistent {
                    if let Err(e) = self.save(&entries) {
                        entries.insert(key.to_string(), entry);
                        return Err(e);
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Sorted keys whose key, value or any tag contains `pattern`, ignoring case.
    pub fn search(&self, pattern: &str) -> Vec<String> {
        let needle = pattern.to_lowercase();
        self.lock()
            .iter()
            .filter(|(k, e)| {
                k.to_lowercase().contains(&needle)
                    || e.value.to_lowercase().contains(&needle)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Removes every entry and returns how many there were.
    pub fn clear(&self) -> Result<usize, ToolError> {
        let mut entries = self.lock();
        let count = entries.len();
        let had_persistent = entries.values().any(|e| e.persistent);
        let previous = std::mem::take(&mut *entries);
        if had_persistent {
            if let Err(e) = self.save(&entries) {
                *entries = previous;
                return Err(e);
            }
        }
        Ok(count)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn write_json(path: &Path, entries: &Entries) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
