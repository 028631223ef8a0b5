use crate::domain::normalize_dist_name;
use crate::error::Result;
use crate::metadata::MetadataIndex;
use std::collections::HashMap;
use std::sync::Mutex;

/// Metadata index with canned versions that records every lookup
pub struct MockIndex {
    versions: HashMap<String, String>,
    lookups: Mutex<Vec<String>>,
}

impl MockIndex {
    /// Create an index where nothing is installed
    pub fn new() -> Self {
        MockIndex {
            versions: HashMap::new(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Pretend `dist_name` is installed at `version`
    pub fn add_distribution(&mut self, dist_name: &str, version: impl Into<String>) {
        self.versions
            .insert(normalize_dist_name(dist_name), version.into());
    }

    /// Names looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .map(|lookups| lookups.clone())
            .unwrap_or_default()
    }
}

impl Default for MockIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataIndex for MockIndex {
    fn version_of(&self, dist_name: &str) -> Result<Option<String>> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(dist_name.to_string());
        }
        Ok(self.versions.get(&normalize_dist_name(dist_name)).cloned())
    }

    fn describe(&self) -> String {
        String::from("mock index")
    }
}
