use crate::storage::traits::{ContentCache, StorageResult};
use std::collections::HashMap;

/// In-process content cache, lost when dropped
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, uri: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.get(uri).cloned())
    }

    fn put(&mut self, uri: &str, body: &[u8]) -> StorageResult<()> {
        self.entries.insert(uri.to_string(), body.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.entries.clear();
        Ok(())
    }
}
