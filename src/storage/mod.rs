use ::opendal::Operator;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

pub mod opendal;

/// A directory inside a store: `uri` names the store (`memory://notes`,
/// `file:///var/notes`, `s3://bucket/prefix`) and `root` is a path below it
/// that every key is resolved against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub uri: String,
    #[serde(default)]
    pub root: String,
}

type MemoryKey = (String, String);

static MEMORY_STORES: OnceLock<Mutex<HashMap<MemoryKey, Operator>>> = OnceLock::new();

impl StorageConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            root: String::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Opens an operator rooted at this location.
    ///
    /// Memory stores live for the whole process, one per `uri` and `root`,
    /// so reopening a memory location sees what was written through an
    /// earlier handle.
    pub fn operator(&self) -> Result<Operator> {
        if !self.uri.starts_with("memory:") {
            return self::opendal::build_operator(&self.uri, &self.root);
        }

        let mut stores = MEMORY_STORES
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .map_err(|_| anyhow!("memory store registry lock poisoned"))?;
        let key = (self.uri.clone(), self.root.clone());
        if let Some(op) = stores.get(&key) {
            return Ok(op.clone());
        }
        let op = self::opendal::build_operator(&self.uri, &self.root)?;
        stores.insert(key, op.clone());
        Ok(op)
    }
}
