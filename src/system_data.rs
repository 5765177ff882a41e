//! Rule-definition JSON, loaded once per alias and cached for the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::path::traverse_indexed;

/// Alias → file name of every rule-data category.
pub const DATA_FILES: &[(&str, &str)] = &[
    ("skills", "skills.json"),
    ("attributes", "attributes.json"),
    ("merits", "merits.json"),
    ("variations", "variations.json"),
    ("adaptations", "adaptations.json"),
    ("scars", "scars.json"),
    ("conditions", "conditions.json"),
    ("tilts", "tilts.json"),
];

pub fn is_known_alias(alias: &str) -> bool {
    DATA_FILES.iter().any(|(a, _)| *a == alias)
}

fn file_for(alias: &str) -> Option<&'static str> {
    DATA_FILES
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, file)| *file)
}

/// Loads rule data lazily. A missing or malformed file is cached as "no
/// data" and never retried; callers treat `None` as an ordinary outcome.
#[derive(Debug)]
pub struct SystemDataLoader {
    root: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<Arc<Value>>>>,
}

impl SystemDataLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loader with no backing directory; every alias is empty.
    pub fn empty() -> Self {
        Self {
            root: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loader preloaded from in-memory definitions, keyed by alias.
    pub fn from_definitions<I, S>(defs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let cache = defs
            .into_iter()
            .map(|(alias, v)| (alias.into(), Some(Arc::new(v))))
            .collect();
        Self {
            root: None,
            cache: Mutex::new(cache),
        }
    }

    /// Fill the cache for every known alias up front.
    pub fn preload_all(&self) {
        for (alias, _) in DATA_FILES {
            let _ = self.get_data(alias);
        }
    }

    pub fn get_data(&self, alias: &str) -> Option<Arc<Value>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entry) = cache.get(alias) {
            return entry.clone();
        }
        let loaded = self.load(alias).map(Arc::new);
        cache.insert(alias.to_string(), loaded.clone());
        loaded
    }

    /// One rule record by entity key.
    pub fn get_system_data(&self, alias: &str, key: &str) -> Option<Value> {
        let data = self.get_data(alias)?;
        data.get(key).filter(|v| !v.is_null()).cloned()
    }

    /// Arbitrary path inside an alias, e.g. `["claws", "effect", "2"]`.
    pub fn get_json_reference(&self, alias: &str, path: &[&str]) -> Option<Value> {
        let data = self.get_data(alias)?;
        traverse_indexed(&data, path).cloned()
    }

    fn load(&self, alias: &str) -> Option<Value> {
        let file = file_for(alias)?;
        let root = self.root.as_deref()?;
        read_json(&root.join(file))
    }
}

impl Default for SystemDataLoader {
    fn default() -> Self {
        Self::empty()
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no system data file");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(v) => {
            debug!(path = %path.display(), "loaded system data");
            Some(v)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed system data ignored");
            None
        }
    }
}
