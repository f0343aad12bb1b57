//! Instruction Store (C2) — named, versioned template bodies loaded
//! once at start and re-read on an explicit `reload()` signal. Reads are
//! concurrency-safe and return an immutable snapshot (spec.md §4.2).

pub mod defaults;
pub mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::instruction::{InstructionName, InstructionTemplate};

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("instruction template not found: {0}")]
    NotFound(InstructionName),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct InstructionStore {
    dir: Option<PathBuf>,
    templates: RwLock<HashMap<InstructionName, InstructionTemplate>>,
}

impl InstructionStore {
    /// Load from `dir`, one file per template named `<name>.md`; falls
    /// back to the built-in default body for any file that's absent so
    /// offline demos and tests don't need a populated directory.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let templates = Self::read_all(Some(&dir));
        Self {
            dir: Some(dir),
            templates: RwLock::new(templates),
        }
    }

    /// In-memory store seeded entirely from built-in defaults, for tests
    /// and the offline CLI demo mode.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            templates: RwLock::new(Self::read_all(None)),
        }
    }

    fn read_all(dir: Option<&Path>) -> HashMap<InstructionName, InstructionTemplate> {
        let mut map = HashMap::new();
        for name in InstructionName::all().iter().copied() {
            let (body, last_modified) = match dir {
                Some(dir) => {
                    let path = dir.join(format!("{}.md", name.as_str()));
                    match std::fs::read_to_string(&path) {
                        Ok(body) => {
                            let last_modified = std::fs::metadata(&path)
                                .and_then(|m| m.modified())
                                .map(chrono::DateTime::<Utc>::from)
                                .unwrap_or_else(|_| Utc::now());
                            (body, last_modified)
                        }
                        Err(_) => {
                            warn!(template = %name, "no template file on disk, using default body");
                            (defaults::body_for(name).to_string(), Utc::now())
                        }
                    }
                }
                None => (defaults::body_for(name).to_string(), Utc::now()),
            };

            let required_sections: Vec<String> =
                name.required_sections().iter().map(|s| s.to_string()).collect();
            let missing = template::missing_sections(&body, name.required_sections());
            let is_valid = missing.is_empty();
            if !is_valid {
                warn!(template = %name, missing = ?missing, "instruction template missing required sections");
            }

            map.insert(
                name,
                InstructionTemplate {
                    name,
                    version: 1,
                    body,
                    required_sections,
                    last_modified,
                    is_valid,
                },
            );
        }
        map
    }

    /// `get(name) -> InstructionTemplate | NotFound` (spec.md §4.2). A
    /// template with `is_valid = false` is still returned; the stage
    /// service is the one that rejects it.
    pub fn get(&self, name: InstructionName) -> Result<InstructionTemplate, InstructionError> {
        self.templates
            .read()
            .expect("instruction store lock poisoned")
            .get(&name)
            .cloned()
            .ok_or(InstructionError::NotFound(name))
    }

    /// Re-read every template from disk. A no-op for an in-memory store.
    pub fn reload(&self) {
        let fresh = Self::read_all(self.dir.as_deref());
        *self.templates.write().expect("instruction store lock poisoned") = fresh;
        info!("instruction templates reloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_defaults_are_all_valid() {
        let store = InstructionStore::in_memory();
        for name in InstructionName::all() {
            let template = store.get(*name).unwrap();
            assert!(template.is_valid, "{name} should be valid by default");
        }
    }

    #[test]
    fn missing_template_file_falls_back_to_default_body() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstructionStore::load(dir.path());
        let template = store.get(InstructionName::RequirementsAnalyzer).unwrap();
        assert!(template.is_valid);
    }

    #[test]
    fn reload_picks_up_edited_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RequirementsAnalyzer.md");
        std::fs::write(&path, "# Role\nbody only, missing other sections\n").unwrap();

        let store = InstructionStore::load(dir.path());
        assert!(!store.get(InstructionName::RequirementsAnalyzer).unwrap().is_valid);

        std::fs::write(
            &path,
            "# Role\nx\n# Task\nx\n# Output Format\nx\n",
        )
        .unwrap();
        store.reload();
        assert!(store.get(InstructionName::RequirementsAnalyzer).unwrap().is_valid);
    }
}
