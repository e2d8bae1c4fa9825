//! Directory-backed implementation of [`DocumentStore`].
//!
//! Each document is a pretty-printed `<id>.grml.json` file. Writes go to a
//! temporary sibling first and are renamed into place. Content hashes are
//! cached per document and recomputed from disk on first use, so an
//! unchanged model is never rewritten, even by a fresh store instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use grml_core::serialize::ModelSerialization;

use crate::error::StorageError;
use crate::hash::hash_model;
use crate::traits::DocumentStore;
use crate::types::{DocumentId, DocumentSummary, SaveOutcome};

pub const EXTENSION: &str = ".grml.json";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    hashes: RefCell<HashMap<DocumentId, blake3::Hash>>,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "file store opened");
        Ok(FileStore {
            root,
            hashes: RefCell::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{id}{EXTENSION}"))
    }

    fn read(&self, id: &DocumentId) -> Result<Option<ModelSerialization>, StorageError> {
        match fs::read(self.path(id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl DocumentStore for FileStore {
    fn save(&mut self, id: &DocumentId, model: &ModelSerialization) -> Result<SaveOutcome, StorageError> {
        let hash = hash_model(model)?;
        if self.hash(id)? == Some(hash) {
            tracing::debug!(%id, "document unchanged, skipping write");
            return Ok(SaveOutcome::Unchanged);
        }

        let path = self.path(id);
        let tmp = path.with_extension("json.tmp");
        let mut text = serde_json::to_string_pretty(model)?;
        text.push('\n');
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        self.hashes.borrow_mut().insert(id.clone(), hash);
        tracing::info!(%id, path = %path.display(), "document written");
        Ok(SaveOutcome::Written)
    }

    fn load(&self, id: &DocumentId) -> Result<ModelSerialization, StorageError> {
        self.read(id)?
            .ok_or_else(|| StorageError::DocumentNotFound { id: id.to_string() })
    }

    fn delete(&mut self, id: &DocumentId) -> Result<(), StorageError> {
        self.hashes.borrow_mut().remove(id);
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::DocumentNotFound { id: id.to_string() })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(EXTENSION)) else {
                continue;
            };
            match DocumentId::new(stem) {
                Ok(id) => ids.push(id),
                Err(_) => tracing::debug!(file = stem, "skipping file with an invalid id"),
            }
        }
        ids.sort();

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let model = self.load(&id)?;
            let hash = hash_model(&model)?;
            self.hashes.borrow_mut().insert(id.clone(), hash);
            summaries.push(DocumentSummary {
                id,
                name: model.name,
                hash: hash.to_hex().to_string(),
            });
        }
        Ok(summaries)
    }

    fn hash(&self, id: &DocumentId) -> Result<Option<blake3::Hash>, StorageError> {
        if let Some(hash) = self.hashes.borrow().get(id) {
            return Ok(Some(*hash));
        }
        let Some(model) = self.read(id)? else {
            return Ok(None);
        };
        let hash = hash_model(&model)?;
        self.hashes.borrow_mut().insert(id.clone(), hash);
        Ok(Some(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grml_core::builtin::{PIPELINE_MODEL, TRAIN_TEST_SPLIT};
    use grml_core::graph::ModelGraph;
    use grml_core::registry::Registry;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).unwrap()
    }

    fn graph(registry: &Registry) -> ModelGraph {
        let mut graph = ModelGraph::new(registry, PIPELINE_MODEL).unwrap();
        let root = graph.root();
        graph.add_function(registry, TRAIN_TEST_SPLIT, root).unwrap();
        graph
    }

    #[test]
    fn writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::with_builtins();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.save_graph(&id("split"), &graph(&registry)).unwrap();

        let text = fs::read_to_string(dir.path().join("split.grml.json")).unwrap();
        assert!(text.starts_with("{\n"));
        assert!(text.ends_with("}\n"));
        assert!(!dir.path().join("split.grml.json.tmp").exists());
    }

    #[test]
    fn fresh_stores_skip_unchanged_documents() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::with_builtins();
        let g = graph(&registry);
        FileStore::open(dir.path())
            .unwrap()
            .save_graph(&id("p"), &g)
            .unwrap();
        let modified = fs::metadata(dir.path().join("p.grml.json"))
            .unwrap()
            .modified()
            .unwrap();

        let mut store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.save_graph(&id("p"), &g).unwrap(), SaveOutcome::Unchanged);
        assert_eq!(
            fs::metadata(store.path(&id("p"))).unwrap().modified().unwrap(),
            modified
        );

        let loaded = store.load_graph(&registry, &id("p")).unwrap();
        assert_eq!(loaded.serialize().unwrap(), g.serialize().unwrap());
    }

    #[test]
    fn lists_only_documents() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::with_builtins();
        let mut store = FileStore::open(dir.path().join("models")).unwrap();
        store.save_graph(&id("b"), &graph(&registry)).unwrap();
        store.save_graph(&id("a"), &graph(&registry)).unwrap();
        fs::write(store.root().join("notes.txt"), "x").unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        store.delete(&id("a")).unwrap();
        assert!(matches!(
            store.load(&id("a")),
            Err(StorageError::DocumentNotFound { .. })
        ));
        assert_eq!(store.hash(&id("a")).unwrap(), None);
    }
}
