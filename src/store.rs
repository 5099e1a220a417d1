use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::{Deref, DerefMut};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;
use tracing::{debug, warn};

use crate::domain::Dataset;
use crate::error::DasError;

/// Persistent home of [`Dataset`] records, keyed by name.
///
/// Mutations are staged until [`DatasetStore::commit`]; reads observe staged state.
pub trait DatasetStore {
    fn find_by_name(&self, name: &str) -> Result<Option<Dataset>, DasError>;
    fn add(&mut self, dataset: Dataset) -> Result<(), DasError>;
    fn remove(&mut self, dataset: &Dataset) -> Result<(), DasError>;
    fn commit(&mut self) -> Result<(), DasError>;
    fn rollback(&mut self) -> Result<(), DasError>;
}

/// Scoped unit of work over a store. Dropping it without [`Session::commit`] rolls
/// back whatever was staged.
pub struct Session<'a, S: DatasetStore + ?Sized> {
    store: &'a mut S,
    finished: bool,
}

impl<'a, S: DatasetStore + ?Sized> Session<'a, S> {
    pub fn begin(store: &'a mut S) -> Self {
        Self {
            store,
            finished: false,
        }
    }

    /// Commits the staged changes. A failed commit still rolls back on drop.
    pub fn commit(mut self) -> Result<(), DasError> {
        self.store.commit()?;
        self.finished = true;
        Ok(())
    }
}

impl<S: DatasetStore + ?Sized> Deref for Session<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: DatasetStore + ?Sized> DerefMut for Session<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: DatasetStore + ?Sized> Drop for Session<'_, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("rolling back uncommitted dataset changes");
        if let Err(err) = self.store.rollback() {
            warn!(error = %err, "rollback failed");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: BTreeMap<String, Dataset>,
    working: BTreeMap<String, Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datasets(datasets: impl IntoIterator<Item = Dataset>) -> Self {
        let committed = datasets
            .into_iter()
            .map(|dataset| (dataset.name().to_string(), dataset))
            .collect::<BTreeMap<_, _>>();
        Self {
            working: committed.clone(),
            committed,
        }
    }

    /// Committed records, in name order.
    pub fn datasets(&self) -> Vec<Dataset> {
        self.committed.values().cloned().collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.committed != self.working
    }

    /// Working records, including changes not yet committed.
    fn staged(&self) -> Vec<Dataset> {
        self.working.values().cloned().collect()
    }
}

impl DatasetStore for MemoryStore {
    fn find_by_name(&self, name: &str) -> Result<Option<Dataset>, DasError> {
        Ok(self.working.get(name).cloned())
    }

    fn add(&mut self, dataset: Dataset) -> Result<(), DasError> {
        if self.working.contains_key(dataset.name()) {
            return Err(DasError::DuplicateDataset(dataset.name().to_string()));
        }
        self.working.insert(dataset.name().to_string(), dataset);
        Ok(())
    }

    fn remove(&mut self, dataset: &Dataset) -> Result<(), DasError> {
        self.working
            .remove(dataset.name())
            .map(|_| ())
            .ok_or_else(|| DasError::DatasetNotFound(dataset.name().to_string()))
    }

    fn commit(&mut self) -> Result<(), DasError> {
        self.committed = self.working.clone();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DasError> {
        self.working = self.committed.clone();
        Ok(())
    }
}

/// Dataset store persisted as a single JSON array, rewritten atomically on commit.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    state: MemoryStore,
}

impl JsonFileStore {
    pub fn default_path() -> Result<Utf8PathBuf, DasError> {
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_dir().join("das-import").join("datasets.json"))
                    .ok()
            })
            .ok_or_else(|| DasError::Filesystem("unable to resolve data directory".to_string()))
    }

    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, DasError> {
        let path = path.into();
        let state = if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| DasError::Store(format!("read {path}: {err}")))?;
            let datasets: Vec<Dataset> = serde_json::from_str(&content)
                .map_err(|err| DasError::Store(format!("parse {path}: {err}")))?;
            MemoryStore::with_datasets(datasets)
        } else {
            MemoryStore::new()
        };
        debug!(%path, "opened dataset store");
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn datasets(&self) -> Vec<Dataset> {
        self.state.datasets()
    }

    fn persist(&self) -> Result<(), DasError> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DasError::Store(err.to_string()))?;
        let content = serde_json::to_vec_pretty(&self.state.staged())
            .map_err(|err| DasError::Store(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("das-import-store")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DasError::Store(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| DasError::Store(err.to_string()))?;
        temp.persist(self.path.as_std_path())
            .map_err(|err| DasError::Store(err.to_string()))?;
        Ok(())
    }
}

impl DatasetStore for JsonFileStore {
    fn find_by_name(&self, name: &str) -> Result<Option<Dataset>, DasError> {
        self.state.find_by_name(name)
    }

    fn add(&mut self, dataset: Dataset) -> Result<(), DasError> {
        self.state.add(dataset)
    }

    fn remove(&mut self, dataset: &Dataset) -> Result<(), DasError> {
        self.state.remove(dataset)
    }

    fn commit(&mut self) -> Result<(), DasError> {
        if !self.state.has_pending_changes() {
            return Ok(());
        }
        // Memory state is committed only once the file is written.
        self.persist()?;
        self.state.commit()?;
        debug!(path = %self.path, "dataset store committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DasError> {
        self.state.rollback()
    }
}
