use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
};

use crate::{
    archive::{ArchiveError, ArchiveSource, TarSnapshot},
    document::Identity,
    extract::extract_document,
    index::{IndexError, IndexStore},
    search::{self, SearchHit, SearchOptions},
};

use super::{
    errors::AppError,
    task_runner::{self, Task},
};

/// Index file inside a library root.
pub const INDEX_FILE_NAME: &str = ".hoard.sqlite";

/// What happened to a snapshot handed to the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed(Identity),
    /// No searchable text; rows of the identity were cleared.
    Suppressed(Identity),
}

impl fmt::Display for IndexOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOutcome::Indexed(identity) => write!(f, "indexed {identity}"),
            IndexOutcome::Suppressed(identity) => write!(f, "no text in {identity}, cleared"),
        }
    }
}

/// Extract a snapshot and replace its rows in `store`.
pub fn index_snapshot(
    store: &IndexStore,
    source: &dyn ArchiveSource,
) -> Result<IndexOutcome, AppError> {
    let identity = source.identity()?;
    let doc = extract_document(source)?;

    store.update(identity, doc.as_ref())?;

    Ok(match doc {
        Some(_) => IndexOutcome::Indexed(identity),
        None => IndexOutcome::Suppressed(identity),
    })
}

/// The index of a library, opened on first use and kept open until closed.
pub struct SharedIndex {
    path: PathBuf,
    store: Mutex<Option<Arc<IndexStore>>>,
}

impl SharedIndex {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            store: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<IndexStore>, IndexError> {
        let mut store = self.store.lock().map_err(|_| IndexError::Poisoned)?;

        if let Some(store) = store.as_ref() {
            return Ok(store.clone());
        }

        let opened = Arc::new(IndexStore::open(&self.path)?);
        *store = Some(opened.clone());
        Ok(opened)
    }

    pub fn is_open(&self) -> bool {
        self.store.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Release the handle. The file stays locked until in-flight users drop
    /// their clones.
    pub fn close(&self) -> Result<(), IndexError> {
        let mut store = self.store.lock().map_err(|_| IndexError::Poisoned)?;
        if store.take().is_some() {
            log::info!("closed index {}", self.path.display());
        }
        Ok(())
    }
}

/// A directory of snapshot archives and the search index over them.
pub struct Library {
    root: PathBuf,
    index: Arc<SharedIndex>,

    task_tx: Option<mpsc::Sender<Task>>,
    task_queue_handle: Option<std::thread::JoinHandle<()>>,
}

impl Library {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            index: Arc::new(SharedIndex::new(root.join(INDEX_FILE_NAME))),
            task_tx: None,
            task_queue_handle: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> &Path {
        self.index.path()
    }

    pub fn run_queue(&mut self) {
        let (task_tx, task_rx) = mpsc::channel::<Task>();

        let handle = std::thread::spawn({
            let index = self.index.clone();
            move || task_runner::start_queue(task_rx, index)
        });

        self.task_queue_handle = Some(handle);
        self.task_tx = Some(task_tx);
    }

    /// Queue a snapshot for (re)indexing. Relative paths are resolved
    /// against the library root, and the snapshot must live under it.
    /// Returns the canonical path that was queued.
    pub fn update_index(&self, path: &Path) -> Result<PathBuf, AppError> {
        let path = self.resolve(path);
        if !path.is_file() {
            return Err(ArchiveError::NotFound(path).into());
        }

        let path = path.canonicalize().map_err(ArchiveError::from)?;
        let inside = self
            .root
            .canonicalize()
            .is_ok_and(|root| path.starts_with(root));
        if !inside {
            return Err(ArchiveError::OutsideLibrary(path).into());
        }

        let task_tx = self.task_tx.as_ref().ok_or(AppError::QueueClosed)?;
        task_tx
            .send(Task::UpdateIndex { path: path.clone() })
            .map_err(|_| AppError::QueueClosed)?;

        log::debug!("queued {}", path.display());
        Ok(path)
    }

    /// Index a snapshot on the calling thread.
    pub fn index_now(&self, path: &Path) -> Result<IndexOutcome, AppError> {
        let snapshot = TarSnapshot::open(&self.resolve(path))?;
        let store = self.index.get()?;
        index_snapshot(&store, &snapshot)
    }

    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>, AppError> {
        let store = self.index.get()?;
        Ok(search::search(store.as_ref(), query, opts)?)
    }

    /// Ask the queue to stop once the tasks sent so far are done.
    pub fn shutdown(&self) {
        if let Some(task_tx) = &self.task_tx {
            if let Err(err) = task_tx.send(Task::Shutdown) {
                log::error!("failed to send shutdown task: {err:?}");
            }
        }
    }

    pub fn wait_task_queue_finish(&mut self) {
        self.task_tx = None;
        if let Some(handle) = self.task_queue_handle.take() {
            if let Err(err) = handle.join() {
                log::error!("task queue panicked: {err:?}");
            }
        }
    }

    /// Drain the queue and release the index.
    pub fn close(&mut self) -> Result<(), AppError> {
        self.shutdown();
        self.wait_task_queue_finish();
        self.index.close()?;
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
