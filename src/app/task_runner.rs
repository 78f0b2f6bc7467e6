use std::{
    fmt,
    path::PathBuf,
    sync::{mpsc, Arc},
};

use crate::archive::TarSnapshot;

use super::{
    errors::AppError,
    library::{index_snapshot, IndexOutcome, SharedIndex},
};

/// Runs queued tasks one at a time, in the order they were sent.
///
/// Every task runs on its own thread which is joined before the next task
/// starts, so a panicking task is logged and the queue carries on.
pub fn start_queue(task_rx: mpsc::Receiver<Task>, index: Arc<SharedIndex>) {
    let mut task_id = 0u64;

    log::debug!("waiting for job");
    while let Ok(task) = task_rx.recv() {
        // graceful shutdown, everything sent earlier has already run
        if let Task::Shutdown = &task {
            log::info!("task queue stopped after {task_id} tasks");
            return;
        }

        task_id += 1;
        log::debug!("task {task_id}: {task}");

        let task_handle = std::thread::spawn({
            let index = index.clone();
            let task = task.clone();
            move || task.run(&index)
        });

        match task_handle.join() {
            Ok(Status::Done(outcome)) => log::info!("task {task_id}: {task}: {outcome}"),
            Ok(Status::Skipped(reason)) => log::warn!("task {task_id}: {task} skipped: {reason}"),
            Ok(Status::Error(msg)) => log::error!("task {task_id}: {task} failed: {msg}"),
            Err(err) => log::error!("task {task_id}: {task} panicked: {err:?}"),
        }
    }

    log::debug!("task queue sender dropped");
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Done(IndexOutcome),
    /// The snapshot could not be read. Previous rows of it stay untouched.
    Skipped(String),
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// (re)index one snapshot archive
    UpdateIndex { path: PathBuf },

    /// request to gracefully shutdown task queue
    Shutdown,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::UpdateIndex { path } => write!(f, "update index from {}", path.display()),
            Task::Shutdown => write!(f, "shutdown"),
        }
    }
}

impl Task {
    pub fn run(&self, index: &SharedIndex) -> Status {
        match self {
            Task::UpdateIndex { path } => {
                let snapshot = match TarSnapshot::open(path) {
                    Ok(snapshot) => snapshot,
                    Err(err) => return Status::Skipped(err.to_string()),
                };

                let store = match index.get() {
                    Ok(store) => store,
                    Err(err) => return Status::Error(err.to_string()),
                };

                match index_snapshot(&store, &snapshot) {
                    Ok(outcome) => Status::Done(outcome),
                    Err(AppError::Archive(err)) => Status::Skipped(err.to_string()),
                    Err(err) => Status::Error(err.to_string()),
                }
            }
            Task::Shutdown => Status::Skipped("shutdown is handled by the queue".to_string()),
        }
    }
}
