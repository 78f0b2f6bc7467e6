use crate::{
    archive::ArchiveError,
    index::{IndexError, QueryError},
    search::SearchError,
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Archive(#[from] ArchiveError),

    #[error("{0}")]
    Index(#[from] IndexError),

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("task queue is not running")]
    QueueClosed,

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Query(err) => AppError::Query(err),
            SearchError::Index(err) => AppError::Index(err),
        }
    }
}
