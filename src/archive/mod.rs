//! Access to the resources recorded in a page snapshot.
//!
//! Only resources that can contribute searchable text are handed out:
//! successful responses with a non-empty body, of HTML or plain-text type,
//! served by the same host as the snapshot itself.

mod snapshot;

use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{Identity, IdentityError};

pub use snapshot::TarSnapshot;

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("snapshot not found: {0}")]
    NotFound(PathBuf),

    #[error("snapshot is outside the library: {0}")]
    OutsideLibrary(PathBuf),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("snapshot has no {0} entry")]
    MissingEntry(&'static str),

    #[error("invalid snapshot identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("malformed response headers: {0}")]
    Headers(#[from] serde_json::Error),
}

/// A snapshot that can be indexed.
pub trait ArchiveSource {
    fn identity(&self) -> Result<Identity, ArchiveError>;

    /// URL the snapshot was recorded from.
    fn base_url(&self) -> &str;

    /// Qualifying resources in recording order, decoded to UTF-8.
    fn records(&self) -> Result<Vec<ArchiveRecord>, ArchiveError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Html,
    PlainText,
}

/// Text of one qualifying resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub url: String,
    pub kind: ResourceKind,
    pub raw_text: String,
}

/// Recorded response of one resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Archive member holding the body.
    pub file: String,
}

impl RecordedResponse {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Charset declared in `Content-Type`, if any.
    pub fn charset(&self) -> Option<&str> {
        split_content_type(self.header("Content-Type")?).1
    }

    /// Kind of text this response contributes, `None` if it is filtered out.
    pub fn qualifies(&self, base_host: Option<&str>) -> Option<ResourceKind> {
        if self.status != 200 {
            return None;
        }

        if self
            .header("Content-Length")
            .is_some_and(|length| length.trim() == "0")
        {
            return None;
        }

        let (mime, _) = split_content_type(self.header("Content-Type")?);
        let kind = if mime.eq_ignore_ascii_case("text/html") {
            ResourceKind::Html
        } else if mime.eq_ignore_ascii_case("text/plain") {
            ResourceKind::PlainText
        } else {
            return None;
        };

        match (base_host, host_of(&self.url)) {
            (Some(base), Some(host)) if base.eq_ignore_ascii_case(&host) => Some(kind),
            _ => None,
        }
    }
}

/// Split a `Content-Type` value into mime type and charset parameter.
pub fn split_content_type(value: &str) -> (&str, Option<&str>) {
    let mut parts = value.split(';');
    let mime = parts.next().unwrap_or_default().trim();

    let charset = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    });

    (mime, charset)
}

pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_lowercase()))
}
