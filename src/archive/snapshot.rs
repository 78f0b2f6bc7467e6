use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use tar::Archive;

use super::{host_of, ArchiveError, ArchiveRecord, ArchiveSource, RecordedResponse};
use crate::document::Identity;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub const UID_ENTRY: &str = "uid";
pub const URL_ENTRY: &str = "url";
pub const HEADERS_ENTRY: &str = "headers.json";

/// Snapshot stored as a tar archive, optionally gzip-compressed.
///
/// Layout:
/// - `uid`: identity as hex
/// - `url`: URL the snapshot was recorded from (optional)
/// - `headers.json`: list of [`RecordedResponse`]
/// - response bodies at the paths named by `RecordedResponse::file`
pub struct TarSnapshot {
    path: PathBuf,
    uid: Option<String>,
    base_url: String,
    responses: Vec<RecordedResponse>,
    /// Bodies of qualifying responses only, keyed by member name.
    bodies: HashMap<String, Vec<u8>>,
}

impl TarSnapshot {
    /// Read a snapshot.
    ///
    /// The archive is scanned twice: once for the metadata members, once for
    /// the bodies of qualifying responses. Any other member is skipped
    /// without being buffered.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        if !path.is_file() {
            return Err(ArchiveError::NotFound(path.to_path_buf()));
        }

        let mut meta = read_members(path, |name| {
            matches!(name, UID_ENTRY | URL_ENTRY | HEADERS_ENTRY)
        })?;

        let responses: Vec<RecordedResponse> = match meta.remove(HEADERS_ENTRY) {
            Some(data) => serde_json::from_slice(&data)?,
            None => return Err(ArchiveError::MissingEntry(HEADERS_ENTRY)),
        };

        let uid = meta
            .remove(UID_ENTRY)
            .map(|data| String::from_utf8_lossy(&data).trim().to_string());

        let base_url = meta
            .remove(URL_ENTRY)
            .map(|data| String::from_utf8_lossy(&data).trim().to_string())
            .filter(|url| !url.is_empty())
            .or_else(|| responses.first().map(|r| r.url.clone()))
            .unwrap_or_default();

        let base_host = host_of(&base_url);
        let wanted: HashSet<&str> = responses
            .iter()
            .filter(|response| response.qualifies(base_host.as_deref()).is_some())
            .map(|response| response.file.as_str())
            .collect();

        let bodies = if wanted.is_empty() {
            HashMap::new()
        } else {
            read_members(path, |name| wanted.contains(name))?
        };

        log::debug!(
            "{}: {} responses, {} bodies kept",
            path.display(),
            responses.len(),
            bodies.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            uid,
            base_url,
            responses,
            bodies,
        })
    }

    #[cfg(test)]
    pub fn retained_members(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.bodies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Open a tar or tar.gz archive for one scan over its members.
fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>, ArchiveError> {
    let mut reader = BufReader::new(File::open(path)?);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    let reader: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    Ok(Archive::new(reader))
}

/// Contents of the regular file members whose name passes `keep`.
fn read_members<F>(path: &Path, keep: F) -> Result<HashMap<String, Vec<u8>>, ArchiveError>
where
    F: Fn(&str) -> bool,
{
    let mut members = HashMap::new();
    let mut archive = open_archive(path)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry.path()?.to_string_lossy().to_string();
        let name = name.trim_start_matches("./");
        if !keep(name) {
            continue;
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        members.insert(name.to_string(), data);
    }

    Ok(members)
}

impl ArchiveSource for TarSnapshot {
    fn identity(&self) -> Result<Identity, ArchiveError> {
        let uid = self
            .uid
            .as_deref()
            .ok_or(ArchiveError::MissingEntry(UID_ENTRY))?;
        Ok(uid.parse()?)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records(&self) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        let base_host = host_of(&self.base_url);

        let records = self
            .responses
            .iter()
            .filter_map(|response| {
                let kind = response.qualifies(base_host.as_deref())?;
                let body = match self.bodies.get(&response.file) {
                    Some(body) if !body.is_empty() => body,
                    Some(_) => return None,
                    None => {
                        log::debug!(
                            "{}: no body for {} at {}",
                            self.path.display(),
                            response.url,
                            response.file
                        );
                        return None;
                    }
                };

                if let Some(charset) = response.charset().filter(|c| !is_utf8_label(c)) {
                    log::debug!(
                        "{}: {} declares charset {charset}, reading it as UTF-8",
                        self.path.display(),
                        response.url
                    );
                }

                Some(ArchiveRecord {
                    url: response.url.clone(),
                    kind,
                    raw_text: String::from_utf8_lossy(body).into_owned(),
                })
            })
            .collect();

        Ok(records)
    }
}

fn is_utf8_label(charset: &str) -> bool {
    charset.eq_ignore_ascii_case("utf-8")
        || charset.eq_ignore_ascii_case("utf8")
        || charset.eq_ignore_ascii_case("us-ascii")
}
