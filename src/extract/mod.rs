//! Content extraction: snapshot resources in, one [`PageDocument`] out.
//!
//! - `classify`: assigns every text run of an HTML document to a tier
//! - `assemble`: joins the runs into title / text / aux_text fields
//! - `entities`: character reference decoding used by `assemble`

pub mod assemble;
pub mod classify;
mod entities;

use scraper::Html;

use crate::{
    archive::{ArchiveError, ArchiveSource, ResourceKind},
    document::PageDocument,
};

pub use assemble::TextAssembler;
pub use classify::{classify, ClassifiedText, Tier};

/// Extract the searchable document of a snapshot.
///
/// `Ok(None)` means the snapshot has no indexable text; the caller still
/// clears previous rows of its identity.
pub fn extract_document(
    source: &dyn ArchiveSource,
) -> Result<Option<PageDocument>, ArchiveError> {
    let identity = source.identity()?;
    let mut assembler = TextAssembler::new();

    for record in source.records()? {
        log::debug!(
            "{identity}: {:?} resource {} ({} bytes)",
            record.kind,
            record.url,
            record.raw_text.len()
        );

        match record.kind {
            ResourceKind::Html => {
                let document = Html::parse_document(&record.raw_text);
                assembler.extend(classify(&document));
            }
            ResourceKind::PlainText => assembler.push_plain_text(&record.raw_text),
        }
    }

    Ok(assembler.finish(identity, source.base_url()))
}
