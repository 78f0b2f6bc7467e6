//! Groups classified text runs of a snapshot into the fields of a
//! [`PageDocument`].
//!
//! - title: first non-empty title-tier run, falling back to the snapshot URL
//! - text: heading and content runs, separated by `" "`
//! - aux_text: navigation runs, separated by `" | "`
//!
//! A run starting with punctuation is appended without separator, so
//! `"Hello"` followed by `"."` becomes `"Hello."`. Every field has its
//! whitespace collapsed afterwards.
//!
//! Runs from the HTML classifier arrive with character references already
//! decoded by the parser. Only plain-text resources are decoded here.

use crate::document::{Identity, PageDocument};

use super::classify::{ClassifiedText, Tier};
use super::entities::decode_entities;

const TEXT_SEPARATOR: &str = " ";
const AUX_TEXT_SEPARATOR: &str = " | ";

/// Accumulates the runs of one field.
#[derive(Debug)]
pub struct FieldBuilder {
    separator: &'static str,
    buffer: String,
}

impl FieldBuilder {
    pub fn new(separator: &'static str) -> Self {
        Self {
            separator,
            buffer: String::new(),
        }
    }

    pub fn push(&mut self, run: &str) {
        if run.is_empty() {
            return;
        }
        if !self.buffer.is_empty() && !starts_with_punctuation(run) {
            self.buffer.push_str(self.separator);
        }
        self.buffer.push_str(run);
    }

    /// Joined runs with whitespace collapsed.
    pub fn finish(self) -> String {
        normalize(&self.buffer)
    }
}

fn starts_with_punctuation(run: &str) -> bool {
    run.chars().next().is_some_and(|c| c.is_ascii_punctuation())
}

/// Collapse whitespace runs into one space and trim.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the document of one snapshot from the runs of all its resources.
#[derive(Debug)]
pub struct TextAssembler {
    title: Option<String>,
    text: FieldBuilder,
    aux_text: FieldBuilder,
}

impl Default for TextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAssembler {
    pub fn new() -> Self {
        Self {
            title: None,
            text: FieldBuilder::new(TEXT_SEPARATOR),
            aux_text: FieldBuilder::new(AUX_TEXT_SEPARATOR),
        }
    }

    pub fn push(&mut self, run: ClassifiedText<'_>) {
        match run.tier {
            Tier::Title => {
                if self.title.is_none() {
                    let title = normalize(run.text);
                    if !title.is_empty() {
                        self.title = Some(title);
                    }
                }
            }
            Tier::Heading | Tier::Content => self.text.push(run.text),
            Tier::Navigation => self.aux_text.push(run.text),
        }
    }

    /// A plain-text resource is one content run. Its character references
    /// are decoded here since no parser has seen it.
    pub fn push_plain_text(&mut self, text: &str) {
        self.text.push(decode_entities(text).trim());
    }

    /// Finish the document. Returns `None` when neither `text` nor
    /// `aux_text` has any content.
    pub fn finish(self, identity: Identity, url: &str) -> Option<PageDocument> {
        let text = self.text.finish();
        let aux_text = self.aux_text.finish();

        if text.is_empty() && aux_text.is_empty() {
            return None;
        }

        let title = self.title.unwrap_or_else(|| normalize(url));

        Some(PageDocument {
            identity,
            url: url.to_string(),
            title,
            text,
            aux_text,
        })
    }
}

impl<'a> Extend<ClassifiedText<'a>> for TextAssembler {
    fn extend<I: IntoIterator<Item = ClassifiedText<'a>>>(&mut self, iter: I) {
        for run in iter {
            self.push(run);
        }
    }
}
