pub mod extract;
pub mod node;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::metadata::Metadata;
use crate::sitemap::{EntryKind, RootKind, SitemapDocument, SitemapEntry};
use extract::Extension;

/// Upstream flag saying whether a document is a sitemap.
pub const IS_SITEMAP_KEY: &str = "isSitemap";
pub const CONTENT_TYPE_KEY: &str = "content-type";
pub const DEPTH_KEY: &str = "depth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// A URL found in a sitemap, not fetched yet.
    Discovered,
    /// The input document itself, passed through untouched.
    Processed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub url: String,
    pub metadata: Metadata,
    pub status: Status,
}

/// A fetched document as handed over by the crawl runtime.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub url: String,
    pub metadata: Metadata,
    pub content: Vec<u8>,
    pub declared_encoding: Option<String>,
}

impl Document {
    pub fn new(url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Document {
            url: url.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.declared_encoding = Some(encoding.into());
        self
    }
}

/// What happened to one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub url: String,
    pub is_sitemap: bool,
    pub kind: Option<RootKind>,
    pub emitted: usize,
    /// Malformed entries that were dropped.
    pub skipped: usize,
    /// Entries dropped for being older than the lastmod cutoff.
    pub filtered: usize,
    /// The sitemap broke off after some entries; later ones are missing.
    pub truncated: bool,
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub report: DocumentReport,
    /// Set when the document was classified as a sitemap but could not be read.
    pub error: Option<ExtractError>,
}

#[derive(Debug)]
pub struct ProcessedDocument {
    pub records: Vec<OutputRecord>,
    pub report: DocumentReport,
    pub error: Option<ExtractError>,
}

/// Classify → parse → extract, one document at a time.
///
/// Holds only configuration, so one instance can serve documents from
/// several threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extensions: Vec<Extension>,
    sniff_content: bool,
    sniff_window: usize,
    max_age: Option<TimeDelta>,
    metadata_transfer: Vec<String>,
    track_depth: bool,
}

impl Pipeline {
    /// Fails with `UnknownExtension` if the config names an extension that
    /// doesn't exist.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let extensions = extract::resolve(&config.extensions)?;
        let max_age = config
            .filter_hours_since_modified
            .filter(|h| *h >= 0)
            .and_then(TimeDelta::try_hours);
        debug!(?extensions, sniff = config.sniff_content, "Sitemap pipeline ready");
        Ok(Pipeline {
            extensions,
            sniff_content: config.sniff_content,
            sniff_window: config.sniff_window,
            max_age,
            metadata_transfer: config.metadata_transfer.clone(),
            track_depth: config.track_depth,
        })
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn is_sitemap(&self, doc: &Document) -> bool {
        let declared = doc.metadata.first_value(IS_SITEMAP_KEY).and_then(parse_declared_flag);
        let content_type = doc.metadata.first_value(CONTENT_TYPE_KEY);
        classify(
            declared,
            content_type,
            &doc.content,
            self.sniff_content,
            self.sniff_window,
        )
    }

    /// Process one document, handing each record to `emit` as soon as it is
    /// built. Always runs to completion; a sitemap that can't be read emits
    /// nothing and reports the error in the outcome.
    pub fn process_with<F>(&self, doc: &Document, mut emit: F) -> DocumentOutcome
    where
        F: FnMut(OutputRecord),
    {
        let mut report = DocumentReport {
            url: doc.url.clone(),
            ..Default::default()
        };

        if !self.is_sitemap(doc) {
            emit(OutputRecord {
                url: doc.url.clone(),
                metadata: doc.metadata.clone(),
                status: Status::Processed,
            });
            report.emitted = 1;
            debug!(url = %doc.url, "Not a sitemap, passed through");
            return DocumentOutcome { report, error: None };
        }
        report.is_sitemap = true;

        let sitemap = match SitemapDocument::parse(&doc.content, doc.declared_encoding.as_deref()) {
            Ok(sitemap) => sitemap,
            Err(e) => {
                warn!(url = %doc.url, error = %e, "Sitemap could not be parsed");
                return DocumentOutcome {
                    report,
                    error: Some(e),
                };
            }
        };
        report.kind = Some(sitemap.root());

        let cutoff = self.max_age.map(|age| Utc::now() - age);
        let seed = self.seed_metadata(&doc.metadata);
        let mut error = None;
        let mut entries = sitemap.entries(&self.extensions);
        for result in entries.by_ref() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(url = %doc.url, error = %e, "Sitemap could not be parsed");
                    error = Some(e);
                    break;
                }
            };
            if is_too_old(&entry, cutoff) {
                report.filtered += 1;
                continue;
            }
            emit(self.build_record(entry, &seed));
            report.emitted += 1;
        }
        report.skipped = entries.skipped();
        report.truncated = entries.truncated();

        info!(
            url = %doc.url,
            emitted = report.emitted,
            skipped = report.skipped,
            filtered = report.filtered,
            truncated = report.truncated,
            "Sitemap processed"
        );
        DocumentOutcome { report, error }
    }

    /// Like [`process_with`](Self::process_with), collecting the records.
    pub fn process(&self, doc: &Document) -> ProcessedDocument {
        let mut records = Vec::new();
        let outcome = self.process_with(doc, |record| records.push(record));
        ProcessedDocument {
            records,
            report: outcome.report,
            error: outcome.error,
        }
    }

    /// Metadata every URL discovered in `parent` starts from.
    fn seed_metadata(&self, parent: &Metadata) -> Metadata {
        let mut seed = Metadata::new();
        for key in self.metadata_transfer.iter().filter(|k| *k != IS_SITEMAP_KEY) {
            if let Some(values) = parent.values(key) {
                seed.set_values(key.clone(), values.to_vec());
            }
        }
        if self.track_depth {
            let depth = parent
                .first_value(DEPTH_KEY)
                .and_then(|d| d.trim().parse::<u32>().ok())
                .unwrap_or(0);
            seed.set_value(DEPTH_KEY, depth.saturating_add(1).to_string());
        }
        seed
    }

    fn build_record(&self, entry: SitemapEntry, seed: &Metadata) -> OutputRecord {
        let mut bag = seed.clone();
        if entry.kind == EntryKind::SitemapRef {
            bag.set_value(IS_SITEMAP_KEY, "true");
        }
        let metadata = extract::extract_all(&self.extensions, &entry.extensions, bag);
        OutputRecord {
            url: entry.loc,
            metadata,
            status: Status::Discovered,
        }
    }
}

fn parse_declared_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_too_old(entry: &SitemapEntry, cutoff: Option<DateTime<Utc>>) -> bool {
    match (cutoff, entry.last_modified()) {
        (Some(cutoff), Some(modified)) => modified < cutoff,
        _ => false,
    }
}

// ── Tests ──
