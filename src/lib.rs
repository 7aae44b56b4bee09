//! Streaming, fault-tolerant sitemap extraction.
//!
//! A [`Pipeline`] takes fetched documents, decides whether each one is a
//! sitemap, and turns sitemaps into one [`OutputRecord`] per `<url>` or
//! `<sitemap>` entry, with metadata from the enabled extensions.

pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod sitemap;
pub mod utils;

pub use config::ExtractorConfig;
pub use error::{ExtractError, Result};
pub use metadata::Metadata;
pub use parser::extract::Extension;
pub use parser::{Document, DocumentReport, OutputRecord, Pipeline, Status};
pub use sitemap::{SitemapDocument, SitemapEntry};
