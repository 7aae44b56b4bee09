use thiserror::Error;

/// Errors raised while configuring or running sitemap extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The document as a whole cannot be read as a sitemap.
    #[error("malformed sitemap document: {0}")]
    MalformedDocument(String),

    /// One `<url>` or `<sitemap>` entry is unusable. Recovered by the parser.
    #[error("malformed sitemap entry: {0}")]
    MalformedEntry(String),

    #[error("unknown sitemap extension: {0}")]
    UnknownExtension(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
