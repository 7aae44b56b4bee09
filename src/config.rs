use config::{Config, Environment};
use serde::Deserialize;

use crate::error::Result;

pub const ENV_PREFIX: &str = "SITEMAP";
pub const DEFAULT_SNIFF_WINDOW: usize = 1024;

/// Settings for one [`Pipeline`](crate::parser::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Look at the content when upstream gives no sitemap hint.
    pub sniff_content: bool,
    /// Leading bytes inspected when sniffing.
    pub sniff_window: usize,
    /// Enabled extensions by name: IMAGE, VIDEO, NEWS, MOBILE, LINKS.
    pub extensions: Vec<String>,
    /// Drop entries whose lastmod is older than this many hours.
    pub filter_hours_since_modified: Option<i64>,
    /// Keys copied from the sitemap's metadata to every discovered URL.
    pub metadata_transfer: Vec<String>,
    /// Write `depth` = sitemap depth + 1 on discovered URLs.
    pub track_depth: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            sniff_content: false,
            sniff_window: DEFAULT_SNIFF_WINDOW,
            extensions: Vec::new(),
            filter_hours_since_modified: None,
            metadata_transfer: Vec::new(),
            track_depth: true,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overlaid with `SITEMAP_*` environment variables, e.g.
    /// `SITEMAP_SNIFF_CONTENT=true` or `SITEMAP_EXTENSIONS=IMAGE,LINKS`.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extensions")
                    .with_list_parse_key("metadata_transfer"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
