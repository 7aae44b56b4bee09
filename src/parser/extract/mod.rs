pub mod image;
pub mod links;
pub mod mobile;
pub mod news;
pub mod video;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::node::XmlNode;
use crate::error::{ExtractError, Result};
use crate::metadata::Metadata;

/// Sitemap extension namespaces this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Extension {
    Image,
    Video,
    News,
    Mobile,
    Links,
}

impl Extension {
    pub const ALL: [Extension; 5] = [
        Extension::Image,
        Extension::Video,
        Extension::News,
        Extension::Mobile,
        Extension::Links,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Extension::Image => "IMAGE",
            Extension::Video => "VIDEO",
            Extension::News => "NEWS",
            Extension::Mobile => "MOBILE",
            Extension::Links => "LINKS",
        }
    }

    /// Key prefix for everything this extension writes.
    pub fn prefix(self) -> &'static str {
        match self {
            Extension::Image => "IMAGE.",
            Extension::Video => "VIDEO.",
            Extension::News => "NEWS.",
            Extension::Mobile => "MOBILE.",
            Extension::Links => "LINKS.",
        }
    }

    pub fn namespace(self) -> &'static str {
        match self {
            Extension::Image => "http://www.google.com/schemas/sitemap-image/1.1",
            Extension::Video => "http://www.google.com/schemas/sitemap-video/1.1",
            Extension::News => "http://www.google.com/schemas/sitemap-news/0.9",
            Extension::Mobile => "http://www.google.com/schemas/sitemap-mobile/1.0",
            Extension::Links => "http://www.w3.org/1999/xhtml",
        }
    }

    pub fn from_namespace(uri: &[u8]) -> Option<Self> {
        let uri = std::str::from_utf8(uri).ok()?.trim().trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|ext| ext.namespace().eq_ignore_ascii_case(uri))
    }

    /// Fallback for documents that use the usual prefix without declaring it.
    pub fn from_prefix(prefix: &[u8]) -> Option<Self> {
        match prefix {
            b"image" => Some(Extension::Image),
            b"video" => Some(Extension::Video),
            b"news" => Some(Extension::News),
            b"mobile" => Some(Extension::Mobile),
            b"xhtml" => Some(Extension::Links),
            _ => None,
        }
    }

    /// Write whatever this extension understands in `node` into `bag`.
    /// Unparsable fields are left out; this never fails.
    pub fn extract(self, node: &XmlNode, bag: &mut Metadata) {
        let mut out = bag.scoped(self.prefix());
        match self {
            Extension::Image => image::extract(node, &mut out),
            Extension::Video => video::extract(node, &mut out),
            Extension::News => news::extract(node, &mut out),
            Extension::Mobile => mobile::extract(node, &mut out),
            Extension::Links => links::extract(node, &mut out),
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Extension {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ext| ext.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ExtractError::UnknownExtension(wanted.to_string()))
    }
}

/// Turn configured extension names into extractors, once, at setup time.
///
/// Names are case-insensitive; blanks are skipped, repeats collapse to one
/// extractor and the result is in canonical order. Any unknown name fails.
pub fn resolve<I, S>(names: I) -> Result<Vec<Extension>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolved = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        let ext: Extension = name.parse()?;
        if !resolved.contains(&ext) {
            resolved.push(ext);
        }
    }
    resolved.sort();
    Ok(resolved)
}

/// Run the enabled extensions over one entry's captured sub-trees.
pub fn extract_all(
    enabled: &[Extension],
    trees: &[(Extension, XmlNode)],
    mut bag: Metadata,
) -> Metadata {
    for ext in enabled {
        for (_, node) in trees.iter().filter(|(kind, _)| kind == ext) {
            ext.extract(node, &mut bag);
        }
    }
    bag
}

// ── Tests ──
