use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, QName, ResolveResult};
use quick_xml::NsReader;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::decode::decode_document;
use crate::error::{ExtractError, Result};
use crate::parser::extract::Extension;
use crate::parser::node::XmlNode;
use crate::utils::parse_w3c_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    UrlSet,
    SitemapIndex,
}

impl RootKind {
    fn from_tag(local_name: &[u8]) -> Option<Self> {
        match local_name {
            b"urlset" => Some(RootKind::UrlSet),
            b"sitemapindex" => Some(RootKind::SitemapIndex),
            _ => None,
        }
    }

    fn entry_tag(self) -> &'static str {
        match self {
            RootKind::UrlSet => "url",
            RootKind::SitemapIndex => "sitemap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    /// A `<url>` pointing at content.
    Url,
    /// A `<sitemap>` in an index, pointing at another sitemap file.
    SitemapRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "always" => Some(ChangeFreq::Always),
            "hourly" => Some(ChangeFreq::Hourly),
            "daily" => Some(ChangeFreq::Daily),
            "weekly" => Some(ChangeFreq::Weekly),
            "monthly" => Some(ChangeFreq::Monthly),
            "yearly" => Some(ChangeFreq::Yearly),
            "never" => Some(ChangeFreq::Never),
            _ => None,
        }
    }
}

/// One decoded `<url>` (or `<sitemap>`) entry.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub kind: EntryKind,
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
    /// Raw sub-trees for the enabled extensions, in document order.
    pub extensions: Vec<(Extension, XmlNode)>,
}

impl SitemapEntry {
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.lastmod.as_deref().and_then(parse_w3c_datetime)
    }
}

/// Namespaces the core `<url>`/`<loc>`/... elements may be bound to, besides
/// whatever namespace the root element itself uses.
const SITEMAP_NAMESPACES: &[&[u8]] = &[
    b"http://www.sitemaps.org/schemas/sitemap/0.9",
    b"http://www.google.com/schemas/sitemap/0.9",
    b"http://www.google.com/schemas/sitemap/0.84",
];

/// A decoded sitemap whose root element has been checked.
#[derive(Debug)]
pub struct SitemapDocument {
    text: String,
    root: RootKind,
}

impl SitemapDocument {
    /// Decode `raw` and check that it has a `urlset` or `sitemapindex` root.
    pub fn parse(raw: &[u8], declared_encoding: Option<&str>) -> Result<Self> {
        let text = decode_document(raw, declared_encoding)?;
        let mut reader = open_reader(&text);
        let (root, _) = seek_root(&mut reader, &mut Vec::new())?;
        Ok(SitemapDocument { text, root })
    }

    pub fn root(&self) -> RootKind {
        self.root
    }

    /// Stream the entries, keeping sub-trees only for `extensions`.
    pub fn entries<'a>(&'a self, extensions: &'a [Extension]) -> SitemapEntries<'a> {
        let mut reader = open_reader(&self.text);
        let mut buf = Vec::new();
        let (tag, pending) = match seek_root(&mut reader, &mut buf) {
            Ok((_, tag)) => (tag, None),
            Err(e) => (
                RootTag {
                    empty: true,
                    ..Default::default()
                },
                Some(e),
            ),
        };
        SitemapEntries {
            reader,
            buf,
            kind: self.root,
            done: tag.empty,
            root: tag,
            extensions,
            open: Vec::new(),
            resume: None,
            yielded: 0,
            skipped: 0,
            truncated: false,
            pending,
            last_error_at: None,
        }
    }
}

fn open_reader(text: &str) -> NsReader<&[u8]> {
    let mut reader = NsReader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(true);
    // Nesting is tracked by name in `SitemapEntries`, so broken nesting
    // stays local to one entry.
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

/// The root start tag as written in the document.
#[derive(Debug, Default)]
struct RootTag {
    name: String,
    namespace: Option<Vec<u8>>,
    empty: bool,
}

/// Read up to the root start tag.
fn seek_root(reader: &mut NsReader<&[u8]>, buf: &mut Vec<u8>) -> Result<(RootKind, RootTag)> {
    loop {
        buf.clear();
        let found = match reader.read_resolved_event_into(buf) {
            Ok((ns, Event::Start(e))) => Ok(root_tag(&ns, &e, false)),
            Ok((ns, Event::Empty(e))) => Ok(root_tag(&ns, &e, true)),
            Ok((_, Event::Eof)) => {
                return Err(ExtractError::MalformedDocument("no root element".into()));
            }
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        let (local, tag) = found.map_err(|e| {
            ExtractError::MalformedDocument(format!("{} at byte {}", e, reader.buffer_position()))
        })?;
        return match RootKind::from_tag(local.as_bytes()) {
            Some(kind) => Ok((kind, tag)),
            None => Err(ExtractError::MalformedDocument(format!(
                "unexpected root element <{}>",
                tag.name
            ))),
        };
    }
}

fn root_tag(ns: &ResolveResult<'_>, e: &BytesStart<'_>, empty: bool) -> (String, RootTag) {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let namespace = match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(uri.to_vec()),
        _ => None,
    };
    let tag = RootTag {
        name: qualified_name(e.name()),
        namespace,
        empty,
    };
    (local, tag)
}

/// Lazily yields the entries of a [`SitemapDocument`].
///
/// Broken entries are skipped and counted. An element left open or closed
/// twice only breaks the entry it sits in. A read error before the first
/// entry is returned once as `MalformedDocument`; after that it ends the
/// stream and sets [`truncated`](Self::truncated).
pub struct SitemapEntries<'a> {
    reader: NsReader<&'a [u8]>,
    buf: Vec<u8>,
    kind: RootKind,
    root: RootTag,
    extensions: &'a [Extension],
    /// Non-entry elements open below the root.
    open: Vec<String>,
    /// An entry start tag read while the previous entry was still open.
    resume: Option<Step>,
    yielded: usize,
    skipped: usize,
    truncated: bool,
    done: bool,
    pending: Option<ExtractError>,
    last_error_at: Option<u64>,
}

/// Which vocabulary an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Sitemap,
    Extension(Extension),
    Foreign,
}

enum Step {
    Open {
        node: XmlNode,
        qname: String,
        space: Space,
        empty: bool,
    },
    Close(String),
    Text(String),
    Eof,
    Skip,
}

enum StepError {
    /// The reader choked on the markup.
    Xml(quick_xml::Error),
    /// Markup was fine but the content could not be decoded.
    Content(String),
}

enum EntryError {
    Malformed(String),
    Fatal(String),
}

/// An element open inside an entry.
struct Frame {
    name: String,
    space: Space,
    node: XmlNode,
}

#[derive(Default)]
struct EntryFields {
    loc: Option<String>,
    lastmod: Option<String>,
    changefreq: Option<ChangeFreq>,
    priority: Option<f32>,
    extensions: Vec<(Extension, XmlNode)>,
}

impl SitemapEntries<'_> {
    /// Entries returned so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Entries dropped as malformed so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The document broke off after some entries were returned, so later
    /// entries may be missing.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn step(&mut self) -> std::result::Result<Step, StepError> {
        self.buf.clear();
        let (ns, event) = self
            .reader
            .read_resolved_event_into(&mut self.buf)
            .map_err(StepError::Xml)?;
        let root_ns = self.root.namespace.as_deref();
        let step = match event {
            Event::Start(e) => Step::Open {
                node: element_node(&e),
                qname: qualified_name(e.name()),
                space: space_of(&ns, root_ns),
                empty: false,
            },
            Event::Empty(e) => Step::Open {
                node: element_node(&e),
                qname: qualified_name(e.name()),
                space: space_of(&ns, root_ns),
                empty: true,
            },
            Event::End(e) => Step::Close(qualified_name(e.name())),
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| StepError::Content(format!("undecodable text: {}", err)))?;
                Step::Text(text.into_owned())
            }
            Event::CData(e) => Step::Text(String::from_utf8_lossy(&e).into_owned()),
            Event::Eof => Step::Eof,
            _ => Step::Skip,
        };
        Ok(step)
    }

    fn is_entry(&self, node: &XmlNode, space: Space) -> bool {
        space == Space::Sitemap && node.name == self.kind.entry_tag()
    }

    /// Remember a reader error; a second error at the same offset means the
    /// reader is stuck.
    fn note_error(&mut self, err: &quick_xml::Error) -> std::result::Result<(), String> {
        let pos = self.reader.buffer_position();
        if self.last_error_at == Some(pos) {
            return Err(format!("{} at byte {}", err, pos));
        }
        self.last_error_at = Some(pos);
        Ok(())
    }

    /// Read from just after the start tag `entry_name` up to its end tag.
    fn read_entry(&mut self, entry_name: &str) -> std::result::Result<SitemapEntry, EntryError> {
        let mut fields = EntryFields::default();
        let mut stack: Vec<Frame> = Vec::new();
        let mut malformed: Option<String> = None;

        loop {
            match self.step() {
                Ok(Step::Open {
                    node,
                    qname,
                    space,
                    empty,
                }) => {
                    if self.is_entry(&node, space) {
                        // Missing end tag; the new entry starts here.
                        self.resume = Some(Step::Open {
                            node,
                            qname,
                            space,
                            empty,
                        });
                        return Err(EntryError::Malformed(format!("<{}> not closed", entry_name)));
                    }
                    let frame = Frame {
                        name: qname,
                        space,
                        node,
                    };
                    if empty {
                        self.attach(&mut stack, &mut fields, frame);
                    } else {
                        stack.push(frame);
                    }
                }
                Ok(Step::Text(text)) => {
                    if let Some(top) = stack.last_mut() {
                        top.node.text.push_str(&text);
                    }
                }
                Ok(Step::Close(name)) => {
                    if let Some(pos) = stack.iter().rposition(|f| f.name == name) {
                        if pos + 1 < stack.len() {
                            malformed.get_or_insert_with(|| format!("<{}> not closed", stack[pos + 1].name));
                            stack.truncate(pos + 1);
                        }
                        if let Some(frame) = stack.pop() {
                            self.attach(&mut stack, &mut fields, frame);
                        }
                    } else if name == entry_name {
                        if let Some(open) = stack.first() {
                            malformed.get_or_insert_with(|| format!("<{}> not closed", open.name));
                        }
                        break;
                    } else if name == self.root.name {
                        self.done = true;
                        return Err(EntryError::Malformed(format!("<{}> not closed", entry_name)));
                    } else {
                        malformed.get_or_insert_with(|| format!("unexpected </{}>", name));
                    }
                }
                Ok(Step::Eof) => {
                    return Err(EntryError::Fatal(
                        "document ends inside an entry".to_string(),
                    ));
                }
                Ok(Step::Skip) => {}
                Err(StepError::Content(reason)) => {
                    malformed.get_or_insert(reason);
                }
                Err(StepError::Xml(err)) => {
                    self.note_error(&err).map_err(EntryError::Fatal)?;
                    malformed.get_or_insert_with(|| err.to_string());
                }
            }
        }

        if let Some(reason) = malformed {
            return Err(EntryError::Malformed(reason));
        }
        self.finish_entry(fields)
    }

    fn attach(&self, stack: &mut [Frame], fields: &mut EntryFields, frame: Frame) {
        if let Some(parent) = stack.last_mut() {
            parent.node.children.push(frame.node);
            return;
        }
        match frame.space {
            Space::Extension(ext) => {
                if self.extensions.contains(&ext) {
                    fields.extensions.push((ext, frame.node));
                }
            }
            Space::Sitemap => {
                let XmlNode { name, text, .. } = frame.node;
                match name.as_str() {
                    "loc" => fields.loc = Some(text),
                    "lastmod" => {
                        fields.lastmod = Some(text.trim().to_string()).filter(|s| !s.is_empty())
                    }
                    "changefreq" => fields.changefreq = ChangeFreq::parse(&text),
                    "priority" => {
                        fields.priority = text
                            .trim()
                            .parse::<f32>()
                            .ok()
                            .filter(|p| (0.0..=1.0).contains(p))
                    }
                    _ => {}
                }
            }
            Space::Foreign => {}
        }
    }

    fn finish_entry(&self, fields: EntryFields) -> std::result::Result<SitemapEntry, EntryError> {
        let loc = fields
            .loc
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| EntryError::Malformed("missing <loc>".to_string()))?;
        match Url::parse(&loc) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(EntryError::Malformed(format!("invalid <loc> {:?}", loc))),
        }

        let kind = match self.kind {
            RootKind::UrlSet => EntryKind::Url,
            RootKind::SitemapIndex => EntryKind::SitemapRef,
        };
        Ok(SitemapEntry {
            kind,
            loc,
            lastmod: fields.lastmod,
            changefreq: fields.changefreq,
            priority: fields.priority,
            extensions: fields.extensions,
        })
    }

    fn fail(&mut self, reason: String) -> Option<Result<SitemapEntry>> {
        self.done = true;
        if self.yielded == 0 {
            return Some(Err(ExtractError::MalformedDocument(reason)));
        }
        self.truncated = true;
        warn!(
            yielded = self.yielded,
            reason = %reason,
            "Sitemap stream ended early"
        );
        None
    }
}

impl Iterator for SitemapEntries<'_> {
    type Item = Result<SitemapEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        while !self.done {
            let step = match self.resume.take() {
                Some(step) => Ok(step),
                None => self.step(),
            };
            match step {
                Ok(Step::Open {
                    node,
                    qname,
                    space,
                    empty,
                }) => {
                    let is_entry = self.is_entry(&node, space);
                    if is_entry && empty {
                        self.skipped += 1;
                        debug!(tag = %qname, "Skipping empty sitemap entry");
                    } else if is_entry {
                        match self.read_entry(&qname) {
                            Ok(entry) => {
                                self.yielded += 1;
                                return Some(Ok(entry));
                            }
                            Err(EntryError::Malformed(reason)) => {
                                self.skipped += 1;
                                debug!(reason = %reason, "Skipping malformed sitemap entry");
                            }
                            Err(EntryError::Fatal(reason)) => return self.fail(reason),
                        }
                    } else if !empty {
                        self.open.push(qname);
                    }
                }
                Ok(Step::Close(name)) => {
                    if let Some(pos) = self.open.iter().rposition(|n| *n == name) {
                        self.open.truncate(pos);
                    } else if name == self.root.name {
                        self.done = true;
                    } else {
                        debug!(tag = %name, "Ignoring stray end tag between entries");
                    }
                }
                Ok(Step::Eof) => {
                    return self.fail("document ends before the root element closes".to_string());
                }
                Ok(Step::Text(_)) | Ok(Step::Skip) | Err(StepError::Content(_)) => {}
                Err(StepError::Xml(err)) => {
                    if let Err(reason) = self.note_error(&err) {
                        return self.fail(reason);
                    }
                    debug!(error = %err, "Ignoring XML error between entries");
                }
            }
        }
        None
    }
}

fn qualified_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn element_node(e: &BytesStart<'_>) -> XmlNode {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let attrs = e
        .attributes()
        .flatten()
        .filter(|a| a.key.as_namespace_binding().is_none())
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
            let value = match a.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
            };
            (key, value)
        })
        .collect();
    XmlNode {
        name,
        attrs,
        ..Default::default()
    }
}

/// Unprefixed elements and the sitemap namespaces carry the core fields;
/// known extension namespaces (or their usual prefixes, when undeclared)
/// map to an extension; everything else is foreign.
fn space_of(ns: &ResolveResult<'_>, root_ns: Option<&[u8]>) -> Space {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => {
            if root_ns == Some(*uri) || SITEMAP_NAMESPACES.contains(uri) {
                Space::Sitemap
            } else {
                Extension::from_namespace(uri).map_or(Space::Foreign, Space::Extension)
            }
        }
        ResolveResult::Unknown(prefix) => {
            Extension::from_prefix(prefix).map_or(Space::Foreign, Space::Extension)
        }
        ResolveResult::Unbound => Space::Sitemap,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> SitemapDocument {
        SitemapDocument::parse(xml.as_bytes(), None).unwrap()
    }

    fn locs(doc: &SitemapDocument) -> Vec<String> {
        doc.entries(&[]).map(|e| e.unwrap().loc).collect()
    }

    #[test]
    fn urlset_with_standard_fields() {
        let doc = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url>
                <loc> http://www.example.com/ </loc>
                <lastmod>2005-01-01</lastmod>
                <changefreq>Monthly</changefreq>
                <priority>0.8</priority>
              </url>
              <url><loc>http://www.example.com/catalog?item=12&amp;desc=vacation_hawaii</loc></url>
            </urlset>"#,
        );
        assert_eq!(doc.root(), RootKind::UrlSet);
        let entries: Vec<_> = doc.entries(&[]).map(Result::unwrap).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loc, "http://www.example.com/");
        assert_eq!(entries[0].kind, EntryKind::Url);
        assert_eq!(entries[0].lastmod.as_deref(), Some("2005-01-01"));
        assert!(entries[0].last_modified().is_some());
        assert_eq!(entries[0].changefreq, Some(ChangeFreq::Monthly));
        assert_eq!(entries[0].priority, Some(0.8));
        assert_eq!(
            entries[1].loc,
            "http://www.example.com/catalog?item=12&desc=vacation_hawaii"
        );
        assert_eq!(entries[1].priority, None);
    }

    #[test]
    fn bad_optional_fields_do_not_skip() {
        let doc = parse(
            "<urlset><url><loc>http://e.com/</loc><priority>2.5</priority>\
             <changefreq>sometimes</changefreq></url></urlset>",
        );
        let entry = doc.entries(&[]).next().unwrap().unwrap();
        assert_eq!(entry.priority, None);
        assert_eq!(entry.changefreq, None);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let doc = parse(
            "<urlset>\
               <url><loc>http://e.com/1</loc></url>\
               <url><lastmod>2005-01-01</lastmod></url>\
               <url><loc>not a url</loc></url>\
               <url><loc>ftp://e.com/file</loc></url>\
               <url><loc>http://e.com/&bogus;</loc></url>\
               <url/>\
               <url><loc>http://e.com/2</loc></url>\
             </urlset>",
        );
        let mut entries = doc.entries(&[]);
        let locs: Vec<_> = entries.by_ref().map(|e| e.unwrap().loc).collect();
        assert_eq!(locs, ["http://e.com/1", "http://e.com/2"]);
        assert_eq!(entries.skipped(), 5);
        assert_eq!(entries.yielded(), 2);
    }

    #[test]
    fn sitemap_index_entries() {
        let doc = parse(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                 <sitemap><loc>http://www.example.com/sitemap1.xml.gz</loc><lastmod>2004-10-01T18:23:17+00:00</lastmod></sitemap>
                 <sitemap><loc>http://www.example.com/sitemap2.xml.gz</loc></sitemap>
               </sitemapindex>"#,
        );
        assert_eq!(doc.root(), RootKind::SitemapIndex);
        let entries: Vec<_> = doc.entries(&[]).map(Result::unwrap).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == EntryKind::SitemapRef));
    }

    #[test]
    fn extension_trees_kept_only_when_enabled() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                       xmlns:image="http://www.google.com/schemas/sitemap-image/1.1"
                       xmlns:xhtml="http://www.w3.org/1999/xhtml">
              <url>
                <loc>http://example.com/sample.html</loc>
                <image:image>
                  <image:loc>http://example.com/image.jpg</image:loc>
                  <image:caption><![CDATA[A <b>bold</b> caption]]></image:caption>
                </image:image>
                <xhtml:link rel="alternate" hreflang="de" href="http://example.com/de/"/>
                <foo:bar xmlns:foo="urn:foo">ignored</foo:bar>
              </url>
            </urlset>"#;
        let doc = parse(xml);

        let entry = doc.entries(&[Extension::Image]).next().unwrap().unwrap();
        assert_eq!(entry.extensions.len(), 1);
        let (ext, node) = &entry.extensions[0];
        assert_eq!(*ext, Extension::Image);
        assert_eq!(node.name, "image");
        assert_eq!(node.child_text("loc"), Some("http://example.com/image.jpg"));
        assert_eq!(node.child_text("caption"), Some("A <b>bold</b> caption"));

        let entry = doc
            .entries(&[Extension::Image, Extension::Links])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(entry.extensions.len(), 2);
        let (ext, link) = &entry.extensions[1];
        assert_eq!(*ext, Extension::Links);
        assert_eq!(link.attr("hreflang"), Some("de"));

        let entry = doc.entries(&[]).next().unwrap().unwrap();
        assert!(entry.extensions.is_empty());
    }

    #[test]
    fn undeclared_prefix_still_matches() {
        let doc = parse(
            "<urlset><url><loc>http://e.com/</loc>\
             <news:news><news:title>T</news:title></news:news></url></urlset>",
        );
        let entry = doc.entries(&[Extension::News]).next().unwrap().unwrap();
        assert_eq!(entry.extensions.len(), 1);
        assert_eq!(entry.extensions[0].1.child_text("title"), Some("T"));
    }

    #[test]
    fn rejects_non_sitemap_roots() {
        for bad in ["", "   ", "just some text", "<html><body/></html>", "<rss version='2.0'/>"] {
            assert!(
                matches!(
                    SitemapDocument::parse(bad.as_bytes(), None),
                    Err(ExtractError::MalformedDocument(_))
                ),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn empty_root_yields_nothing() {
        assert!(locs(&parse("<urlset/>")).is_empty());
        assert!(locs(&parse("<urlset></urlset>")).is_empty());
    }

    #[test]
    fn truncated_before_any_entry_fails() {
        let doc = parse("<urlset><url><loc>http://e.com/</lo");
        let mut entries = doc.entries(&[]);
        assert!(matches!(
            entries.next(),
            Some(Err(ExtractError::MalformedDocument(_)))
        ));
        assert!(entries.next().is_none());
    }

    #[test]
    fn truncated_after_entries_keeps_them() {
        let doc = parse(
            "<urlset><url><loc>http://e.com/1</loc></url><url><loc>http://e.com/2</loc></url><url><loc>http://e.c",
        );
        let mut entries = doc.entries(&[]);
        let results: Vec<_> = entries.by_ref().collect();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(entries.truncated());
    }

    #[test]
    fn complete_document_is_not_truncated() {
        let doc = parse("<urlset><url><loc>http://e.com/1</loc></url></urlset>");
        let mut entries = doc.entries(&[]);
        assert_eq!(entries.by_ref().count(), 1);
        assert!(!entries.truncated());
    }

    const IMAGE_NS: &str = r#"xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1""#;

    fn locs_and_skipped(xml: &str, extensions: &[Extension]) -> (Vec<String>, usize) {
        let doc = parse(xml);
        let mut entries = doc.entries(extensions);
        let locs = entries.by_ref().map(|e| e.unwrap().loc).collect();
        (locs, entries.skipped())
    }

    #[test]
    fn unclosed_element_breaks_only_its_entry() {
        let xml = format!(
            "<urlset {}>\
               <url><loc>http://e.com/1</loc><image:image><image:loc>http://e.com/1.jpg</image:loc></url>\
               <url><loc>http://e.com/2</loc></url>\
               <url><loc>http://e.com/3</loc></url>\
             </urlset>",
            IMAGE_NS
        );
        for exts in [&[][..], &[Extension::Image][..]] {
            let (locs, skipped) = locs_and_skipped(&xml, exts);
            assert_eq!(locs, ["http://e.com/2", "http://e.com/3"]);
            assert_eq!(skipped, 1);
        }
    }

    #[test]
    fn stray_end_tag_breaks_only_its_entry() {
        let xml = format!(
            "<urlset {}>\
               <url><loc>http://e.com/1</loc></image:image></url>\
               <url><loc>http://e.com/2</loc></url>\
               <url><loc>http://e.com/3</loc></url>\
             </urlset>",
            IMAGE_NS
        );
        let (locs, skipped) = locs_and_skipped(&xml, &[]);
        assert_eq!(locs, ["http://e.com/2", "http://e.com/3"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn unclosed_entry_resumes_at_next_entry() {
        let (locs, skipped) = locs_and_skipped(
            "<urlset>\
               <url><loc>http://e.com/1</loc>\
               <url><loc>http://e.com/2</loc></url>\
               <url><loc>http://e.com/3</loc>\
             </urlset>",
            &[],
        );
        assert_eq!(locs, ["http://e.com/2"]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn stray_end_tag_between_entries_is_ignored() {
        let (locs, skipped) = locs_and_skipped(
            "<urlset>\
               <url><loc>http://e.com/1</loc></url></loc>\
               <url><loc>http://e.com/2</loc></url>\
             </urlset>",
            &[],
        );
        assert_eq!(locs, ["http://e.com/1", "http://e.com/2"]);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn foreign_namespace_fields_are_ignored() {
        let doc = parse(
            "<urlset xmlns='http://www.sitemaps.org/schemas/sitemap/0.9'>\
               <url>\
                 <loc>http://e.com/real</loc>\
                 <foo:loc xmlns:foo='urn:foo'>http://evil.com/x</foo:loc>\
                 <foo:priority xmlns:foo='urn:foo'>0.1</foo:priority>\
                 <bar:lastmod>2005-01-01</bar:lastmod>\
               </url>\
               <foo:url xmlns:foo='urn:foo'><loc>http://evil.com/y</loc></foo:url>\
             </urlset>",
        );
        let entries: Vec<_> = doc.entries(&[]).map(Result::unwrap).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].loc, "http://e.com/real");
        assert_eq!(entries[0].priority, None);
        assert_eq!(entries[0].lastmod, None);
    }

    #[test]
    fn legacy_and_custom_root_namespaces() {
        for ns in [
            "http://www.google.com/schemas/sitemap/0.84",
            "http://example.com/schemas/custom",
        ] {
            let doc = parse(&format!(
                "<urlset xmlns='{}'><url><loc>http://e.com/a</loc><priority>0.3</priority></url></urlset>",
                ns
            ));
            let entry = doc.entries(&[]).next().unwrap().unwrap();
            assert_eq!(entry.loc, "http://e.com/a");
            assert_eq!(entry.priority, Some(0.3));
        }
    }

    #[test]
    fn stopping_early_is_fine() {
        let doc = parse(
            "<urlset><url><loc>http://e.com/1</loc></url><url><loc>http://e.com/2</loc></url></urlset>",
        );
        let first = doc.entries(&[]).take(1).count();
        assert_eq!(first, 1);
        assert_eq!(locs(&doc).len(), 2);
    }
}
