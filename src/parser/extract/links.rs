use crate::metadata::ScopedMetadata;
use crate::parser::node::XmlNode;

/// `<xhtml:link>`: `href` plus one `params.<attr>` key per other attribute.
/// Links without an `href` are skipped.
pub fn extract(node: &XmlNode, out: &mut ScopedMetadata<'_>) {
    if node.name != "link" {
        return;
    }
    let Some(href) = node.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
        return;
    };

    out.add("href", href);
    for (key, value) in node.attrs.iter().filter(|(k, _)| k != "href") {
        out.add(&format!("params.{}", key), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    fn run(nodes: &[XmlNode]) -> Metadata {
        let mut md = Metadata::new();
        for node in nodes {
            extract(node, &mut md.scoped("LINKS."));
        }
        md
    }

    #[test]
    fn alternate_link() {
        let node = XmlNode::new("link")
            .with_attr("rel", "alternate")
            .with_attr("hreflang", "en")
            .with_attr("href", "http://www.example.com/english/");
        let md = run(&[node]);
        assert_eq!(md.len(), 3);
        assert_eq!(md.first_value("LINKS.href"), Some("http://www.example.com/english/"));
        assert_eq!(md.first_value("LINKS.params.rel"), Some("alternate"));
        assert_eq!(md.first_value("LINKS.params.hreflang"), Some("en"));
    }

    #[test]
    fn several_links_accumulate() {
        let en = XmlNode::new("link").with_attr("hreflang", "en").with_attr("href", "http://e.com/en/");
        let de = XmlNode::new("link").with_attr("hreflang", "de").with_attr("href", "http://e.com/de/");
        let md = run(&[en, de]);
        assert_eq!(md.values("LINKS.href").unwrap(), ["http://e.com/en/", "http://e.com/de/"]);
        assert_eq!(md.values("LINKS.params.hreflang").unwrap(), ["en", "de"]);
    }

    #[test]
    fn link_without_href_skipped() {
        let node = XmlNode::new("link").with_attr("rel", "alternate");
        assert!(run(&[node]).is_empty());
    }
}
