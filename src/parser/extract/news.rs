use crate::metadata::ScopedMetadata;
use crate::parser::node::XmlNode;
use crate::utils::{parse_w3c_datetime, split_list};

const GENRES: &[&str] = &[
    "PressRelease",
    "Satire",
    "Blog",
    "OpEd",
    "Opinion",
    "UserGenerated",
];
const MAX_STOCK_TICKERS: usize = 5;

/// `<news:news>`. List fields are comma-separated in the source and become
/// one value per item.
pub fn extract(node: &XmlNode, out: &mut ScopedMetadata<'_>) {
    if node.name != "news" {
        return;
    }

    if let Some(publication) = node.child("publication") {
        for field in ["name", "language"] {
            if let Some(value) = publication.child_text(field) {
                out.add(field, value);
            }
        }
    }
    if let Some(date) = node
        .child_text("publication_date")
        .filter(|d| parse_w3c_datetime(d).is_some())
    {
        out.add("publication_date", date);
    }
    if let Some(title) = node.child_text("title") {
        out.add("title", title);
    }

    if let Some(genres) = node.child_text("genres") {
        for genre in split_list(genres).filter(|g| GENRES.contains(g)) {
            out.add("genres", genre);
        }
    }
    if let Some(keywords) = node.child_text("keywords") {
        for keyword in split_list(keywords) {
            out.add("keywords", keyword);
        }
    }
    if let Some(tickers) = node.child_text("stock_tickers") {
        for ticker in split_list(tickers).take(MAX_STOCK_TICKERS) {
            out.add("stock_tickers", ticker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    fn field(name: &str, text: &str) -> XmlNode {
        XmlNode::new(name).with_text(text)
    }

    fn run(node: &XmlNode) -> Metadata {
        let mut md = Metadata::new();
        extract(node, &mut md.scoped("NEWS."));
        md
    }

    #[test]
    fn merger_talks() {
        let node = XmlNode::new("news")
            .with_child(
                XmlNode::new("publication")
                    .with_child(field("name", "The Example Times"))
                    .with_child(field("language", "en")),
            )
            .with_child(field("genres", "PressRelease, Blog"))
            .with_child(field("publication_date", "2008-12-23T00:00Z"))
            .with_child(field("title", "Companies A, B in Merger Talks"))
            .with_child(field("keywords", "business, merger, acquisition, A, B"))
            .with_child(field("stock_tickers", "NASDAQ:A, NASDAQ:B"));
        let md = run(&node);

        assert_eq!(md.keys_with_prefix("NEWS.").count(), 7);
        assert_eq!(md.first_value("NEWS.name"), Some("The Example Times"));
        assert_eq!(md.first_value("NEWS.language"), Some("en"));
        assert_eq!(md.first_value("NEWS.publication_date"), Some("2008-12-23T00:00Z"));
        assert_eq!(md.first_value("NEWS.title"), Some("Companies A, B in Merger Talks"));
        assert_eq!(md.values("NEWS.genres").unwrap(), ["PressRelease", "Blog"]);
        assert_eq!(
            md.values("NEWS.keywords").unwrap(),
            ["business", "merger", "acquisition", "A", "B"]
        );
        assert_eq!(md.values("NEWS.stock_tickers").unwrap(), ["NASDAQ:A", "NASDAQ:B"]);
    }

    #[test]
    fn unknown_genres_and_extra_tickers_dropped() {
        let node = XmlNode::new("news")
            .with_child(field("genres", "Blog, Gossip"))
            .with_child(field("stock_tickers", "A:1, A:2, A:3, A:4, A:5, A:6"));
        let md = run(&node);
        assert_eq!(md.values("NEWS.genres").unwrap(), ["Blog"]);
        assert_eq!(md.values("NEWS.stock_tickers").unwrap().len(), 5);
    }

    #[test]
    fn bad_date_omitted() {
        let node = XmlNode::new("news").with_child(field("publication_date", "soon"));
        assert!(run(&node).is_empty());
    }
}
