use crate::metadata::ScopedMetadata;
use crate::parser::node::XmlNode;
use crate::utils::{parse_flag, parse_w3c_datetime};

const TEXT_FIELDS: &[&str] = &[
    "thumbnail_loc",
    "title",
    "description",
    "content_loc",
    "player_loc",
    "gallery_loc",
    "uploader",
];
const COUNT_FIELDS: &[&str] = &["duration", "view_count"];
const DATE_FIELDS: &[&str] = &["expiration_date", "publication_date"];
/// (element, key)
const FLAG_FIELDS: &[(&str, &str)] = &[
    ("family_friendly", "family_friendly"),
    ("requires_subscription", "requires_subscription"),
    ("live", "is_live"),
];

/// `<video:video>`. Counts are written as integers, yes/no flags as
/// `true`/`false`, dates and rating verbatim once they parse.
pub fn extract(node: &XmlNode, out: &mut ScopedMetadata<'_>) {
    if node.name != "video" {
        return;
    }

    for field in TEXT_FIELDS {
        if let Some(value) = node.child_text(field) {
            out.add(field, value);
        }
    }
    for field in COUNT_FIELDS {
        if let Some(n) = node.child_text(field).and_then(|v| v.parse::<u64>().ok()) {
            out.add(field, &n.to_string());
        }
    }
    for field in DATE_FIELDS {
        if let Some(value) = node
            .child_text(field)
            .filter(|v| parse_w3c_datetime(v).is_some())
        {
            out.add(field, value);
        }
    }
    for (element, key) in FLAG_FIELDS {
        if let Some(flag) = node.child_text(element).and_then(parse_flag) {
            out.add(key, if flag { "true" } else { "false" });
        }
    }

    if let Some(rating) = node.child_text("rating").filter(|v| valid_rating(v)) {
        out.add("rating", rating);
    }
    if let Some(info) = node.child("uploader").and_then(|u| u.attr("info")) {
        out.add("uploader_info", info);
    }

    for tag in node.children_named("tag") {
        out.add("tags", &tag.text);
    }
    for restriction in node.children_named("restriction") {
        let allows = restriction
            .attr("relationship")
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("allow"));
        if !allows {
            continue;
        }
        for country in restriction.text.split_whitespace() {
            out.add("allowed_countries", country);
        }
    }
    for price in node.children_named("price") {
        out.add("prices", &format_price(price));
    }
}

fn valid_rating(raw: &str) -> bool {
    raw.parse::<f32>()
        .is_ok_and(|r| (0.0..=5.0).contains(&r))
}

/// `value: V, currency: C, type: T, resolution: R`, `null` for anything absent.
pub fn format_price(price: &XmlNode) -> String {
    let value = Some(price.text.trim()).filter(|v| v.parse::<f64>().is_ok());
    let attr = |name: &str| price.attr(name).map(str::trim).filter(|v| !v.is_empty());
    format!(
        "value: {}, currency: {}, type: {}, resolution: {}",
        value.unwrap_or("null"),
        attr("currency").unwrap_or("null"),
        attr("type").unwrap_or("null"),
        attr("resolution").unwrap_or("null"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    fn field(name: &str, text: &str) -> XmlNode {
        XmlNode::new(name).with_text(text)
    }

    fn sample() -> XmlNode {
        XmlNode::new("video")
            .with_child(field("thumbnail_loc", "http://www.example.com/thumbs/123.jpg"))
            .with_child(field("title", "Grilling steaks for summer"))
            .with_child(field("description", "Alkis shows you how to get perfectly done steaks every time"))
            .with_child(field("content_loc", "http://streamserver.example.com/video123.mp4"))
            .with_child(field("player_loc", "http://www.example.com/videoplayer.php?video=123").with_attr("allow_embed", "yes"))
            .with_child(field("duration", "600"))
            .with_child(field("expiration_date", "2021-11-05T19:20:30+08:00"))
            .with_child(field("rating", "4.2"))
            .with_child(field("view_count", "12345"))
            .with_child(field("publication_date", "2007-11-05T19:20:30+08:00"))
            .with_child(field("family_friendly", "yes"))
            .with_child(field("restriction", "IE GB US CA").with_attr("relationship", "allow"))
            .with_child(field("gallery_loc", "http://cooking.example.com"))
            .with_child(field("price", "1.99").with_attr("currency", "EUR").with_attr("type", "rent").with_attr("resolution", "HD"))
            .with_child(field("price", "4.99").with_attr("currency", "EUR"))
            .with_child(field("requires_subscription", "no"))
            .with_child(field("uploader", "GrillyMcGrillerson").with_attr("info", "http://www.example.com/users/grillymcgrillerson"))
            .with_child(field("live", "No"))
            .with_child(field("tag", "steak"))
            .with_child(field("tag", "meat"))
            .with_child(field("tag", "summer"))
    }

    fn run(node: &XmlNode) -> Metadata {
        let mut md = Metadata::new();
        extract(node, &mut md.scoped("VIDEO."));
        md
    }

    #[test]
    fn full_video_block() {
        let md = run(&sample());
        assert_eq!(md.keys_with_prefix("VIDEO.").count(), 19);
        assert_eq!(md.first_value("VIDEO.duration"), Some("600"));
        assert_eq!(md.first_value("VIDEO.rating"), Some("4.2"));
        assert_eq!(md.first_value("VIDEO.family_friendly"), Some("true"));
        assert_eq!(md.first_value("VIDEO.requires_subscription"), Some("false"));
        assert_eq!(md.first_value("VIDEO.is_live"), Some("false"));
        assert_eq!(md.first_value("VIDEO.player_loc"), Some("http://www.example.com/videoplayer.php?video=123"));
        assert_eq!(md.first_value("VIDEO.uploader_info"), Some("http://www.example.com/users/grillymcgrillerson"));
        assert_eq!(md.values("VIDEO.tags").unwrap(), ["steak", "meat", "summer"]);
        assert_eq!(md.values("VIDEO.allowed_countries").unwrap(), ["IE", "GB", "US", "CA"]);
        assert_eq!(
            md.values("VIDEO.prices").unwrap(),
            [
                "value: 1.99, currency: EUR, type: rent, resolution: HD",
                "value: 4.99, currency: EUR, type: null, resolution: null",
            ]
        );
    }

    #[test]
    fn unparsable_fields_are_omitted() {
        let node = XmlNode::new("video")
            .with_child(field("title", "ok"))
            .with_child(field("duration", "ten minutes"))
            .with_child(field("rating", "7.5"))
            .with_child(field("view_count", "-3"))
            .with_child(field("publication_date", "last week"))
            .with_child(field("family_friendly", "sometimes"));
        let md = run(&node);
        assert_eq!(md.keys().collect::<Vec<_>>(), ["VIDEO.title"]);
    }

    #[test]
    fn deny_restriction_is_ignored() {
        let node = XmlNode::new("video")
            .with_child(field("restriction", "FR").with_attr("relationship", "deny"));
        assert!(run(&node).is_empty());
    }

    #[test]
    fn price_without_value() {
        let price = field("price", "").with_attr("resolution", "SD");
        assert_eq!(
            format_price(&price),
            "value: null, currency: null, type: null, resolution: SD"
        );
    }
}
