use crate::metadata::ScopedMetadata;
use crate::parser::node::XmlNode;

const FIELDS: &[&str] = &["loc", "caption", "title", "license", "geo_location"];

/// `<image:image>`: every field is copied verbatim.
pub fn extract(node: &XmlNode, out: &mut ScopedMetadata<'_>) {
    if node.name != "image" {
        return;
    }
    for field in FIELDS {
        if let Some(value) = node.child_text(field) {
            out.add(field, value);
        }
    }
}
