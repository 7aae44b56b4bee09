use tracing::trace;

use crate::metadata::ScopedMetadata;
use crate::parser::node::XmlNode;

/// `<mobile:mobile/>` only marks a page as mobile-friendly. It carries no
/// fields, so nothing is written.
pub fn extract(node: &XmlNode, _out: &mut ScopedMetadata<'_>) {
    trace!(element = %node.name, "Mobile marker seen");
}
