use std::borrow::Cow;
use std::io::Read;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use regex::bytes::Regex;
use tracing::debug;

use crate::error::{ExtractError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const DECL_SCAN_LIMIT: usize = 256;

static DECL_ENCODING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap()
});

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Turn raw document bytes into text: inflate gzip, then decode with the
/// encoding picked by [`resolve_encoding`].
pub fn decode_document(raw: &[u8], declared_encoding: Option<&str>) -> Result<String> {
    let inflated;
    let bytes = if is_gzip(raw) {
        let mut out = Vec::new();
        GzDecoder::new(raw)
            .read_to_end(&mut out)
            .map_err(|e| ExtractError::MalformedDocument(format!("gzip stream: {}", e)))?;
        inflated = out;
        &inflated[..]
    } else {
        raw
    };

    let encoding = resolve_encoding(bytes, declared_encoding);
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = actual.name(), "Replaced undecodable byte sequences");
    }
    Ok(text.into_owned())
}

/// BOM first, then the XML declaration, then the caller's label, then UTF-8.
pub fn resolve_encoding(bytes: &[u8], declared: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    let head = &bytes[..bytes.len().min(DECL_SCAN_LIMIT)];
    let from_decl = DECL_ENCODING_RE
        .captures(head)
        .and_then(|caps| Encoding::for_label(&caps[1]))
        // a declaration we could read as ASCII can't be in UTF-16
        .filter(|e| e.is_ascii_compatible());
    if let Some(encoding) = from_decl {
        return encoding;
    }

    declared
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Best-effort text of the first `window` bytes, inflating gzip input.
/// Never fails: a broken stream yields whatever was inflated before the error.
pub fn leading_text(raw: &[u8], window: usize) -> String {
    let bytes: Cow<'_, [u8]> = if is_gzip(raw) {
        let mut out = Vec::new();
        let _ = GzDecoder::new(raw).take(window as u64).read_to_end(&mut out);
        Cow::Owned(out)
    } else {
        Cow::Borrowed(&raw[..raw.len().min(window)])
    };
    let encoding = Encoding::for_bom(&bytes).map_or(UTF_8, |(e, _)| e);
    encoding.decode(&bytes).0.into_owned()
}
