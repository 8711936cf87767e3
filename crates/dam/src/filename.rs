//! Filename parsing: the only contract between uploaders and the link side.
//!
//! The convention is `EAN<digits>_SKU<alnum>_<tag...>.<ext>`. Prefixes are
//! case-sensitive (`ean123` is a tag, not an EAN), segment order is free, and
//! anything that is neither a well-formed EAN token nor a well-formed SKU
//! token falls through into the tag. Parsing never fails: a filename with no
//! recognizable tokens is simply a key with empty fields.

use serde::{Deserialize, Serialize};

use mdm_core::{Ean, Sku, ValueObject};

/// What a filename claims about an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFileKey {
    pub ean: Option<Ean>,
    pub sku: Option<Sku>,
    /// Residual segments joined with `_`, in original order.
    pub tag: Option<String>,
    /// Lowercased, without the dot.
    pub extension: Option<String>,
}

impl ParsedFileKey {
    /// Parse a filename. Total: every string yields a key.
    pub fn parse(filename: &str) -> Self {
        let (stem, extension) = split_extension(filename);

        let mut ean = None;
        let mut sku = None;
        let mut tag_segments: Vec<&str> = Vec::new();

        for segment in stem.split('_').filter(|s| !s.is_empty()) {
            if ean.is_none() {
                if let Some(parsed) = parse_prefixed(segment, "EAN", |s| Ean::new(s).ok()) {
                    ean = Some(parsed);
                    continue;
                }
            }
            if sku.is_none() {
                if let Some(parsed) = parse_prefixed(segment, "SKU", |s| Sku::new(s).ok()) {
                    sku = Some(parsed);
                    continue;
                }
            }
            tag_segments.push(segment);
        }

        let tag = if tag_segments.is_empty() {
            None
        } else {
            Some(tag_segments.join("_"))
        };

        Self {
            ean,
            sku,
            tag,
            extension,
        }
    }

    pub fn has_ean(&self) -> bool {
        self.ean.is_some()
    }
}

impl ValueObject for ParsedFileKey {}

/// Split off the extension at the last dot. A dot that would leave an empty
/// stem or an empty extension is not a separator.
fn split_extension(filename: &str) -> (&str, Option<String>) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (filename, None),
    }
}

/// A segment is a well-formed token only if the case-sensitive prefix matches
/// and the whole remainder parses. `EAN12a` has the prefix but no valid
/// remainder, so it is not a token.
fn parse_prefixed<T>(segment: &str, prefix: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    segment.strip_prefix(prefix).and_then(|rest| parse(rest))
}
