//! Decoder for the angle-bracket tag markup embedded in model replies.
//!
//! The model is asked to append directives such as `<balance=900>` or
//! `<inventory:apple=+1>` to its prose. This module finds those tokens,
//! decodes individual values, and strips all markup from the text shown
//! to players.
//!
//! Every lookup returns a [`Tag`], which keeps "tag absent" apart from
//! "tag present but malformed". The reply parsers currently treat both
//! as absent.

use std::collections::BTreeMap;

/// Key prefix of per-item inventory directives.
const INVENTORY_PREFIX: &str = "inventory:";

/// Outcome of looking up one tag in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag<T> {
    /// No token with that key.
    Absent,
    /// Tokens with that key exist, but none had a valid value. Holds the
    /// first offending raw value.
    Malformed(String),
    /// The first well-formed value.
    Present(T),
}

impl<T> Tag<T> {
    /// The decoded value, treating malformed as absent.
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent | Self::Malformed(_) => None,
        }
    }

    /// The decoded value, or `default` when absent or malformed.
    pub fn or(self, default: T) -> T {
        self.present().unwrap_or(default)
    }

    /// Whether a token with that key existed but could not be decoded.
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// A `<key=value>` token found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTag<'a> {
    /// Everything between `<` and the first `=`.
    pub key: &'a str,
    /// Everything between the first `=` and `>`.
    pub value: &'a str,
}

/// Find every `<key=value>` token, in order of appearance.
///
/// A token never spans another `<`: in `<a <b=1>` only `<b=1>` is found.
/// Tokens without `=` are not directives and are skipped.
pub fn scan(text: &str) -> Vec<RawTag<'_>> {
    let mut tags = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let Some(after) = rest.get(open.saturating_add(1)..) else {
            break;
        };
        let Some(close) = after.find('>') else {
            break;
        };
        let body = after.get(..close).unwrap_or_default();

        if let Some(inner) = body.rfind('<') {
            // Restart at the innermost opener.
            rest = after.get(inner..).unwrap_or_default();
            continue;
        }
        if let Some((key, value)) = body.split_once('=') {
            tags.push(RawTag { key, value });
        }
        rest = after.get(close.saturating_add(1)..).unwrap_or_default();
    }

    tags
}

/// Look up the first token with `key` whose value `decode` accepts.
pub fn first<T>(tags: &[RawTag<'_>], key: &str, decode: impl Fn(&str) -> Option<T>) -> Tag<T> {
    let mut malformed = None;
    for tag in tags.iter().filter(|tag| tag.key == key) {
        match decode(tag.value) {
            Some(value) => return Tag::Present(value),
            None => {
                if malformed.is_none() {
                    malformed = Some(tag.value.to_owned());
                }
            }
        }
    }
    malformed.map_or(Tag::Absent, Tag::Malformed)
}

/// Collect `<inventory:NAME=N>` deltas.
///
/// Names are trimmed; a repeated name keeps its last value. Returns the
/// deltas and the raw text of every inventory token that failed to decode.
pub fn inventory_deltas(tags: &[RawTag<'_>]) -> (BTreeMap<String, i64>, Vec<String>) {
    let mut deltas = BTreeMap::new();
    let mut malformed = Vec::new();

    for tag in tags {
        let Some(name) = tag.key.strip_prefix(INVENTORY_PREFIX) else {
            continue;
        };
        let name = name.trim();
        match signed_int(tag.value) {
            Some(delta) if !name.is_empty() => {
                deltas.insert(name.to_owned(), delta);
            }
            _ => malformed.push(format!("{}={}", tag.key, tag.value)),
        }
    }

    (deltas, malformed)
}

/// Decode `[+-]?digits`.
pub fn signed_int(value: &str) -> Option<i64> {
    let digits = value
        .strip_prefix('+')
        .or_else(|| value.strip_prefix('-'))
        .unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Decode a non-empty run of ASCII digits, without sign.
pub fn unsigned_int(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Accept any non-empty value verbatim.
pub fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

/// Accept any value verbatim, including the empty string.
pub fn any_text(value: &str) -> Option<String> {
    Some(value.to_owned())
}

/// Decode exactly `true` or `false`.
pub fn boolean(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Remove every `<...>` token (at least one character between the
/// brackets) and trim the result.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let (before, from_open) = rest.split_at(open);
        out.push_str(before);
        let after = from_open.get(1..).unwrap_or_default();
        match after.find('>') {
            Some(close) if close > 0 => {
                rest = after.get(close.saturating_add(1)..).unwrap_or_default();
            }
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    out.trim().to_owned()
}
