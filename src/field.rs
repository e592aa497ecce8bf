//! Record member lookup-key resolution.
//!
//! Members are described by [`facet_core::Field`]. Renames are written as
//! `#[facet(tag = "name,args")]` field attributes, one tag per attribute.

use std::borrow::Cow;

pub use facet_core::Field;
use facet_core::{FieldAttribute, FieldFlags};

/// Returns the raw value of `tag` on `field`, if the member carries it.
pub fn field_tag(field: &Field, tag: &str) -> Option<&'static str> {
    field.attributes.iter().find_map(|attr| match attr {
        FieldAttribute::Arbitrary(text) => {
            let (key, value) = text.split_once('=')?;
            (key.trim() == tag).then(|| unquote(value.trim()))
        }
        _ => None,
    })
}

/// Returns `true` if `field` carries the bare attribute `name`, as in
/// `#[facet(squash)]`.
pub fn has_marker(field: &Field, name: &str) -> bool {
    field
        .attributes
        .iter()
        .any(|attr| matches!(attr, FieldAttribute::Arbitrary(text) if text.trim() == name))
}

/// Returns `true` if the member's own members bind from the parent's
/// source: `#[facet(flatten)]`.
pub fn is_flattened(field: &Field) -> bool {
    field.flags.contains(FieldFlags::FLATTEN)
}

fn unquote(value: &'static str) -> &'static str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// What the engine does with a resolved member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    /// Look the key up in the source map.
    #[default]
    None,
    /// Never write this member.
    Ignore,
    /// Bind the member's own members from the parent's source.
    Squash,
}

/// A resolved lookup key together with its modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldName {
    /// Key looked up in the source map. Empty when ignored.
    pub key: Cow<'static, str>,
    /// How the member is treated.
    pub modifier: Modifier,
}

impl FieldName {
    /// Interprets the `(name, arg)` pair produced by a field-name function.
    ///
    /// An empty name means the member is ignored; `squash` among the
    /// comma-separated arguments flattens it.
    pub fn from_parts(name: Cow<'static, str>, arg: &str) -> Self {
        let modifier = if name.is_empty() {
            Modifier::Ignore
        } else if arg.split(',').any(|a| a.trim() == "squash") {
            Modifier::Squash
        } else {
            Modifier::None
        };
        FieldName {
            key: name,
            modifier,
        }
    }
}

/// Splits a `"name,arg1,arg2"` tag value at its first comma.
pub fn parse_tag(value: &'static str) -> (&'static str, &'static str) {
    match value.split_once(',') {
        Some((name, arg)) => (name.trim(), arg.trim()),
        None => (value.trim(), ""),
    }
}

/// Resolves a member through a single tag: a missing or empty tag name
/// falls back to the member name, `"-"` ignores the member.
pub fn resolve_with_tag(field: &Field, tag: &str) -> (Cow<'static, str>, &'static str) {
    resolve_with_tags(field, &[tag])
}

/// Resolves a member through the first of `tags` it carries. A member
/// marked `#[facet(skip)]` is always ignored.
pub fn resolve_with_tags(field: &Field, tags: &[&str]) -> (Cow<'static, str>, &'static str) {
    if has_marker(field, "skip") {
        return (Cow::Borrowed(""), "");
    }
    let (name, arg) = tags
        .iter()
        .find_map(|tag| field_tag(field, tag))
        .map(parse_tag)
        .unwrap_or(("", ""));
    match name {
        "" => (Cow::Borrowed(field.name), arg),
        "-" => (Cow::Borrowed(""), arg),
        name => (Cow::Borrowed(name), arg),
    }
}

/// The resolver used by [`Binder::new`](crate::Binder::new): the `json` tag.
pub fn default_field_name(field: &Field) -> (Cow<'static, str>, &'static str) {
    resolve_with_tag(field, "json")
}

/// Returns the canonical MIME header form of `key`: the first letter and any
/// letter following a hyphen are upper-cased, the rest lower-cased.
///
/// Keys containing a byte that cannot appear in a header name (including a
/// space) are returned unchanged.
pub fn canonical_header_key(key: &str) -> Cow<'_, str> {
    if !key.bytes().all(is_token_byte) {
        return Cow::Borrowed(key);
    }

    let mut upper = true;
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }

    if out == key {
        Cow::Borrowed(key)
    } else {
        Cow::Owned(out)
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use facet::Facet;

    use super::*;
    use crate::shape::struct_fields;

    #[derive(Facet)]
    struct Tagged {
        #[facet(json = "name,omitempty")]
        #[facet(query = "-")]
        #[facet(header = "")]
        user_name: String,
        age: u8,
        #[facet(skip)]
        secret: String,
        #[facet(squash)]
        #[facet(flatten)]
        extra: Extra,
    }

    #[derive(Facet)]
    struct Extra {
        note: String,
    }

    fn field(name: &str) -> &'static Field {
        struct_fields(Tagged::SHAPE)
            .unwrap_or_default()
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no field {name}"))
    }

    #[test]
    fn test_field_tag() {
        assert_eq!(field_tag(field("user_name"), "json"), Some("name,omitempty"));
        assert_eq!(field_tag(field("user_name"), "query"), Some("-"));
        assert_eq!(field_tag(field("user_name"), "header"), Some(""));
        assert_eq!(field_tag(field("user_name"), "form"), None);
        assert_eq!(field_tag(field("age"), "json"), None);
    }

    #[test]
    fn test_markers() {
        assert!(has_marker(field("secret"), "skip"));
        assert!(!has_marker(field("age"), "skip"));
        assert!(has_marker(field("extra"), "squash"));
        assert!(is_flattened(field("extra")));
        assert!(!is_flattened(field("age")));
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("name"), ("name", ""));
        assert_eq!(parse_tag("name,omitempty"), ("name", "omitempty"));
        assert_eq!(parse_tag(",squash"), ("", "squash"));
        assert_eq!(parse_tag("a,b,c"), ("a", "b,c"));
    }

    #[test]
    fn test_resolve_with_tag() {
        let tagged = field("user_name");
        assert_eq!(
            resolve_with_tag(tagged, "json"),
            (Cow::Borrowed("name"), "omitempty")
        );
        assert_eq!(resolve_with_tag(tagged, "query"), (Cow::Borrowed(""), ""));
        assert_eq!(
            resolve_with_tag(tagged, "header"),
            (Cow::Borrowed("user_name"), "")
        );
        assert_eq!(
            resolve_with_tag(field("age"), "json"),
            (Cow::Borrowed("age"), "")
        );
        assert_eq!(
            resolve_with_tag(field("secret"), "json"),
            (Cow::Borrowed(""), "")
        );
    }

    #[test]
    fn test_resolve_with_tags_first_present_wins() {
        let tagged = field("user_name");
        assert_eq!(
            resolve_with_tags(tagged, &["form", "query", "json"]),
            (Cow::Borrowed(""), "")
        );
        assert_eq!(
            resolve_with_tags(tagged, &["form", "json"]),
            (Cow::Borrowed("name"), "omitempty")
        );
    }

    #[test]
    fn test_field_name_modifiers() {
        assert_eq!(
            FieldName::from_parts(Cow::Borrowed(""), "squash").modifier,
            Modifier::Ignore
        );
        assert_eq!(
            FieldName::from_parts(Cow::Borrowed("inner"), "omitempty,squash").modifier,
            Modifier::Squash
        );
        assert_eq!(
            FieldName::from_parts(Cow::Borrowed("inner"), "squashed").modifier,
            Modifier::None
        );
    }

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("x-request-id"), "X-Request-Id");
        assert_eq!(canonical_header_key("CONTENT-TYPE"), "Content-Type");
        assert_eq!(canonical_header_key("Accept"), "Accept");
        assert_eq!(canonical_header_key("user_name"), "User_name");
        assert_eq!(canonical_header_key("bad key"), "bad key");
        assert!(matches!(canonical_header_key("Host"), Cow::Borrowed(_)));
    }
}
