//! Helpers for data that has already been pulled out of a request: plain
//! maps, string maps, query pairs and header pairs.
//!
//! Each helper builds a fresh [`Binder::new`] that resolves member names
//! through the given tag, so a process-wide hook does not apply here.

use std::{borrow::Cow, collections::HashMap};

use facet_core::Facet;

use crate::{
    BindError, Binder, Map, Value,
    field::{canonical_header_key, resolve_with_tag},
};

/// Binds `src` onto `dst`, resolving member names through `tag`.
pub fn bind_with_tag<T: Facet<'static>>(
    dst: &mut T,
    src: &Value,
    tag: &str,
) -> Result<(), BindError> {
    log::trace!("Entering `bind_with_tag` with tag `{tag}`");
    Binder::new().with_tag(tag).bind(dst, src)
}

/// Binds a map onto `dst`. Keys are case-sensitive.
pub fn bind_map<T: Facet<'static>>(dst: &mut T, tag: &str, data: Map) -> Result<(), BindError> {
    bind_with_tag(dst, &Value::Map(data), tag)
}

/// Binds a string-to-string map onto `dst`. Keys are case-sensitive.
pub fn bind_string_map<T: Facet<'static>>(
    dst: &mut T,
    tag: &str,
    data: &HashMap<String, String>,
) -> Result<(), BindError> {
    let map = data
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect::<Map>();
    bind_with_tag(dst, &Value::Map(map), tag)
}

/// Binds query-string pairs onto `dst`. Repeated keys collect their values in
/// order. Keys are case-sensitive.
pub fn bind_query<T, I, K, V>(dst: &mut T, tag: &str, pairs: I) -> Result<(), BindError>
where
    T: Facet<'static>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let map = group_values(pairs, |key| key);
    bind_with_tag(dst, &Value::Map(map), tag)
}

/// Binds header pairs onto `dst`. Header names and resolved member names are
/// both put in canonical MIME form, so matching is case-insensitive.
pub fn bind_header<T, I, K, V>(dst: &mut T, tag: &str, pairs: I) -> Result<(), BindError>
where
    T: Facet<'static>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    log::trace!("Entering `bind_header` with tag `{tag}`");
    let map = group_values(pairs, |key| canonical_header_key(&key).into_owned());
    let tag = tag.to_owned();
    let binder = Binder::new().with_field_name(move |field| {
        let (name, arg) = resolve_with_tag(field, &tag);
        if name.is_empty() {
            return (name, arg);
        }
        (Cow::Owned(canonical_header_key(&name).into_owned()), arg)
    });
    binder.bind(dst, &Value::Map(map))
}

/// Groups `(key, value)` pairs into a map of string sequences, keeping the
/// order in which keys first appear.
fn group_values<I, K, V>(pairs: I, normalize: impl Fn(String) -> String) -> Map
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut map = Map::new();
    for (key, value) in pairs {
        let key = normalize(key.into());
        let value = Value::String(value.into());
        match map.get_mut(&key) {
            Some(Value::Seq(values)) => values.push(value),
            _ => {
                map.insert(key, Value::Seq(vec![value]));
            }
        }
    }
    map
}
