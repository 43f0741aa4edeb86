use std::sync::OnceLock;

use serde_json::{Map, Value};

/// The normalized cache: a flat key→object store where fields may hold
/// pointer-like references instead of inline values.
pub type Cache = Map<String, Value>;

const ACTIVE_LISTING_PREFIX: &str = "ActivePropertyListing:";

// One hop is what the format promises; the bound keeps a broken cache from
// chasing pointers forever.
const MAX_REF_HOPS: usize = 4;

/// Tagged view of a cache field value. Resolution is a total function over
/// this variant instead of ad-hoc shape inspection.
#[derive(Debug)]
pub enum CacheValue<'a> {
    Scalar(&'a Value),
    Ref(&'a str),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
}

pub fn classify(value: &Value) -> CacheValue<'_> {
    match value {
        Value::Object(map) => match map.get("__ref").and_then(Value::as_str) {
            // a ref is a one-field pointer record
            Some(key) if map.len() == 1 => CacheValue::Ref(key),
            _ => CacheValue::Object(map),
        },
        Value::Array(items) => CacheValue::List(items),
        other => CacheValue::Scalar(other),
    }
}

fn empty() -> &'static Cache {
    static EMPTY: OnceLock<Cache> = OnceLock::new();
    EMPTY.get_or_init(Cache::new)
}

/// Locate the normalized cache inside the SSR tree.
pub fn apollo_state(ssr: &Value) -> Option<&Cache> {
    ssr.get("props")?
        .get("pageProps")?
        .get("__APOLLO_STATE__")?
        .as_object()
}

/// First top-level key with the recognized type prefix, in insertion order.
/// The source format does not guarantee uniqueness; first match is the
/// accepted approximation.
pub fn active_listing_root(state: &Cache) -> Option<&Cache> {
    state.iter().find_map(|(key, value)| {
        if key.starts_with(ACTIVE_LISTING_PREFIX) {
            value.as_object()
        } else {
            None
        }
    })
}

/// Resolve a pointer value into its cached object. A miss, a dangling
/// chain, or a non-object input resolves to the empty object, never an
/// error.
pub fn resolve<'a>(value: Option<&'a Value>, cache: &'a Cache) -> &'a Cache {
    let Some(mut current) = value else {
        return empty();
    };
    for _ in 0..=MAX_REF_HOPS {
        match classify(current) {
            CacheValue::Ref(key) => match cache.get(key) {
                Some(next) => current = next,
                None => return empty(),
            },
            CacheValue::Object(map) => return map,
            _ => return empty(),
        }
    }
    empty()
}

/// Money arrives either as an amount-bearing record or a bare number.
pub fn money_amount(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Object(map) => map.get("amount").and_then(Value::as_f64),
        other => other.as_f64(),
    }
}

/// Resolve a location ref to its display name.
pub fn resolve_name(value: Option<&Value>, cache: &Cache) -> Option<String> {
    let data = resolve(value, cache);
    for key in ["fullName", "name"] {
        if let Some(name) = data.get(key).and_then(Value::as_str) {
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Resolve a list of location refs, preserving input order. Refs resolving
/// to objects without a usable name are dropped; all dropped ⇒ None.
pub fn resolve_names(value: Option<&Value>, cache: &Cache) -> Option<Vec<String>> {
    let refs = value?.as_array()?;
    let names: Vec<String> = refs
        .iter()
        .filter_map(|r| resolve_name(Some(r), cache))
        .collect();
    if names.is_empty() { None } else { Some(names) }
}
