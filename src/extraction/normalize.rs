use serde_json::{Map, Value};

// camelCase source vocabulary → canonical snake_case vocabulary
const ALIASES: [(&str, &str); 8] = [
    ("sellingPrice", "selling_price"),
    ("soldAtDate", "sold_at_date"),
    ("livingArea", "living_area"),
    ("streetAddress", "street_address"),
    ("brokerAgency", "broker_agency"),
    ("pricePerSqm", "price_per_square_meter"),
    ("pricePerSquareMeter", "price_per_square_meter"),
    ("askingPrice", "price"),
];

// Canonical fields that may arrive money-wrapped.
const MONEY_FIELDS: [&str; 3] = ["selling_price", "price", "price_per_square_meter"];

/// Map a source's field vocabulary onto the canonical one. Pure. A
/// canonical field is filled only if absent (first writer wins), so this
/// may run after merging higher-priority sources without clobbering them.
/// Money-shaped values unwrap to plain numbers uniformly.
pub fn normalize(props: &Map<String, Value>) -> Map<String, Value> {
    let mut out = props.clone();
    for (alias, canonical) in ALIASES {
        if out.contains_key(canonical) {
            continue;
        }
        if let Some(value) = props.get(alias) {
            out.insert(canonical.to_string(), value.clone());
        }
    }
    for field in MONEY_FIELDS {
        if let Some(Value::Object(wrapped)) = out.get(field) {
            if let Some(amount) = wrapped.get("amount").cloned() {
                out.insert(field.to_string(), amount);
            }
        }
    }
    out
}

/// Tolerant numeric read: numbers pass through, digit strings parse,
/// anything else is absent. Never errors.
pub fn as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty strings only; absence stays absent, never "".
pub fn as_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

pub fn as_bool(value: Option<&Value>) -> Option<bool> {
    value?.as_bool()
}
