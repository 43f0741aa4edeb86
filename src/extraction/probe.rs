use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::warn;

use super::types::{PayloadKind, RawPayload};

// The analytics array is assigned inline in a script body, not inside a
// dedicated tag, so it is located in the raw text.
static DATA_LAYER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dataLayer\s*=\s*(\[[\s\S]*?\]);").unwrap());

/// Lift every candidate payload off the page, in fixed priority order:
/// legacy sold, legacy active, SSR tree. Candidates that fail to parse are
/// dropped with a warning; an empty result is the recoverable "no data"
/// condition, never an error.
pub fn probe(html: &str) -> Vec<RawPayload> {
    let mut out = Vec::new();

    if let Some(layer) = data_layer(html) {
        if let Some(sold) = layer_entry(&layer, "sold_property") {
            out.push(RawPayload { kind: PayloadKind::LegacySold, value: sold });
        }
        if let Some(active) = layer_entry(&layer, "property") {
            out.push(RawPayload { kind: PayloadKind::LegacyActive, value: active });
        }
    }

    if let Some(tree) = next_data(html) {
        out.push(RawPayload { kind: PayloadKind::SsrTree, value: tree });
    }

    out
}

fn data_layer(html: &str) -> Option<Vec<Value>> {
    let caps = DATA_LAYER_RE.captures(html)?;
    match serde_json::from_str::<Vec<Value>>(&caps[1]) {
        Ok(entries) => Some(entries),
        Err(err) => {
            warn!(error = %err, "analytics array failed to parse, dropped");
            None
        }
    }
}

// First array element carrying the wanted key as an object wins.
fn layer_entry(layer: &[Value], key: &str) -> Option<Value> {
    layer
        .iter()
        .find_map(|el| el.get(key))
        .filter(|v| v.is_object())
        .cloned()
}

fn next_data(html: &str) -> Option<Value> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("script#__NEXT_DATA__").ok()?;
    let node = doc.select(&sel).next()?;
    let text = node.text().collect::<String>();
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(tree) => Some(tree),
        Err(err) => {
            warn!(error = %err, "SSR blob failed to parse, dropped");
            None
        }
    }
}
