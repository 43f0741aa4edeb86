use serde_json::{Map, Value};

// Adversarially nested trees stop here; JSON is acyclic so no cycle guard.
const MAX_DEPTH: usize = 64;

// Two naming conventions for the same price/date fields.
const PRICE_OR_DATE_KEYS: [&str; 4] =
    ["selling_price", "sellingPrice", "sold_at_date", "soldAtDate"];

/// Depth-first search for a property-shaped node when no fast path applies:
/// object values in key insertion order, then array elements in index
/// order. First qualifying node wins, deterministically; serde_json's
/// preserve_order keeps object iteration in insertion order.
pub fn find(node: &Value) -> Option<&Map<String, Value>> {
    walk(node, 0)
}

fn walk(node: &Value, depth: usize) -> Option<&Map<String, Value>> {
    if depth >= MAX_DEPTH {
        return None;
    }
    match node {
        Value::Object(map) => {
            // explicit sold marker, either convention
            for key in ["sold_property", "soldProperty"] {
                if let Some(Value::Object(inner)) = map.get(key) {
                    return Some(inner);
                }
            }
            // explicit active marker, only if it carries an identity
            if let Some(Value::Object(inner)) = map.get("property") {
                if inner.contains_key("id") {
                    return Some(inner);
                }
            }
            // a bare node qualifies with an identity plus any price/date field
            if map.contains_key("id")
                && PRICE_OR_DATE_KEYS.iter().any(|k| map.contains_key(*k))
            {
                return Some(map);
            }
            for value in map.values() {
                if let Some(found) = walk(value, depth + 1) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| walk(item, depth + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_sold_marker_first() {
        let tree = json!({
            "a": {"soldProperty": {"id": 1, "sellingPrice": 100}},
            "b": {"id": 2, "selling_price": 200},
        });
        let found = find(&tree).unwrap();
        assert_eq!(found.get("id"), Some(&json!(1)));
    }

    #[test]
    fn property_container_needs_id() {
        let tree = json!({
            "x": {"property": {"price": 1}},
            "y": {"property": {"id": 9, "price": 2}},
        });
        let found = find(&tree).unwrap();
        assert_eq!(found.get("id"), Some(&json!(9)));
    }

    #[test]
    fn first_match_in_insertion_order_wins() {
        // both children qualify; the one inserted first must win
        let tree = json!({
            "first": {"id": 10, "sold_at_date": "2024-01-01"},
            "second": {"id": 20, "sold_at_date": "2024-01-02"},
        });
        let found = find(&tree).unwrap();
        assert_eq!(found.get("id"), Some(&json!(10)));
    }

    #[test]
    fn id_alone_does_not_qualify() {
        let tree = json!({"node": {"id": 5, "title": "no price or date"}});
        assert!(find(&tree).is_none());
    }

    #[test]
    fn lists_are_searched_in_index_order() {
        let tree = json!([
            {"noise": true},
            [{"id": 7, "sellingPrice": {"amount": 1}}],
            {"id": 8, "sellingPrice": 2},
        ]);
        let found = find(&tree).unwrap();
        assert_eq!(found.get("id"), Some(&json!(7)));
    }

    #[test]
    fn recursion_is_bounded() {
        let mut tree = json!({"id": 1, "selling_price": 2});
        for _ in 0..100 {
            tree = json!({"wrap": tree});
        }
        assert!(find(&tree).is_none());
    }
}
