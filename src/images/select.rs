use serde_json::Value;

use crate::record::CanonicalRecord;

// Largest usable gallery cut first, smallest last.
const PREFERRED_FORMATS: [&str; 4] =
    ["ITEMGALLERY_L", "ITEMGALLERY_CUT", "ITEMGALLERY_M", "ITEMGALLERY_S"];

const FLOOR_PLAN_LABEL: &str = "FLOOR_PLAN";

/// Pick one main and one floor-plan URL from the record's image
/// descriptors. A descriptor labeled as a floor plan fills the floor-plan
/// slot; the first unlabeled descriptor with a resolvable URL fills main;
/// the scan stops once both slots are filled. Main falls back to the
/// thumbnail payload, floor plan to the dedicated floor-plan list.
pub fn select(record: &CanonicalRecord) -> (Option<String>, Option<String>) {
    let mut main_url: Option<String> = None;
    let mut floor_url: Option<String> = None;

    for image in gallery(record.images.as_ref()) {
        let Some(url) = descriptor_url(image) else { continue };
        if is_floor_plan(image) {
            if floor_url.is_none() {
                floor_url = Some(url.to_string());
            }
        } else if main_url.is_none() {
            main_url = Some(url.to_string());
        }
        if main_url.is_some() && floor_url.is_some() {
            break;
        }
    }

    if main_url.is_none() {
        main_url = record
            .thumbnail
            .as_ref()
            .and_then(descriptor_url)
            .map(str::to_string);
    }
    if floor_url.is_none() {
        floor_url = record
            .floor_plan_images
            .as_ref()
            .and_then(Value::as_array)
            .and_then(|items| items.iter().find_map(descriptor_url))
            .map(str::to_string);
    }

    (main_url, floor_url)
}

// The gallery arrives either as {"images": [...]} or a bare list.
fn gallery(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Object(map)) => map
            .get("images")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Each descriptor exposes the same photo at several named format cuts,
/// keyed like `url({"format":"ITEMGALLERY_L"})`. Any other `url(...)` key
/// is the last resort.
fn descriptor_url(image: &Value) -> Option<&str> {
    let map = image.as_object()?;
    for fmt in PREFERRED_FORMATS {
        let key = format!(r#"url({{"format":"{fmt}"}})"#);
        if let Some(url) = map.get(&key).and_then(Value::as_str) {
            return Some(url);
        }
    }
    map.iter()
        .find_map(|(k, v)| if k.starts_with("url(") { v.as_str() } else { None })
}

fn is_floor_plan(image: &Value) -> bool {
    image
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| labels.iter().any(|l| l.as_str() == Some(FLOOR_PLAN_LABEL)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(images: Value) -> CanonicalRecord {
        CanonicalRecord { images: Some(images), ..CanonicalRecord::default() }
    }

    #[test]
    fn one_url_per_slot_and_distinct() {
        let rec = record_with(json!({"images": [
            {"labels": [], "url({\"format\":\"ITEMGALLERY_L\"})": "https://img/main-l.jpg"},
            {"labels": ["FLOOR_PLAN"], "url({\"format\":\"ITEMGALLERY_M\"})": "https://img/plan-m.jpg"}
        ]}));
        let (main, floor) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/main-l.jpg"));
        assert_eq!(floor.as_deref(), Some("https://img/plan-m.jpg"));
        assert_ne!(main, floor);
    }

    #[test]
    fn format_preference_order() {
        let rec = record_with(json!([
            {"url({\"format\":\"ITEMGALLERY_S\"})": "https://img/s.jpg",
             "url({\"format\":\"ITEMGALLERY_CUT\"})": "https://img/cut.jpg"}
        ]));
        let (main, _) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/cut.jpg"));
    }

    #[test]
    fn unknown_format_is_last_resort() {
        let rec = record_with(json!([
            {"url({\"format\":\"SOMETHING_NEW\"})": "https://img/new.jpg", "width": 800}
        ]));
        let (main, _) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/new.jpg"));
    }

    #[test]
    fn first_descriptor_without_url_is_skipped() {
        let rec = record_with(json!([
            {"labels": []},
            {"labels": [], "url({\"format\":\"ITEMGALLERY_L\"})": "https://img/second.jpg"}
        ]));
        let (main, _) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/second.jpg"));
    }

    #[test]
    fn thumbnail_fills_main_as_last_resort() {
        let mut rec = record_with(json!([]));
        rec.thumbnail = Some(json!({"url({\"format\":\"ITEMGALLERY_S\"})": "https://img/thumb.jpg"}));
        let (main, floor) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/thumb.jpg"));
        assert_eq!(floor, None);
    }

    #[test]
    fn floor_plan_list_fills_floor_slot() {
        let mut rec = record_with(json!([
            {"labels": [], "url({\"format\":\"ITEMGALLERY_L\"})": "https://img/main.jpg"}
        ]));
        rec.floor_plan_images = Some(json!([
            {"url({\"format\":\"ITEMGALLERY_L\"})": "https://img/plan.jpg"}
        ]));
        let (main, floor) = select(&rec);
        assert_eq!(main.as_deref(), Some("https://img/main.jpg"));
        assert_eq!(floor.as_deref(), Some("https://img/plan.jpg"));
    }

    #[test]
    fn no_descriptors_means_no_urls() {
        let rec = CanonicalRecord::default();
        assert_eq!(select(&rec), (None, None));
    }
}
