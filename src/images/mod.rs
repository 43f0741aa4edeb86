use reqwest::Client;

use crate::record::CanonicalRecord;

pub mod fetch;
pub mod select;

pub use fetch::FetchCaps;

/// Attach the main and floor-plan images to a record, in place. Idempotent:
/// a record already carrying image bytes is left untouched. At most two
/// independent fetches otherwise; each failure just leaves its slot empty.
/// Returns the number of fetch attempts made.
pub async fn enrich(record: &mut CanonicalRecord, client: &Client, caps: &FetchCaps) -> usize {
    if record.has_image_bytes() {
        return 0;
    }

    let (main_url, floor_url) = select::select(record);
    let mut attempts = 0;

    if let Some(url) = main_url {
        attempts += 1;
        if let Some(asset) = fetch::fetch_image(client, &url, caps).await {
            record.main_image = Some(asset);
        }
    }
    if let Some(url) = floor_url {
        attempts += 1;
        if let Some(asset) = fetch::fetch_image(client, &url, caps).await {
            record.floorplan_image = Some(asset);
        }
    }

    attempts
}
