use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

/// Which embedded payload the record was built from, in falling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceUsed {
    #[serde(rename = "legacy-sold")]
    LegacySold,
    #[serde(rename = "legacy-active")]
    LegacyActive,
    #[serde(rename = "normalized-cache")]
    NormalizedCache,
    #[serde(rename = "tree-search")]
    TreeSearch,
}

impl SourceUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceUsed::LegacySold => "legacy-sold",
            SourceUsed::LegacyActive => "legacy-active",
            SourceUsed::NormalizedCache => "normalized-cache",
            SourceUsed::TreeSearch => "tree-search",
        }
    }
}

/// A downloaded image. Bytes stay out of the serialized record; the sink
/// writes them to disk separately when asked to.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAsset {
    pub url: String,
    #[serde(skip_serializing)]
    pub bytes: Bytes,
    pub mime: Option<String>,
}

/// The unified, source-agnostic representation of one listing. Every field
/// is independently nullable; absence means the page did not expose the
/// value, never zero or empty.
///
/// Serializes to the flat field-name → value map the downstream sink
/// expects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanonicalRecord {
    // identity
    pub hemnet_id: Option<i64>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub source_used: Option<SourceUsed>,
    pub collected_at: Option<DateTime<Utc>>,

    // price block
    pub price: Option<i64>,
    pub asked_price: Option<i64>,
    pub price_per_square_meter: Option<f64>,
    pub sold_date: Option<NaiveDate>,
    pub price_change: Option<Value>,

    // area block
    pub rooms: Option<f64>,
    pub square_meters: Option<f64>,
    pub biarea: Option<i64>,
    pub lot_size: Option<i64>,
    pub land_area: Option<f64>,
    pub supplemental_area: Option<f64>,
    pub formatted_land_area: Option<String>,
    pub formatted_living_area: Option<String>,
    pub formatted_supplemental_area: Option<String>,
    pub formatted_floor: Option<String>,

    // fees and running costs
    pub monthly_fee: Option<i64>,
    pub cost_per_year: Option<i64>,
    pub yearly_arrende_fee: Option<f64>,
    pub yearly_leasehold_fee: Option<f64>,

    // building
    pub year: Option<String>,
    pub association: Option<String>,
    pub housing_form: Option<String>,
    pub tenure: Option<String>,
    pub energy_classification: Option<Value>,
    pub housing_cooperative: Option<Value>,
    pub housing_cooperative_name: Option<String>,

    // broker contact
    pub broker_name: Option<String>,
    pub broker_phone: Option<String>,
    pub broker_email: Option<String>,
    pub broker_firm: Option<String>,
    pub broker_firm_phone: Option<String>,

    // location
    pub address: Option<String>,
    pub geographic_area: Option<String>,
    pub post_code: Option<String>,
    pub municipality_name: Option<String>,
    pub region_name: Option<String>,
    pub county_name: Option<String>,
    pub districts: Option<Vec<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub closest_water_distance_meters: Option<i64>,
    pub coastline_distance_meters: Option<i64>,

    // listing metadata
    pub listing_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub days_on_hemnet: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub times_viewed: Option<i64>,
    pub listing_broker_url: Option<String>,
    pub listing_broker_gallery_url: Option<String>,

    // flags
    pub is_new_construction: Option<bool>,
    pub is_project: Option<bool>,
    pub is_project_unit: Option<bool>,
    pub is_upcoming: Option<bool>,
    pub is_foreclosure: Option<bool>,
    pub is_bidding_ongoing: Option<bool>,
    pub bidding_started: Option<bool>,
    pub verified_bidding: Option<bool>,

    // media
    pub images: Option<Value>,
    pub images_preview: Option<Value>,
    pub thumbnail: Option<Value>,
    pub floor_plan_images: Option<Value>,
    pub photo_attribution: Option<String>,
    pub video_attachment: Option<Value>,
    pub three_d_attachment: Option<Value>,
    pub attachments: Option<Value>,

    // marketplace blobs, kept raw
    pub labels: Option<Value>,
    pub relevant_amenities: Option<Value>,
    pub listing_collection_ids: Option<Value>,
    pub breadcrumbs: Option<Value>,
    pub ad_targeting: Option<Value>,
    pub upcoming_open_houses: Option<Value>,
    pub active_package: Option<Value>,
    pub seller_package_recommendation: Option<Value>,

    // retained raw source
    pub raw_listing: Option<Value>,

    // image assets, filled by the enrichment stage
    pub main_image: Option<ImageAsset>,
    pub floorplan_image: Option<ImageAsset>,
}

impl CanonicalRecord {
    /// True once the enrichment stage has stored any image bytes; a second
    /// enrichment pass must then be a no-op.
    pub fn has_image_bytes(&self) -> bool {
        self.main_image.is_some() || self.floorplan_image.is_some()
    }
}
