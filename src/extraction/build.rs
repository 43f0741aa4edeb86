use chrono::Utc;
use scraper::Html;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ExtractError;
use crate::record::{CanonicalRecord, SourceUsed};
use crate::util::time;

use super::apollo::{self, Cache};
use super::contact;
use super::finder;
use super::ids;
use super::normalize::{self, as_bool, as_f64, as_i64, as_string};
use super::page::{self, PageFacts};
use super::types::{PayloadKind, RawPayload};

/// Reconcile one page's probed payloads into a canonical record.
///
/// Source priority: legacy-sold is authoritative (sold listings expose
/// final price/date nowhere else as reliably), then legacy-active, then a
/// resolvable normalized-cache active root (the richest source), then the
/// recursive tree search passed through the normalizer. No source yielding
/// fields is the recoverable `NoExtractableData` outcome.
pub fn build(
    page_url: &str,
    html: &str,
    payloads: &[RawPayload],
) -> Result<CanonicalRecord, ExtractError> {
    let doc = Html::parse_document(html);
    let facts = PageFacts::gather(&doc, html);

    if let Some(props) = payload_object(payloads, PayloadKind::LegacySold) {
        return Ok(from_legacy(page_url, props, &facts, SourceUsed::LegacySold));
    }
    if let Some(props) = payload_object(payloads, PayloadKind::LegacyActive) {
        return Ok(from_legacy(page_url, props, &facts, SourceUsed::LegacyActive));
    }
    if let Some(tree) = payloads
        .iter()
        .find(|p| p.kind == PayloadKind::SsrTree)
        .map(|p| &p.value)
    {
        if let Some(state) = apollo::apollo_state(tree) {
            if let Some(root) = apollo::active_listing_root(state) {
                return Ok(from_active_root(page_url, root, state, &facts));
            }
        }
        if let Some(node) = finder::find(tree) {
            let props = normalize::normalize(node);
            return Ok(from_legacy(page_url, &props, &facts, SourceUsed::TreeSearch));
        }
    }

    Err(ExtractError::NoExtractableData)
}

fn payload_object(payloads: &[RawPayload], kind: PayloadKind) -> Option<&Map<String, Value>> {
    payloads
        .iter()
        .find(|p| p.kind == kind)
        .and_then(|p| p.value.as_object())
}

// The leading word of the URL slug ("villa-8rok-…" → "villa").
fn slug_kind(page_url: &str) -> Option<String> {
    let segment = page_url.trim_end_matches('/').rsplit('/').next()?;
    let segment = segment.strip_suffix(".html").unwrap_or(segment);
    let kind = segment.split('-').next()?;
    if kind.is_empty() || kind.chars().any(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(kind.to_string())
    }
}

fn base_record(page_url: &str, source: SourceUsed) -> CanonicalRecord {
    CanonicalRecord {
        url: Some(page_url.to_string()),
        source_used: Some(source),
        collected_at: Some(Utc::now()),
        ..CanonicalRecord::default()
    }
}

/// Flat legacy property dict (sold or active analytics payload, or the
/// normalized tree-search result). Page-level facts fill what the payload
/// lacks: the attribute legend, the broker card, the map coordinates.
fn from_legacy(
    page_url: &str,
    props: &Map<String, Value>,
    facts: &PageFacts,
    source: SourceUsed,
) -> CanonicalRecord {
    let mut rec = base_record(page_url, source);

    rec.hemnet_id = as_i64(props.get("id")).or_else(|| ids::listing_id(page_url));
    rec.item_type = slug_kind(page_url);

    rec.rooms = as_f64(props.get("rooms"));
    rec.square_meters = as_f64(props.get("living_area"));
    rec.price = as_i64(props.get("selling_price"));
    rec.asked_price = as_i64(props.get("price"));
    rec.price_per_square_meter = as_f64(props.get("price_per_square_meter"));
    rec.sold_date = props
        .get("sold_at_date")
        .and_then(Value::as_str)
        .and_then(time::parse_date);
    rec.address = as_string(props.get("street_address"));
    rec.geographic_area = as_string(props.get("location"));

    apply_legend(&mut rec, facts);

    if let Some(card) = &facts.broker_card {
        rec.broker_name = card.name.clone();
        rec.broker_phone = card.phone_href.as_deref().and_then(contact::strip_tel);
        rec.broker_email = card
            .email_href
            .as_deref()
            .and_then(contact::decode_protected_email);
        rec.broker_firm_phone = card
            .firm_phone_href
            .as_deref()
            .and_then(contact::strip_tel);
    }
    rec.broker_firm = as_string(props.get("broker_agency"));

    (rec.latitude, rec.longitude) = split_coords(facts.coords);
    rec
}

/// The normalized-cache active root: the richest source. Relational refs
/// (broker, agency, locations, cooperative) resolve through the cache;
/// marketplace blobs are retained raw.
fn from_active_root(
    page_url: &str,
    root: &Cache,
    state: &Cache,
    facts: &PageFacts,
) -> CanonicalRecord {
    let mut rec = base_record(page_url, SourceUsed::NormalizedCache);

    rec.hemnet_id = as_i64(root.get("id")).or_else(|| ids::listing_id(page_url));
    rec.item_type = root
        .get("housingForm")
        .and_then(|hf| as_string(hf.get("name")))
        .or_else(|| slug_kind(page_url));

    rec.rooms = as_f64(root.get("numberOfRooms"));
    rec.square_meters = as_f64(root.get("livingArea"));
    rec.monthly_fee = apollo::money_amount(root.get("fee")).map(|v| v as i64);
    rec.cost_per_year = apollo::money_amount(root.get("runningCosts")).map(|v| v as i64);

    // can be a range like "2008-2009", so it stays text
    rec.year = root
        .get("legacyConstructionYear")
        .filter(|v| !v.is_null())
        .map(display_string);

    apply_legend(&mut rec, facts);

    let broker = apollo::resolve(root.get("broker"), state);
    let agency = apollo::resolve(root.get("brokerAgency"), state);
    rec.broker_name = as_string(broker.get("name"));
    rec.broker_phone = as_string(broker.get("phoneNumber"));
    rec.broker_email = as_string(broker.get("email"));
    rec.broker_firm = as_string(agency.get("name"));
    rec.broker_firm_phone = as_string(agency.get("phoneNumber"));

    rec.listing_url = as_string(root.get("listingHemnetUrl"));
    rec.title = as_string(root.get("title"));
    rec.description = as_string(root.get("description"));
    rec.housing_form = root
        .get("housingForm")
        .and_then(|hf| as_string(hf.get("name")));
    rec.tenure = root.get("tenure").and_then(|t| as_string(t.get("name")));
    rec.days_on_hemnet = as_i64(root.get("daysOnHemnet"));
    rec.is_new_construction = as_bool(root.get("isNewConstruction"));
    rec.is_project = as_bool(root.get("isProject"));
    rec.is_project_unit = as_bool(root.get("isProjectUnit"));
    rec.is_upcoming = as_bool(root.get("isUpcoming"));
    rec.is_foreclosure = as_bool(root.get("isForeclosure"));
    rec.is_bidding_ongoing = as_bool(root.get("isBiddingOngoing"));
    rec.bidding_started = as_bool(root.get("biddingStarted"));
    rec.published_at = root.get("publishedAt").and_then(time::parse_datetime);
    rec.times_viewed = as_i64(root.get("timesViewed"));
    rec.verified_bidding = as_bool(root.get("verifiedBidding"));
    rec.listing_broker_url = as_string(root.get("listingBrokerUrl"));
    rec.listing_broker_gallery_url = as_string(root.get("listingBrokerGalleryUrl"));
    rec.post_code = as_string(root.get("postCode"));

    rec.municipality_name = apollo::resolve_name(root.get("municipality"), state);
    rec.region_name = apollo::resolve_name(root.get("region"), state);
    rec.county_name = apollo::resolve_name(root.get("county"), state);
    rec.districts = apollo::resolve_names(root.get("districts"), state);

    rec.labels = cloned(root.get("labels"));
    rec.relevant_amenities = cloned(root.get("relevantAmenities"));
    rec.listing_collection_ids = cloned(root.get("listingCollectionIds"));
    rec.breadcrumbs = cloned(root.get("breadcrumbs"));
    rec.ad_targeting = cloned(root.get("adTargeting"));
    rec.attachments = cloned(root.get("attachments"));

    rec.images = cloned(root.get(r#"images({"limit":300})"#));
    rec.images_preview = cloned(root.get(r#"images({"limit":0})"#));
    rec.thumbnail = cloned(root.get("thumbnail"));
    rec.photo_attribution = as_string(root.get("photoAttribution"));
    rec.price_change = cloned(root.get("priceChange"));
    rec.upcoming_open_houses = cloned(root.get("upcomingOpenHouses"));
    rec.floor_plan_images = cloned(root.get("floorPlanImages"));
    rec.video_attachment = cloned(root.get(r#"attachment({"type":"VIDEO"})"#));
    rec.three_d_attachment = cloned(root.get(r#"attachment({"type":"THREE_D"})"#));
    rec.energy_classification = cloned(root.get("energyClassification"));
    rec.active_package = cloned(root.get("activePackage"));
    rec.seller_package_recommendation = cloned(root.get("sellerPackageRecommendation"));

    let cooperative = apollo::resolve(root.get("housingCooperative"), state);
    if !cooperative.is_empty() {
        rec.housing_cooperative_name = as_string(cooperative.get("name"));
        rec.housing_cooperative = Some(Value::Object(cooperative.clone()));
    }

    rec.yearly_arrende_fee = apollo::money_amount(root.get("yearlyArrendeFee"));
    rec.yearly_leasehold_fee = apollo::money_amount(root.get("yearlyLeaseholdFee"));
    rec.land_area = as_f64(root.get("landArea"));
    rec.supplemental_area = as_f64(root.get("supplementalArea"));
    rec.formatted_land_area = as_string(root.get("formattedLandArea"));
    rec.formatted_living_area = as_string(root.get("formattedLivingArea"));
    rec.formatted_supplemental_area = as_string(root.get("formattedSupplementalArea"));
    rec.formatted_floor = as_string(root.get("formattedFloor"));
    rec.closest_water_distance_meters = as_i64(root.get("closestWaterDistanceMeters"));
    rec.coastline_distance_meters = as_i64(root.get("coastlineDistanceMeters"));

    rec.raw_listing = Some(Value::Object(root.clone()));

    rec.price = apollo::money_amount(root.get("askingPrice")).map(|v| v as i64);
    rec.asked_price = rec.price;
    rec.price_per_square_meter = apollo::money_amount(root.get("squareMeterPrice"));
    rec.sold_date = None;
    rec.address = as_string(root.get("streetAddress"));
    rec.geographic_area = as_string(root.get("area"));

    (rec.latitude, rec.longitude) = split_coords(facts.coords);
    rec
}

// Legend fields apply to every source path; the legend is simply absent on
// most active renders.
fn apply_legend(rec: &mut CanonicalRecord, facts: &PageFacts) {
    if rec.monthly_fee.is_none() {
        rec.monthly_fee = legend_int_field(facts, "Avgift/månad");
    }
    if rec.cost_per_year.is_none() {
        rec.cost_per_year = legend_int_field(facts, "Driftskostnad");
    }
    if rec.year.is_none() {
        rec.year = legend(facts, "Byggår").and_then(|v| page::legend_str(&v));
    }
    rec.association = legend(facts, "Förening").and_then(|v| page::legend_str(&v));
    rec.lot_size = legend_int_field(facts, "Tomtarea");
    rec.biarea = legend_int_field(facts, "Biarea");
}

fn legend(facts: &PageFacts, key: &str) -> Option<String> {
    facts.attributes.get(key).cloned()
}

fn legend_int_field(facts: &PageFacts, key: &'static str) -> Option<i64> {
    let raw = legend(facts, key)?;
    let parsed = page::legend_int(&raw);
    if parsed.is_none() {
        let err = ExtractError::FieldCoercion { field: key, raw: raw.clone() };
        debug!(reason = err.reason(), field = key, raw = %raw, "legend value skipped");
    }
    parsed
}

fn cloned(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn split_coords(coords: Option<(f64, f64)>) -> (Option<f64>, Option<f64>) {
    match coords {
        Some((lat, lon)) => (Some(lat), Some(lon)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::super::probe;
    use super::*;

    const LEGACY_ACTIVE_PAGE: &str = r#"
    <html><head><script>
      dataLayer = [
        {"page_type":"item"},
        {"property":{"id":7788990,"selling_price":4750000,"price":4500000,
                     "rooms":"3","living_area":72.5,
                     "street_address":"Storgatan 1","location":"Vasastan",
                     "broker_agency":"Mäklarhuset",
                     "price_per_square_meter":65517.2}}
      ];
    </script></head><body>
      <dl class="sold-property__attributes">
        <dt>Avgift/m&#229;nad</dt><dd>3&#160;998 kr/m&#229;n</dd>
      </dl>
    </body></html>
    "#;

    const SOLD_PAGE: &str = r#"
    <html><head><script>
      dataLayer = [
        {"sold_property":{"id":111,"selling_price":3200000,"sold_at_date":"2024-02-17",
                          "street_address":"Lillgatan 2"}},
        {"property":{"id":222,"price":9999999}}
      ];
    </script></head><body></body></html>
    "#;

    fn build_page(url: &str, html: &str) -> Result<CanonicalRecord, ExtractError> {
        let payloads = probe::probe(html);
        build(url, html, &payloads)
    }

    #[test]
    fn legacy_active_end_to_end() {
        let url = "https://www.hemnet.se/bostad/lagenhet-3rok-vasastan-7788990";
        let rec = build_page(url, LEGACY_ACTIVE_PAGE).unwrap();
        assert_eq!(rec.source_used, Some(SourceUsed::LegacyActive));
        assert_eq!(rec.price, Some(4750000));
        assert_eq!(rec.asked_price, Some(4500000));
        assert_eq!(rec.address.as_deref(), Some("Storgatan 1"));
        assert_eq!(rec.hemnet_id, Some(7788990));
        assert_eq!(rec.rooms, Some(3.0));
        assert_eq!(rec.square_meters, Some(72.5));
        assert_eq!(rec.monthly_fee, Some(3998));
        assert_eq!(rec.item_type.as_deref(), Some("lagenhet"));
        assert_eq!(rec.geographic_area.as_deref(), Some("Vasastan"));
        // absent stays absent
        assert_eq!(rec.sold_date, None);
        assert_eq!(rec.lot_size, None);
    }

    #[test]
    fn sold_payload_outranks_active() {
        let url = "https://www.hemnet.se/salda/lagenhet-2rok-111";
        let rec = build_page(url, SOLD_PAGE).unwrap();
        assert_eq!(rec.source_used, Some(SourceUsed::LegacySold));
        assert_eq!(rec.hemnet_id, Some(111));
        assert_eq!(rec.price, Some(3200000));
        assert_eq!(
            rec.sold_date,
            chrono::NaiveDate::from_ymd_opt(2024, 2, 17)
        );
        assert_eq!(rec.address.as_deref(), Some("Lillgatan 2"));
    }

    #[test]
    fn active_root_is_used_when_no_legacy_payload() {
        let page = r#"
        <html><body>
        <script id="__NEXT_DATA__" type="application/json">
        {"props":{"pageProps":{"__APOLLO_STATE__":{
          "ROOT_QUERY":{},
          "ActivePropertyListing:555":{
            "id":"555",
            "askingPrice":{"amount":5200000},
            "squareMeterPrice":{"amount":61000},
            "fee":{"amount":4100},
            "runningCosts":14000,
            "numberOfRooms":4,
            "livingArea":85,
            "streetAddress":"Kungsgatan 3",
            "area":"Centrum",
            "housingForm":{"name":"Bostadsrättslägenhet"},
            "tenure":{"name":"Bostadsrätt"},
            "daysOnHemnet":12,
            "isBiddingOngoing":true,
            "timesViewed":980,
            "publishedAt":"2024-03-01T09:30:00Z",
            "legacyConstructionYear":1962,
            "broker":{"__ref":"Broker:9"},
            "brokerAgency":{"__ref":"BrokerAgency:4"},
            "municipality":{"__ref":"Location:1"},
            "districts":[{"__ref":"Location:2"}]
          },
          "Broker:9":{"name":"Kim Larsson","phoneNumber":"070-111 22 33","email":"kim@firm.se"},
          "BrokerAgency:4":{"name":"Firm AB","phoneNumber":"08-555 66 77"},
          "Location:1":{"fullName":"Stockholms kommun"},
          "Location:2":{"name":"Norrmalm"}
        }}}}
        </script></body></html>
        "#;
        let url = "https://www.hemnet.se/bostad/lagenhet-4rok-centrum-555";
        let rec = build_page(url, page).unwrap();
        assert_eq!(rec.source_used, Some(SourceUsed::NormalizedCache));
        assert_eq!(rec.hemnet_id, Some(555));
        assert_eq!(rec.price, Some(5200000));
        assert_eq!(rec.asked_price, Some(5200000));
        assert_eq!(rec.monthly_fee, Some(4100));
        assert_eq!(rec.cost_per_year, Some(14000));
        assert_eq!(rec.square_meters, Some(85.0));
        assert_eq!(rec.item_type.as_deref(), Some("Bostadsrättslägenhet"));
        assert_eq!(rec.broker_name.as_deref(), Some("Kim Larsson"));
        assert_eq!(rec.broker_email.as_deref(), Some("kim@firm.se"));
        assert_eq!(rec.broker_firm.as_deref(), Some("Firm AB"));
        assert_eq!(rec.municipality_name.as_deref(), Some("Stockholms kommun"));
        assert_eq!(rec.districts, Some(vec!["Norrmalm".to_string()]));
        assert_eq!(rec.year.as_deref(), Some("1962"));
        assert_eq!(rec.is_bidding_ongoing, Some(true));
        assert_eq!(rec.times_viewed, Some(980));
        assert!(rec.raw_listing.is_some());
        assert_eq!(rec.sold_date, None);
    }

    #[test]
    fn tree_search_is_last_resort_and_normalized() {
        let page = r#"
        <html><body>
        <script id="__NEXT_DATA__" type="application/json">
        {"props":{"pageProps":{"listing":{"data":{
          "id":42,"sellingPrice":{"amount":1900000},
          "streetAddress":"Bygatan 9","livingArea":"44"
        }}}}}
        </script></body></html>
        "#;
        let url = "https://www.hemnet.se/salda/lagenhet-1rok-42";
        let rec = build_page(url, page).unwrap();
        assert_eq!(rec.source_used, Some(SourceUsed::TreeSearch));
        assert_eq!(rec.hemnet_id, Some(42));
        assert_eq!(rec.price, Some(1900000));
        assert_eq!(rec.address.as_deref(), Some("Bygatan 9"));
        assert_eq!(rec.square_meters, Some(44.0));
    }

    #[test]
    fn nothing_extractable_is_a_typed_outcome() {
        let err = build_page("https://example.se/x-1", "<html><body>empty</body></html>")
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoExtractableData));
        assert_eq!(err.reason(), "no-extractable-data");
    }

    #[test]
    fn id_falls_back_to_url_suffix() {
        let page = r#"
        <html><head><script>
          dataLayer = [{"property":{"selling_price":1000000}}];
        </script></head><body></body></html>
        "#;
        let rec = build_page("https://www.hemnet.se/bostad/villa-100200300", page).unwrap();
        assert_eq!(rec.hemnet_id, Some(100200300));
    }
}
