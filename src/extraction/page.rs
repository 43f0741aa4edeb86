use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const NBSP: char = '\u{a0}';

// Coordinates are embedded in a map-config blob on the same line.
static COORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"coordinate.*\[(\d{2}\.\d+),(\d{2}\.\d+)\]").unwrap());

/// CSS-level facts gathered once per page and consumed by the builder.
pub struct PageFacts {
    pub attributes: HashMap<String, String>,
    pub broker_card: Option<BrokerCard>,
    pub coords: Option<(f64, f64)>,
}

/// The broker contact card as it appears in the DOM; hrefs stay raw here,
/// decoding happens behind the contact boundary.
pub struct BrokerCard {
    pub name: Option<String>,
    pub phone_href: Option<String>,
    pub email_href: Option<String>,
    pub firm_phone_href: Option<String>,
}

impl PageFacts {
    pub fn gather(doc: &Html, raw_html: &str) -> Self {
        PageFacts {
            attributes: property_attributes(doc),
            broker_card: broker_card(doc),
            coords: coordinates(raw_html),
        }
    }
}

/// The key/value legend under the property attributes list: dt holds the
/// label, the following dd the display value.
pub fn property_attributes(doc: &Html) -> HashMap<String, String> {
    let (Ok(dt_sel), Ok(dd_sel)) = (
        Selector::parse(".sold-property__attributes > dt"),
        Selector::parse(".sold-property__attributes > dd"),
    ) else {
        return HashMap::new();
    };
    let keys = doc.select(&dt_sel).map(element_text);
    let values = doc.select(&dd_sel).map(element_text);
    keys.zip(values).collect()
}

pub fn broker_card(doc: &Html) -> Option<BrokerCard> {
    let card_sel = Selector::parse(".broker-contact-card__information").ok()?;
    let node = doc.select(&card_sel).next()?;

    let name_sel = Selector::parse("strong").ok()?;
    let name = node
        .select(&name_sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty());

    let link_sel = Selector::parse("a.broker-contact__link").ok()?;
    let links: Vec<String> = node
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    let firm_sel = Selector::parse(".phone-number").ok()?;
    let firm_links: Vec<String> = node
        .select(&firm_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    Some(BrokerCard {
        name,
        phone_href: links.first().cloned(),
        email_href: links.get(1).cloned(),
        // the first phone-number link repeats the broker's own; the firm's
        // comes second
        firm_phone_href: firm_links.get(1).cloned(),
    })
}

pub fn coordinates(raw_html: &str) -> Option<(f64, f64)> {
    let caps = COORD_RE.captures(raw_html)?;
    let lat = caps[1].parse().ok()?;
    let lon = caps[2].parse().ok()?;
    Some((lat, lon))
}

/// Coerce a legend display value to an integer: non-breaking spaces and
/// unit suffixes (`kr/mån`, `kr/år`, `m²`) are stripped, digit groups are
/// joined, and anything unparseable degrades to absent.
pub fn legend_int(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(NBSP, " ");
    let digits: String = cleaned
        .split_whitespace()
        .take_while(|tok| tok.chars().all(|c| c.is_ascii_digit()))
        .collect();
    if digits.is_empty() { None } else { digits.parse().ok() }
}

/// Legend string values: trimmed, empty becomes absent.
pub fn legend_str(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
