//! Parses a trail-detail page into a [`TrailRecord`].
//!
//! Parsing is keyed off fixed selector lists that match the trail site's markup.
//! For every field the selectors are tried in order and the first element found
//! wins. Missing optional fields are left empty; a page without a name or a
//! location is rejected.

use std::collections::BTreeSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::trail::{Difficulty, TrailRecord, to_km, to_meters};

const NAME_SELECTORS: &[&str] = &[
    r#"[data-testid="trail-title"]"#,
    r#"h1[class*="title"]"#,
    "h1",
];

const LOCATION_SELECTORS: &[&str] = &[
    r#"[data-testid="location"]"#,
    r#"div[class*="location"]"#,
    r#"p[class*="location"]"#,
];

const STATS_SELECTORS: &[&str] = &[
    r#"[data-testid="trail-stats"]"#,
    r#"div[class*="trailStats"]"#,
    r#"div[class*="stat"]"#,
];

const STAT_ITEM_SELECTOR: &str = r#"div[class*="stat"], span[class*="stat"]"#;

const RATING_SELECTORS: &[&str] = &[r#"[data-testid="rating"]"#, r#"span[class*="rating"]"#];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-testid="description"]"#,
    r#"div[class*="description"]"#,
    r#"p[class*="description"]"#,
];

const FEATURES_SELECTORS: &[&str] = &[
    r#"[data-testid="tags"]"#,
    r#"div[class*="tags"]"#,
    r#"div[class*="features"]"#,
];

const ROUTE_TYPES: &[(&str, &str)] = &[
    ("loop", "Loop"),
    ("out & back", "Out & back"),
    ("out and back", "Out & back"),
    ("point to point", "Point to point"),
];

const INTERSTITIAL_MARKERS: &[&str] = &[
    "access denied",
    "just a moment",
    "attention required",
    "are you a robot",
    "verify you are human",
    "403 forbidden",
];

static LENGTH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(miles?|mi|km|kilomet(?:er|re)s?)\b")
        .expect("Failed to compile LENGTH regex")
});

static ELEVATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(ft|feet|foot|m|met(?:er|re)s?)\b")
        .expect("Failed to compile ELEVATION regex")
});

/// Estimated hiking times such as "2h 30m" or "45 min", removed before the
/// elevation is read so that minutes are not taken for metres.
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s*(?:h|hrs?|hours?)\b(?:\s*\d+\s*(?:m|mins?|minutes?)\b)?|\b\d+\s*(?:mins?|minutes?)\b",
    )
    .expect("Failed to compile DURATION regex")
});

static RATING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d(?:\.\d+)?)").expect("Failed to compile RATING regex"));

static REVIEWS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\s*reviews?\b").expect("Failed to compile REVIEWS regex")
});

static LIST_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s·•\-*→▶▸▹▻▪▫◦‣⁃]+").expect("Failed to compile LIST_MARKER regex")
});

/// Parses trail-detail HTML into a [`TrailRecord`].
///
/// # Errors
///
/// Returns [`ParseError::Interstitial`] for bot-protection pages and
/// [`ParseError::MissingField`] when the name or location cannot be found.
pub fn parse_trail(html: &str) -> Result<TrailRecord, ParseError> {
    let document = Html::parse_document(html);

    if let Some(marker) = detect_interstitial(&document) {
        return Err(ParseError::Interstitial(marker));
    }

    let name = first_text(&document, NAME_SELECTORS).ok_or(ParseError::MissingField("name"))?;
    let location = first_text(&document, LOCATION_SELECTORS)
        .map(|location| clean_location(&location))
        .filter(|location| !location.is_empty())
        .ok_or(ParseError::MissingField("location"))?;

    let mut trail = TrailRecord::new(name, location);
    apply_stats(&document, &mut trail);
    trail.rating = first_text(&document, RATING_SELECTORS).and_then(|text| parse_rating(&text));
    trail.reviews_count = parse_reviews(&document);
    trail.description = first_text(&document, DESCRIPTION_SELECTORS).unwrap_or_default();
    trail.features = parse_features(&document);

    debug!("Parsed trail record: {trail:?}");
    Ok(trail)
}

/// Strips leading bullet and list markers from a scraped location.
#[must_use]
pub fn clean_location(location: &str) -> String {
    LIST_MARKER_REGEX
        .replace(location.trim(), "")
        .trim()
        .to_string()
}

fn detect_interstitial(document: &Html) -> Option<String> {
    ["title", "h1"]
        .into_iter()
        .filter_map(|tag| first_text(document, &[tag]))
        .find_map(|text| {
            let lower = text.to_lowercase();
            INTERSTITIAL_MARKERS
                .iter()
                .any(|marker| lower.contains(marker))
                .then_some(text)
        })
}

/// Collapses the text of an element into a single whitespace-normalized line.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_element<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|query| {
        Selector::parse(query)
            .ok()
            .and_then(|selector| document.select(&selector).next())
    })
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|query| {
        let selector = Selector::parse(query).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn apply_stats(document: &Html, trail: &mut TrailRecord) {
    let (Some(container), Ok(item_selector)) = (
        first_element(document, STATS_SELECTORS),
        Selector::parse(STAT_ITEM_SELECTOR),
    ) else {
        return;
    };

    let mut items: Vec<String> = container
        .select(&item_selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();
    if items.is_empty() {
        items.push(element_text(container));
    }

    for text in items {
        let lower = text.to_lowercase();
        if trail.difficulty.is_none() {
            trail.difficulty = Difficulty::detect(&lower);
        }
        if trail.length_km.is_none()
            && let Some((value, unit)) = capture_number(&LENGTH_REGEX, &text)
        {
            trail.length_km = Some(to_km(value, &unit));
        }
        if trail.elevation_gain_m.is_none()
            && let Some((value, unit)) =
                capture_number(&ELEVATION_REGEX, &DURATION_REGEX.replace_all(&text, ""))
        {
            trail.elevation_gain_m = Some(to_meters(value, &unit));
        }
        if trail.route_type.is_empty()
            && let Some((_, label)) = ROUTE_TYPES.iter().find(|(word, _)| lower.contains(word))
        {
            trail.route_type = (*label).to_string();
        }
    }
}

fn capture_number(regex: &Regex, text: &str) -> Option<(f64, String)> {
    let captures = regex.captures(text)?;
    let value = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
    let unit = captures.get(2)?.as_str().to_string();
    Some((value, unit))
}

fn parse_rating(text: &str) -> Option<f64> {
    RATING_REGEX
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse().ok())
}

fn parse_reviews(document: &Html) -> Option<u32> {
    let selector = Selector::parse("span").ok()?;
    document.select(&selector).find_map(|span| {
        let text = element_text(span);
        let captures = REVIEWS_REGEX.captures(&text)?;
        captures.get(1)?.as_str().replace(',', "").parse().ok()
    })
}

fn parse_features(document: &Html) -> BTreeSet<String> {
    let Some(container) = first_element(document, FEATURES_SELECTORS) else {
        return BTreeSet::new();
    };

    container
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "span" | "div" | "a"))
        .map(element_text)
        .filter(|text| text.chars().count() > 1)
        .collect()
}
