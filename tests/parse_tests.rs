use std::collections::BTreeSet;

use spectral::prelude::*;
use trailday::{Difficulty, ParseError, TrailRecord, parse_trail};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR")))
        .expect("Failed to read fixture")
}

fn parse_fixture(name: &str) -> TrailRecord {
    parse_trail(&fixture(name)).expect("Expected a trail record")
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|value| (value - expected).abs() < 0.01)
}

#[test]
fn parses_full_trail_page() {
    let trail = parse_fixture("trail_page.html");

    assert_that(&trail.name).is_equal_to("Mount Tamalpais East Peak Loop".to_string());
    assert_that(&trail.location)
        .is_equal_to("Mount Tamalpais State Park, Mill Valley, California".to_string());
    assert_that(&trail.difficulty).is_equal_to(Some(Difficulty::Moderate));
    assert_that(&trail.route_type).is_equal_to("Loop".to_string());
    assert_that(&trail.rating).is_equal_to(Some(4.7));
    assert_that(&trail.reviews_count).is_equal_to(Some(1234));
    assert_that(&trail.description).starts_with("Generally considered a challenging route");
}

#[test]
fn converts_imperial_units() {
    let trail = parse_fixture("trail_page.html");

    assert_that(&approx(trail.length_km, 8.37)).is_true();
    assert_that(&approx(trail.elevation_gain_m, 365.76)).is_true();
}

#[test]
fn collects_distinct_features() {
    let trail = parse_fixture("trail_page.html");

    let expected: BTreeSet<String> = ["Dog friendly", "Views", "Wildflowers"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_that(&trail.features).is_equal_to(expected);
}

#[test]
fn reads_stats_from_container_text() {
    let trail = parse_fixture("trail_page_metric.html");

    assert_that(&trail.name).is_equal_to("Seealpsee Rundweg".to_string());
    assert_that(&trail.location).is_equal_to("Appenzell, Switzerland".to_string());
    assert_that(&trail.difficulty).is_equal_to(Some(Difficulty::Easy));
    assert_that(&trail.route_type).is_equal_to("Out & back".to_string());
    assert_that(&approx(trail.length_km, 7.5)).is_true();
    assert_that(&approx(trail.elevation_gain_m, 420.0)).is_true();
}

#[test]
fn optional_fields_stay_empty() {
    let trail = parse_fixture("trail_page_minimal.html");

    assert_that(&trail).is_equal_to(TrailRecord::new("Fern Creek Trail", "Muir Woods, California"));
}

#[test]
fn rejects_access_denied_page() {
    let result = parse_trail(&fixture("access_denied.html"));

    assert_that(&result).is_equal_to(Err(ParseError::Interstitial("Access Denied".to_string())));
}

#[test]
fn rejects_page_without_location() {
    let result = parse_trail(&fixture("no_location.html"));

    assert_that(&result).is_equal_to(Err(ParseError::MissingField("location")));
}

#[test]
fn rejects_empty_document() {
    assert_that(&parse_trail("")).is_equal_to(Err(ParseError::MissingField("name")));
}

#[test]
fn bullets_show_both_unit_systems() {
    let mut trail = TrailRecord::new("Fern Creek Trail", "Muir Woods, California");
    trail.length_km = Some(8.0467);
    trail.elevation_gain_m = Some(304.8);

    let bullets = trail.to_bullets();

    assert_that(&bullets).contains("- Length: 8.0 km (5.0 mi)");
    assert_that(&bullets).contains("- Elevation Gain: 305 m (1000 ft)");
    assert_that(&bullets).contains("- Difficulty: Unknown");
    assert_that(&bullets).ends_with("- Features: None specified");
}

#[test]
fn difficulty_is_detected_from_labels() {
    assert_that(&Difficulty::detect("Difficulty: Easy")).is_equal_to(Some(Difficulty::Easy));
    assert_that(&Difficulty::detect("Strenuous")).is_equal_to(Some(Difficulty::Hard));
    assert_that(&Difficulty::detect("Length 4 km")).is_equal_to(None);
}

fn stats_page(stats: &str) -> String {
    format!(
        r#"<html><body><h1>Dipsea Trail</h1><p class="location">Mill Valley, California</p><div class="trailStats">{stats}</div></body></html>"#
    )
}

#[test]
fn estimated_time_is_not_elevation() {
    let trail = parse_trail(&stats_page("Length 3.1 mi · Est. 2h 30m"))
        .expect("Expected a trail record");

    assert_that(&trail.elevation_gain_m).is_equal_to(None);
    assert_that(&approx(trail.length_km, 4.99)).is_true();
}

#[test]
fn elevation_after_estimated_time_is_kept() {
    let trail = parse_trail(&stats_page("Est. 1h 45m · 45 min descent · Elevation gain 250 m"))
        .expect("Expected a trail record");

    assert_that(&approx(trail.elevation_gain_m, 250.0)).is_true();
}
