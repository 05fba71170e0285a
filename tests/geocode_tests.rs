use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use spectral::prelude::*;
use trailday::geocode::{MapContext, rate_limiter, resolve_places};
use trailday::{
    Coordinates, ExtractPolicy, Geocode, PlaceMention, Session, Storage, TrailRecord, map,
};

const MUIR_WOODS: Coordinates = Coordinates {
    lat: 37.8970,
    lng: -122.5811,
};
const CAFE: Coordinates = Coordinates {
    lat: 37.9061,
    lng: -122.5450,
};

struct StubGeocoder {
    known: HashMap<&'static str, Coordinates>,
    queries: Mutex<Vec<String>>,
}

impl StubGeocoder {
    fn new() -> Self {
        Self {
            known: HashMap::from([
                ("Muir Woods, California", MUIR_WOODS),
                ("12 Throckmorton Ave, Mill Valley, CA", CAFE),
            ]),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Geocode for StubGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        self.queries
            .lock()
            .expect("Poisoned stub lock")
            .push(query.to_string());

        if query.contains("offline") {
            bail!("connection refused");
        }
        Ok(self.known.get(query).copied())
    }
}

fn trail() -> TrailRecord {
    TrailRecord::new("Fern Creek Trail", "Muir Woods, California")
}

fn places() -> Vec<PlaceMention> {
    vec![
        PlaceMention::new(1, "Depot Cafe", "12 Throckmorton Ave, Mill Valley, CA"),
        PlaceMention::new(2, "Hidden Overlook", "Somewhere unmapped"),
        PlaceMention::new(3, "Pelican Inn", "offline lookup"),
    ]
}

#[tokio::test]
async fn resolves_trail_and_places_in_order() {
    let geocoder = StubGeocoder::new();
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: None,
    };

    let plan = resolve_places(&trail(), places(), &ctx).await;

    let queries = geocoder.queries.lock().expect("Poisoned stub lock").clone();
    assert_that(&queries).is_equal_to(vec![
        "Muir Woods, California".to_string(),
        "12 Throckmorton Ave, Mill Valley, CA".to_string(),
        "Somewhere unmapped".to_string(),
        "offline lookup".to_string(),
    ]);
    assert_that(&plan.trail.as_ref().map(|pin| (pin.index, pin.coordinates)))
        .is_equal_to(Some((0, MUIR_WOODS)));
    assert_that(&plan.places).has_length(3);
}

#[tokio::test]
async fn unresolved_places_stay_listed_but_off_the_map() {
    let geocoder = StubGeocoder::new();
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: None,
    };

    let plan = resolve_places(&trail(), places(), &ctx).await;

    let pinned: Vec<usize> = plan.pins().iter().map(|pin| pin.index).collect();
    let unresolved: Vec<usize> = plan.unresolved().iter().map(|place| place.index).collect();
    assert_that(&pinned).is_equal_to(vec![1]);
    assert_that(&unresolved).is_equal_to(vec![2, 3]);
}

#[tokio::test]
async fn geojson_uses_longitude_latitude_order() {
    let geocoder = StubGeocoder::new();
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: None,
    };

    let geojson = resolve_places(&trail(), places(), &ctx).await.to_geojson();

    assert_that(&geojson["type"]).is_equal_to(Value::from("FeatureCollection"));
    let features = geojson["features"].as_array().cloned().unwrap_or_default();
    assert_that(&features).has_length(2);

    let trail_feature = features.first().cloned().unwrap_or_default();
    assert_that(&trail_feature["properties"]["kind"]).is_equal_to(Value::from("trail"));
    assert_that(&trail_feature["geometry"]["coordinates"])
        .is_equal_to(serde_json::json!([MUIR_WOODS.lng, MUIR_WOODS.lat]));

    let cafe_feature = features.last().cloned().unwrap_or_default();
    assert_that(&cafe_feature["properties"]["index"]).is_equal_to(Value::from(1));
    assert_that(&cafe_feature["properties"]["name"]).is_equal_to(Value::from("Depot Cafe"));
}

#[tokio::test]
async fn limiter_spaces_out_requests() {
    let geocoder = StubGeocoder::new();
    let limiter = rate_limiter(Some(600));
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: limiter.as_ref(),
    };

    let started = Instant::now();
    let plan = resolve_places(&trail(), places(), &ctx).await;
    let elapsed = started.elapsed();

    // Four lookups at one per 100ms leave at least three gaps.
    assert_that(&(elapsed >= Duration::from_millis(250))).is_true();
    assert_that(&geocoder.queries.lock().expect("Poisoned stub lock").len()).is_equal_to(4);
    assert_that(&plan.pins()).has_length(1);
}

#[tokio::test]
async fn unthrottled_lookups_do_not_wait() {
    let geocoder = StubGeocoder::new();
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: None,
    };

    let started = Instant::now();
    resolve_places(&trail(), places(), &ctx).await;

    assert_that(&(started.elapsed() < Duration::from_millis(250))).is_true();
}

#[tokio::test]
async fn map_writes_geojson_for_session_itinerary() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = dir.path().join("session.db");
    let db = db.to_str().expect("Temp path is UTF-8");
    let output = dir.path().join("map.geojson");
    let output = output.to_str().expect("Temp path is UTF-8");

    let mut session = Session::default();
    session.replace_trail(None, trail());
    session.set_itinerary(
        Vec::new(),
        "## Morning\nCoffee first.\n\n## Places Mentioned\n1. Depot Cafe — 12 Throckmorton Ave, Mill Valley, CA\n2. Hidden Overlook — Somewhere unmapped\n".to_string(),
    );
    Storage::new(db)
        .and_then(|storage| storage.save_session(&session))
        .expect("Failed to save session");

    let geocoder = StubGeocoder::new();
    let ctx = MapContext {
        geocoder: &geocoder,
        rate_limiter: None,
    };
    let plan = map(db, output, ExtractPolicy::Lenient, &ctx)
        .await
        .expect("Expected map plan");

    let written: Value = serde_json::from_str(
        &std::fs::read_to_string(output).expect("Failed to read map output"),
    )
    .expect("Map output is JSON");
    let names: Vec<Value> = written["features"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|feature| feature["properties"]["name"].clone())
        .collect();
    assert_that(&names).is_equal_to(vec![Value::from("Fern Creek Trail"), Value::from("Depot Cafe")]);
    assert_that(&plan.unresolved().len()).is_equal_to(1);
}
