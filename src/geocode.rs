//! The geocode module resolves the places of an itinerary to coordinates and
//! prepares numbered pins for an external map renderer (as GeoJSON).

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::ExtractPolicy;
use crate::constants::GEOCODER_USER_AGENT;
use crate::places::{Coordinates, PlaceMention, extract_places};
use crate::storage::Storage;
use crate::trail::TrailRecord;

/// Resolves a free-form address to coordinates.
#[async_trait]
pub trait Geocode: Send + Sync {
    /// Returns `Ok(None)` when the service knows no match for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup request itself fails.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>>;
}

/// [`Geocode`] over a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    search_url: Url,
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    /// # Errors
    ///
    /// Returns an error if `search_url` is not a URL or the client cannot be built.
    pub fn new(search_url: &str) -> Result<Self> {
        let search_url =
            Url::parse(search_url).with_context(|| format!("Invalid geocoder URL: {search_url}"))?;
        let client = reqwest::Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create geocoding HTTP client")?;

        Ok(Self { client, search_url })
    }
}

#[async_trait]
impl Geocode for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let results: Vec<NominatimPlace> = self
            .client
            .get(self.search_url.clone())
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        let Some(place) = results.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(Coordinates {
            lat: place.lat.parse().context("Invalid latitude in geocoding response")?,
            lng: place.lon.parse().context("Invalid longitude in geocoding response")?,
        }))
    }
}

/// A resolved place ready to be drawn. The trail itself uses index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub index: usize,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
}

/// The trail pin plus every place of the itinerary, in itinerary order, with
/// coordinates filled in where geocoding succeeded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapPlan {
    pub trail: Option<Pin>,
    pub places: Vec<PlaceMention>,
}

impl MapPlan {
    /// Places that made it onto the map.
    #[must_use]
    pub fn pins(&self) -> Vec<Pin> {
        self.places
            .iter()
            .filter_map(|place| {
                place.coordinates.map(|coordinates| Pin {
                    index: place.index,
                    name: place.name.clone(),
                    address: place.address.clone(),
                    coordinates,
                })
            })
            .collect()
    }

    /// Places kept in the textual list but left off the map.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&PlaceMention> {
        self.places
            .iter()
            .filter(|place| place.coordinates.is_none())
            .collect()
    }

    /// Renders the plan as a GeoJSON `FeatureCollection`.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        let feature = |pin: &Pin, kind: &str| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [pin.coordinates.lng, pin.coordinates.lat],
                },
                "properties": {
                    "index": pin.index,
                    "name": pin.name,
                    "address": pin.address,
                    "kind": kind,
                },
            })
        };

        let features: Vec<Value> = self
            .trail
            .iter()
            .map(|pin| feature(pin, "trail"))
            .chain(self.pins().iter().map(|pin| feature(pin, "place")))
            .collect();

        json!({ "type": "FeatureCollection", "features": features })
    }
}

/// Shared data for geocoding operations
pub struct MapContext<'a> {
    pub geocoder: &'a dyn Geocode,
    /// Rate limiter for controlling request frequency
    pub rate_limiter: Option<&'a StdTokenBucket>,
}

/// Builds a token bucket that lets one request through every `60 / rpm`
/// seconds. The bucket holds a single token, so a run never bursts past the
/// service's per-second limit.
#[must_use]
pub fn rate_limiter(rpm: Option<u32>) -> Option<StdTokenBucket> {
    rpm.and_then(|rpm| {
        let refill_interval = Duration::from_secs_f64(60.0 / f64::from(rpm.max(1)));

        TokenBucketBuilder::builder()
            .capacity(1_u64)
            .refill_amount(1_u64)
            .refill_every(refill_interval)
            .with_time(rate_guard::StdTimeSource::new())
            .with_precision::<rate_guard::Nanos>()
            .build()
            .ok()
    })
}

/// Geocodes the trail location and every place, in order.
///
/// Places that cannot be resolved (no match or a failing request) keep
/// `coordinates: None`; they never abort the whole plan.
pub async fn resolve_places(
    trail: &TrailRecord,
    places: Vec<PlaceMention>,
    ctx: &MapContext<'_>,
) -> MapPlan {
    let mut plan = MapPlan {
        trail: lookup(ctx, &trail.location).await.map(|coordinates| Pin {
            index: 0,
            name: trail.name.clone(),
            address: trail.location.clone(),
            coordinates,
        }),
        ..MapPlan::default()
    };
    if plan.trail.is_none() {
        warn!("Could not find coordinates for trail location {}", trail.location);
    }

    for mut place in places {
        place.coordinates = lookup(ctx, &place.address).await;
        if place.coordinates.is_none() {
            warn!("Leaving {}. {} off the map", place.index, place.name);
        }
        plan.places.push(place);
    }

    plan
}

async fn lookup(ctx: &MapContext<'_>, query: &str) -> Option<Coordinates> {
    if let Some(limiter) = ctx.rate_limiter {
        while limiter.try_acquire(1).is_err() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    match ctx.geocoder.geocode(query).await {
        Ok(Some(coordinates)) => {
            debug!("Geocoded {query:?} to {coordinates:?}");
            Some(coordinates)
        }
        Ok(None) => {
            debug!("No geocoding match for {query:?}");
            None
        }
        Err(error) => {
            warn!("Geocoding {query:?} failed: {error}");
            None
        }
    }
}

/// Extracts the session itinerary's places, geocodes them and writes the
/// resulting pins as GeoJSON to `output_path`.
///
/// # Errors
///
/// Returns an error if:
/// * The session has no trail or no itinerary
/// * Place extraction fails under the strict policy
/// * Database or file operations fail
pub async fn map(
    db_path: &str,
    output_path: &str,
    policy: ExtractPolicy,
    ctx: &MapContext<'_>,
) -> Result<MapPlan> {
    let storage = Storage::new(db_path)?;
    let session = storage.load_session()?;
    let trail = session.require_trail()?;
    let places = extract_places(session.require_itinerary()?, policy)?;

    info!("Geocoding {} places around {}...", places.len(), trail.name);
    let plan = resolve_places(trail, places, ctx).await;

    let geojson = serde_json::to_string_pretty(&plan.to_geojson())?;
    fs::write(output_path, geojson)
        .with_context(|| format!("Failed to write map to {output_path}"))?;
    info!(
        "Wrote {} pins to {output_path} ({} unresolved)",
        plan.pins().len() + usize::from(plan.trail.is_some()),
        plan.unresolved().len()
    );

    Ok(plan)
}
