//! The trail record produced by the parser or by manual entry.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

const KM_PER_MILE: f64 = 1.609_344;
const METERS_PER_FOOT: f64 = 0.3048;

/// Trail difficulty as shown on the trail-detail page.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

impl Difficulty {
    /// Finds a difficulty word anywhere in `text`, case-insensitively.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase().replace("difficulty", "");
        [
            ("moderate", Self::Moderate),
            ("hard", Self::Hard),
            ("difficult", Self::Hard),
            ("strenuous", Self::Hard),
            ("easy", Self::Easy),
        ]
        .into_iter()
        .find(|(word, _)| lower.contains(word))
        .map(|(_, difficulty)| difficulty)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "moderate" => Ok(Self::Moderate),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Invalid difficulty: {input}")),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Easy => "Easy",
            Self::Moderate => "Moderate",
            Self::Hard => "Hard",
        })
    }
}

/// Structured description of one hike.
///
/// `name` and `location` are never empty. Length is kept in kilometres and
/// elevation gain in metres regardless of the units used by the source page.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TrailRecord {
    pub name: String,
    pub location: String,
    pub length_km: Option<f64>,
    pub elevation_gain_m: Option<f64>,
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub route_type: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<u32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl TrailRecord {
    /// Creates a record with only the required fields set.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            length_km: None,
            elevation_gain_m: None,
            difficulty: None,
            route_type: String::new(),
            rating: None,
            reviews_count: None,
            description: String::new(),
            features: BTreeSet::new(),
        }
    }

    /// Renders the record as the bullet list embedded in prompts and exports.
    #[must_use]
    pub fn to_bullets(&self) -> String {
        let unknown = || "Unknown".to_string();
        let features = if self.features.is_empty() {
            "None specified".to_string()
        } else {
            self.features
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        [
            format!("- Trail Name: {}", self.name),
            format!("- Location: {}", self.location),
            format!(
                "- Difficulty: {}",
                self.difficulty.map_or_else(unknown, |d| d.to_string())
            ),
            format!(
                "- Length: {}",
                self.length_km
                    .map_or_else(unknown, |km| format!("{km:.1} km ({:.1} mi)", km / KM_PER_MILE))
            ),
            format!(
                "- Elevation Gain: {}",
                self.elevation_gain_m
                    .map_or_else(unknown, |m| format!("{m:.0} m ({:.0} ft)", m / METERS_PER_FOOT))
            ),
            format!(
                "- Route Type: {}",
                non_empty_or(&self.route_type, "Unknown")
            ),
            format!(
                "- Rating: {}",
                match (self.rating, self.reviews_count) {
                    (Some(rating), Some(reviews)) => format!("{rating:.1} ({reviews} reviews)"),
                    (Some(rating), None) => format!("{rating:.1}"),
                    _ => unknown(),
                }
            ),
            format!(
                "- Description: {}",
                non_empty_or(&self.description, "None provided")
            ),
            format!("- Features: {features}"),
        ]
        .join("\n")
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Converts a length reading to kilometres.
pub(crate) fn to_km(value: f64, unit: &str) -> f64 {
    if unit.to_lowercase().starts_with("mi") {
        value * KM_PER_MILE
    } else {
        value
    }
}

/// Converts an elevation reading to metres.
pub(crate) fn to_meters(value: f64, unit: &str) -> f64 {
    if unit.to_lowercase().starts_with('f') {
        value * METERS_PER_FOOT
    } else {
        value
    }
}
