//! The trailday library scrapes a hiking-trail page, asks an LLM to build a day
//! itinerary around the hike, and turns the places the itinerary mentions into
//! numbered map pins.

pub mod compose;
pub mod config;
pub mod constants;
pub mod error;
pub mod generate;
pub mod geocode;
pub mod parse;
pub mod places;
pub mod scrape;
pub mod storage;
pub mod trail;

/// What to do with a line of the "Places Mentioned" section that does not parse.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ExtractPolicy {
    /// Log the line and continue with the next one
    #[default]
    Lenient,
    /// Fail the whole extraction
    Strict,
}

impl std::str::FromStr for ExtractPolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "lenient" => Ok(ExtractPolicy::Lenient),
            "strict" => Ok(ExtractPolicy::Strict),
            _ => Err(format!("Invalid extraction policy: {}", input)),
        }
    }
}

pub use compose::compose;
pub use error::{ConfigError, ExtractError, FetchError, GenerateError, ParseError};
pub use generate::{ItineraryRequest, generate, generate_itinerary};
pub use geocode::{Geocode, MapPlan, NominatimGeocoder, map};
pub use parse::parse_trail;
pub use places::{Coordinates, ExtractedLine, PlaceMention, extract_places, parse_place_lines};
pub use scrape::{Fetcher, enter_trail, scrape_trail};
pub use storage::{Session, Storage};
pub use trail::{Difficulty, TrailRecord};
