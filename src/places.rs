//! Extraction of the "Places Mentioned" section from generated itinerary text.
//!
//! The section is found by heading, then every non-blank line up to the next
//! markdown heading is split into name and address at `N. Name — Address`
//! (or a bulleted or hyphenated variant). Lines that do not match are reported as
//! [`ExtractedLine::Unparseable`] instead of being silently sliced.

use anyhow::Result as AnyResult;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ExtractPolicy;
use crate::constants::PLACES_HEADING;
use crate::error::ExtractError;
use crate::storage::Storage;

static LIST_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+\s*[.)]|[-*•])?\s*").expect("Failed to compile LIST_PREFIX regex")
});

/// Em or en dash between name and address; preferred when present.
static DASH_DELIMITER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+[—–]\s+").expect("Failed to compile DASH_DELIMITER regex")
});

static HYPHEN_DELIMITER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+-{1,2}\s+").expect("Failed to compile HYPHEN_DELIMITER regex")
});

const PLACEHOLDER_NAMES: &[&str] = &["none", "n/a", "na", "unknown", "tbd"];

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// One place from the itinerary. `index` is 1-based and matches the numbering
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMention {
    pub index: usize,
    pub name: String,
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

impl PlaceMention {
    pub fn new(index: usize, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            address: address.into(),
            coordinates: None,
        }
    }
}

/// Result of matching one line of the section body.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedLine {
    Place(PlaceMention),
    /// `line_number` is 1-based and relative to the text that was scanned.
    Unparseable { line_number: usize, text: String },
}

/// Extracts the places listed under the "Places Mentioned" heading.
///
/// Returns an empty list when the heading is absent.
///
/// # Errors
///
/// Under [`ExtractPolicy::Strict`], returns [`ExtractError::MalformedLine`] for
/// the first line that does not parse. [`ExtractPolicy::Lenient`] never fails.
pub fn extract_places(
    itinerary: &str,
    policy: ExtractPolicy,
) -> Result<Vec<PlaceMention>, ExtractError> {
    let Some((offset, body)) = find_places_section(itinerary) else {
        if itinerary
            .to_lowercase()
            .contains(&PLACES_HEADING.to_lowercase())
        {
            warn!("Itinerary mentions \"{PLACES_HEADING}\" but no line reads as its heading");
        } else {
            debug!("No \"{PLACES_HEADING}\" section in itinerary");
        }
        return Ok(Vec::new());
    };

    collect(scan_lines(&body, offset), policy)
}

/// Extracts the places of the itinerary stored in the session database.
///
/// # Errors
///
/// Returns an error if the session has no itinerary, extraction fails under
/// the strict policy, or database operations fail.
pub fn session_places(db_path: &str, policy: ExtractPolicy) -> AnyResult<Vec<PlaceMention>> {
    let storage = Storage::new(db_path)?;
    let session = storage.load_session()?;
    let places = extract_places(session.require_itinerary()?, policy)?;
    info!("Found {} places in the itinerary", places.len());
    Ok(places)
}

/// Parses a section body (the lines under the heading) directly.
///
/// # Errors
///
/// Same as [`extract_places`].
pub fn parse_place_lines(
    body: &str,
    policy: ExtractPolicy,
) -> Result<Vec<PlaceMention>, ExtractError> {
    collect(scan_lines(body, 0), policy)
}

/// Classifies every non-blank line of `body`.
///
/// Places are numbered in order of appearance, so indices stay contiguous even
/// when some lines are unparseable.
#[must_use]
pub fn scan_lines(body: &str, line_offset: usize) -> Vec<ExtractedLine> {
    let mut next_index = 1;

    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| match parse_line(line) {
            Some((name, address)) => {
                let place = PlaceMention::new(next_index, name, address);
                next_index += 1;
                ExtractedLine::Place(place)
            }
            None => ExtractedLine::Unparseable {
                line_number: line_offset + number + 1,
                text: line.trim().to_string(),
            },
        })
        .collect()
}

/// Renders places in the canonical format understood by [`extract_places`].
#[must_use]
pub fn render_places(places: &[PlaceMention]) -> String {
    let mut rendered = format!("{PLACES_HEADING}\n");
    for place in places {
        rendered.push_str(&format!("{}. {} — {}\n", place.index, place.name, place.address));
    }
    rendered
}

fn collect(
    lines: Vec<ExtractedLine>,
    policy: ExtractPolicy,
) -> Result<Vec<PlaceMention>, ExtractError> {
    let mut places = Vec::new();

    for line in lines {
        match line {
            ExtractedLine::Place(place) => places.push(place),
            ExtractedLine::Unparseable { line_number, text } => match policy {
                ExtractPolicy::Strict => {
                    return Err(ExtractError::MalformedLine { line_number, text });
                }
                ExtractPolicy::Lenient => {
                    warn!("Skipping unparseable place line {line_number}: {text:?}");
                }
            },
        }
    }

    Ok(places)
}

/// Locates the heading and returns the line number it sits on together with
/// the section body that follows it.
fn find_places_section(text: &str) -> Option<(usize, String)> {
    let mut lines = text.lines().enumerate();
    let (heading_line, _) = lines.by_ref().find(|(_, line)| is_places_heading(line))?;

    let body = lines
        .map(|(_, line)| line)
        .take_while(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    Some((heading_line + 1, body))
}

/// Accepts the heading wrapped in markdown, numbering, emoji or a trailing
/// colon. Extra words after it count only on a line marked up as a heading.
fn is_places_heading(line: &str) -> bool {
    let line = line.trim();
    let normalized = line
        .trim_start_matches(|c: char| !c.is_alphabetic())
        .trim_end_matches(|c: char| !c.is_alphanumeric() && c != ')')
        .to_lowercase();

    let Some(rest) = normalized.strip_prefix(&PLACES_HEADING.to_lowercase()) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }

    let marked = line.starts_with('#') || line.starts_with("**") || line.ends_with(':');
    rest.starts_with(|c: char| !c.is_alphanumeric())
        && (marked || rest.trim_start().starts_with('('))
}

/// Splits on the first em or en dash; spaced hyphens are only a fallback so
/// that names like "Muir Woods - Visitor Center" stay whole.
fn parse_line(line: &str) -> Option<(String, String)> {
    let rest = LIST_PREFIX_REGEX.replace(line.trim(), "");
    let delimiter = DASH_DELIMITER_REGEX
        .find(&rest)
        .or_else(|| HYPHEN_DELIMITER_REGEX.find(&rest))?;
    let name = strip_emphasis(rest.get(..delimiter.start())?);
    let address = strip_emphasis(rest.get(delimiter.end()..)?);

    if name.is_empty()
        || address.is_empty()
        || PLACEHOLDER_NAMES.contains(&name.to_lowercase().as_str())
    {
        return None;
    }

    Some((name, address))
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "")
        .trim_matches(|c: char| c == '*' || c == '_' || c == ':' || c.is_whitespace())
        .to_string()
}
