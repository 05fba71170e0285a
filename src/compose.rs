//! The compose module writes the session's itinerary to a Markdown file.

use anyhow::Result;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;

use crate::storage::{Session, Storage};

/// Composes the output file from the trail and itinerary stored in the session.
///
/// # Arguments
///
/// * `db_path` - Path to the session database
/// * `output_path` - Path to the Markdown file to write
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if any operation fails
///
/// # Errors
///
/// Returns an error if:
/// * The session has no trail or no itinerary
/// * Database operations fail
/// * File operations fail
pub async fn compose(db_path: &str, output_path: &str) -> Result<()> {
    let storage = Storage::new(db_path)?;
    let session = storage.load_session()?;

    info!("Composing itinerary from {db_path} to {output_path}...");
    let markdown = render_markdown(&session)?;

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(output_path)?;
    file.write_all(markdown.as_bytes())?;

    info!("Composed itinerary to {output_path}");
    Ok(())
}

/// Renders the session as a plain Markdown document.
///
/// # Errors
///
/// Returns an error if the session has no trail or no itinerary.
pub fn render_markdown(session: &Session) -> Result<String> {
    let trail = session.require_trail()?;
    let itinerary = session.require_itinerary()?;

    let title = session
        .url
        .as_ref()
        .map(|url| format!("[{}]({url})", trail.name))
        .unwrap_or(trail.name.clone());

    let mut markdown = format!("# A Day Around {title}\n\n## The Hike\n{}\n\n", trail.to_bullets());

    if !session.preferences.is_empty() {
        markdown.push_str("## Preferences\n");
        for preference in &session.preferences {
            markdown.push_str(&format!("- {preference}\n"));
        }
        markdown.push('\n');
    }

    markdown.push_str(&format!("## Itinerary\n{}\n", itinerary.trim()));
    Ok(markdown)
}
