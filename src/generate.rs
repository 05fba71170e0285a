//! The generate module asks an LLM for a day itinerary built around the
//! session's trail and stores the answer in the session database.

use anyhow::Result;
use llm::builder::LLMBuilder;
use llm::chat::{ChatMessage, ChatMessageBuilder, ChatProvider};
use llm::error::LLMError;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{DEFAULT_PROMPT_TEMPLATE, PLACES_INSTRUCTION, THINK_STRIPPER};
use crate::error::GenerateError;
use crate::storage::Storage;
use crate::trail::TrailRecord;

static THINK_STRIPPER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(THINK_STRIPPER).expect("Failed to compile THINK_STRIPPER regex"));

/// Trail plus the user's free-text wishes, in the order they were given.
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryRequest {
    pub trail: TrailRecord,
    pub preferences: Vec<String>,
}

/// Shared data for one generation call.
pub struct GenerateContext<'a> {
    /// LLM model to ask
    pub model: &'a dyn ChatProvider,
    /// Prompt template to use instead of the built-in one
    pub prompt_template: Option<&'a str>,
}

/// Generates an itinerary for the session's trail and stores it in the database.
///
/// # Arguments
///
/// * `db_path` - Path to the session database
/// * `llm_builder` - Configured builder for the chat model
/// * `prompt_template` - Optional user prompt template (`{trail}`, `{preferences}`)
/// * `preferences` - Free-text preferences; the stored ones are reused when empty
///
/// # Returns
///
/// Returns the generated itinerary text
///
/// # Errors
///
/// Returns an error if:
/// * The session has no trail yet
/// * The LLM model fails to build
/// * The generation request fails
/// * Database operations fail
pub async fn generate(
    db_path: &str,
    llm_builder: LLMBuilder,
    prompt_template: Option<&str>,
    preferences: Vec<String>,
) -> Result<String> {
    let storage = Storage::new(db_path)?;
    let mut session = storage.load_session()?;

    let preferences = if preferences.is_empty() {
        session.preferences.clone()
    } else {
        preferences
    };
    let request = ItineraryRequest {
        trail: session.require_trail()?.clone(),
        preferences,
    };

    let model = llm_builder
        .build()
        .map_err(|e| GenerateError::Build(e.to_string()))?;
    let ctx = GenerateContext {
        model: model.as_ref(),
        prompt_template,
    };

    info!("Generating itinerary around {}...", request.trail.name);
    let itinerary = generate_itinerary(&request, &ctx).await?;

    session.set_itinerary(request.preferences, itinerary.clone());
    storage.save_session(&session)?;
    info!("Stored itinerary ({} characters)", itinerary.len());

    Ok(itinerary)
}

/// Builds the user prompt for `request`.
///
/// The instruction to finish with a "Places Mentioned" section is always
/// appended, whatever template is used.
#[must_use]
pub fn build_prompt(request: &ItineraryRequest, prompt_template: Option<&str>) -> String {
    let template = prompt_template.unwrap_or(DEFAULT_PROMPT_TEMPLATE);
    let preferences = if request.preferences.is_empty() {
        "None specified".to_string()
    } else {
        request
            .preferences
            .iter()
            .map(|preference| format!("- {}", preference.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut prompt = template
        .replace("{trail}", &format!("Hike Information:\n{}", request.trail.to_bullets()))
        .replace("{preferences}", &preferences);
    prompt.push('\n');
    prompt.push_str(PLACES_INSTRUCTION);
    prompt
}

/// Sends one generation request and returns the itinerary text.
///
/// No retry is attempted; the caller decides what to do with a failure.
///
/// # Errors
///
/// Returns [`GenerateError::Auth`], [`GenerateError::RateLimit`],
/// [`GenerateError::Network`] or [`GenerateError::Provider`] depending on the
/// failure, and [`GenerateError::EmptyResponse`] if the model answers with
/// nothing.
pub async fn generate_itinerary(
    request: &ItineraryRequest,
    ctx: &GenerateContext<'_>,
) -> Result<String, GenerateError> {
    let template = ctx.prompt_template;
    let mut messages: Vec<ChatMessageBuilder> =
        vec![ChatMessage::user().content(build_prompt(request, template))];

    if template.is_some_and(|template| !template.contains("{trail}")) {
        messages.push(
            ChatMessage::user().content(format!("Hike Information:\n{}", request.trail.to_bullets())),
        );
    }

    let messages: Vec<ChatMessage> = messages
        .into_iter()
        .map(|message| message.build())
        .collect();

    debug!("Sending {} messages to the model", messages.len());
    let response = ctx
        .model
        .chat(&messages)
        .await
        .map_err(classify_llm_error)?
        .to_string();

    let itinerary = THINK_STRIPPER_REGEX
        .replace_all(&response, "")
        .trim()
        .to_owned();

    if itinerary.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }

    Ok(itinerary)
}

/// Maps an LLM client error to the generation error taxonomy.
#[must_use]
pub fn classify_llm_error(error: LLMError) -> GenerateError {
    let message = error.to_string();
    let lower = message.to_lowercase();

    let is_auth = matches!(error, LLMError::AuthError(_))
        || ["401", "unauthorized", "invalid api key", "incorrect api key"]
            .iter()
            .any(|needle| lower.contains(needle));
    let is_rate_limit = ["429", "rate limit", "too many requests", "quota"]
        .iter()
        .any(|needle| lower.contains(needle));
    let is_network = matches!(error, LLMError::HttpError(_))
        || ["timed out", "timeout", "connection", "dns"]
            .iter()
            .any(|needle| lower.contains(needle));

    if is_auth {
        GenerateError::Auth(message)
    } else if is_rate_limit {
        GenerateError::RateLimit(message)
    } else if is_network {
        GenerateError::Network(message)
    } else {
        GenerateError::Provider(message)
    }
}
