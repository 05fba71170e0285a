use std::sync::Mutex;

use llm::{
    chat::{ChatMessage, ChatProvider, ChatResponse, Tool},
    error::LLMError,
};
use trailday::TrailRecord;

#[macro_export]
macro_rules! assert_itineraries {
    (
        $(
            $test_name:ident : response => $response:expr, result => $result:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let model = StubLlmProvider::new($response);
                let context = trailday::generate::GenerateContext {
                    model: &model,
                    prompt_template: None,
                };
                let result = trailday::generate_itinerary(&sample_request(), &context)
                    .await
                    .expect("Expected successful generation.");

                assert_that(&result).is_equal_to($result.to_owned());
            }
        )+
    }
}

pub(crate) fn sample_request() -> trailday::ItineraryRequest {
    let mut trail = TrailRecord::new("Mount Tamalpais East Peak Loop", "Mill Valley, California");
    trail.length_km = Some(8.4);
    trail.difficulty = Some(trailday::Difficulty::Moderate);

    trailday::ItineraryRequest {
        trail,
        preferences: vec!["vegetarian lunch".to_string(), "coffee before the hike".to_string()],
    }
}

/// What the stub answers with.
pub(crate) enum Reply {
    Text(String),
    Fail(fn() -> LLMError),
}

pub(crate) struct StubLlmProvider {
    reply: Reply,
    /// Text of every message received, in order.
    pub(crate) received: Mutex<Vec<String>>,
}

impl StubLlmProvider {
    pub fn new(response_content: impl Into<String>) -> Self {
        StubLlmProvider {
            reply: Reply::Text(response_content.into()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> LLMError) -> Self {
        StubLlmProvider {
            reply: Reply::Fail(error),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl ChatProvider for StubLlmProvider {
    fn chat<'life0, 'life1, 'async_trait>(
        &'life0 self,
        messages: &'life1 [ChatMessage],
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            #[derive(Debug)]
            struct StringResponse(String);

            impl ChatResponse for StringResponse {
                fn text(&self) -> Option<String> {
                    Some(self.0.clone())
                }

                fn tool_calls(&self) -> Option<Vec<llm::ToolCall>> {
                    panic!()
                }

                fn thinking(&self) -> Option<String> {
                    None
                }

                fn usage(&self) -> Option<llm::chat::Usage> {
                    None
                }
            }

            impl std::fmt::Display for StringResponse {
                fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(formatter, "{}", self.0)
                }
            }

            self.received
                .lock()
                .expect("Poisoned stub lock")
                .extend(messages.iter().map(|message| message.content.clone()));

            match &self.reply {
                Reply::Text(text) => {
                    Ok(Box::new(StringResponse(text.clone())) as Box<dyn ChatResponse>)
                }
                Reply::Fail(error) => Err(error()),
            }
        })
    }

    fn chat_with_tools<'life0, 'life1, 'life2, 'async_trait>(
        &'life0 self,
        _messages: &'life1 [ChatMessage],
        _tools: Option<&'life2 [Tool]>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        'life2: 'async_trait,
        Self: 'async_trait,
    {
        panic!()
    }
}
