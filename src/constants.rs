pub const MODEL_API_KEY_ENV_NAME: &str = "OPENAI_API_KEY";

pub const DEFAULT_SECRETS_PATH: &str = ".trailday/secrets.toml";

pub const DEFAULT_MODEL: &str = "openai://gpt-3.5-turbo";

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

pub const GEOCODER_USER_AGENT: &str = "trailday/0.1 (hike itinerary mapper)";

pub const PLACES_HEADING: &str = "Places Mentioned";

pub(crate) const THINK_STRIPPER: &str = r"<think>[\s\S]*</think>\s*";

pub(crate) const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub(crate) const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

pub const SYSTEM_PROMPT: &str = r#"You are an expert outdoor adventure planner and local guide.
You create day itineraries around hiking trails, with practical timing estimates,
local food and sightseeing recommendations, and safety considerations that fit the
hike's difficulty and duration. Structure your answer in clear sections for the
different parts of the day."#;

pub(crate) const DEFAULT_PROMPT_TEMPLATE: &str = r#"
Please create a comprehensive itinerary for a perfect day centered around this hike:

{trail}

Additional preferences:
{preferences}

Please include:
1. **Pre-Hike Preparation** (what to bring, when to start, parking info)
2. **Morning Activities** (breakfast, travel to trailhead, any pre-hike activities)
3. **Hike Details** (timing, what to expect, safety considerations)
4. **Post-Hike Activities** (lunch recommendations, relaxation, local attractions)
5. **Evening Plans** (dinner, accommodation if needed, sunset viewing spots)
6. **Practical Tips** (weather considerations, gear recommendations, local insights)

Make the itinerary realistic for the hike's difficulty and length, and suggest local
favorites near the trail."#;

pub(crate) const PLACES_INSTRUCTION: &str = r#"
End your answer with a section whose heading is exactly "Places Mentioned".
List every restaurant, viewpoint, trailhead, shop or other location you referred to,
one per line, numbered in the order they appear, using this exact format:
1. Place Name — Full street address, City, State
Do not add anything after that list."#;
