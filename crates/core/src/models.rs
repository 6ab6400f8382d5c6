use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The safety-relevant place kinds the assistant can search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hospital,
    Pharmacy,
    PoliceStation,
}

impl Category {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "hospital" => Some(Self::Hospital),
            "pharmacy" => Some(Self::Pharmacy),
            "police_station" | "police station" | "police" => Some(Self::PoliceStation),
            _ => None,
        }
    }

    /// Human-readable label used in prompts and replies.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Pharmacy => "pharmacy",
            Self::PoliceStation => "police station",
        }
    }

    /// Category code sent to the place-search provider.
    pub fn search_code(self) -> &'static str {
        match self {
            Self::Hospital => "healthcare.hospital",
            Self::Pharmacy => "healthcare.pharmacy",
            Self::PoliceStation => "service.police",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One incoming user query. Nothing here outlives the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistQuery {
    #[serde(default)]
    pub message: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AssistQuery {
    /// Both coordinates present, as the informational branch requires.
    pub fn location(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceResult {
    pub name: String,
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub duration_seconds: f64,
    pub duration_minutes: u64,
    pub steps: Vec<String>,
}

/// Facts handed to the synthesizer. Route degradation is the optional
/// field, never a sentinel threaded through control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReplyContext {
    Conversational { intent: Intent },
    Informational {
        category: Category,
        place: PlaceResult,
        route: Option<RouteResult>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Help,
    Place(Category),
    Unclassified,
}

/// Quota state reported by an upstream provider on one response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Per-user quota bookkeeping. The only state that survives a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub user_id: String,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn exhausted_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining == 0 && self.reset_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistReply {
    pub text: String,
}
