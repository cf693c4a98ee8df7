//! Client for the mood-suggestion endpoint.
//!
//! One `POST {base}/suggest` per finalized mood session, carrying the
//! summary `{mood, age}`. Failures are swallowed by the dispatcher (the
//! session is already over; there is nothing to retry for).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SUGGEST_URL: &str = "http://localhost:8080";

/// One recommended item. The endpoint mixes movies, songs and activities
/// in the same list shape, so every discriminating field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuggestionItem {
    pub title: Option<String>,
    pub activity: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub movie_link: Option<String>,
    pub song_link: Option<String>,
    pub activity_link: Option<String>,
}

impl SuggestionItem {
    /// Whatever names this item, preferring title over activity over artist.
    pub fn name(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.activity.as_deref())
            .or(self.artist.as_deref())
    }
}

/// Category name to recommended items.
pub type SuggestionSet = HashMap<String, Vec<SuggestionItem>>;

#[derive(Serialize)]
struct SuggestRequest {
    mood: String,
    age: f32,
}

#[derive(Deserialize)]
struct SuggestResponse {
    suggestions: SuggestionSet,
}

#[derive(Clone)]
pub struct SuggestionClient {
    client: Client,
    base_url: String,
}

impl SuggestionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create suggestion HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch_suggestions(&self, mood: &str, age: f32) -> Result<SuggestionSet> {
        let url = format!("{}/suggest", self.base_url);
        let request = SuggestRequest {
            mood: mood.to_string(),
            age,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("suggestion request to {url} failed"))?;

        if !response.status().is_success() {
            anyhow::bail!("suggestion server error: {}", response.status());
        }

        let body: SuggestResponse = response
            .json()
            .await
            .context("failed to decode suggestion response")?;
        Ok(body.suggestions)
    }
}
