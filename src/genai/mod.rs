//! Generative-language client and the wellness prompts built for it.
//!
//! The endpoint is an opaque text-completion API: send `{"prompt": ...}`,
//! read `candidates[0].output`. Everything interesting lives in the
//! prompts, which reproduce the dietary and mental-state flows.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateText";

/// Substituted when the API answers with no candidates.
pub const NO_DATA_MESSAGE: &str = "No data received.";

#[derive(Serialize)]
struct GenerateRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct Candidate {
    output: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

pub struct GenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GenAiClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create generative HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// One completion round trip. An empty candidate list is not an
    /// error; it yields [`NO_DATA_MESSAGE`] like the source system.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let request = GenerateRequest {
            prompt: prompt.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("generative request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("generative server error: {}", response.status());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("failed to decode generative response")?;

        Ok(body
            .candidates
            .into_iter()
            .next()
            .map(|candidate| candidate.output)
            .unwrap_or_else(|| NO_DATA_MESSAGE.to_string()))
    }
}

/// Inputs for the full-day diet plan prompt.
#[derive(Debug, Clone)]
pub struct DietQuery {
    pub meal_type: String,
    pub meal_kind: String,
    pub health_condition: String,
    pub protein_g: u32,
    pub vitamins: String,
    pub carbs_g: u32,
}

pub fn diet_plan_prompt(query: &DietQuery) -> String {
    format!(
        "You are a professional nutritionist. Suggest a meal plan for a person with {}.\n\
         - Meal Type: {}\n\
         - Solid/Liquid: {}\n\
         - Protein Needs: {}g\n\
         - Vitamins Needed: {}\n\
         - Carbohydrates Needed: {}g\n\
         Suggest a full-day diet plan with breakfast, lunch, dinner, and snacks.",
        query.health_condition,
        query.meal_type,
        query.meal_kind,
        query.protein_g,
        query.vitamins,
        query.carbs_g
    )
}

pub fn recipe_prompt(ingredients: &str, health_condition: &str) -> String {
    format!(
        "Suggest healthy recipes using these ingredients: {ingredients}.\n\
         The recipes should be suitable for someone with {health_condition}."
    )
}

/// Quiz summary prompt: questions and answers are paired by index.
pub fn mental_state_prompt(questions: &[String], answers: &[String]) -> String {
    let formatted_questions: Vec<String> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect();
    let formatted_answers: Vec<String> = answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}. {a}", i + 1))
        .collect();

    format!(
        "You are a psychologist analyzing responses to a mental health quiz. \
         Based on the following questions and answers, provide a brief summary \
         of the person's mental state:\n\n\
         Questions:\n{}\n\n\
         Answers:\n{}\n\n\
         Summary of mental state:",
        formatted_questions.join("\n"),
        formatted_answers.join("\n")
    )
}
