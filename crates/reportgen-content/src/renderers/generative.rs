use async_trait::async_trait;
use reportgen_common::{ReportConfig, ReportError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{renderer::ContentRenderer, types::ChapterPlan};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("REPORTGEN_LLM_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())?;

        let endpoint = std::env::var("REPORTGEN_LLM_ENDPOINT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = std::env::var("REPORTGEN_LLM_MODEL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Some(Self {
            endpoint,
            api_key,
            model,
        })
    }
}

/// Client for an OpenAI-compatible chat completions API.
pub struct GenerativeRenderer {
    client: reqwest::Client,
    completions_url: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl GenerativeRenderer {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: GeneratorConfig) -> Result<Self> {
        let completions_url = completions_url(&config.endpoint)?;
        Ok(Self {
            client,
            completions_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You write formal academic report content in clear British English.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.completions_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                ReportError::Upstream(format!(
                    "failed to reach text generation api {}: {err}",
                    self.completions_url
                ))
            })?;

        if !response.status().is_success() {
            return Err(ReportError::Upstream(format!(
                "text generation api {} returned status {}",
                self.completions_url,
                response.status()
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|err| {
            ReportError::Upstream(format!("malformed text generation response: {err}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ReportError::Upstream("text generation api returned no content".to_string()))
    }
}

#[async_trait]
impl ContentRenderer for GenerativeRenderer {
    async fn plan_chapters(&self, config: &ReportConfig) -> Result<Vec<ChapterPlan>> {
        let reply = self.complete(&plan_prompt(config)).await?;
        let plan = parse_chapter_plan(&reply)?;
        debug!(chapters = plan.len(), model = %self.model, "received chapter plan");
        Ok(plan)
    }

    async fn write_section(
        &self,
        config: &ReportConfig,
        chapter: &str,
        section: &str,
    ) -> Result<String> {
        self.complete(&section_prompt(config, chapter, section)).await
    }
}

fn completions_url(endpoint: &str) -> Result<Url> {
    let mut base = endpoint.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join("chat/completions"))
        .map_err(|err| ReportError::InvalidField {
            field: "REPORTGEN_LLM_ENDPOINT".to_string(),
            reason: err.to_string(),
        })
}

fn plan_prompt(config: &ReportConfig) -> String {
    let chapters = config
        .chapter_count
        .map(|count| format!("exactly {count}"))
        .unwrap_or_else(|| "between 5 and 7".to_string());
    format!(
        "Plan the chapters of a {report} titled \"{title}\" for the course {course}. \
         Project description: {description}. Produce {chapters} chapters, each with 2 to 4 sections. \
         Reply with JSON only, as an array of objects with a \"title\" string and a \"sections\" array of strings.",
        report = config.report_type.display_name(),
        title = config.project_title,
        course = config.course,
        description = config.project_description,
    )
}

fn section_prompt(config: &ReportConfig, chapter: &str, section: &str) -> String {
    format!(
        "Write the section \"{section}\" of the chapter \"{chapter}\" for a {report} titled \"{title}\" \
         ({description}). The author is a student of {course} at {institution}. \
         Write two to three paragraphs of plain prose without headings or markdown.",
        report = config.report_type.display_name(),
        title = config.project_title,
        description = config.project_description,
        course = config.course,
        institution = config.institution,
    )
}

pub(crate) fn parse_chapter_plan(reply: &str) -> Result<Vec<ChapterPlan>> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(ReportError::Upstream(
                "chapter plan reply does not contain a json array".to_string(),
            ));
        }
    };

    let plan: Vec<ChapterPlan> = serde_json::from_str(json)
        .map_err(|err| ReportError::Upstream(format!("chapter plan reply is not valid: {err}")))?;

    Ok(plan
        .into_iter()
        .map(|chapter| ChapterPlan {
            title: chapter.title.trim().to_string(),
            sections: chapter
                .sections
                .into_iter()
                .map(|section| section.trim().to_string())
                .filter(|section| !section.is_empty())
                .collect(),
        })
        .filter(|chapter| !chapter.title.is_empty())
        .collect())
}
