use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::header::HeaderMap;
use reqwest::Client;
use safepoint_core::{QuotaUsage, ReplyContext};
use tracing::warn;

use crate::prompt::{context_messages, fallback_reply};
use crate::{ComposedReply, ReplyComposer};

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Chat-completions client for the text-generation provider. A single
/// shot per request; whatever goes wrong degrades to the deterministic
/// fallback instead of erroring.
#[derive(Debug, Clone)]
pub struct ReplySynthesizer {
    client: Client,
    config: GenerationConfig,
}

impl ReplySynthesizer {
    pub fn new(client: Client, config: GenerationConfig) -> Self {
        Self { client, config }
    }

    async fn generate(&self, context: &ReplyContext) -> Result<(Option<String>, Option<QuotaUsage>)> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": context_messages(context),
            "max_tokens": 256,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(self.config.api_key.as_str())
            .json(&payload)
            .send()
            .await?;

        let quota = quota_from_headers(response.headers());

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("generation returned status {}", status.as_u16());
        }

        let body: serde_json::Value = response.json().await?;
        Ok((extract_generation_text(&body), quota))
    }
}

impl ReplyComposer for ReplySynthesizer {
    async fn compose(&self, context: &ReplyContext) -> ComposedReply {
        match self.generate(context).await {
            Ok((Some(text), quota)) => ComposedReply {
                text,
                fallback_used: false,
                quota,
            },
            Ok((None, quota)) => {
                warn!("generation response had no usable message");
                ComposedReply {
                    text: fallback_reply(context),
                    fallback_used: true,
                    quota,
                }
            }
            Err(error) => {
                warn!(error = %error, "generation call failed");
                ComposedReply {
                    text: fallback_reply(context),
                    fallback_used: true,
                    quota: None,
                }
            }
        }
    }
}

/// Pulls `choices[0].message.content` out of a chat-completions payload.
/// Malformed shapes and blank content yield `None`, never a panic.
pub fn extract_generation_text(payload: &serde_json::Value) -> Option<String> {
    payload
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads the provider's `x-ratelimit-*` headers. All three must parse for
/// a usable snapshot; reset is reported as seconds-until-reset.
pub fn quota_from_headers(headers: &HeaderMap) -> Option<QuotaUsage> {
    let limit = header_number(headers, "x-ratelimit-limit-requests")?;
    let remaining = header_number(headers, "x-ratelimit-remaining-requests")?;
    let reset_seconds = headers
        .get("x-ratelimit-reset-requests")?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;

    Some(QuotaUsage {
        limit,
        remaining,
        reset_at: Utc::now() + Duration::milliseconds((reset_seconds * 1_000.0) as i64),
    })
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.trim().parse::<u32>().ok()
}
