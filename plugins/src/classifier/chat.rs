use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use prospector_core::api::{
    parse_company_info, parse_emails, parse_verdict, render_content_prompt, render_template,
    truncate_chars, AiConfig, Classification, ClassifierConfig, ClassifyError, CompanyInfo,
    ConnectionCheck, CrawledSite, EmailInfo, InfoExtractor, SiteClassifier,
};
use prospector_core::classify::prompt::{DEFAULT_COMPANY_PROMPT, DEFAULT_EMAIL_PROMPT};

const ERROR_PREVIEW_LIMIT: usize = 300;
const CONNECTION_PROMPT: &str = "Connection test. Reply with \"OK\".";

/// Sampling knobs for one call.
struct CallParams {
    timeout_ms: u64,
    temperature: f32,
    max_tokens: u32,
    json_mode: bool,
}

/// OpenAI-compatible chat-completion client. Endpoint, model and key come from the
/// caller's `AiConfig` on every call.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    cfg: ClassifierConfig,
}

impl ChatCompletionClient {
    pub fn new(cfg: ClassifierConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, cfg })
    }

    fn classify_params(&self) -> CallParams {
        CallParams {
            timeout_ms: self.cfg.timeout_ms,
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
            json_mode: true,
        }
    }

    fn extraction_params(&self) -> CallParams {
        CallParams {
            timeout_ms: self.cfg.extraction_timeout_ms,
            temperature: self.cfg.extraction_temperature,
            max_tokens: self.cfg.extraction_max_tokens,
            json_mode: true,
        }
    }

    async fn complete(
        &self,
        config: &AiConfig,
        system: Option<&str>,
        user: &str,
        params: CallParams,
    ) -> Result<String, ClassifyError> {
        validate(config)?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": user}));

        let mut body = json!({
            "model": config.model_name,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        if params.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        tracing::debug!(
            target: "prospector.classify",
            url = %config.api_url,
            model = %config.model_name,
            prompt_chars = user.chars().count(),
            "chat.in"
        );

        let resp = self
            .http
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .timeout(Duration::from_millis(params.timeout_ms))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest(e, params.timeout_ms))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| map_reqwest(e, params.timeout_ms))?;

        if !status.is_success() {
            return Err(ClassifyError::from_status(
                status.as_u16(),
                truncate_chars(text.trim(), ERROR_PREVIEW_LIMIT),
            ));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ClassifyError::Parse(format!("response body: {e}")))?;
        let content = message_content(&value).ok_or(ClassifyError::EmptyResponse)?;

        tracing::debug!(target: "prospector.classify", status = %status, reply_chars = content.chars().count(), "chat.out");
        Ok(content)
    }
}

fn validate(config: &AiConfig) -> Result<(), ClassifyError> {
    if !config.has_api_key() {
        return Err(ClassifyError::MissingConfig("apiKey".into()));
    }
    if config.api_url.trim().is_empty() {
        return Err(ClassifyError::MissingConfig("apiUrl".into()));
    }
    if config.model_name.trim().is_empty() {
        return Err(ClassifyError::MissingConfig("modelName".into()));
    }
    Ok(())
}

fn map_reqwest(err: reqwest::Error, timeout_ms: u64) -> ClassifyError {
    if err.is_timeout() {
        ClassifyError::Timeout { timeout_ms }
    } else {
        ClassifyError::Transport(err.to_string())
    }
}

/// `choices[0].message.content`, or the `output.text` shape some gateways use.
fn message_content(value: &Value) -> Option<String> {
    value
        .pointer("/choices/0/message/content")
        .or_else(|| value.pointer("/output/text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn has_content(site: &CrawledSite) -> bool {
    !(site.content.trim().is_empty() && site.title.trim().is_empty())
}

#[async_trait]
impl SiteClassifier for ChatCompletionClient {
    fn name(&self) -> &str {
        "chat_completion"
    }

    async fn classify(
        &self,
        config: &AiConfig,
        site: &CrawledSite,
    ) -> Result<Classification, ClassifyError> {
        if !has_content(site) {
            return Err(ClassifyError::MissingConfig("crawled content".into()));
        }
        let prompt = render_template(&config.prompt_template, site);
        let raw = self
            .complete(
                config,
                Some(&self.cfg.system_prompt),
                &prompt,
                self.classify_params(),
            )
            .await?;
        let verdict = parse_verdict(&raw, self.cfg.reason_char_limit);
        tracing::debug!(target: "prospector.classify", url = %site.url, result = %verdict.result, "classified");
        Ok(verdict)
    }

    async fn check_connection(&self, config: &AiConfig) -> Result<ConnectionCheck, ClassifyError> {
        let started = Instant::now();
        let reply = self
            .complete(
                config,
                None,
                CONNECTION_PROMPT,
                CallParams {
                    timeout_ms: self.cfg.extraction_timeout_ms,
                    temperature: 0.0,
                    max_tokens: 50,
                    json_mode: false,
                },
            )
            .await?;
        Ok(ConnectionCheck {
            model: config.model_name.clone(),
            response_time_ms: started.elapsed().as_millis() as u64,
            reply: truncate_chars(&reply, 100),
        })
    }
}

#[async_trait]
impl InfoExtractor for ChatCompletionClient {
    async fn extract_company_info(
        &self,
        config: &AiConfig,
        content: &str,
    ) -> Result<CompanyInfo, ClassifyError> {
        if content.trim().is_empty() {
            return Err(ClassifyError::MissingConfig("content".into()));
        }
        let prompt = render_content_prompt(
            config.company_name_prompt.as_deref(),
            DEFAULT_COMPANY_PROMPT,
            content,
        );
        let raw = self
            .complete(config, None, &prompt, self.extraction_params())
            .await?;
        parse_company_info(&raw)
    }

    async fn extract_emails(
        &self,
        config: &AiConfig,
        content: &str,
    ) -> Result<Vec<EmailInfo>, ClassifyError> {
        if content.trim().is_empty() {
            return Err(ClassifyError::MissingConfig("content".into()));
        }
        let prompt = render_content_prompt(
            config.email_crawl_prompt.as_deref(),
            DEFAULT_EMAIL_PROMPT,
            content,
        );
        let raw = self
            .complete(config, None, &prompt, self.extraction_params())
            .await?;
        parse_emails(&raw)
    }
}
