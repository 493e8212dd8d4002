//! Keyword extraction requests.
//!
//! A [`KeywordRequester`] owns the completion backend, the model identifier
//! and the prompt template chosen at start-up. It turns article text into the
//! model's raw keyword answer; splitting that answer is left to
//! [`Keywords::parse`](crate::models::Keywords::parse).

use crate::api::{ChatMessage, CompletionError, CompletionService};
use crate::prompts::PromptTemplate;
use crate::utils::truncate_for_log;
use std::time::Instant;
use tracing::{error, info, instrument};

#[derive(Debug)]
pub struct KeywordRequester<C> {
    service: C,
    model: String,
    template: PromptTemplate,
}

impl<C: CompletionService> KeywordRequester<C> {
    pub fn new(service: C, model: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            service,
            model: model.into(),
            template,
        }
    }

    pub fn template(&self) -> PromptTemplate {
        self.template
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Message list that [`request_keywords`](Self::request_keywords) would send.
    pub fn messages(&self, article_text: &str) -> Vec<ChatMessage> {
        self.template.messages(article_text)
    }

    /// Ask the model for the keywords of `article_text`.
    ///
    /// Returns the raw answer. Failures are not retried.
    #[instrument(level = "info", skip_all, fields(template = %self.template, model = %self.model))]
    pub async fn request_keywords(&self, article_text: &str) -> Result<String, CompletionError> {
        let t0 = Instant::now();
        let messages = self.messages(article_text);
        let res = self.service.complete(&self.model, &messages).await;
        let dt = t0.elapsed();

        match &res {
            Ok(raw) => info!(
                elapsed_ms = dt.as_millis(),
                answer = %truncate_for_log(raw, 200),
                "Keywords received"
            ),
            Err(e) => error!(elapsed_ms = dt.as_millis(), error = %e, "Keyword request failed"),
        }
        res
    }
}
