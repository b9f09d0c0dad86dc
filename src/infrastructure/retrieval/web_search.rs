//! Web search source over a SearxNG-style JSON API

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::evidence::EvidenceItem;
use crate::domain::retrieval::RetrievalSource;
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;

const DEFAULT_SOURCE_NAME: &str = "web";

/// Networked search source backed by a JSON search endpoint
///
/// Speaks the SearxNG query shape (`GET /search?q=...&format=json`) and
/// treats each returned result's title plus snippet as one evidence
/// item. Transport failures surface as errors and are absorbed by the
/// orchestrator into the iteration trace.
#[derive(Debug)]
pub struct WebSearchSource<C> {
    name: String,
    client: C,
    base_url: String,
}

impl<C> WebSearchSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    results: Vec<WebSearchHit>,
}

#[derive(Debug, Deserialize)]
struct WebSearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

impl WebSearchHit {
    fn into_text(self) -> (String, Option<f64>) {
        let text = if self.content.is_empty() {
            self.title
        } else if self.title.is_empty() {
            self.content
        } else {
            format!("{}: {}", self.title, self.content)
        };

        (text, self.score)
    }
}

#[async_trait]
impl<C: HttpClientTrait> RetrievalSource for WebSearchSource<C> {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, DomainError> {
        let url = self.search_url();
        let json = self
            .client
            .get_json(&url, Vec::new(), &[("q", query), ("format", "json")])
            .await
            .map_err(|e| DomainError::source_unavailable(&self.name, e.to_string()))?;

        let response: WebSearchResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::source_unavailable(&self.name, format!("Unexpected response shape: {}", e))
        })?;

        let results = response
            .results
            .into_iter()
            .take(limit)
            .enumerate()
            .filter_map(|(index, hit)| {
                let (text, score) = hit.into_text();
                if text.is_empty() {
                    return None;
                }
                Some(EvidenceItem::new(
                    text,
                    &self.name,
                    index + 1,
                    score.unwrap_or(0.0),
                ))
            })
            .collect();

        Ok(results)
    }
}
