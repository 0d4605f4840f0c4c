pub mod tavily;

use serde::{Deserialize, Serialize};

pub use tavily::TavilyClient;

/// A web search request. The options are fixed for every research run; see [`SearchRequest::new`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub topic: String,
    pub search_depth: String,
    pub chunks_per_source: u32,
    pub max_results: u32,
    pub time_range: String,
    pub days: u32,
    pub include_answer: bool,
    pub include_raw_content: bool,
    pub include_images: bool,
    pub include_image_descriptions: bool,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub country: String,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            topic: "general".to_string(),
            search_depth: "basic".to_string(),
            chunks_per_source: 3,
            max_results: 10,
            time_range: "year".to_string(),
            days: 90,
            include_answer: true,
            include_raw_content: true,
            include_images: false,
            include_image_descriptions: false,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            country: "united states".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, req: &SearchRequest) -> anyhow::Result<SearchResponse>;
    fn name(&self) -> &str;
}
