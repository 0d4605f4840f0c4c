use opentelemetry::KeyValue;

use crate::error::ResearchError;
use crate::search::{SearchProvider, SearchRequest, SearchResult};
use crate::telemetry::metrics::SEARCH_RESULTS;

pub const RESULT_SEPARATOR: &str = "\n---\n";

/// Renders results as `Title / Content / URL` blocks joined by a separator line.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Title: {}\nContent: {}\nURL: {}\n", r.title, r.content, r.url))
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// Prefixes a formatted result block with the query that produced it.
pub fn search_bundle(query: &str, formatted: &str) -> String {
    format!("=== Search Query: {query} ===\n{formatted}")
}

#[tracing::instrument(
    name = "pipeline_stage search",
    skip(search),
    fields(pipeline.stage = "search", search.results_count)
)]
pub async fn search_web(search: &dyn SearchProvider, query: &str) -> Result<String, ResearchError> {
    let response = search
        .search(&SearchRequest::new(query))
        .await
        .map_err(|e| ResearchError::Search {
            query: query.to_string(),
            message: e.to_string(),
        })?;

    tracing::Span::current().record("search.results_count", response.results.len());
    SEARCH_RESULTS.record(
        response.results.len() as f64,
        &[KeyValue::new("search.provider", search.name().to_string())],
    );

    Ok(format_results(&response.results))
}
