use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;

use crate::auth::TokenProvider;
use crate::config::Config;
use crate::error::ResearchError;
use crate::llm::azure::AzureOpenAIProvider;
use crate::llm::{LlmClient, app_key_tag};
use crate::search::{SearchProvider, TavilyClient};
use crate::telemetry::metrics::{RESEARCH_DURATION, RESEARCH_QUERIES};

use super::progress::{ProgressReporter, search_progress};
use super::{analyze, queries, retrieve};

/// Everything one research run talks to. Built fresh for every run.
pub struct ResearchClients {
    pub llm: LlmClient,
    pub search: Arc<dyn SearchProvider>,
    pub model: String,
    pub app_key: String,
}

fn setup_failed(cause: ResearchError) -> ResearchError {
    ResearchError::Initialization(Box::new(cause))
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ResearchError> {
    value
        .as_deref()
        .ok_or_else(|| setup_failed(ResearchError::MissingConfig(name)))
}

/// Acquires a new access token and builds the chat and search clients.
#[tracing::instrument(name = "pipeline_stage initialize", skip(config))]
pub async fn initialize_clients(config: &Config) -> Result<ResearchClients, ResearchError> {
    let token_url = required(&config.token_url, "OAUTH_TOKEN_URL")?;
    let client_id = required(&config.client_id, "CLIENT_ID")?;
    let client_secret = required(&config.client_secret, "CLIENT_SECRET")?;
    let app_key = required(&config.app_key, "APP_KEY")?;
    let tavily_api_key = required(&config.tavily_api_key, "TAVILY_API_KEY")?;
    let azure_endpoint = required(&config.azure_endpoint, "AZURE_OPENAI_ENDPOINT")?;

    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| setup_failed(ResearchError::ClientBuild(e.to_string())))?;

    let access_token = TokenProvider::new(http.clone(), token_url, client_id, client_secret)
        .get_access_token()
        .await
        .map_err(setup_failed)?;

    let provider = AzureOpenAIProvider::new(
        azure_endpoint,
        &config.azure_api_version,
        &config.chat_model,
        &access_token,
    );

    tracing::info!(
        chat_endpoint = %azure_endpoint,
        search_endpoint = %config.tavily_base_url,
        model = %config.chat_model,
        "research clients initialized"
    );

    Ok(ResearchClients {
        llm: LlmClient::new(Arc::new(provider), azure_endpoint),
        search: Arc::new(TavilyClient::new(
            http,
            tavily_api_key,
            &config.tavily_base_url,
        )),
        model: config.chat_model.clone(),
        app_key: app_key.to_string(),
    })
}

/// Complete research workflow for one company: new token and clients, then the pipeline.
pub async fn research_company(
    config: &Config,
    company_name: &str,
    progress: &mut ProgressReporter,
) -> Result<String, ResearchError> {
    let clients = initialize_clients(config).await?;
    run_research(&clients, company_name, progress, config.search_delay).await
}

/// Query generation, one search per query, aggregation and synthesis, in that order.
/// The first failure aborts the run; nothing partial is returned.
#[tracing::instrument(
    name = "pipeline research",
    skip(clients, progress, search_delay),
    fields(research.queries_count, research.duration_ms)
)]
pub async fn run_research(
    clients: &ResearchClients,
    company_name: &str,
    progress: &mut ProgressReporter,
    search_delay: Duration,
) -> Result<String, ResearchError> {
    let start = Instant::now();
    let result = run_stages(clients, company_name, progress, search_delay).await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    RESEARCH_DURATION.record(
        start.elapsed().as_secs_f64(),
        &[KeyValue::new("research.outcome", outcome)],
    );
    tracing::Span::current().record("research.duration_ms", start.elapsed().as_millis() as u64);

    result.map_err(|e| ResearchError::Research(Box::new(e)))
}

async fn run_stages(
    clients: &ResearchClients,
    company_name: &str,
    progress: &mut ProgressReporter,
    search_delay: Duration,
) -> Result<String, ResearchError> {
    let user_tag = app_key_tag(&clients.app_key);

    progress.status("Generating search queries...");
    progress.progress(10);
    let search_queries =
        queries::generate_search_queries(&clients.llm, &clients.model, &user_tag, company_name)
            .await?;
    progress.queries(&search_queries);

    tracing::Span::current().record("research.queries_count", search_queries.len());
    RESEARCH_QUERIES.record(search_queries.len() as f64, &[]);

    progress.status("Collecting search data...");
    progress.progress(30);

    let total = search_queries.len();
    let mut all_search_data = Vec::with_capacity(total);
    for (i, query) in search_queries.iter().enumerate() {
        let preview: String = query.chars().take(50).collect();
        progress.status(format!("Searching ({}/{total}): {preview}...", i + 1));

        let results = retrieve::search_web(clients.search.as_ref(), query).await?;
        all_search_data.push(retrieve::search_bundle(query, &results));

        progress.progress(search_progress(i + 1, total));
        tokio::time::sleep(search_delay).await;
    }

    let combined_search_data = all_search_data.join("\n\n");
    progress.progress(70);

    progress.status("Analyzing collected data...");
    progress.progress(80);
    let report = analyze::analyze_company_data(
        &clients.llm,
        &clients.model,
        &user_tag,
        company_name,
        &combined_search_data,
    )
    .await?;

    progress.progress(100);
    progress.status("Research completed!");

    Ok(report)
}
