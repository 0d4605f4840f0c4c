use std::sync::LazyLock;

use regex::Regex;

use crate::error::ResearchError;
use crate::llm::{GenerateRequest, LlmClient};

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// Research aspects the query model is asked to cover.
const ASPECTS: [&str; 13] = [
    "What AI or LLM projects have been announced or are under development?",
    "What are the use cases associated with these projects (concrete examples of applications)?",
    "Who are the partners involved (technology suppliers, research labs, startups, etc.)?",
    "What are the main benefits expected (performance, time savings, cost reductions, etc.)?",
    "What risks have been identified concerning the use of LLMs (ethical issues, security, reliability, confidentiality, etc.)?",
    "What internal tasks or activities does the company plan to automate using LLMs?",
    "What returns on investment (ROI) are expected or have already been measured?",
    "What governance and CSR programs are in place around AI?",
    "What IT, GPU, server, network, storage and software architectures are being used? Name the publishers and companies involved.",
    "What security and observability architectures and solutions have been implemented as part of these AI projects? Name the publishers and companies involved.",
    "What are the main AI-related challenges the company is currently facing?",
    "What are other companies in the same industry doing with AI? Provide a comparative analysis.",
    "Who are the technical managers or members of the management team involved, and what is their role in the company? Give the names and their roles.",
];

/// Pulls every double-quoted substring out of free-form model output, in order of appearance.
/// Duplicates are kept and text without quotes yields an empty list.
pub fn extract_queries(text: &str) -> Vec<String> {
    QUOTED
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

fn query_prompt(company_name: &str) -> String {
    let mut prompt = format!("Detail the following aspects of the company {company_name}:\n");
    for (i, aspect) in ASPECTS.iter().enumerate() {
        prompt.push_str(&format!("{}. {aspect}\n", i + 1));
    }
    prompt
}

#[tracing::instrument(
    name = "pipeline_stage generate_queries",
    skip(llm_client, user_tag),
    fields(pipeline.stage = "generate_queries", research.queries_count)
)]
pub async fn generate_search_queries(
    llm_client: &LlmClient,
    model: &str,
    user_tag: &str,
    company_name: &str,
) -> Result<Vec<String>, ResearchError> {
    let resp = llm_client
        .generate(&GenerateRequest {
            model: model.to_string(),
            system: include_str!("../../data/query-system.txt").to_string(),
            prompt: query_prompt(company_name),
            user: Some(user_tag.to_string()),
            stage: "generate_queries".to_string(),
        })
        .await
        .map_err(|e| ResearchError::Generation(e.to_string()))?;

    let Some(content) = resp.content else {
        return Err(ResearchError::Generation(format!(
            "model returned no message content (finish reason: {})",
            empty_as_unknown(&resp.finish_reason)
        )));
    };

    let queries = extract_queries(&content);
    tracing::Span::current().record("research.queries_count", queries.len());

    Ok(queries)
}

fn empty_as_unknown(s: &str) -> &str {
    if s.is_empty() { "unknown" } else { s }
}
