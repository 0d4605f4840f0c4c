use crate::error::ResearchError;
use crate::llm::{GenerateRequest, LlmClient};

pub const EMPTY_REPORT: &str = "No information found or error in response.";

const REPORT_SECTIONS: [&str; 14] = [
    "Executive Summary",
    "AI/LLM Projects and Initiatives",
    "Use Cases and Applications - Identify which use cases could make sense to run on premises in the data center or at the edge based on cost, performance, and security.",
    "Technology Partners and Vendors",
    "Expected Benefits and ROI",
    "Risks and Challenges",
    "Internal Automation Plans",
    "Governance and CSR Programs",
    "Technical Architecture and Infrastructure",
    "Security and Observability Solutions",
    "Current AI-Related Challenges",
    "Industry Comparison",
    "Key Personnel and Leadership",
    "Sources and References",
];

fn report_prompt(company_name: &str, search_data: &str) -> String {
    let sections = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {s}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "I have gathered the latest information about the company from various sources.\n\
        Please provide a detailed summary of the company's AI and LLM projects, including any recent developments, partnerships, or notable achievements.\n\
        If the company is not known for AI or LLM projects, please state that clearly but also provide information about any technology initiatives they may have.\n\n\
        Structure your response as a comprehensive markdown report with the following sections:\n\
        {sections}\n\n\
        Company Name: {company_name}\n\n\
        Search Data:\n\
        {search_data}\n\n\
        Please cite specific sources (URLs) when making claims and provide a comprehensive analysis.\n\
        If you cannot find information for a particular section, please state that clearly."
    )
}

#[tracing::instrument(
    name = "pipeline_stage analyze",
    skip(llm_client, user_tag, search_data),
    fields(
        pipeline.stage = "analyze",
        research.search_data_bytes = search_data.len(),
        research.report_bytes,
    )
)]
pub async fn analyze_company_data(
    llm_client: &LlmClient,
    model: &str,
    user_tag: &str,
    company_name: &str,
    search_data: &str,
) -> Result<String, ResearchError> {
    let resp = llm_client
        .generate(&GenerateRequest {
            model: model.to_string(),
            system: include_str!("../../data/report-system.txt").to_string(),
            prompt: report_prompt(company_name, search_data),
            user: Some(user_tag.to_string()),
            stage: "analyze".to_string(),
        })
        .await
        .map_err(|e| ResearchError::Analysis {
            company: company_name.to_string(),
            message: e.to_string(),
        })?;

    let report = resp
        .content
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| EMPTY_REPORT.to_string());

    tracing::Span::current().record("research.report_bytes", report.len());

    Ok(report)
}
