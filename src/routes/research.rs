use std::convert::Infallible;

use axum::{
    Json,
    extract::{Query, State},
    http::{
        HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::research::{
    ProgressReporter, ReportFormat, ResearchEvent, report_filename, research_company,
};

#[derive(Debug, Deserialize)]
pub struct ResearchBody {
    pub company_name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DownloadQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub company_name: String,
    pub report: String,
    pub markdown_filename: String,
    pub text_filename: String,
}

impl ResearchResponse {
    fn new(company_name: String, report: String) -> Self {
        let now = chrono::Local::now();
        Self {
            markdown_filename: report_filename(&company_name, &now, ReportFormat::Md),
            text_filename: report_filename(&company_name, &now, ReportFormat::Txt),
            company_name,
            report,
        }
    }
}

fn company_name(body: ResearchBody) -> AppResult<String> {
    let name = body.company_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("company_name must not be empty".into()));
    }
    Ok(name.to_string())
}

pub async fn create_research(
    State(state): State<AppState>,
    Json(body): Json<ResearchBody>,
) -> AppResult<Json<ResearchResponse>> {
    let company_name = company_name(body)?;

    let report =
        research_company(&state.config, &company_name, &mut ProgressReporter::silent()).await?;

    Ok(Json(ResearchResponse::new(company_name, report)))
}

/// Runs the research in a background task and streams its events. The run is not cancelled
/// when the client goes away; remaining events are dropped.
pub async fn stream_research(
    State(state): State<AppState>,
    Json(body): Json<ResearchBody>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let company_name = company_name(body)?;
    let (tx, rx) = mpsc::unbounded_channel();
    let config = state.config.clone();

    tokio::spawn(
        async move {
            let mut progress = ProgressReporter::new(tx.clone());
            let event = match research_company(&config, &company_name, &mut progress).await {
                Ok(report) => {
                    let response = ResearchResponse::new(company_name, report);
                    ResearchEvent::Completed {
                        report: response.report,
                        markdown_filename: response.markdown_filename,
                        text_filename: response.text_filename,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Research failed");
                    ResearchEvent::Failed {
                        error: e.to_string(),
                    }
                }
            };
            let _ = tx.send(event);
        }
        .in_current_span(),
    );

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse(&event)), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &ResearchEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().event(event.name()).data(data)
}

pub async fn download_research(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    Json(body): Json<ResearchBody>,
) -> AppResult<Response> {
    let company_name = company_name(body)?;

    let report =
        research_company(&state.config, &company_name, &mut ProgressReporter::silent()).await?;

    let filename = report_filename(&company_name, &chrono::Local::now(), query.format);
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(query.format.content_type())),
            (CONTENT_DISPOSITION, disposition),
        ],
        report,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name_trimmed() {
        let body = ResearchBody {
            company_name: "  Acme Corp \n".to_string(),
        };
        assert_eq!(company_name(body).unwrap(), "Acme Corp");
    }

    #[test]
    fn test_blank_company_name_rejected() {
        let body = ResearchBody {
            company_name: "   ".to_string(),
        };
        assert!(matches!(company_name(body), Err(AppError::Validation(_))));
    }
}
