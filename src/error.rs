use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Failed to get access token: {status} - {body}")]
    Authentication { status: u16, body: String },

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("{0} is not set")]
    MissingConfig(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Failed to initialize API clients: {0}")]
    Initialization(#[source] Box<ResearchError>),

    #[error("Error generating search queries: {0}")]
    Generation(String),

    #[error("Error searching for query '{query}': {message}")]
    Search { query: String, message: String },

    #[error("Error analyzing information for {company}: {message}")]
    Analysis { company: String, message: String },

    #[error("Error during research: {0}")]
    Research(#[source] Box<ResearchError>),
}

impl ResearchError {
    /// The innermost error, skipping orchestrator and setup wrapping.
    pub fn root(&self) -> &ResearchError {
        match self {
            ResearchError::Research(inner) | ResearchError::Initialization(inner) => inner.root(),
            other => other,
        }
    }

    /// Failures of this service's own setup, as opposed to an upstream provider.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self.root(),
            ResearchError::MissingConfig(_) | ResearchError::ClientBuild(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Research(e) if e.is_misconfiguration() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Research(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Research(e) => {
                tracing::error!(error = %e, "Research failed");
                e.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
        };

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
