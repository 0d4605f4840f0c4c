//! Company AI research service.
//!
//! A research run turns a company name into a markdown report about the company's AI and LLM
//! initiatives: a chat model proposes web search queries, every query is searched in turn, and
//! a second chat call synthesizes the collected results. [`research::research_company`] is the
//! entry point; [`routes`] exposes it over HTTP.

pub mod auth;
pub mod config;
pub mod error;
pub mod llm;
pub mod research;
pub mod routes;
pub mod search;
pub mod telemetry;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, ResearchError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}
