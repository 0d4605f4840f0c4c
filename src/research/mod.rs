pub mod analyze;
pub mod orchestrator;
pub mod progress;
pub mod queries;
pub mod report;
pub mod retrieve;

pub use orchestrator::{ResearchClients, initialize_clients, research_company, run_research};
pub use progress::{ProgressReporter, ResearchEvent};
pub use report::{ReportFormat, report_filename};
