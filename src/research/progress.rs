use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Everything a research run reports to whoever started it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    Status {
        message: String,
    },
    Progress {
        percent: u8,
    },
    Queries {
        queries: Vec<String>,
    },
    Completed {
        report: String,
        markdown_filename: String,
        text_filename: String,
    },
    Failed {
        error: String,
    },
}

impl ResearchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ResearchEvent::Status { .. } => "status",
            ResearchEvent::Progress { .. } => "progress",
            ResearchEvent::Queries { .. } => "queries",
            ResearchEvent::Completed { .. } => "completed",
            ResearchEvent::Failed { .. } => "failed",
        }
    }
}

/// Sends progress events to an optional listener.
///
/// Percentages are clamped to 100 and never go backwards. Once the receiving side is gone,
/// events are dropped silently.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<ResearchEvent>>,
    last_percent: u8,
}

impl ProgressReporter {
    pub fn new(tx: UnboundedSender<ResearchEvent>) -> Self {
        Self {
            tx: Some(tx),
            last_percent: 0,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn status(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(status = %message, "research status");
        self.send(ResearchEvent::Status { message });
    }

    pub fn progress(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        self.send(ResearchEvent::Progress { percent });
    }

    pub fn queries(&mut self, queries: &[String]) {
        self.send(ResearchEvent::Queries {
            queries: queries.to_vec(),
        });
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    fn send(&self, event: ResearchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Progress after `completed` of `total` searches, spread across the 30..=70 band.
/// An empty query list counts as a finished search phase.
pub fn search_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 70;
    }
    let completed = completed.min(total);
    30 + (40 * completed / total) as u8
}
