use chrono::{DateTime, TimeZone};

/// Download formats for a finished report. Both carry the same markdown text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    #[serde(alias = "markdown")]
    Md,
    #[serde(alias = "text")]
    Txt,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Md => "md",
            ReportFormat::Txt => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Md => "text/markdown; charset=utf-8",
            ReportFormat::Txt => "text/plain; charset=utf-8",
        }
    }
}

/// `{company}_AI_Research_Report_{YYYYmmdd_HHMMSS}.{ext}` with every character of the company
/// name that is not an ASCII letter or digit replaced by `_`, so the name is header-safe.
pub fn report_filename<Tz: TimeZone>(
    company_name: &str,
    timestamp: &DateTime<Tz>,
    format: ReportFormat,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let safe: String = company_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{safe}_AI_Research_Report_{}.{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}
