mod analysis;
mod excel;
mod html;
mod json;
mod table;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::engine::{AccessReport, AccountClassifier};
use crate::error::Result;

pub use analysis::{account_analysis_csv, risk_analysis_csv, user_analysis_csv};
pub use excel::{excel_workbook, SHEET_NAME};
pub use html::format_html;
pub use json::format_json;
pub use table::{format_csv, row_values, COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    #[serde(alias = "excel")]
    Xlsx,
    Html,
    Json,
}

impl ReportFormat {
    pub const ALL: [Self; 4] = [Self::Csv, Self::Xlsx, Self::Html, Self::Json];

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Unknown format: {s}. Valid options: csv, xlsx, html, json"
            )),
        }
    }
}

/// Write the requested report files plus the three analysis CSVs into
/// `directory`, returning the paths written.
pub fn write_reports(
    report: &AccessReport,
    classifier: &AccountClassifier,
    directory: &Path,
    prefix: &str,
    formats: &[ReportFormat],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(directory)?;
    let mut written = Vec::new();

    for format in formats {
        let path = directory.join(format!("{prefix}.{}", format.extension()));
        match format {
            ReportFormat::Csv => fs::write(&path, format_csv(&report.records)?)?,
            ReportFormat::Xlsx => excel_workbook(&report.records)?.save(&path)?,
            ReportFormat::Html => fs::write(&path, format_html(&report.records))?,
            ReportFormat::Json => fs::write(&path, format_json(&report.summaries)?)?,
        }
        info!(path = %path.display(), "report written");
        written.push(path);
    }

    let analyses = [
        ("user_analysis", user_analysis_csv(&report.records, classifier)?),
        ("account_analysis", account_analysis_csv(&report.records)?),
        ("risk_analysis", risk_analysis_csv(&report.records, classifier)?),
    ];
    for (suffix, content) in analyses {
        let path = directory.join(format!("{prefix}_{suffix}.csv"));
        fs::write(&path, content)?;
        info!(path = %path.display(), "analysis written");
        written.push(path);
    }

    Ok(written)
}
