use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};

use sso_audit::engine::{allowed_actions, PolicyAnalyzer, RoleSecurityReport};

use super::report::load_scoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFormat {
    Json,
    Markdown,
    Csv,
}

impl FromStr for ScoreFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            _ => Err(format!(
                "Unknown format: {s}. Valid options: json, markdown, csv"
            )),
        }
    }
}

pub struct ScoreRequest<'a> {
    pub actions: &'a [String],
    pub policy: Option<&'a Path>,
    pub name: &'a str,
    pub arn: &'a str,
    pub scoring: Option<&'a Path>,
    pub format: ScoreFormat,
    pub ci: bool,
    pub output: Option<&'a Path>,
}

/// Offline security review of one role, from explicit actions and/or an IAM
/// policy document.
pub fn run_score(request: &ScoreRequest<'_>) -> Result<()> {
    let mut actions = request.actions.to_vec();
    if let Some(policy_path) = request.policy {
        let document = fs::read_to_string(policy_path)
            .with_context(|| format!("Failed to read policy {}", policy_path.display()))?;
        let granted = allowed_actions(&document)
            .with_context(|| format!("Invalid policy document {}", policy_path.display()))?;
        actions.extend(granted);
    }

    if actions.is_empty() {
        anyhow::bail!("No actions to score. Pass actions as arguments or use --policy <file>.");
    }

    let table = load_scoring(request.scoring)?;
    let analyzer = PolicyAnalyzer::new(&table);
    let report = RoleSecurityReport::build(&analyzer, request.name, request.arn, &actions);

    let rendered = match request.format {
        ScoreFormat::Json => report.to_json()?,
        ScoreFormat::Markdown => report.to_markdown(request.ci),
        ScoreFormat::Csv => report.to_csv()?,
    };

    match request.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Security report for {} written to {}", request.name, path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("MD".parse::<ScoreFormat>().unwrap(), ScoreFormat::Markdown);
        assert_eq!("json".parse::<ScoreFormat>().unwrap(), ScoreFormat::Json);
        assert!("xml".parse::<ScoreFormat>().is_err());
    }

    #[test]
    fn test_policy_file_is_scored() {
        let temp = tempfile::TempDir::new().unwrap();
        let policy = temp.path().join("policy.json");
        let out = temp.path().join("report.json");
        fs::write(
            &policy,
            r#"{"Statement":[{"Effect":"Allow","Action":["iam:CreateUser","s3:GetObject"]}]}"#,
        )
        .unwrap();

        run_score(&ScoreRequest {
            actions: &[],
            policy: Some(&policy),
            name: "Auditor",
            arn: "arn:aws:iam::123456789012:role/Auditor",
            scoring: None,
            format: ScoreFormat::Json,
            ci: false,
            output: Some(&out),
        })
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["role"]["name"], "Auditor");
        assert_eq!(value["total_actions"], 2);
    }

    #[test]
    fn test_no_actions_is_an_error() {
        let result = run_score(&ScoreRequest {
            actions: &[],
            policy: None,
            name: "Empty",
            arn: "",
            scoring: None,
            format: ScoreFormat::Json,
            ci: false,
            output: None,
        });
        assert!(result.is_err());
    }
}
