use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;

use sso_audit::config::AuditConfig;
use sso_audit::engine::{
    AccountClassifier, AwsDirectory, CachedDirectory, Collector, PolicyAnalyzer, ScoringTable,
};
use sso_audit::output::{write_reports, ReportFormat};

/// Command-line overrides for `sso-audit report`; `None` keeps the config value.
#[derive(Debug, Default)]
pub struct ReportOptions {
    pub config: Option<PathBuf>,
    pub profile: Option<String>,
    pub region: Option<String>,
    pub aws_profile: Option<String>,
    pub scoring: Option<PathBuf>,
    pub formats: Vec<ReportFormat>,
    pub output_dir: Option<PathBuf>,
    pub prefix: Option<String>,
}

pub fn load_config(path: Option<&Path>, profile: Option<&str>) -> Result<AuditConfig> {
    let config = match path {
        Some(path) => AuditConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AuditConfig::load().context("Failed to load configuration")?,
    };
    Ok(match profile {
        Some(name) => config.with_profile(name),
        None => config,
    })
}

pub fn load_scoring(path: Option<&Path>) -> Result<ScoringTable> {
    match path {
        Some(path) => ScoringTable::load(path)
            .with_context(|| format!("Failed to load scoring table from {}", path.display())),
        None => ScoringTable::builtin().context("Embedded scoring table is invalid"),
    }
}

fn apply_overrides(mut config: AuditConfig, options: ReportOptions) -> AuditConfig {
    if options.region.is_some() {
        config.aws.region = options.region;
    }
    if options.aws_profile.is_some() {
        config.aws.profile = options.aws_profile;
    }
    if options.scoring.is_some() {
        config.scoring.path = options.scoring;
    }
    if !options.formats.is_empty() {
        config.output.formats = options.formats;
    }
    if let Some(dir) = options.output_dir {
        config.output.directory = dir;
    }
    if let Some(prefix) = options.prefix {
        config.output.prefix = prefix;
    }
    config
}

pub fn run_report(options: ReportOptions) -> Result<()> {
    let config = load_config(options.config.as_deref(), options.profile.as_deref())?;
    let config = apply_overrides(config, options);
    config.validate().context("Invalid report settings")?;

    let table = load_scoring(config.scoring.path.as_deref())?;
    let classifier = AccountClassifier::new(&config.classification);

    let started = chrono::Local::now();
    let timer = Instant::now();
    println!(
        "{} Starting IAM Identity Center report at {}",
        "→".cyan().bold(),
        started.format("%Y-%m-%d %H:%M:%S")
    );

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let directory = AwsDirectory::connect(&config.aws)
            .await
            .context("Failed to connect to AWS IAM Identity Center")?;
        let directory = CachedDirectory::new(directory);
        let collector = Collector::new(&directory, PolicyAnalyzer::new(&table), &classifier);
        collector
            .collect()
            .await
            .context("Failed to collect IAM Identity Center data")
    })?;

    let written = write_reports(
        &report,
        &classifier,
        &config.output.directory,
        &config.output.prefix,
        &config.output.formats,
    )
    .with_context(|| {
        format!(
            "Failed to write reports to {}",
            config.output.directory.display()
        )
    })?;

    let finished = chrono::Local::now();
    println!(
        "\n{} Report complete: {} user(s), {} assignment(s)",
        "✓".green().bold(),
        report.user_count(),
        report.assignment_count()
    );
    for path in &written {
        println!("  {}", path.display());
    }
    println!("\nStarted:  {}", started.format("%Y-%m-%d %H:%M:%S"));
    println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    println!("Duration: {}", format_duration(timer.elapsed().as_secs()));

    Ok(())
}

fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(7), "7s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_overrides_win_over_config() {
        let config = apply_overrides(
            AuditConfig::default(),
            ReportOptions {
                region: Some("eu-west-1".to_string()),
                formats: vec![ReportFormat::Json],
                prefix: Some("audit".to_string()),
                ..ReportOptions::default()
            },
        );
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.output.formats, vec![ReportFormat::Json]);
        assert_eq!(config.output.prefix, "audit");
        assert_eq!(config.output.directory, PathBuf::from("."));
    }

    #[test]
    fn test_empty_prefix_override_is_rejected() {
        let config = apply_overrides(
            AuditConfig::default(),
            ReportOptions {
                prefix: Some(String::new()),
                ..ReportOptions::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.prefix"));
    }

    #[test]
    fn test_empty_format_list_keeps_config() {
        let config = apply_overrides(AuditConfig::default(), ReportOptions::default());
        assert_eq!(config.output.formats.len(), 4);
    }
}
