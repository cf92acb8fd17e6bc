use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AuditError, Result};
use crate::output::ReportFormat;

pub const CONFIG_FILE: &str = "sso-audit.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScoringConfig {
    /// Replaces the embedded scoring table when set.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_classification")]
    pub default_classification: String,
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClassificationRule {
    pub name: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileOverrides {
    #[serde(default)]
    pub output: Option<PartialOutputConfig>,
    #[serde(default)]
    pub aws: Option<PartialAwsConfig>,
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PartialOutputConfig {
    pub prefix: Option<String>,
    pub directory: Option<PathBuf>,
    pub formats: Option<Vec<ReportFormat>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PartialAwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

fn default_prefix() -> String {
    "iam_identity_center_report".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_formats() -> Vec<ReportFormat> {
    ReportFormat::ALL.to_vec()
}

fn default_classification() -> String {
    "Unclassified".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            directory: default_directory(),
            formats: default_formats(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            default_classification: default_classification(),
            rules: Vec::new(),
        }
    }
}

impl AuditConfig {
    pub fn load() -> Result<Self> {
        let config_path = Path::new(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)?;
        let config: AuditConfig =
            toml::from_str(&content).map_err(|e| AuditError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that also apply after command-line overrides.
    pub fn validate(&self) -> Result<()> {
        if self.output.prefix.trim().is_empty() {
            return Err(AuditError::Config("output.prefix must not be empty".to_string()));
        }
        for rule in &self.classification.rules {
            if rule.include.is_empty() {
                return Err(AuditError::Config(format!(
                    "classification rule '{}' has no include patterns",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_profile(mut self, profile_name: &str) -> Self {
        if let Some(overrides) = self.profiles.get(profile_name).cloned() {
            if let Some(output) = overrides.output {
                if let Some(v) = output.prefix {
                    self.output.prefix = v;
                }
                if let Some(v) = output.directory {
                    self.output.directory = v;
                }
                if let Some(v) = output.formats {
                    self.output.formats = v;
                }
            }
            if let Some(aws) = overrides.aws {
                if aws.region.is_some() {
                    self.aws.region = aws.region;
                }
                if aws.profile.is_some() {
                    self.aws.profile = aws.profile;
                }
            }
            if let Some(scoring) = overrides.scoring {
                if scoring.path.is_some() {
                    self.scoring.path = scoring.path;
                }
            }
        }
        self
    }
}
