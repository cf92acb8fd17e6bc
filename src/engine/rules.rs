use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::domain::RiskLevel;
use crate::error::{AuditError, Result};

const BUILTIN_TABLE: &str = include_str!("../../config/permission_scoring.yaml");

#[derive(Debug, Clone, Deserialize)]
struct RawTable {
    #[serde(default)]
    risk_levels: BTreeMap<RiskLevel, u32>,
    #[serde(default)]
    defaults: DefaultScores,
    #[serde(default)]
    weights: Weights,
    #[serde(default)]
    special_actions: HashMap<String, RawAction>,
    #[serde(default)]
    services: HashMap<String, RawService>,
    #[serde(default)]
    patterns: BTreeMap<RiskLevel, Vec<String>>,
    #[serde(default)]
    managed_policies: BTreeMap<String, RawManagedPolicy>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DefaultScores {
    pub read_score: u32,
    pub write_score: u32,
    pub admin_score: u32,
}

impl Default for DefaultScores {
    fn default() -> Self {
        Self {
            read_score: 2,
            write_score: 5,
            admin_score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Weights {
    #[serde(default = "default_service_weight")]
    pub service_specific: f64,
    #[serde(default = "default_pattern_weight")]
    pub pattern_based: f64,
}

fn default_service_weight() -> f64 {
    1.0
}

fn default_pattern_weight() -> f64 {
    0.7
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            service_specific: default_service_weight(),
            pattern_based: default_pattern_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawAction {
    #[serde(default = "default_action_risk")]
    risk_level: RiskLevel,
    #[serde(default)]
    description: Option<String>,
}

fn default_action_risk() -> RiskLevel {
    RiskLevel::Medium
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawService {
    #[serde(default)]
    actions: HashMap<String, RawAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawManagedPolicy {
    Names(Vec<String>),
    Scores {
        #[serde(default)]
        read_score: Option<u32>,
        #[serde(default)]
        write_score: Option<u32>,
        #[serde(default)]
        admin_score: Option<u32>,
    },
}

#[derive(Debug, Clone)]
struct ActionRule {
    risk: RiskLevel,
    description: String,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    risk: RiskLevel,
    regex: Regex,
}

/// Score of a single IAM action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionScore {
    pub read: u32,
    pub write: u32,
    pub admin: u32,
    /// `None` when the action matched nothing in the table.
    pub risk: Option<RiskLevel>,
    pub justification: String,
}

impl ActionScore {
    #[must_use]
    pub fn risk_name(&self) -> &'static str {
        self.risk.map_or("unknown", RiskLevel::key)
    }

    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        matches!(self.risk, Some(RiskLevel::Critical | RiskLevel::High))
    }
}

/// Static `(service, action) -> (read, write, admin, tier, justification)` table.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    risk_levels: BTreeMap<RiskLevel, u32>,
    defaults: DefaultScores,
    weights: Weights,
    special_actions: HashMap<String, ActionRule>,
    services: HashMap<String, HashMap<String, ActionRule>>,
    patterns: Vec<CompiledPattern>,
    managed_exact: HashMap<String, (u32, u32, u32)>,
    managed_lists: Vec<(RiskLevel, Vec<String>)>,
}

impl ScoringTable {
    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawTable = serde_yaml::from_str(content)?;
        Self::compile(raw)
    }

    fn compile(raw: RawTable) -> Result<Self> {
        let mut risk_levels = BTreeMap::from([
            (RiskLevel::Minimal, 1),
            (RiskLevel::Low, 3),
            (RiskLevel::Medium, 5),
            (RiskLevel::High, 8),
            (RiskLevel::Critical, 10),
        ]);
        risk_levels.extend(raw.risk_levels);

        let special_actions = raw
            .special_actions
            .into_iter()
            .map(|(action, rule)| {
                let description = rule
                    .description
                    .unwrap_or_else(|| format!("Special action {action}"));
                (
                    action,
                    ActionRule {
                        risk: rule.risk_level,
                        description,
                    },
                )
            })
            .collect();

        let services = raw
            .services
            .into_iter()
            .map(|(service, config)| {
                let actions = config
                    .actions
                    .into_iter()
                    .map(|(action, rule)| {
                        let description = rule
                            .description
                            .unwrap_or_else(|| format!("Action {action}"));
                        (
                            action.to_lowercase(),
                            ActionRule {
                                risk: rule.risk_level,
                                description,
                            },
                        )
                    })
                    .collect();
                (service.to_lowercase(), actions)
            })
            .collect();

        let mut patterns = Vec::new();
        for level in RiskLevel::DESCENDING {
            for pattern in raw.patterns.get(&level).into_iter().flatten() {
                let regex = Regex::new(&format!("(?i)^(?:{pattern})")).map_err(|e| {
                    AuditError::InvalidPattern {
                        level: level.key().to_string(),
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    }
                })?;
                patterns.push(CompiledPattern { risk: level, regex });
            }
        }

        let mut managed_exact = HashMap::new();
        let mut managed_lists = Vec::new();
        for (key, entry) in raw.managed_policies {
            match entry {
                RawManagedPolicy::Scores {
                    read_score,
                    write_score,
                    admin_score,
                } => {
                    managed_exact.insert(
                        key,
                        (
                            read_score.unwrap_or(raw.defaults.read_score),
                            write_score.unwrap_or(raw.defaults.write_score),
                            admin_score.unwrap_or(raw.defaults.admin_score),
                        ),
                    );
                }
                RawManagedPolicy::Names(names) => {
                    let level = parse_level(&key).ok_or_else(|| {
                        AuditError::Scoring(format!(
                            "managed policy list '{key}' is not a risk level"
                        ))
                    })?;
                    managed_lists.push((level, names));
                }
            }
        }
        managed_lists.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(Self {
            risk_levels,
            defaults: raw.defaults,
            weights: raw.weights,
            special_actions,
            services,
            patterns,
            managed_exact,
            managed_lists,
        })
    }

    #[must_use]
    pub fn risk_score(&self, level: RiskLevel) -> u32 {
        self.risk_levels.get(&level).copied().unwrap_or(5)
    }

    #[must_use]
    pub fn defaults(&self) -> DefaultScores {
        self.defaults
    }

    #[must_use]
    pub fn score_action(&self, action: &str) -> ActionScore {
        if let Some(rule) = self.special_actions.get(action) {
            return self.score_special(action, rule);
        }

        let Some((service, _)) = action.split_once(':') else {
            return self.score_by_pattern(action);
        };

        if let Some(actions) = self.services.get(&service.to_lowercase()) {
            if let Some(rule) = actions.get(&action.to_lowercase()) {
                return self.score_service_action(rule);
            }
        }

        self.score_by_pattern(action)
    }

    fn score_special(&self, action: &str, rule: &ActionRule) -> ActionScore {
        let base = self.risk_score(rule.risk);
        let justification = match action {
            "*" => "Full administrative access: Complete control over all AWS services and resources"
                .to_string(),
            "*:*" => "Wildcard access: Unrestricted permissions across all AWS services".to_string(),
            _ => format!("Special permission: {}", rule.description),
        };
        ActionScore {
            read: base,
            write: base,
            admin: base,
            risk: Some(rule.risk),
            justification,
        }
    }

    fn score_service_action(&self, rule: &ActionRule) -> ActionScore {
        let base = self.risk_score(rule.risk);
        let weighted = weigh(base, self.weights.service_specific);
        let mut justification = format!("{} (Risk: {})", rule.description, rule.risk);
        if matches!(rule.risk, RiskLevel::Low | RiskLevel::Minimal) {
            justification.push_str(". LOW: Read-only access - minimal security risk.");
        }
        shaped(rule.risk, weighted, justification)
    }

    fn score_by_pattern(&self, action: &str) -> ActionScore {
        for pattern in &self.patterns {
            if !pattern.regex.is_match(action) {
                continue;
            }
            let base = self.risk_score(pattern.risk);
            let weighted = weigh(base, self.weights.pattern_based);
            let suffix = match pattern.risk {
                RiskLevel::Critical => "CRITICAL: Pattern indicates high-risk administrative action.",
                RiskLevel::High => "HIGH: Pattern indicates significant write/modify permissions.",
                RiskLevel::Medium => "MEDIUM: Pattern indicates standard write operations.",
                RiskLevel::Low | RiskLevel::Minimal => "LOW: Pattern indicates read-only operations.",
            };
            let justification = format!(
                "Pattern-based scoring: Action '{action}' matches {} risk pattern. Score: {base} (weighted: {weighted}). {suffix}",
                pattern.risk
            );
            return shaped(pattern.risk, weighted, justification);
        }

        ActionScore {
            read: self.defaults.read_score,
            write: self.defaults.write_score,
            admin: self.defaults.admin_score,
            risk: None,
            justification: format!("Unknown action: '{action}' - using default risk assessment"),
        }
    }

    /// Scores of a managed policy by name: `(read, write, admin)`.
    #[must_use]
    pub fn score_managed_policy(&self, policy_name: &str) -> (u32, u32, u32) {
        if let Some(scores) = self.managed_exact.get(policy_name) {
            return *scores;
        }

        for (level, names) in &self.managed_lists {
            if names.iter().any(|name| policy_name.contains(name.as_str())) {
                let s = self.risk_score(*level);
                return match level {
                    RiskLevel::Critical => (s, s, s),
                    RiskLevel::High => (s, s, s / 2),
                    RiskLevel::Medium => (s, s, 0),
                    RiskLevel::Low | RiskLevel::Minimal => (s, 0, 0),
                };
            }
        }

        (
            self.defaults.read_score,
            self.defaults.write_score,
            self.defaults.admin_score,
        )
    }
}

fn parse_level(name: &str) -> Option<RiskLevel> {
    match name.to_lowercase().as_str() {
        "minimal" => Some(RiskLevel::Minimal),
        "low" => Some(RiskLevel::Low),
        "medium" => Some(RiskLevel::Medium),
        "high" => Some(RiskLevel::High),
        "critical" => Some(RiskLevel::Critical),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn weigh(base: u32, weight: f64) -> u32 {
    (f64::from(base) * weight).max(0.0) as u32
}

fn shaped(risk: RiskLevel, w: u32, justification: String) -> ActionScore {
    let (read, write, admin) = match risk {
        RiskLevel::Critical => (w, w, w),
        RiskLevel::High => (w, w, w / 2),
        RiskLevel::Medium => (w / 2, w, 0),
        RiskLevel::Low | RiskLevel::Minimal => (w, 0, 0),
    };
    ActionScore {
        read,
        write,
        admin,
        risk: Some(risk),
        justification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ScoringTable {
        ScoringTable::builtin().unwrap()
    }

    #[test]
    fn test_builtin_table_parses() {
        let table = table();
        assert_eq!(table.risk_score(RiskLevel::Critical), 10);
        assert_eq!(table.risk_score(RiskLevel::Low), 3);
    }

    #[test]
    fn test_wildcard_is_full_admin() {
        let score = table().score_action("*");
        assert_eq!((score.read, score.write, score.admin), (10, 10, 10));
        assert_eq!(score.risk, Some(RiskLevel::Critical));
        assert!(score.justification.contains("Full administrative access"));
        assert!(score.justification.contains("Complete control"));
    }

    #[test]
    fn test_service_wildcard_is_critical_pattern() {
        let score = table().score_action("s3:*");
        assert_eq!(score.risk, Some(RiskLevel::Critical));
        assert_eq!((score.read, score.write, score.admin), (7, 7, 7));
        assert!(score.justification.starts_with("Pattern-based scoring"));
    }

    #[test]
    fn test_known_actions_expected_tiers() {
        let table = table();
        let cases = [
            ("kms:Decrypt", RiskLevel::Low),
            ("iam:CreateRole", RiskLevel::Critical),
            ("s3:GetObject", RiskLevel::Low),
            ("ec2:AuthorizeSecurityGroupIngress", RiskLevel::Critical),
        ];
        for (action, expected) in cases {
            assert_eq!(table.score_action(action).risk, Some(expected), "{action}");
        }
    }

    #[test]
    fn test_service_lookup_is_case_insensitive() {
        let score = table().score_action("IAM:createrole");
        assert_eq!(score.risk, Some(RiskLevel::Critical));
    }

    #[test]
    fn test_score_shapes_per_tier() {
        let table = table();
        let critical = table.score_action("iam:CreateRole");
        assert_eq!((critical.read, critical.write, critical.admin), (10, 10, 10));
        assert!(critical.justification.contains("privilege escalation"));

        let high = table.score_action("iam:PassRole");
        assert_eq!((high.read, high.write, high.admin), (8, 8, 4));

        let medium = table.score_action("s3:PutObject");
        assert_eq!((medium.read, medium.write, medium.admin), (2, 5, 0));

        let low = table.score_action("s3:GetObject");
        assert_eq!((low.read, low.write, low.admin), (3, 0, 0));
        assert!(low.justification.contains("Read-only access"));
    }

    #[test]
    fn test_unknown_action_uses_defaults() {
        let score = table().score_action("unknownservice:UnknownAction");
        assert_eq!(score.risk, None);
        assert_eq!(score.risk_name(), "unknown");
        assert_eq!((score.read, score.write, score.admin), (2, 5, 0));
        assert!(score.justification.contains("Unknown action"));
        assert!(score.justification.contains("default"));
    }

    #[test]
    fn test_pattern_fallback_for_unlisted_action() {
        let score = table().score_action("dynamodb:DescribeTable");
        assert_eq!(score.risk, Some(RiskLevel::Low));
        assert_eq!((score.read, score.write, score.admin), (2, 0, 0));

        let score = table().score_action("dynamodb:DeleteTable");
        assert_eq!(score.risk, Some(RiskLevel::High));
    }

    #[test]
    fn test_managed_policy_exact_and_lists() {
        let table = table();
        assert_eq!(table.score_managed_policy("AdministratorAccess"), (10, 10, 10));
        assert_eq!(table.score_managed_policy("ReadOnlyAccess"), (8, 0, 0));
        assert_eq!(table.score_managed_policy("IAMFullAccess"), (10, 10, 10));
        assert_eq!(table.score_managed_policy("AmazonS3FullAccess"), (8, 8, 4));
        assert_eq!(table.score_managed_policy("AmazonEC2ReadOnlyAccess"), (3, 0, 0));
        assert_eq!(table.score_managed_policy("SomethingCustom"), (2, 5, 0));
    }

    #[test]
    fn test_custom_table_overrides() {
        let yaml = r"
risk_levels:
  critical: 9
services:
  s3:
    actions:
      s3:GetObject:
        risk_level: critical
        description: Sensitive bucket
";
        let table = ScoringTable::from_yaml(yaml).unwrap();
        let score = table.score_action("s3:GetObject");
        assert_eq!((score.read, score.write, score.admin), (9, 9, 9));
        assert_eq!(score.justification, "Sensitive bucket (Risk: CRITICAL)");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let yaml = r"
patterns:
  high:
    - '[unclosed'
";
        let err = ScoringTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, AuditError::InvalidPattern { .. }));
    }

    #[test]
    fn test_managed_list_under_unknown_key_is_rejected() {
        let yaml = r"
managed_policies:
  dangerous:
    - Something
";
        assert!(ScoringTable::from_yaml(yaml).is_err());
    }
}
