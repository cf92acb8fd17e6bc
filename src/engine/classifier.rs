use tracing::debug;

use crate::config::{ClassificationConfig, ClassificationRule};

/// Labels accounts (Production, Development, ...) from their names.
///
/// Rules are checked in order; a rule matches when the name contains any of
/// its include patterns and none of its exclude patterns.
#[derive(Debug, Clone)]
pub struct AccountClassifier {
    rules: Vec<ClassificationRule>,
    case_sensitive: bool,
    default_classification: String,
}

impl Default for AccountClassifier {
    fn default() -> Self {
        Self::new(&ClassificationConfig::default())
    }
}

impl AccountClassifier {
    #[must_use]
    pub fn new(config: &ClassificationConfig) -> Self {
        let rules = if config.case_sensitive {
            config.rules.clone()
        } else {
            config
                .rules
                .iter()
                .map(|rule| ClassificationRule {
                    name: rule.name.clone(),
                    include: rule.include.iter().map(|p| p.to_lowercase()).collect(),
                    exclude: rule.exclude.iter().map(|p| p.to_lowercase()).collect(),
                })
                .collect()
        };
        Self {
            rules,
            case_sensitive: config.case_sensitive,
            default_classification: config.default_classification.clone(),
        }
    }

    #[must_use]
    pub fn classify(&self, account_name: &str) -> &str {
        let name = if self.case_sensitive {
            account_name.to_string()
        } else {
            account_name.to_lowercase()
        };

        for rule in &self.rules {
            let included = rule.include.iter().any(|p| name.contains(p.as_str()));
            let excluded = rule.exclude.iter().any(|p| name.contains(p.as_str()));
            if included && !excluded {
                debug!(account = account_name, classification = %rule.name, "classified account");
                return &rule.name;
            }
        }

        &self.default_classification
    }

    /// Classification labels in rule order, followed by the default.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::with_capacity(self.rules.len() + 1);
        for rule in &self.rules {
            if !labels.contains(&rule.name.as_str()) {
                labels.push(&rule.name);
            }
        }
        if !labels.contains(&self.default_classification.as_str()) {
            labels.push(&self.default_classification);
        }
        labels
    }
}
