use tracing::{debug, info, warn};

use crate::domain::{AccessLevel, PermissionScores};
use crate::engine::policy::allowed_actions;
use crate::engine::rules::ScoringTable;

const BREAKDOWN_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAnalysis {
    pub access_level: AccessLevel,
    pub scores: PermissionScores,
    pub high_risk_actions: Vec<String>,
}

/// Turns managed policy names and inline policy documents into an access
/// level and aggregate scores, using a [`ScoringTable`].
#[derive(Debug, Clone, Copy)]
pub struct PolicyAnalyzer<'a> {
    table: &'a ScoringTable,
}

impl<'a> PolicyAnalyzer<'a> {
    #[must_use]
    pub fn new(table: &'a ScoringTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &'a ScoringTable {
        self.table
    }

    /// Aggregate a list of actions: each score is the maximum over the actions.
    #[must_use]
    pub fn analyze_actions(&self, actions: &[String]) -> ActionAnalysis {
        let mut scores = PermissionScores::default();
        let mut high_risk_actions = Vec::new();
        let mut has_admin = false;
        let mut has_write = false;
        let mut breakdown = Vec::with_capacity(actions.len().min(BREAKDOWN_LIMIT));

        for action in actions {
            let score = self.table.score_action(action);
            scores.absorb(score.read, score.write, score.admin);
            has_admin |= score.admin > 0;
            has_write |= score.write > 0;
            if score.is_high_risk() {
                high_risk_actions.push(action.clone());
            }
            if breakdown.len() < BREAKDOWN_LIMIT {
                breakdown.push(format!("{action}: {}", score.justification));
            }
        }

        let access_level = if has_admin || scores.admin_score >= 5 {
            AccessLevel::FullAdmin
        } else if has_write || scores.write_score >= 5 {
            AccessLevel::ReadWrite
        } else if scores.read_score > 0 {
            AccessLevel::ReadOnly
        } else {
            AccessLevel::Unknown
        };

        let mut justification = format!(
            "Analysis of {} actions. Access level: {}. High-risk actions: {}. Detailed breakdown: {}",
            actions.len(),
            access_level,
            high_risk_actions.len(),
            breakdown.join("; ")
        );
        if actions.len() > BREAKDOWN_LIMIT {
            justification.push_str(&format!(
                " ... and {} more actions.",
                actions.len() - BREAKDOWN_LIMIT
            ));
        }
        scores.justification = justification;

        ActionAnalysis {
            access_level,
            scores,
            high_risk_actions,
        }
    }

    /// Analyze a permission set from its managed policy names and its
    /// (possibly empty) inline policy document.
    #[must_use]
    pub fn analyze_permission_set(
        &self,
        managed_policies: &[String],
        inline_policy: Option<&str>,
    ) -> (AccessLevel, PermissionScores) {
        let mut scores = PermissionScores::default();
        let mut scored_managed = Vec::new();

        for name in managed_policies {
            let (read, write, admin) = self.table.score_managed_policy(name);
            debug!(policy = %name, read, write, admin, "scored managed policy");
            scores.absorb(read, write, admin);
            if read > 0 || write > 0 || admin > 0 {
                scored_managed.push(name.as_str());
            }
        }

        let mut inline_analyzed = false;
        if let Some(document) = inline_policy.filter(|d| !d.trim().is_empty()) {
            match allowed_actions(document) {
                Ok(actions) if !actions.is_empty() => {
                    let analysis = self.analyze_actions(&actions);
                    scores.absorb(
                        analysis.scores.read_score,
                        analysis.scores.write_score,
                        analysis.scores.admin_score,
                    );
                    if !analysis.high_risk_actions.is_empty() {
                        info!(actions = ?analysis.high_risk_actions, "high-risk inline actions");
                    }
                    inline_analyzed = true;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "could not parse inline policy"),
            }
        }

        let access_level = if scores.admin_score >= 5 {
            AccessLevel::FullAdmin
        } else if scores.write_score >= 5 {
            AccessLevel::ReadWrite
        } else if scores.read_score > 0 {
            AccessLevel::ReadOnly
        } else {
            AccessLevel::Unknown
        };

        scores.justification = summarize(
            managed_policies,
            &scored_managed,
            inline_analyzed,
            &scores,
            access_level,
        );

        (access_level, scores)
    }
}

fn summarize(
    managed: &[String],
    scored_managed: &[&str],
    inline_analyzed: bool,
    scores: &PermissionScores,
    access_level: AccessLevel,
) -> String {
    if managed.is_empty() && !inline_analyzed {
        return format!("Access level: {access_level} - No detailed analysis available");
    }

    if managed.iter().any(|n| n.contains("AdministratorAccess")) {
        let mut text =
            "Full administrative access via AdministratorAccess managed policy".to_string();
        if inline_analyzed {
            text.push_str(" plus additional inline permissions");
        }
        return text;
    }

    if managed.iter().any(|n| n.contains("ReadOnlyAccess")) {
        if scores.write_score == 0 && scores.admin_score == 0 {
            return "Read-only access via ReadOnlyAccess managed policy".to_string();
        }
        let mut sources: Vec<String> = scored_managed
            .iter()
            .filter(|n| !n.contains("ReadOnlyAccess"))
            .map(|n| format!("'{n}' managed policy"))
            .collect();
        if inline_analyzed {
            sources.push("inline policy".to_string());
        }
        if sources.is_empty() {
            return "Read-only access via ReadOnlyAccess managed policy, plus additional write/admin permissions"
                .to_string();
        }
        return format!(
            "Read-only access via ReadOnlyAccess managed policy, plus write/admin permissions from {}",
            sources.join(", ")
        );
    }

    // A lone policy is only named when it contributed nothing to the scores.
    if managed.len() == 1 && scored_managed.is_empty() && !inline_analyzed {
        return format!("Permissions granted via {} managed policy", managed[0]);
    }

    match (scored_managed.len(), inline_analyzed) {
        (0, true) => "Custom permissions via inline policy".to_string(),
        (0, false) => "Mixed permission sources".to_string(),
        (m, true) => {
            format!("Combined permissions from {m} managed policy(ies) and custom inline policy")
        }
        (m, false) => format!("Permissions from {m} managed policy(ies)"),
    }
}
