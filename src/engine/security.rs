use std::fmt::Write;

use serde::{Serialize, Serializer};

use crate::domain::{AccessLevel, PermissionScores, RiskLevel};
use crate::engine::analyzer::PolicyAnalyzer;
use crate::error::Result;

/// Report tiers, most severe first. `None` holds actions missing from the table.
const TIERS: [Option<RiskLevel>; 5] = [
    Some(RiskLevel::Critical),
    Some(RiskLevel::High),
    Some(RiskLevel::Medium),
    Some(RiskLevel::Low),
    None,
];

#[derive(Debug, Clone, Serialize)]
pub struct ActionDetail {
    pub action: String,
    #[serde(serialize_with = "serialize_tier")]
    pub risk_level: Option<RiskLevel>,
    pub read_score: u32,
    pub write_score: u32,
    pub admin_score: u32,
    pub justification: String,
    pub is_high_risk: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub name: String,
    pub arn: String,
    pub access_level: AccessLevel,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RiskDistribution {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl RiskDistribution {
    fn slot(&mut self, tier: Option<RiskLevel>) -> &mut usize {
        match tier {
            Some(RiskLevel::Critical) => &mut self.critical,
            Some(RiskLevel::High) => &mut self.high,
            Some(RiskLevel::Medium) => &mut self.medium,
            Some(RiskLevel::Low | RiskLevel::Minimal) => &mut self.low,
            None => &mut self.unknown,
        }
    }

    fn count(&self, tier: Option<RiskLevel>) -> usize {
        match tier {
            Some(RiskLevel::Critical) => self.critical,
            Some(RiskLevel::High) => self.high,
            Some(RiskLevel::Medium) => self.medium,
            Some(RiskLevel::Low | RiskLevel::Minimal) => self.low,
            None => self.unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComplianceIssue {
    pub regulation: &'static str,
    pub issue: &'static str,
    pub description: &'static str,
    pub affected_actions: Vec<String>,
    pub severity: RiskLevel,
}

/// Security review of a single role built from the actions it grants.
#[derive(Debug, Clone, Serialize)]
pub struct RoleSecurityReport {
    pub role: RoleInfo,
    pub scores: PermissionScores,
    pub total_actions: usize,
    pub high_risk_actions: usize,
    pub risk_distribution: RiskDistribution,
    pub actions: Vec<ActionDetail>,
    pub recommendations: Vec<String>,
    pub compliance_issues: Vec<ComplianceIssue>,
    pub overall_risk: RiskLevel,
    pub generated_at: String,
}

impl RoleSecurityReport {
    #[must_use]
    pub fn build(
        analyzer: &PolicyAnalyzer<'_>,
        name: &str,
        arn: &str,
        actions: &[String],
    ) -> Self {
        let analysis = analyzer.analyze_actions(actions);

        let details: Vec<ActionDetail> = actions
            .iter()
            .map(|action| {
                let score = analyzer.table().score_action(action);
                ActionDetail {
                    action: action.clone(),
                    risk_level: score.risk,
                    read_score: score.read,
                    write_score: score.write,
                    admin_score: score.admin,
                    is_high_risk: analysis.high_risk_actions.contains(action),
                    justification: score.justification,
                }
            })
            .collect();

        let mut distribution = RiskDistribution::default();
        for detail in &details {
            *distribution.slot(detail.risk_level) += 1;
        }

        let recommendations = recommendations(&details, &distribution, analysis.access_level);
        let compliance_issues = compliance_issues(&details);
        let overall_risk = overall_risk(&analysis.scores, analysis.high_risk_actions.len());

        Self {
            role: RoleInfo {
                name: name.to_string(),
                arn: arn.to_string(),
                access_level: analysis.access_level,
                risk_level: analysis.scores.risk_level(),
            },
            total_actions: actions.len(),
            high_risk_actions: analysis.high_risk_actions.len(),
            scores: analysis.scores,
            risk_distribution: distribution,
            actions: details,
            recommendations,
            compliance_issues,
            overall_risk,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn actions_in(&self, tier: Option<RiskLevel>) -> impl Iterator<Item = &ActionDetail> + '_ {
        self.actions.iter().filter(move |a| tier_of(a) == tier)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(vec![]);

        wtr.write_record(["AWS Security Analysis Report"])?;
        wtr.write_record(["Generated:", self.generated_at.as_str()])?;
        wtr.write_record([""])?;

        wtr.write_record(["Role Information"])?;
        wtr.write_record(["Name", self.role.name.as_str()])?;
        wtr.write_record(["ARN", self.role.arn.as_str()])?;
        wtr.write_record(["Access Level", self.role.access_level.label()])?;
        wtr.write_record(["Risk Level", self.role.risk_level.as_str()])?;
        wtr.write_record([""])?;

        wtr.write_record(["Security Scores"])?;
        wtr.write_record(["Read Score", self.scores.read_score.to_string().as_str()])?;
        wtr.write_record(["Write Score", self.scores.write_score.to_string().as_str()])?;
        wtr.write_record(["Admin Score", self.scores.admin_score.to_string().as_str()])?;
        wtr.write_record(["Justification", self.scores.justification.as_str()])?;
        wtr.write_record([""])?;

        wtr.write_record(["Action Analysis"])?;
        wtr.write_record([
            "Action",
            "Risk Level",
            "Read Score",
            "Write Score",
            "Admin Score",
            "Justification",
        ])?;
        for tier in TIERS {
            for detail in self.actions_in(tier) {
                wtr.write_record([
                    detail.action.as_str(),
                    tier_label(detail.risk_level),
                    detail.read_score.to_string().as_str(),
                    detail.write_score.to_string().as_str(),
                    detail.admin_score.to_string().as_str(),
                    detail.justification.as_str(),
                ])?;
            }
        }
        wtr.write_record([""])?;

        wtr.write_record(["Security Recommendations"])?;
        for rec in &self.recommendations {
            wtr.write_record([rec.as_str()])?;
        }
        wtr.write_record([""])?;

        wtr.write_record(["Compliance Issues"])?;
        wtr.write_record(["Regulation", "Issue", "Description", "Severity", "Affected Actions"])?;
        for issue in &self.compliance_issues {
            wtr.write_record([
                issue.regulation,
                issue.issue,
                issue.description,
                issue.severity.as_str(),
                issue.affected_actions.join("; ").as_str(),
            ])?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Markdown rendering; `ci_mode` swaps emoji badges for plain tags.
    #[must_use]
    pub fn to_markdown(&self, ci_mode: bool) -> String {
        let badge = |tier: Option<RiskLevel>| -> String {
            if ci_mode {
                return format!("[{}]", tier_label(tier));
            }
            match tier {
                Some(RiskLevel::Critical) => "🔴",
                Some(RiskLevel::High) => "🟠",
                Some(RiskLevel::Medium) => "🟡",
                Some(RiskLevel::Low | RiskLevel::Minimal) => "🟢",
                None => "⚪",
            }
            .to_string()
        };

        let mut md = String::from("# AWS Security Analysis Report\n\n");
        let _ = writeln!(md, "**Generated:** {}  ", self.generated_at);
        md.push_str("**Analysis Method:** Configuration-driven scoring\n\n");

        md.push_str("## Role Summary\n\n");
        md.push_str("| Property | Value |\n|----------|-------|\n");
        let _ = writeln!(md, "| **Name** | `{}` |", self.role.name);
        let _ = writeln!(md, "| **ARN** | `{}` |", self.role.arn);
        let _ = writeln!(md, "| **Access Level** | **{}** |", self.role.access_level);
        let _ = writeln!(md, "| **Risk Level** | **{}** |\n", self.role.risk_level);

        md.push_str("## Security Scores\n\n");
        md.push_str("| Score Type | Value | Description |\n|------------|-------|-------------|\n");
        let _ = writeln!(
            md,
            "| **Read Score** | {} | Read-only access capabilities |",
            self.scores.read_score
        );
        let _ = writeln!(
            md,
            "| **Write Score** | {} | Write/modify capabilities |",
            self.scores.write_score
        );
        let _ = writeln!(
            md,
            "| **Admin Score** | {} | Administrative privileges |\n",
            self.scores.admin_score
        );
        let _ = writeln!(md, "**Justification:** {}\n", self.scores.justification);

        md.push_str("## Risk Analysis\n\n");
        let _ = writeln!(md, "**Total Actions:** {}  ", self.total_actions);
        let _ = writeln!(md, "**High-Risk Actions:** {}\n", self.high_risk_actions);
        md.push_str("| Risk Level | Count | Actions |\n|------------|-------|---------|\n");
        for tier in TIERS {
            let count = self.risk_distribution.count(tier);
            if count == 0 {
                continue;
            }
            let names: Vec<String> = self
                .actions_in(tier)
                .take(3)
                .map(|a| format!("`{}`", a.action))
                .collect();
            let mut list = names.join(", ");
            if count > 3 {
                let _ = write!(list, " ... and {} more", count - 3);
            }
            let _ = writeln!(
                md,
                "| {} **{}** | {count} | {list} |",
                badge(tier),
                tier_label(tier)
            );
        }
        md.push('\n');

        md.push_str("## Detailed Action Analysis\n\n");
        for tier in TIERS.into_iter().take(4) {
            let mut actions = self.actions_in(tier).peekable();
            if actions.peek().is_none() {
                continue;
            }
            let _ = writeln!(md, "### {} {} Risk Actions\n", badge(tier), tier_label(tier));
            for detail in actions {
                let _ = writeln!(md, "**`{}`**  ", detail.action);
                let _ = writeln!(
                    md,
                    "*Scores:* Read={}, Write={}, Admin={}  ",
                    detail.read_score, detail.write_score, detail.admin_score
                );
                let _ = writeln!(md, "*Justification:* {}\n", detail.justification);
            }
        }

        md.push_str("## Security Recommendations\n\n");
        if self.recommendations.is_empty() {
            md.push_str("No specific recommendations.\n\n");
        }
        for (i, rec) in self.recommendations.iter().enumerate() {
            let _ = writeln!(md, "{}. {rec}\n", i + 1);
        }

        if !self.compliance_issues.is_empty() {
            md.push_str("## Compliance Issues\n\n");
            for issue in &self.compliance_issues {
                let _ = writeln!(
                    md,
                    "### {} {}: {}\n",
                    badge(Some(issue.severity)),
                    issue.regulation,
                    issue.issue
                );
                let _ = writeln!(md, "**Description:** {}\n", issue.description);
                let affected: Vec<String> = issue
                    .affected_actions
                    .iter()
                    .map(|a| format!("`{a}`"))
                    .collect();
                let _ = writeln!(md, "**Affected Actions:** {}\n", affected.join(", "));
            }
        }

        let _ = writeln!(
            md,
            "## {} Overall Risk Assessment: **{}**\n",
            badge(Some(self.overall_risk)),
            self.overall_risk
        );
        md.push_str(match self.overall_risk {
            RiskLevel::Critical => "**IMMEDIATE ACTION REQUIRED** - This role poses significant security risks and requires urgent review.\n",
            RiskLevel::High => "**HIGH PRIORITY REVIEW** - This role should be reviewed and potentially restricted.\n",
            RiskLevel::Medium => "**STANDARD REVIEW** - This role should be included in regular access reviews.\n",
            RiskLevel::Low | RiskLevel::Minimal => "**LOW RISK** - This role appears to have appropriate permissions for its function.\n",
        });

        md
    }
}

fn tier_of(detail: &ActionDetail) -> Option<RiskLevel> {
    match detail.risk_level {
        Some(RiskLevel::Minimal) => Some(RiskLevel::Low),
        other => other,
    }
}

fn tier_label(tier: Option<RiskLevel>) -> &'static str {
    tier.map_or("UNKNOWN", RiskLevel::as_str)
}

fn serialize_tier<S: Serializer>(
    tier: &Option<RiskLevel>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(tier.map_or("unknown", RiskLevel::key))
}

fn recommendations(
    details: &[ActionDetail],
    distribution: &RiskDistribution,
    access_level: AccessLevel,
) -> Vec<String> {
    let mut recs = Vec::new();

    if distribution.critical > 0 {
        recs.push(format!(
            "URGENT: {} critical risk actions detected. Immediate review required for privilege escalation and security bypass capabilities.",
            distribution.critical
        ));
    }
    if distribution.high > 3 {
        recs.push(format!(
            "HIGH PRIORITY: {} high-risk actions present. Consider implementing additional approval workflows for these permissions.",
            distribution.high
        ));
    }
    if access_level == AccessLevel::FullAdmin {
        recs.push(
            "ADMIN ACCESS: Full administrative privileges detected. Ensure this role is assigned only to authorized personnel with MFA enabled."
                .to_string(),
        );
    }
    if distribution.unknown > 0 {
        recs.push(format!(
            "REVIEW NEEDED: {} actions not in scoring database. Manual review recommended to assess security implications.",
            distribution.unknown
        ));
    }

    let critical: Vec<&str> = details
        .iter()
        .filter(|d| d.risk_level == Some(RiskLevel::Critical))
        .map(|d| d.action.as_str())
        .collect();
    if critical.iter().any(|a| a.contains("iam:")) {
        recs.push(
            "IAM RISK: IAM privilege escalation capabilities detected. Implement strict approval process and regular access reviews."
                .to_string(),
        );
    }
    if critical.iter().any(|a| a.contains("cloudtrail:")) {
        recs.push(
            "AUDIT RISK: CloudTrail modification capabilities detected. This poses compliance risks for audit trail integrity."
                .to_string(),
        );
    }

    recs
}

fn compliance_issues(details: &[ActionDetail]) -> Vec<ComplianceIssue> {
    let mut issues = Vec::new();

    let audit = affected(details, |d| {
        d.action.contains("cloudtrail:")
            && matches!(d.risk_level, Some(RiskLevel::Critical | RiskLevel::High))
    });
    if !audit.is_empty() {
        issues.push(ComplianceIssue {
            regulation: "SOX/GDPR",
            issue: "Audit Trail Integrity Risk",
            description: "Actions that can modify or disable audit logging detected",
            affected_actions: audit,
            severity: RiskLevel::Critical,
        });
    }

    let secrets = affected(details, |d| {
        d.action.contains("secretsmanager:") || d.action.contains("ssm:")
    });
    if !secrets.is_empty() {
        issues.push(ComplianceIssue {
            regulation: "PCI-DSS",
            issue: "Sensitive Data Access",
            description: "Access to secrets and configuration parameters detected",
            affected_actions: secrets,
            severity: RiskLevel::Medium,
        });
    }

    let network = affected(details, |d| {
        d.action.contains("ec2:") && d.risk_level == Some(RiskLevel::Critical)
    });
    if !network.is_empty() {
        issues.push(ComplianceIssue {
            regulation: "ISO 27001",
            issue: "Network Security Controls",
            description: "Critical network modification capabilities detected",
            affected_actions: network,
            severity: RiskLevel::High,
        });
    }

    issues
}

fn affected(details: &[ActionDetail], pred: impl Fn(&ActionDetail) -> bool) -> Vec<String> {
    details
        .iter()
        .filter(|d| pred(d))
        .map(|d| d.action.clone())
        .collect()
}

#[must_use]
pub fn overall_risk(scores: &PermissionScores, high_risk_count: usize) -> RiskLevel {
    if scores.admin_score >= 8 || high_risk_count >= 5 {
        RiskLevel::Critical
    } else if scores.admin_score >= 5 || high_risk_count >= 3 {
        RiskLevel::High
    } else if scores.write_score >= 5 || high_risk_count >= 1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
