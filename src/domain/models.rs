use std::fmt;

use serde::{Deserialize, Serialize};

/// Three-tier classification of a permission set, plus the states a row can
/// fall into when analysis failed or the user is disabled.
///
/// Variants are ordered from least to most privileged so `max()` yields the
/// highest access a user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    NoAccess,
    #[default]
    Unknown,
    ReadOnly,
    ReadWrite,
    FullAdmin,
}

impl AccessLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NoAccess => "No access",
            Self::Unknown => "unknown",
            Self::ReadOnly => "Read Only",
            Self::ReadWrite => "Read Write",
            Self::FullAdmin => "Admin",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all(serialize = "UPPERCASE", deserialize = "lowercase"))]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const DESCENDING: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "MINIMAL",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionScores {
    pub read_score: u32,
    pub write_score: u32,
    pub admin_score: u32,
    pub justification: String,
}

impl PermissionScores {
    #[must_use]
    pub fn new(read_score: u32, write_score: u32, admin_score: u32) -> Self {
        Self {
            read_score,
            write_score,
            admin_score,
            justification: String::new(),
        }
    }

    /// Raise each score to at least the given values.
    pub fn absorb(&mut self, read: u32, write: u32, admin: u32) {
        self.read_score = self.read_score.max(read);
        self.write_score = self.write_score.max(write);
        self.admin_score = self.admin_score.max(admin);
    }

    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        if self.admin_score >= 8 {
            RiskLevel::Critical
        } else if self.admin_score >= 5 || self.write_score >= 8 {
            RiskLevel::High
        } else if self.write_score >= 5 {
            RiskLevel::Medium
        } else if self.read_score >= 5 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }
}

/// A permission set together with its analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub arn: String,
    pub access_level: AccessLevel,
    pub scores: PermissionScores,
}

impl Role {
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        self.scores.risk_level()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub classification: String,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStatus {
    Enabled,
    #[default]
    Disabled,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub groups: Vec<String>,
    pub status: UserStatus,
}

impl User {
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentType {
    User,
    Group,
    None,
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::None => "NONE",
        })
    }
}

/// One user / account / permission set row, with the group that grants it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub user: User,
    pub account: Account,
    pub role: Role,
    pub responsible_group: String,
    pub assignment_type: AssignmentType,
}

impl AccessRecord {
    /// Placeholder row for a user holding no assignment at all.
    #[must_use]
    pub fn unassigned(user: User) -> Self {
        Self {
            user,
            account: Account::default(),
            role: Role::default(),
            responsible_group: "NONE".to_string(),
            assignment_type: AssignmentType::None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.assignment_type == AssignmentType::None
    }

    /// Access level as shown in tabular reports: disabled users have none.
    #[must_use]
    pub fn effective_access(&self) -> AccessLevel {
        if self.user.status == UserStatus::Disabled {
            AccessLevel::NoAccess
        } else {
            self.role.access_level
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAccess {
    pub name: String,
    #[serde(skip)]
    pub arn: String,
    pub access_level: AccessLevel,
    pub read_score: u32,
    pub write_score: u32,
    pub admin_score: u32,
}

impl From<&Role> for RoleAccess {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            arn: role.arn.clone(),
            access_level: role.access_level,
            read_score: role.scores.read_score,
            write_score: role.scores.write_score,
            admin_score: role.scores.admin_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRoles {
    pub account_name: String,
    pub account_id: String,
    pub roles: Vec<RoleAccess>,
}

/// Per-user entry of the JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Groups")]
    pub groups: Vec<String>,
    #[serde(rename = "AWS Accounts")]
    pub accounts: Vec<AccountRoles>,
}
