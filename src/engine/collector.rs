use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::domain::{
    AccessLevel, AccessRecord, Account, AccountRoles, AssignmentType, PermissionScores, Role,
    RoleAccess, User, UserStatus, UserSummary,
};
use crate::engine::analyzer::PolicyAnalyzer;
use crate::engine::classifier::AccountClassifier;
use crate::engine::directory::{
    AccountAssignment, DirectoryGroup, DirectoryUser, IdentityDirectory, PrincipalType,
};
use crate::error::Result;

pub const DIRECT_ASSIGNMENT: &str = "DIRECT";

/// Everything fetched from the directory, before the per-user join.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub users: Vec<DirectoryUser>,
    pub groups: Vec<DirectoryGroup>,
    /// Group id to member user ids.
    pub group_members: HashMap<String, HashSet<String>>,
    pub accounts: HashMap<String, Account>,
    pub roles: HashMap<String, Role>,
    /// Keyed by `(account id, permission set arn)`.
    pub assignments: BTreeMap<(String, String), Vec<AccountAssignment>>,
}

/// Result of the join: one row per user/account/permission set plus the
/// per-user summaries of the JSON export.
#[derive(Debug, Clone, Default)]
pub struct AccessReport {
    pub records: Vec<AccessRecord>,
    pub summaries: Vec<UserSummary>,
}

impl AccessReport {
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.summaries.len()
    }

    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_placeholder()).count()
    }
}

pub struct Collector<'a, D> {
    directory: &'a D,
    analyzer: PolicyAnalyzer<'a>,
    classifier: &'a AccountClassifier,
}

impl<'a, D: IdentityDirectory> Collector<'a, D> {
    pub fn new(
        directory: &'a D,
        analyzer: PolicyAnalyzer<'a>,
        classifier: &'a AccountClassifier,
    ) -> Self {
        Self {
            directory,
            analyzer,
            classifier,
        }
    }

    pub async fn collect(&self) -> Result<AccessReport> {
        let inventory = self.inventory().await?;
        Ok(inventory.join())
    }

    /// Fetch users, groups, accounts, permission sets and assignments.
    ///
    /// The four top-level listings are required; per-group, per-permission-set
    /// and per-assignment failures are logged and skipped.
    pub async fn inventory(&self) -> Result<Inventory> {
        let users = self.directory.list_users().await?;
        let groups = self.directory.list_groups().await?;
        let org_accounts = self.directory.list_accounts().await?;
        let permission_sets = self.directory.list_permission_sets().await?;

        info!(
            users = users.len(),
            groups = groups.len(),
            accounts = org_accounts.len(),
            permission_sets = permission_sets.len(),
            "directory listed"
        );

        let mut group_members = HashMap::with_capacity(groups.len());
        for group in &groups {
            match self.directory.list_group_members(&group.id).await {
                Ok(members) => {
                    group_members.insert(group.id.clone(), members.into_iter().collect());
                }
                Err(e) => warn!(group = %group.display_name, error = %e, "skipping group members"),
            }
        }

        let accounts: HashMap<String, Account> = org_accounts
            .into_iter()
            .map(|a| {
                let classification = self.classifier.classify(&a.name).to_string();
                (
                    a.id.clone(),
                    Account {
                        id: a.id,
                        name: a.name,
                        classification,
                    },
                )
            })
            .collect();

        let mut roles = HashMap::with_capacity(permission_sets.len());
        let mut assignments = BTreeMap::new();
        for arn in &permission_sets {
            let role = self.analyze_role(arn).await;
            debug!(role = %role.name, access = %role.access_level, "analyzed permission set");
            roles.insert(arn.clone(), role);

            let provisioned = match self.directory.list_provisioned_accounts(arn).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(permission_set = %arn, error = %e, "skipping provisioned accounts");
                    continue;
                }
            };

            for account_id in provisioned {
                if !accounts.contains_key(&account_id) {
                    debug!(account = %account_id, "provisioned account outside the organization listing");
                    continue;
                }
                match self
                    .directory
                    .list_account_assignments(&account_id, arn)
                    .await
                {
                    Ok(found) if !found.is_empty() => {
                        assignments.insert((account_id, arn.clone()), found);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(
                        account = %account_id,
                        permission_set = %arn,
                        error = %e,
                        "skipping account assignments"
                    ),
                }
            }
        }

        Ok(Inventory {
            users,
            groups,
            group_members,
            accounts,
            roles,
            assignments,
        })
    }

    async fn analyze_role(&self, arn: &str) -> Role {
        let name = match self.directory.describe_permission_set(arn).await {
            Ok(details) => details.name,
            Err(e) => {
                warn!(permission_set = %arn, error = %e, "could not describe permission set");
                arn.rsplit('/').next().unwrap_or(arn).to_string()
            }
        };

        match self.policies(arn).await {
            Ok((managed, inline)) => {
                let (access_level, scores) = self
                    .analyzer
                    .analyze_permission_set(&managed, inline.as_deref());
                Role {
                    name,
                    arn: arn.to_string(),
                    access_level,
                    scores,
                }
            }
            Err(e) => {
                warn!(permission_set = %arn, error = %e, "could not analyze permissions");
                Role {
                    name,
                    arn: arn.to_string(),
                    access_level: AccessLevel::Unknown,
                    scores: PermissionScores {
                        justification: format!("Permission analysis failed: {e}"),
                        ..PermissionScores::default()
                    },
                }
            }
        }
    }

    async fn policies(&self, arn: &str) -> Result<(Vec<String>, Option<String>)> {
        let managed = self
            .directory
            .list_managed_policies(arn)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let inline = self.directory.get_inline_policy(arn).await?;
        Ok((managed, inline))
    }
}

impl Inventory {
    /// Join users with their direct and group assignments, in user listing
    /// order and `(account id, permission set arn)` order within a user.
    #[must_use]
    pub fn join(&self) -> AccessReport {
        let mut report = AccessReport::default();
        let total = self.users.len();

        for (idx, entry) in self.users.iter().enumerate() {
            let user_groups: Vec<&DirectoryGroup> = self
                .groups
                .iter()
                .filter(|g| {
                    self.group_members
                        .get(&g.id)
                        .is_some_and(|members| members.contains(&entry.id))
                })
                .collect();

            let mut user = User {
                id: entry.id.clone(),
                username: entry
                    .user_name
                    .clone()
                    .or_else(|| entry.display_name.clone())
                    .unwrap_or_else(|| entry.id.clone()),
                display_name: entry.display_name.clone(),
                email: entry.preferred_email().unwrap_or("N/A").to_string(),
                groups: user_groups.iter().map(|g| g.display_name.clone()).collect(),
                status: UserStatus::Disabled,
            };

            let grants = self.grants_for(&entry.id, &user_groups);
            if !grants.is_empty() {
                user.status = UserStatus::Enabled;
            }
            info!(
                "[{}/{}] processing user {} ({})",
                idx + 1,
                total,
                user.name(),
                user.status
            );

            let mut by_account: Vec<AccountRoles> = Vec::new();
            for (account, role, responsible_group, assignment_type) in &grants {
                let position = by_account
                    .iter()
                    .position(|a| a.account_id == account.id)
                    .unwrap_or_else(|| {
                        by_account.push(AccountRoles {
                            account_name: account.name.clone(),
                            account_id: account.id.clone(),
                            roles: Vec::new(),
                        });
                        by_account.len() - 1
                    });
                let roles = &mut by_account[position].roles;
                if !roles.iter().any(|r| r.arn == role.arn) {
                    roles.push(RoleAccess::from(*role));
                }

                report.records.push(AccessRecord {
                    user: user.clone(),
                    account: (*account).clone(),
                    role: (*role).clone(),
                    responsible_group: responsible_group.clone(),
                    assignment_type: *assignment_type,
                });
            }

            report.summaries.push(UserSummary {
                user: user.name().to_string(),
                groups: user.groups.clone(),
                accounts: by_account,
            });

            if grants.is_empty() {
                report.records.push(AccessRecord::unassigned(user));
            }
        }

        report
    }

    fn grants_for(
        &self,
        user_id: &str,
        user_groups: &[&DirectoryGroup],
    ) -> Vec<(&Account, &Role, String, AssignmentType)> {
        let mut grants = Vec::new();
        for ((account_id, arn), assignments) in &self.assignments {
            let (Some(account), Some(role)) = (self.accounts.get(account_id), self.roles.get(arn))
            else {
                continue;
            };
            for assignment in assignments {
                match assignment.principal_type {
                    PrincipalType::User if assignment.principal_id == user_id => {
                        grants.push((
                            account,
                            role,
                            DIRECT_ASSIGNMENT.to_string(),
                            AssignmentType::User,
                        ));
                    }
                    PrincipalType::Group => {
                        if let Some(group) =
                            user_groups.iter().find(|g| g.id == assignment.principal_id)
                        {
                            grants.push((
                                account,
                                role,
                                group.display_name.clone(),
                                AssignmentType::Group,
                            ));
                        }
                    }
                    PrincipalType::User => {}
                }
            }
        }
        grants
    }
}
