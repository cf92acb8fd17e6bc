//! Identity Center, Identity Store and Organizations over the AWS SDK.
//!
//! Credentials come from the default provider chain (environment, shared
//! profile, SSO, instance metadata). Every call here is read-only.

use async_trait::async_trait;
use aws_sdk_identitystore::types::MemberId;
use aws_sdk_ssoadmin::error::DisplayErrorContext;
use aws_sdk_ssoadmin::types::PrincipalType as SdkPrincipalType;
use tracing::{debug, info};

use crate::config::AwsConfig;
use crate::engine::directory::{
    AccountAssignment, DirectoryEmail, DirectoryGroup, DirectoryUser, IdentityDirectory,
    ManagedPolicy, OrgAccount, PermissionSetDetails, PrincipalType,
};
use crate::error::{AuditError, Result};

fn sdk_error<E>(operation: &str, err: &E) -> AuditError
where
    E: std::error::Error,
{
    AuditError::aws(operation, DisplayErrorContext(err).to_string())
}

#[derive(Debug, Clone)]
pub struct AwsDirectory {
    sso_admin: aws_sdk_ssoadmin::Client,
    identity_store: aws_sdk_identitystore::Client,
    organizations: aws_sdk_organizations::Client,
    instance_arn: String,
    identity_store_id: String,
}

impl AwsDirectory {
    /// Load the SDK configuration, check the credentials with
    /// `sts:GetCallerIdentity` and bind to the first Identity Center instance.
    pub async fn connect(settings: &AwsConfig) -> Result<Self> {
        let mut loader = aws_config::from_env();
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let identity = aws_sdk_sts::Client::new(&sdk_config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| AuditError::Credentials(DisplayErrorContext(&e).to_string()))?;
        info!(
            account = identity.account().unwrap_or("unknown"),
            arn = identity.arn().unwrap_or("unknown"),
            "AWS credentials validated"
        );

        let sso_admin = aws_sdk_ssoadmin::Client::new(&sdk_config);
        let instances = sso_admin
            .list_instances()
            .send()
            .await
            .map_err(|e| sdk_error("sso-admin:ListInstances", &e))?;
        let instance = instances.instances().first().ok_or(AuditError::NoInstance)?;
        let instance_arn = instance
            .instance_arn()
            .ok_or(AuditError::NoInstance)?
            .to_string();
        let identity_store_id = instance
            .identity_store_id()
            .ok_or(AuditError::NoInstance)?
            .to_string();

        info!(
            instance_arn = %instance_arn,
            identity_store_id = %identity_store_id,
            region = ?sdk_config.region().map(ToString::to_string),
            "IAM Identity Center instance selected"
        );

        Ok(Self {
            sso_admin,
            identity_store: aws_sdk_identitystore::Client::new(&sdk_config),
            organizations: aws_sdk_organizations::Client::new(&sdk_config),
            instance_arn,
            identity_store_id,
        })
    }

    #[must_use]
    pub fn instance_arn(&self) -> &str {
        &self.instance_arn
    }

    #[must_use]
    pub fn identity_store_id(&self) -> &str {
        &self.identity_store_id
    }
}

#[async_trait]
impl IdentityDirectory for AwsDirectory {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        let mut pages = self
            .identity_store
            .list_users()
            .identity_store_id(&self.identity_store_id)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("identitystore:ListUsers", &e))?;
            for user in page.users() {
                users.push(DirectoryUser {
                    id: user.user_id().to_string(),
                    user_name: user.user_name().map(ToString::to_string),
                    display_name: user.display_name().map(ToString::to_string),
                    emails: user
                        .emails()
                        .iter()
                        .filter_map(|e| {
                            e.value().map(|value| DirectoryEmail {
                                value: value.to_string(),
                                primary: e.primary(),
                            })
                        })
                        .collect(),
                });
            }
        }
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        let mut groups = Vec::new();
        let mut pages = self
            .identity_store
            .list_groups()
            .identity_store_id(&self.identity_store_id)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("identitystore:ListGroups", &e))?;
            for group in page.groups() {
                groups.push(DirectoryGroup {
                    id: group.group_id().to_string(),
                    display_name: group
                        .display_name()
                        .unwrap_or(group.group_id())
                        .to_string(),
                });
            }
        }
        debug!(count = groups.len(), "listed groups");
        Ok(groups)
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let mut members = Vec::new();
        let mut pages = self
            .identity_store
            .list_group_memberships()
            .identity_store_id(&self.identity_store_id)
            .group_id(group_id)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("identitystore:ListGroupMemberships", &e))?;
            for membership in page.group_memberships() {
                if let Some(MemberId::UserId(user_id)) = membership.member_id() {
                    members.push(user_id.clone());
                }
            }
        }
        Ok(members)
    }

    async fn list_accounts(&self) -> Result<Vec<OrgAccount>> {
        let mut accounts = Vec::new();
        let mut pages = self.organizations.list_accounts().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("organizations:ListAccounts", &e))?;
            for account in page.accounts() {
                let Some(id) = account.id() else { continue };
                accounts.push(OrgAccount {
                    id: id.to_string(),
                    name: account.name().unwrap_or(id).to_string(),
                });
            }
        }
        debug!(count = accounts.len(), "listed accounts");
        Ok(accounts)
    }

    async fn list_permission_sets(&self) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut pages = self
            .sso_admin
            .list_permission_sets()
            .instance_arn(&self.instance_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("sso-admin:ListPermissionSets", &e))?;
            arns.extend(page.permission_sets().iter().cloned());
        }
        debug!(count = arns.len(), "listed permission sets");
        Ok(arns)
    }

    async fn describe_permission_set(&self, arn: &str) -> Result<PermissionSetDetails> {
        let output = self
            .sso_admin
            .describe_permission_set()
            .instance_arn(&self.instance_arn)
            .permission_set_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error("sso-admin:DescribePermissionSet", &e))?;
        let name = output
            .permission_set()
            .and_then(|ps| ps.name())
            .ok_or_else(|| AuditError::UnknownPermissionSet(arn.to_string()))?;
        Ok(PermissionSetDetails {
            arn: arn.to_string(),
            name: name.to_string(),
        })
    }

    async fn list_managed_policies(&self, arn: &str) -> Result<Vec<ManagedPolicy>> {
        let mut policies = Vec::new();
        let mut pages = self
            .sso_admin
            .list_managed_policies_in_permission_set()
            .instance_arn(&self.instance_arn)
            .permission_set_arn(arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|e| sdk_error("sso-admin:ListManagedPoliciesInPermissionSet", &e))?;
            for policy in page.attached_managed_policies() {
                let Some(name) = policy.name() else { continue };
                policies.push(ManagedPolicy {
                    name: name.to_string(),
                    arn: policy.arn().unwrap_or_default().to_string(),
                });
            }
        }
        Ok(policies)
    }

    async fn get_inline_policy(&self, arn: &str) -> Result<Option<String>> {
        let output = self
            .sso_admin
            .get_inline_policy_for_permission_set()
            .instance_arn(&self.instance_arn)
            .permission_set_arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error("sso-admin:GetInlinePolicyForPermissionSet", &e))?;
        Ok(output
            .inline_policy()
            .filter(|p| !p.trim().is_empty())
            .map(ToString::to_string))
    }

    async fn list_provisioned_accounts(&self, arn: &str) -> Result<Vec<String>> {
        let mut account_ids = Vec::new();
        let mut pages = self
            .sso_admin
            .list_accounts_for_provisioned_permission_set()
            .instance_arn(&self.instance_arn)
            .permission_set_arn(arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page
                .map_err(|e| sdk_error("sso-admin:ListAccountsForProvisionedPermissionSet", &e))?;
            account_ids.extend(page.account_ids().iter().cloned());
        }
        Ok(account_ids)
    }

    async fn list_account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<AccountAssignment>> {
        let mut assignments = Vec::new();
        let mut pages = self
            .sso_admin
            .list_account_assignments()
            .instance_arn(&self.instance_arn)
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("sso-admin:ListAccountAssignments", &e))?;
            for assignment in page.account_assignments() {
                let principal_type = match assignment.principal_type() {
                    Some(SdkPrincipalType::User) => PrincipalType::User,
                    Some(SdkPrincipalType::Group) => PrincipalType::Group,
                    _ => continue,
                };
                let Some(principal_id) = assignment.principal_id() else {
                    continue;
                };
                assignments.push(AccountAssignment {
                    principal_type,
                    principal_id: principal_id.to_string(),
                });
            }
        }
        Ok(assignments)
    }
}
