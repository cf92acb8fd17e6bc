use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEmail {
    pub value: String,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryUser {
    pub id: String,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub emails: Vec<DirectoryEmail>,
}

impl DirectoryUser {
    /// Primary email, else the first one listed.
    #[must_use]
    pub fn preferred_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgAccount {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSetDetails {
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalType {
    User,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAssignment {
    pub principal_type: PrincipalType,
    pub principal_id: String,
}

/// Read-only view of an Identity Center instance and its organization.
///
/// Listings return every page. `AwsDirectory` is the production
/// implementation; `CachedDirectory` memoizes any implementation.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>>;

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>>;

    /// User ids that are members of the group.
    async fn list_group_members(&self, group_id: &str) -> Result<Vec<String>>;

    async fn list_accounts(&self) -> Result<Vec<OrgAccount>>;

    async fn list_permission_sets(&self) -> Result<Vec<String>>;

    async fn describe_permission_set(&self, arn: &str) -> Result<PermissionSetDetails>;

    async fn list_managed_policies(&self, arn: &str) -> Result<Vec<ManagedPolicy>>;

    /// `None` when the permission set carries no inline policy.
    async fn get_inline_policy(&self, arn: &str) -> Result<Option<String>>;

    /// Accounts the permission set is provisioned to.
    async fn list_provisioned_accounts(&self, arn: &str) -> Result<Vec<String>>;

    async fn list_account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<AccountAssignment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(value: &str, primary: bool) -> DirectoryEmail {
        DirectoryEmail {
            value: value.to_string(),
            primary,
        }
    }

    #[test]
    fn test_preferred_email_picks_primary() {
        let user = DirectoryUser {
            emails: vec![email("a@example.com", false), email("b@example.com", true)],
            ..DirectoryUser::default()
        };
        assert_eq!(user.preferred_email(), Some("b@example.com"));
    }

    #[test]
    fn test_preferred_email_falls_back_to_first() {
        let user = DirectoryUser {
            emails: vec![email("a@example.com", false), email("c@example.com", false)],
            ..DirectoryUser::default()
        };
        assert_eq!(user.preferred_email(), Some("a@example.com"));
        assert_eq!(DirectoryUser::default().preferred_email(), None);
    }
}
