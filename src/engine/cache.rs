use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use crate::engine::directory::{
    AccountAssignment, DirectoryGroup, DirectoryUser, IdentityDirectory, ManagedPolicy,
    OrgAccount, PermissionSetDetails,
};
use crate::error::Result;

type Memo<K, V> = Mutex<HashMap<K, V>>;

/// Memoizing wrapper around any [`IdentityDirectory`].
///
/// Each listing and each keyed lookup reaches the wrapped directory at most
/// once per successful result; failures are not cached.
pub struct CachedDirectory<D> {
    inner: D,
    users: OnceCell<Vec<DirectoryUser>>,
    groups: OnceCell<Vec<DirectoryGroup>>,
    accounts: OnceCell<Vec<OrgAccount>>,
    permission_sets: OnceCell<Vec<String>>,
    group_members: Memo<String, Vec<String>>,
    details: Memo<String, PermissionSetDetails>,
    managed_policies: Memo<String, Vec<ManagedPolicy>>,
    inline_policies: Memo<String, Option<String>>,
    provisioned: Memo<String, Vec<String>>,
    assignments: Memo<(String, String), Vec<AccountAssignment>>,
}

impl<D: IdentityDirectory> CachedDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            users: OnceCell::new(),
            groups: OnceCell::new(),
            accounts: OnceCell::new(),
            permission_sets: OnceCell::new(),
            group_members: Mutex::default(),
            details: Mutex::default(),
            managed_policies: Mutex::default(),
            inline_policies: Mutex::default(),
            provisioned: Mutex::default(),
            assignments: Mutex::default(),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

async fn memoized<K, V, F, Fut>(memo: &Memo<K, V>, key: K, fetch: F) -> Result<V>
where
    K: Eq + Hash,
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V>>,
{
    let mut entries = memo.lock().await;
    if let Some(hit) = entries.get(&key) {
        return Ok(hit.clone());
    }
    let value = fetch().await?;
    entries.insert(key, value.clone());
    Ok(value)
}

#[async_trait]
impl<D: IdentityDirectory> IdentityDirectory for CachedDirectory<D> {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        self.users
            .get_or_try_init(|| self.inner.list_users())
            .await
            .cloned()
    }

    async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        self.groups
            .get_or_try_init(|| self.inner.list_groups())
            .await
            .cloned()
    }

    async fn list_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        memoized(&self.group_members, group_id.to_string(), || {
            self.inner.list_group_members(group_id)
        })
        .await
    }

    async fn list_accounts(&self) -> Result<Vec<OrgAccount>> {
        self.accounts
            .get_or_try_init(|| self.inner.list_accounts())
            .await
            .cloned()
    }

    async fn list_permission_sets(&self) -> Result<Vec<String>> {
        self.permission_sets
            .get_or_try_init(|| self.inner.list_permission_sets())
            .await
            .cloned()
    }

    async fn describe_permission_set(&self, arn: &str) -> Result<PermissionSetDetails> {
        memoized(&self.details, arn.to_string(), || {
            self.inner.describe_permission_set(arn)
        })
        .await
    }

    async fn list_managed_policies(&self, arn: &str) -> Result<Vec<ManagedPolicy>> {
        memoized(&self.managed_policies, arn.to_string(), || {
            self.inner.list_managed_policies(arn)
        })
        .await
    }

    async fn get_inline_policy(&self, arn: &str) -> Result<Option<String>> {
        memoized(&self.inline_policies, arn.to_string(), || {
            self.inner.get_inline_policy(arn)
        })
        .await
    }

    async fn list_provisioned_accounts(&self, arn: &str) -> Result<Vec<String>> {
        memoized(&self.provisioned, arn.to_string(), || {
            self.inner.list_provisioned_accounts(arn)
        })
        .await
    }

    async fn list_account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> Result<Vec<AccountAssignment>> {
        memoized(
            &self.assignments,
            (account_id.to_string(), permission_set_arn.to_string()),
            || self.inner.list_account_assignments(account_id, permission_set_arn),
        )
        .await
    }
}
