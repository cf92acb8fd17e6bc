//! End-to-end: in-memory directory -> cache -> collector -> report files.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use sso_audit::config::{ClassificationConfig, ClassificationRule};
use sso_audit::engine::directory::{
    AccountAssignment, DirectoryEmail, DirectoryGroup, DirectoryUser, ManagedPolicy, OrgAccount,
    PermissionSetDetails, PrincipalType,
};
use sso_audit::engine::{
    AccessReport, AccountClassifier, CachedDirectory, Collector, IdentityDirectory,
    PolicyAnalyzer, ScoringTable, DIRECT_ASSIGNMENT,
};
use sso_audit::output::{write_reports, ReportFormat};
use sso_audit::{AccessLevel, AuditError, AuditResult};

const ADMIN_PS: &str = "arn:aws:sso:::permissionSet/ssoins-1/ps-admin";
const READ_PS: &str = "arn:aws:sso:::permissionSet/ssoins-1/ps-read";
const BROKEN_PS: &str = "arn:aws:sso:::permissionSet/ssoins-1/ps-broken";

/// A directory call that the fake answers with an error.
#[derive(Clone, Copy)]
enum Outage<'a> {
    Users,
    Accounts,
    GroupMembers(&'a str),
    ProvisionedAccounts(&'a str),
    Assignments(&'a str, &'a str),
}

#[derive(Default)]
struct FakeDirectory {
    calls: AtomicUsize,
    outage: Option<Outage<'static>>,
}

impl FakeDirectory {
    fn failing(outage: Outage<'static>) -> Self {
        Self {
            outage: Some(outage),
            ..Self::default()
        }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, call: Outage<'_>) -> AuditResult<()> {
        let fails = match (self.outage, call) {
            (Some(Outage::Users), Outage::Users) | (Some(Outage::Accounts), Outage::Accounts) => {
                true
            }
            (Some(Outage::GroupMembers(a)), Outage::GroupMembers(b)) => a == b,
            (Some(Outage::ProvisionedAccounts(a)), Outage::ProvisionedAccounts(b)) => a == b,
            (Some(Outage::Assignments(a, p)), Outage::Assignments(b, q)) => a == b && p == q,
            _ => false,
        };
        if fails {
            return Err(AuditError::Aws {
                operation: "Fake".to_string(),
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn user(id: &str, name: &str, email: Option<&str>) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        user_name: Some(name.to_string()),
        display_name: None,
        emails: email
            .map(|value| DirectoryEmail {
                value: value.to_string(),
                primary: true,
            })
            .into_iter()
            .collect(),
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    async fn list_users(&self) -> AuditResult<Vec<DirectoryUser>> {
        self.hit();
        self.check(Outage::Users)?;
        Ok(vec![
            user("u-alice", "alice", Some("alice@example.com")),
            user("u-bob", "bob", Some("bob@example.com")),
            user("u-carol", "carol", None),
        ])
    }

    async fn list_groups(&self) -> AuditResult<Vec<DirectoryGroup>> {
        self.hit();
        Ok(vec![DirectoryGroup {
            id: "g-ops".to_string(),
            display_name: "Operations".to_string(),
        }])
    }

    async fn list_group_members(&self, group_id: &str) -> AuditResult<Vec<String>> {
        self.hit();
        self.check(Outage::GroupMembers(group_id))?;
        Ok(match group_id {
            "g-ops" => vec!["u-bob".to_string()],
            _ => Vec::new(),
        })
    }

    async fn list_accounts(&self) -> AuditResult<Vec<OrgAccount>> {
        self.hit();
        self.check(Outage::Accounts)?;
        Ok(vec![
            OrgAccount {
                id: "111111111111".to_string(),
                name: "payments-prod".to_string(),
            },
            OrgAccount {
                id: "222222222222".to_string(),
                name: "payments-dev".to_string(),
            },
        ])
    }

    async fn list_permission_sets(&self) -> AuditResult<Vec<String>> {
        self.hit();
        Ok(vec![
            ADMIN_PS.to_string(),
            READ_PS.to_string(),
            BROKEN_PS.to_string(),
        ])
    }

    async fn describe_permission_set(&self, arn: &str) -> AuditResult<PermissionSetDetails> {
        self.hit();
        let name = match arn {
            ADMIN_PS => "AdministratorAccess",
            READ_PS => "ReadOnly",
            _ => {
                return Err(AuditError::Aws {
                    operation: "DescribePermissionSet".to_string(),
                    message: "access denied".to_string(),
                })
            }
        };
        Ok(PermissionSetDetails {
            arn: arn.to_string(),
            name: name.to_string(),
        })
    }

    async fn list_managed_policies(&self, arn: &str) -> AuditResult<Vec<ManagedPolicy>> {
        self.hit();
        let name = match arn {
            ADMIN_PS => "AdministratorAccess",
            READ_PS => "ReadOnlyAccess",
            _ => {
                return Err(AuditError::Aws {
                    operation: "ListManagedPoliciesInPermissionSet".to_string(),
                    message: "throttled".to_string(),
                })
            }
        };
        Ok(vec![ManagedPolicy {
            name: name.to_string(),
            arn: format!("arn:aws:iam::aws:policy/{name}"),
        }])
    }

    async fn get_inline_policy(&self, _arn: &str) -> AuditResult<Option<String>> {
        self.hit();
        Ok(None)
    }

    async fn list_provisioned_accounts(&self, arn: &str) -> AuditResult<Vec<String>> {
        self.hit();
        self.check(Outage::ProvisionedAccounts(arn))?;
        Ok(match arn {
            ADMIN_PS => vec!["111111111111".to_string(), "999999999999".to_string()],
            READ_PS => vec!["111111111111".to_string(), "222222222222".to_string()],
            _ => vec!["222222222222".to_string()],
        })
    }

    async fn list_account_assignments(
        &self,
        account_id: &str,
        permission_set_arn: &str,
    ) -> AuditResult<Vec<AccountAssignment>> {
        self.hit();
        self.check(Outage::Assignments(account_id, permission_set_arn))?;
        let assignment = |principal_type, id: &str| AccountAssignment {
            principal_type,
            principal_id: id.to_string(),
        };
        Ok(match (account_id, permission_set_arn) {
            ("111111111111", ADMIN_PS) => vec![assignment(PrincipalType::User, "u-alice")],
            ("111111111111", READ_PS) => vec![assignment(PrincipalType::Group, "g-ops")],
            ("222222222222", READ_PS) => vec![
                assignment(PrincipalType::Group, "g-ops"),
                assignment(PrincipalType::User, "u-bob"),
            ],
            ("222222222222", BROKEN_PS) => vec![assignment(PrincipalType::User, "u-alice")],
            _ => Vec::new(),
        })
    }
}

fn classifier() -> AccountClassifier {
    AccountClassifier::new(&ClassificationConfig {
        rules: vec![
            ClassificationRule {
                name: "Production".to_string(),
                include: vec!["prod".to_string()],
                exclude: vec![],
            },
            ClassificationRule {
                name: "Development".to_string(),
                include: vec!["dev".to_string()],
                exclude: vec![],
            },
        ],
        ..ClassificationConfig::default()
    })
}

#[tokio::test]
async fn test_collect_joins_users_groups_and_assignments() {
    let table = ScoringTable::builtin().unwrap();
    let classifier = classifier();
    let directory = CachedDirectory::new(FakeDirectory::default());
    let collector = Collector::new(&directory, PolicyAnalyzer::new(&table), &classifier);

    let report = collector.collect().await.unwrap();

    assert_eq!(report.user_count(), 3);
    assert_eq!(report.assignment_count(), 5);

    let alice: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.user.username == "alice")
        .collect();
    assert_eq!(alice.len(), 2);
    assert_eq!(alice[0].account.name, "payments-prod");
    assert_eq!(alice[0].account.classification, "Production");
    assert_eq!(alice[0].role.access_level, AccessLevel::FullAdmin);
    assert_eq!(alice[0].responsible_group, DIRECT_ASSIGNMENT);

    let broken = alice[1];
    assert_eq!(broken.role.name, "ps-broken");
    assert_eq!(broken.role.access_level, AccessLevel::Unknown);
    assert!(broken
        .role
        .scores
        .justification
        .starts_with("Permission analysis failed"));

    let bob: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.user.username == "bob")
        .collect();
    assert_eq!(bob.len(), 3);
    assert!(bob.iter().all(|r| r.user.groups == vec!["Operations"]));
    assert!(bob
        .iter()
        .any(|r| r.responsible_group == "Operations" && r.account.id == "111111111111"));
    assert!(bob
        .iter()
        .any(|r| r.responsible_group == DIRECT_ASSIGNMENT && r.account.id == "222222222222"));

    let carol: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.user.username == "carol")
        .collect();
    assert_eq!(carol.len(), 1);
    assert!(carol[0].is_placeholder());
    assert_eq!(carol[0].user.email, "N/A");
    assert_eq!(carol[0].effective_access(), AccessLevel::NoAccess);

    let bob_summary = &report.summaries[1];
    assert_eq!(bob_summary.user, "bob");
    assert_eq!(bob_summary.accounts.len(), 2);
    assert_eq!(bob_summary.accounts[1].roles.len(), 1);
}

async fn collect_with(directory: FakeDirectory) -> AuditResult<AccessReport> {
    let table = ScoringTable::builtin().unwrap();
    let classifier = classifier();
    let directory = CachedDirectory::new(directory);
    let collector = Collector::new(&directory, PolicyAnalyzer::new(&table), &classifier);
    let report = collector.collect().await?;
    Ok(report)
}

fn grants(report: &AccessReport, username: &str) -> Vec<(String, String, String)> {
    report
        .records
        .iter()
        .filter(|r| r.user.username == username && !r.is_placeholder())
        .map(|r| {
            (
                r.account.id.clone(),
                r.role.name.clone(),
                r.responsible_group.clone(),
            )
        })
        .collect()
}

fn grant(account: &str, role: &str, via: &str) -> (String, String, String) {
    (account.to_string(), role.to_string(), via.to_string())
}

#[tokio::test]
async fn test_user_listing_failure_aborts_collection() {
    let err = collect_with(FakeDirectory::failing(Outage::Users))
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::Aws { .. }));
}

#[tokio::test]
async fn test_account_listing_failure_aborts_collection() {
    let err = collect_with(FakeDirectory::failing(Outage::Accounts))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("service unavailable"));
}

#[tokio::test]
async fn test_group_member_failure_drops_only_group_grants() {
    let report = collect_with(FakeDirectory::failing(Outage::GroupMembers("g-ops")))
        .await
        .unwrap();

    assert_eq!(report.user_count(), 3);
    assert_eq!(report.assignment_count(), 3);
    assert_eq!(
        grants(&report, "bob"),
        vec![grant("222222222222", "ReadOnly", DIRECT_ASSIGNMENT)]
    );
    assert!(report
        .records
        .iter()
        .filter(|r| r.user.username == "bob")
        .all(|r| r.user.groups.is_empty()));
    assert_eq!(grants(&report, "alice").len(), 2);
}

#[tokio::test]
async fn test_provisioned_account_failure_skips_one_permission_set() {
    let report = collect_with(FakeDirectory::failing(Outage::ProvisionedAccounts(ADMIN_PS)))
        .await
        .unwrap();

    assert_eq!(report.assignment_count(), 4);
    assert_eq!(
        grants(&report, "alice"),
        vec![grant("222222222222", "ps-broken", DIRECT_ASSIGNMENT)]
    );
    assert_eq!(grants(&report, "bob").len(), 3);
}

#[tokio::test]
async fn test_assignment_failure_skips_one_account_pair() {
    let report = collect_with(FakeDirectory::failing(Outage::Assignments(
        "222222222222",
        READ_PS,
    )))
    .await
    .unwrap();

    assert_eq!(report.assignment_count(), 3);
    assert_eq!(
        grants(&report, "bob"),
        vec![grant("111111111111", "ReadOnly", "Operations")]
    );
    assert_eq!(grants(&report, "alice").len(), 2);
    let carol: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.user.username == "carol")
        .collect();
    assert_eq!(carol.len(), 1);
    assert!(carol[0].is_placeholder());
}

#[tokio::test]
async fn test_second_collection_is_served_from_cache() {
    let table = ScoringTable::builtin().unwrap();
    let classifier = classifier();
    let directory = CachedDirectory::new(FakeDirectory::default());
    let collector = Collector::new(&directory, PolicyAnalyzer::new(&table), &classifier);

    let first = collector.collect().await.unwrap();
    let calls = directory.inner().calls.load(Ordering::SeqCst);
    let second = collector.collect().await.unwrap();

    assert_eq!(first.records, second.records);
    // Only the failing lookups for the broken permission set are retried.
    let retried = directory.inner().calls.load(Ordering::SeqCst) - calls;
    assert_eq!(retried, 2);
}

#[tokio::test]
async fn test_reports_written_to_disk() {
    let table = ScoringTable::builtin().unwrap();
    let classifier = classifier();
    let directory = CachedDirectory::new(FakeDirectory::default());
    let report = Collector::new(&directory, PolicyAnalyzer::new(&table), &classifier)
        .collect()
        .await
        .unwrap();

    let temp = TempDir::new().unwrap();
    let written = write_reports(
        &report,
        &classifier,
        temp.path(),
        "audit",
        &[ReportFormat::Csv, ReportFormat::Json],
    )
    .unwrap();
    assert_eq!(written.len(), 5);

    let csv = fs::read_to_string(temp.path().join("audit.csv")).unwrap();
    assert_eq!(csv.lines().count(), 7);
    assert!(csv.contains("carol,N/A,Disabled,NONE,NONE"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp.path().join("audit.json")).unwrap())
            .unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0]["AWS Accounts"][0]["roles"][0]["access_level"], "full-admin");

    let mut by_user = HashMap::new();
    for line in fs::read_to_string(temp.path().join("audit_user_analysis.csv"))
        .unwrap()
        .lines()
        .skip(1)
    {
        let (name, rest) = line.split_once(',').unwrap();
        by_user.insert(name.to_string(), rest.to_string());
    }
    assert_eq!(by_user["alice"], "alice@example.com,Admin,unknown,No Access");
    assert_eq!(by_user["bob"], "bob@example.com,Read Only,Read Only,No Access");
    assert_eq!(by_user["carol"], "N/A,No Access,No Access,No Access");
}
